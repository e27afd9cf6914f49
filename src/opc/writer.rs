//! Package writing

use std::io::{Seek, Write};

use tracing::{debug, info};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::writer::write_model_part;

use super::content_types::{
    ContentTypes, MODEL_CONTENT_TYPE, RELATIONSHIPS_CONTENT_TYPE, content_type_for_extension,
};
use super::relationships::{
    MODEL_REL_TYPE, Relationship, THUMBNAIL_REL_TYPE, write_relationships,
};
use super::validation::{rels_path_for, validate_opc_part_name, zip_name};
use super::{CONTENT_TYPES_PATH, RELS_PATH};

fn add_file<W: Write + Seek>(zip: &mut ZipWriter<W>, name: &str, data: &[u8]) -> Result<()> {
    zip.start_file(name, SimpleFileOptions::default())
        .map_err(|e| Error::xml_write(format!("Failed to create {}: {}", name, e)))?;
    zip.write_all(data)
        .map_err(|e| Error::xml_write(format!("Failed to write {}: {}", name, e)))
}

fn relationship(index: usize, target: &str, rel_type: &str) -> Relationship {
    Relationship {
        id: format!("rel{}", index),
        target: target.to_string(),
        rel_type: rel_type.to_string(),
    }
}

/// Write a complete 3MF package for `model`
///
/// Produces `[Content_Types].xml`, `_rels/.rels`, one model part per part
/// path holding resources, the relationships of the root model part and
/// every attachment. Thumbnail attachments are related from the package,
/// other typed attachments and the non-root model parts from the root part.
pub fn create_package<W: Write + Seek>(writer: W, model: &Model) -> Result<W> {
    let root = model.root_path().to_string();
    let mut zip = ZipWriter::new(writer);

    let mut content_types = ContentTypes::default();
    content_types.add_default("rels", RELATIONSHIPS_CONTENT_TYPE);
    content_types.add_default("model", MODEL_CONTENT_TYPE);

    let mut package_rels = vec![relationship(0, &root, MODEL_REL_TYPE)];
    let mut root_rels = Vec::new();

    let parts: Vec<String> = model.part_paths().into_iter().map(str::to_string).collect();
    for path in &parts {
        validate_opc_part_name(path)?;
        content_types.add_part(path, MODEL_CONTENT_TYPE);
        if *path != root {
            root_rels.push(relationship(root_rels.len(), path, MODEL_REL_TYPE));
        }
        let mut xml = Vec::new();
        write_model_part(model, path, &mut xml)?;
        add_file(&mut zip, zip_name(path), &xml)?;
    }

    for attachment in model.attachments() {
        validate_opc_part_name(&attachment.path)?;
        let extension = attachment
            .path
            .rsplit_once('.')
            .map_or("", |(_, ext)| ext);
        content_types.add_part(&attachment.path, content_type_for_extension(extension));
        match attachment.relationship_type.as_str() {
            "" => {}
            THUMBNAIL_REL_TYPE => package_rels.push(relationship(
                package_rels.len(),
                &attachment.path,
                THUMBNAIL_REL_TYPE,
            )),
            rel_type => root_rels.push(relationship(root_rels.len(), &attachment.path, rel_type)),
        }
        add_file(&mut zip, zip_name(&attachment.path), &attachment.data)?;
    }

    if !root_rels.is_empty() {
        add_file(&mut zip, &rels_path_for(&root), &write_relationships(&root_rels)?)?;
    }
    add_file(&mut zip, RELS_PATH, &write_relationships(&package_rels)?)?;
    add_file(&mut zip, CONTENT_TYPES_PATH, &content_types.to_xml()?)?;

    debug!(
        parts = parts.len(),
        attachments = model.attachments().count(),
        "package contents written"
    );
    let writer = zip
        .finish()
        .map_err(|e| Error::xml_write(format!("Failed to finalize ZIP archive: {}", e)))?;
    info!(root = %root, "package written");
    Ok(writer)
}
