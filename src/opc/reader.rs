//! Package reading
//!
//! Opening validates the content types and the package relationships. The
//! model reader then loads every non-XML part as an attachment, parses the
//! model parts referenced from the root part and finally the root part.

use std::io::{Read, Seek};

use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::model::{Attachment, Model, ParserConfig, ProgressStage};
use crate::parser::parse_model_part;
use crate::warnings::Warnings;

use super::content_types::{ContentTypes, MODEL_CONTENT_TYPE, RELATIONSHIPS_CONTENT_TYPE};
use super::relationships::{MODEL_REL_TYPE, Relationship, parse_relationships};
use super::validation::{rels_path_for, zip_name};
use super::{CONTENT_TYPES_PATH, RELS_PATH};

/// An opened OPC package (3MF file)
pub struct Package<R: Read + Seek> {
    archive: ZipArchive<R>,
    content_types: ContentTypes,
    relationships: Vec<Relationship>,
    root_model_path: String,
}

impl<R: Read + Seek> Package<R> {
    /// Open and validate a package
    ///
    /// # Errors
    ///
    /// `InvalidFormat` when `[Content_Types].xml` or `_rels/.rels` is missing
    /// or malformed, when no model relationship exists, or when a package
    /// relationship points to a missing part.
    pub fn open(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let types_xml = read_text(&mut archive, CONTENT_TYPES_PATH).map_err(|_| {
            Error::invalid_format_context(
                "OPC package structure",
                &format!("Missing required file '{}'", CONTENT_TYPES_PATH),
            )
        })?;
        let content_types = ContentTypes::parse(&types_xml)?;

        let rels_xml = read_text(&mut archive, RELS_PATH).map_err(|_| {
            Error::invalid_format_context(
                "OPC package structure",
                &format!("Missing required file '{}'", RELS_PATH),
            )
        })?;
        let relationships = parse_relationships(&rels_xml, "/")?;

        for rel in &relationships {
            if archive.by_name(zip_name(&rel.target)).is_err() {
                return Err(Error::InvalidFormat(format!(
                    "Relationship points to non-existent file: {}",
                    rel.target
                )));
            }
        }
        let root_model_path = relationships
            .iter()
            .find(|rel| rel.rel_type == MODEL_REL_TYPE)
            .map(|rel| rel.target.clone())
            .ok_or_else(|| Error::MissingFile("3D model relationship not found".to_string()))?;

        info!(root = %root_model_path, parts = archive.len(), "opened package");
        Ok(Self {
            archive,
            content_types,
            relationships,
            root_model_path,
        })
    }

    /// Absolute path of the root model part
    pub fn root_model_path(&self) -> &str {
        &self.root_model_path
    }

    /// Package level relationships
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Content types of the package
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Relationships of a part, empty when it has none
    pub fn part_relationships(&mut self, path: &str) -> Result<Vec<Relationship>> {
        let rels_path = rels_path_for(path);
        if !self.has_file(&rels_path) {
            return Ok(Vec::new());
        }
        let xml = self.get_file(&rels_path)?;
        parse_relationships(&xml, path)
    }

    /// Text of a part
    pub fn get_file(&mut self, path: &str) -> Result<String> {
        read_text(&mut self.archive, zip_name(path))
    }

    /// Bytes of a part
    pub fn get_file_binary(&mut self, path: &str) -> Result<Vec<u8>> {
        let name = zip_name(path);
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|_| Error::MissingFile(name.to_string()))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Whether the archive holds a part
    pub fn has_file(&mut self, path: &str) -> bool {
        self.archive.by_name(zip_name(path)).is_ok()
    }

    /// Absolute paths of every file entry
    pub fn part_names(&self) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(|name| format!("/{}", name))
            .collect()
    }

    /// Number of entries in the archive
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether the archive has no entries
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Read the whole package into `model`
    ///
    /// Parts referenced from the root part through model relationships are
    /// parsed before the root part so that its components and build items
    /// can point into them.
    pub fn read_model(&mut self, config: &ParserConfig) -> Result<(Model, Warnings)> {
        config.report_progress(ProgressStage::ReadingPackage, 0.0)?;
        let mut model = Model::new();
        model.set_root_path(&self.root_model_path)?;
        let mut warnings = config.new_warnings();

        let root = self.root_model_path.clone();
        let root_rels = self.part_relationships(&root)?;
        self.load_attachments(&mut model, &root_rels)?;
        config.report_progress(ProgressStage::ReadingPackage, 1.0)?;

        let mut parsed: Vec<&str> = Vec::new();
        for rel in root_rels.iter().filter(|rel| rel.rel_type == MODEL_REL_TYPE) {
            if rel.target == root || parsed.contains(&rel.target.as_str()) {
                continue;
            }
            let xml = self.get_file(&rel.target)?;
            parse_model_part(&mut model, &mut warnings, &rel.target, &xml, config)?;
            parsed.push(&rel.target);
        }

        let xml = self.get_file(&root)?;
        parse_model_part(&mut model, &mut warnings, &root, &xml, config)?;
        model.resolve_function_calls()?;

        debug!(
            parts = parsed.len() + 1,
            resources = model.resource_count(),
            warnings = warnings.len(),
            "package read"
        );
        Ok((model, warnings))
    }

    /// Add every part that is neither XML package data nor a model
    fn load_attachments(&mut self, model: &mut Model, root_rels: &[Relationship]) -> Result<()> {
        for path in self.part_names() {
            if path == format!("/{}", CONTENT_TYPES_PATH) {
                continue;
            }
            let content_type = self.content_types.content_type_of(&path);
            let is_package_xml = path.ends_with(".rels")
                || content_type == Some(RELATIONSHIPS_CONTENT_TYPE)
                || content_type == Some(MODEL_CONTENT_TYPE);
            if is_package_xml {
                continue;
            }
            let rel_type = root_rels
                .iter()
                .chain(self.relationships.iter())
                .find(|rel| rel.target == path)
                .map(|rel| rel.rel_type.clone())
                .unwrap_or_default();
            let data = self.get_file_binary(&path)?;
            debug!(path = %path, bytes = data.len(), "attachment");
            model.add_attachment(Attachment::new(path, rel_type, data))?;
        }
        Ok(())
    }
}

fn read_text<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut file = archive
        .by_name(name)
        .map_err(|_| Error::MissingFile(name.to_string()))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}
