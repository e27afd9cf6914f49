//! Package structure tests

#[path = "../common/mod.rs"]
mod common;

use common::{MODEL_REL_TYPE, init_tracing, model_part_rels, model_xml, package, package_rels, triangle_object};
use lib3mf_model::opc::{CONTENT_TYPES_PATH, Package, RELS_PATH, create_package};
use lib3mf_model::{Error, Model, ParserConfig};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn zip_of(files: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap()
}

#[test]
fn test_missing_content_types() {
    let rels = package_rels("/3D/3dmodel.model");
    let xml = model_xml("", "");
    let cursor = zip_of(&[
        (RELS_PATH, rels.as_bytes()),
        ("3D/3dmodel.model", xml.as_bytes()),
    ]);
    let err = Model::from_reader(cursor).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)), "{}", err);
    assert!(err.to_string().contains(CONTENT_TYPES_PATH));
}

#[test]
fn test_missing_package_relationships() {
    let xml = model_xml("", "");
    let cursor = package(&[("3D/3dmodel.model", xml.as_bytes())]);
    let err = Model::from_reader(cursor).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)), "{}", err);
}

#[test]
fn test_package_without_model_relationship() {
    let rels = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/Metadata/thumbnail.png" Id="rel0" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail"/>
</Relationships>"#;
    let cursor = package(&[
        ("_rels/.rels", rels.as_bytes()),
        ("Metadata/thumbnail.png", b"png"),
    ]);
    assert!(matches!(
        Model::from_reader(cursor),
        Err(Error::MissingFile(_))
    ));
}

#[test]
fn test_root_part_at_custom_path() {
    let rels = package_rels("/model/main.model");
    let xml = model_xml(&triangle_object(1, "", ""), "<item objectid=\"1\"/>");
    let cursor = package(&[
        ("_rels/.rels", rels.as_bytes()),
        ("model/main.model", xml.as_bytes()),
    ]);
    let (model, warnings) = Model::from_reader(cursor).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(model.root_path(), "/model/main.model");
    assert!(model.find_package_resource_id("/model/main.model", 1).is_some());

    // The root part keeps its path when written again
    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let package = Package::open(Cursor::new(bytes)).unwrap();
    assert_eq!(package.root_model_path(), "/model/main.model");
}

#[test]
fn test_parts_related_from_root_are_read() {
    init_tracing();
    let rels = package_rels("/3D/3dmodel.model");
    let part_rels = model_part_rels(&["/3D/parts/bolt.model"]);
    let bolt = model_xml(&triangle_object(1, "name=\"bolt\"", ""), "");
    let root = common::production_model_xml(
        r#"    <object id="1" p:UUID="4b7f2c8e-0d1a-4c5e-9f6b-1a2b3c4d5e6f">
      <components>
        <component objectid="1" p:path="/3D/parts/bolt.model" p:UUID="9e8d7c6b-5a49-4382-9170-6f5e4d3c2b1a"/>
      </components>
    </object>"#,
        r#"<item objectid="1" p:UUID="11111111-2222-4333-8444-555555555555"/>"#,
    )
    .replace("<build>", r#"<build p:UUID="22222222-3333-4444-8555-666666666666">"#);
    let cursor = package(&[
        ("_rels/.rels", rels.as_bytes()),
        ("3D/_rels/3dmodel.model.rels", part_rels.as_bytes()),
        ("3D/3dmodel.model", root.as_bytes()),
        ("3D/parts/bolt.model", bolt.as_bytes()),
    ]);

    let mut package = Package::open(cursor).unwrap();
    let related = package.part_relationships("/3D/3dmodel.model").unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].rel_type, MODEL_REL_TYPE);

    let (model, warnings) = package.read_model(&ParserConfig::with_all_extensions()).unwrap();
    assert!(warnings.is_empty(), "{:?}", warnings.iter().collect::<Vec<_>>());
    assert_eq!(model.part_paths().len(), 2);
    let bolt = model.find_package_resource_id("/3D/parts/bolt.model", 1).unwrap();
    assert_eq!(model.object(bolt).unwrap().name.as_deref(), Some("bolt"));

    let assembly = model.find_package_resource_id(model.root_path(), 1).unwrap();
    let components = model.object(assembly).unwrap().components().unwrap();
    assert_eq!(components[0].object, bolt);

    // Both parts are written back with the relationship between them
    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let mut package = Package::open(Cursor::new(bytes)).unwrap();
    assert!(package.has_file("/3D/parts/bolt.model"));
    let related = package.part_relationships("/3D/3dmodel.model").unwrap();
    assert!(related.iter().any(|r| r.target == "/3D/parts/bolt.model"));
}

#[test]
fn test_written_package_content_types() {
    let (model, _) =
        lib3mf_model::parse_model_xml(&model_xml(&triangle_object(1, "", ""), "")).unwrap();
    let cursor = create_package(Cursor::new(Vec::new()), &model).unwrap();
    let mut package = Package::open(Cursor::new(cursor.into_inner())).unwrap();

    assert_eq!(
        package.content_types().content_type_of("/3D/3dmodel.model"),
        Some("application/vnd.ms-package.3dmanufacturing-3dmodel+xml")
    );
    let names = package.part_names();
    assert!(names.contains(&format!("/{}", CONTENT_TYPES_PATH)));
    assert!(names.contains(&format!("/{}", RELS_PATH)));
    let xml = package.get_file("/3D/3dmodel.model").unwrap();
    assert!(xml.contains("<object"));
    assert!(!xml.contains("xmlns:b="));
}
