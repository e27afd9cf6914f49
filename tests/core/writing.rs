//! Writer tests
//!
//! Models are written to a package and read back.

#[path = "../common/mod.rs"]
mod common;

use common::{model_xml, single_part_package, triangle_object};
use lib3mf_model::codec::IDENTITY_TRANSFORM;
use lib3mf_model::parser::parse_model_xml;
use lib3mf_model::{
    BaseMaterial, BaseMaterials, BuildItem, Component, ErrorCode, Extension, Mesh, Model, Object,
    ObjectType, Resource, Triangle, Unit, Vertex,
};
use std::io::Cursor;

fn roundtrip(model: &Model) -> Model {
    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let (model, warnings) = Model::from_reader(Cursor::new(bytes)).unwrap();
    assert!(warnings.is_empty(), "{:?}", warnings.iter().collect::<Vec<_>>());
    model
}

fn square_mesh() -> Mesh {
    let mut mesh = Mesh::new();
    mesh.vertices = vec![
        Vertex::new(0.0, 0.0, 0.0),
        Vertex::new(12.5, 0.0, 0.0),
        Vertex::new(12.5, 12.5, 0.0),
        Vertex::new(0.0, 12.5, -0.001),
    ];
    mesh.add_triangle(Triangle::new(0, 1, 2)).unwrap();
    mesh.add_triangle(Triangle::new(0, 2, 3)).unwrap();
    mesh
}

#[test]
fn test_build_model_and_roundtrip() {
    let mut model = Model::new();
    model.unit = Unit::Inch;
    model.language = "de-DE".to_string();

    let materials = model
        .add(Resource::BaseMaterials(BaseMaterials {
            materials: vec![
                BaseMaterial::new("steel", (128, 128, 128, 255)),
                BaseMaterial::new("glass", (200, 220, 255, 64)),
            ],
        }))
        .unwrap();

    let mut mesh = square_mesh();
    mesh.triangles[1].pid = Some(materials);
    mesh.triangles[1].p1 = Some(1);
    let mut plate = Object::new_mesh(mesh);
    plate.name = Some("plate".to_string());
    plate.part_number = Some("P-1".to_string());
    plate.pid = Some(materials);
    plate.pindex = Some(0);
    let plate = model.add(Resource::Object(plate)).unwrap();

    let assembly = model.add(Resource::Object(Object::new_components())).unwrap();
    model.add_component(assembly, Component::new(plate)).unwrap();
    let mut shifted = IDENTITY_TRANSFORM;
    shifted[10] = 40.0;
    model
        .add_component(assembly, Component::with_transform(plate, shifted))
        .unwrap();

    let mut item = BuildItem::new(assembly);
    item.transform = Some(shifted);
    model.add_build_item(item).unwrap();

    let reread = roundtrip(&model);
    assert_eq!(reread.unit, Unit::Inch);
    assert_eq!(reread.language, "de-DE");
    assert_eq!(reread.resource_count(), 3);
    let lookup = |id| {
        let pid = model.package_resource_id(id).unwrap();
        reread
            .find_package_resource_id(&pid.path, pid.model_resource_id)
            .unwrap()
    };
    let (materials, plate, assembly) = (lookup(materials), lookup(plate), lookup(assembly));

    let materials_group = reread.base_materials(materials).unwrap();
    assert_eq!(materials_group.materials[1].name, "glass");
    assert_eq!(materials_group.materials[1].display_color, (200, 220, 255, 64));

    let object = reread.object(plate).unwrap();
    assert_eq!(object.name.as_deref(), Some("plate"));
    assert_eq!(object.part_number.as_deref(), Some("P-1"));
    assert_eq!(object.pindex, Some(0));
    let mesh = object.mesh().unwrap();
    assert_eq!(mesh.vertices[3], Vertex::new(0.0, 12.5, -0.001));
    assert_eq!(mesh.triangles[1].pid, Some(materials));
    assert_eq!(mesh.triangles[1].p1, Some(1));
    assert!(mesh.triangles[0].pid.is_none());

    let components = reread.object(assembly).unwrap().components().unwrap();
    assert_eq!(components.len(), 2);
    assert_eq!(components[0].object, plate);
    assert_eq!(components[1].transform, Some(shifted));
    assert_eq!(reread.build.items[0].object, assembly);
    assert_eq!(reread.build.items[0].transform, Some(shifted));
}

#[test]
fn test_parsed_model_is_stable_across_roundtrips() {
    let resources = format!(
        r##"    <basematerials id="3"><base name="red" displaycolor="#FF0000"/></basematerials>
{}"##,
        triangle_object(7, "name=\"tri\"", "pid=\"3\" p1=\"0\"")
            .replace("type=\"model\"", "type=\"support\"")
    );
    let xml = model_xml(&resources, "<item objectid=\"7\" partnumber=\"abc\"/>");
    let (model, _) = Model::from_reader(single_part_package(&xml)).unwrap();

    let once = roundtrip(&model);
    let twice = roundtrip(&once);

    let first = once.find_package_resource_id(once.root_path(), 7).unwrap();
    let second = twice.find_package_resource_id(twice.root_path(), 7).unwrap();
    assert_eq!(once.object(first), twice.object(second));
    assert_eq!(twice.object(second).unwrap().object_type, ObjectType::Support);
    assert_eq!(twice.build.items[0].part_number.as_deref(), Some("abc"));
}

#[test]
fn test_production_uuids_roundtrip() {
    let mut model = Model::new();
    let mut object = Object::new_mesh(square_mesh());
    object.uuid = Some("4b7f2c8e-0d1a-4c5e-9f6b-1a2b3c4d5e6f".to_string());
    let id = model.add(Resource::Object(object)).unwrap();
    let mut item = BuildItem::new(id);
    item.uuid = Some("9e8d7c6b-5a49-4382-9170-6f5e4d3c2b1a".to_string());
    model.add_build_item(item).unwrap();
    model.build.uuid = Some("11111111-2222-4333-8444-555555555555".to_string());

    let reread = roundtrip(&model);
    assert!(reread.has_uuid("4b7f2c8e-0d1a-4c5e-9f6b-1a2b3c4d5e6f"));
    assert_eq!(
        reread.build.items[0].uuid.as_deref(),
        Some("9e8d7c6b-5a49-4382-9170-6f5e4d3c2b1a")
    );
    assert_eq!(
        reread.build.uuid.as_deref(),
        Some("11111111-2222-4333-8444-555555555555")
    );
}

#[test]
fn test_duplicate_uuid_rejected_on_read() {
    let resources = format!(
        "{}\n{}",
        triangle_object(1, "p:UUID=\"4b7f2c8e-0d1a-4c5e-9f6b-1a2b3c4d5e6f\"", ""),
        triangle_object(2, "p:UUID=\"4b7f2c8e-0d1a-4c5e-9f6b-1a2b3c4d5e6f\"", "")
    );
    let xml = common::production_model_xml(&resources, "");
    let err = parse_model_xml(&xml).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::DuplicateUuid));
}

#[test]
fn test_duplicate_uuid_rejected_through_api() {
    let uuid = "4b7f2c8e-0d1a-4c5e-9f6b-1a2b3c4d5e6f";
    let mut model = Model::new();
    let mut first = Object::new_mesh(square_mesh());
    first.uuid = Some(uuid.to_string());
    model.add(Resource::Object(first)).unwrap();

    let mut second = Object::new_mesh(square_mesh());
    second.uuid = Some(uuid.to_string());
    let err = model.add(Resource::Object(second)).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::DuplicateUuid));
    assert_eq!(model.resource_count(), 1);

    // What was written reads back without a conflict
    let reread = roundtrip(&model);
    assert!(reread.has_uuid(uuid));
    assert_eq!(reread.resource_count(), 1);
}

#[test]
fn test_required_extensions_written_when_used() {
    let (mut model, _) = parse_model_xml(&model_xml(&triangle_object(1, "", ""), "")).unwrap();
    model.required_extensions.insert(Extension::Material);

    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let (reread, _) = Model::from_reader(Cursor::new(bytes)).unwrap();
    assert!(reread.required_extensions.contains(&Extension::Material));
}

#[test]
fn test_write_to_file() {
    let (model, _) =
        parse_model_xml(&model_xml(&triangle_object(1, "", ""), "<item objectid=\"1\"/>")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("triangle.3mf");
    model.write_to_file(&path).unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let (reread, warnings) = Model::from_reader(file).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(reread.build.items.len(), 1);
    let id = reread.find_package_resource_id(reread.root_path(), 1).unwrap();
    assert_eq!(reread.object(id).unwrap().mesh().unwrap().triangles.len(), 1);
}
