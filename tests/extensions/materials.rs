//! Materials and properties extension tests

#[path = "../common/mod.rs"]
mod common;

use common::{model_xml, package, package_rels, triangle_object};
use lib3mf_model::model::Tex2Coord;
use lib3mf_model::parser::parse_model_xml;
use lib3mf_model::{BlendMethod, ErrorCode, FilterMode, Model, TileStyle};
use std::io::Cursor;

fn root_id(model: &Model, id: u32) -> lib3mf_model::ResourceId {
    model.find_package_resource_id(model.root_path(), id).unwrap()
}

#[test]
fn test_color_group_with_triangle_colors() {
    let resources = format!(
        r##"    <m:colorgroup id="4">
      <m:color color="#FF000080"/>
      <m:color color="#00ff00"/>
    </m:colorgroup>
{}"##,
        triangle_object(1, "pid=\"4\" pindex=\"1\"", "p1=\"0\" p2=\"1\" p3=\"0\"")
    );
    let (model, warnings) = parse_model_xml(&model_xml(&resources, "")).unwrap();
    assert!(warnings.is_empty());

    let colors = model.color_group(root_id(&model, 4)).unwrap();
    assert_eq!(colors.colors, vec![(255, 0, 0, 128), (0, 255, 0, 255)]);

    let object = model.object(root_id(&model, 1)).unwrap();
    assert_eq!(object.pid, Some(root_id(&model, 4)));
    assert_eq!(object.pindex, Some(1));
    assert!(object.mesh().unwrap().triangles[0].pid.is_none());
}

#[test]
fn test_invalid_color_is_rejected() {
    let resources = r#"<m:colorgroup id="4"><m:color color="red"/></m:colorgroup>"#;
    let err = parse_model_xml(&model_xml(resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidColor));
}

#[test]
fn test_object_pindex_out_of_range() {
    let resources = format!(
        r##"<m:colorgroup id="4"><m:color color="#FF0000"/></m:colorgroup>
{}"##,
        triangle_object(1, "pid=\"4\" pindex=\"5\"", "")
    );
    let err = parse_model_xml(&model_xml(&resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidPropertyIndex));
}

fn texture_resources() -> String {
    format!(
        r#"    <m:texture2d id="1" path="/3D/Textures/wood.png" contenttype="image/png" tilestyleu="mirror" tilestylev="clamp" filter="nearest"/>
    <m:texture2dgroup id="2" texid="1">
      <m:tex2coord u="0" v="0"/>
      <m:tex2coord u="1" v="0"/>
      <m:tex2coord u="0.5" v="1"/>
    </m:texture2dgroup>
{}"#,
        triangle_object(3, "", "pid=\"2\" p1=\"0\" p2=\"1\" p3=\"2\"")
    )
}

#[test]
fn test_texture_without_attachment_warns() {
    let (model, warnings) = parse_model_xml(&model_xml(&texture_resources(), "")).unwrap();
    assert!(warnings.contains(ErrorCode::AttachmentNotFound));

    let texture = model.texture2d(root_id(&model, 1)).unwrap();
    assert_eq!(texture.path, "/3D/Textures/wood.png");
    assert_eq!(texture.tile_style_u, TileStyle::Mirror);
    assert_eq!(texture.tile_style_v, TileStyle::Clamp);
    assert_eq!(texture.filter, FilterMode::Nearest);

    let group = model.texture2d_group(root_id(&model, 2)).unwrap();
    assert_eq!(group.texture, root_id(&model, 1));
    assert_eq!(group.coords[2], Tex2Coord { u: 0.5, v: 1.0 });
}

#[test]
fn test_texture_with_attachment_roundtrip() {
    let rels = package_rels("/3D/3dmodel.model");
    let xml = model_xml(&texture_resources(), "<item objectid=\"3\"/>");
    let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a];
    let cursor = package(&[
        ("_rels/.rels", rels.as_bytes()),
        ("3D/3dmodel.model", xml.as_bytes()),
        ("3D/Textures/wood.png", &png),
    ]);

    let (model, warnings) = Model::from_reader(cursor).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(model.attachment("/3D/Textures/wood.png").unwrap().data, png);

    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let (reread, warnings) = Model::from_reader(Cursor::new(bytes)).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(reread.attachment("/3D/Textures/wood.png").unwrap().data, png);
    let texture = reread.texture2d(root_id(&reread, 1)).unwrap();
    assert_eq!(texture.filter, FilterMode::Nearest);
    assert_eq!(reread.texture2d_group(root_id(&reread, 2)).unwrap().coords.len(), 3);
}

#[test]
fn test_texture_group_requires_texture() {
    let resources = r##"<basematerials id="1"><base name="a" displaycolor="#FFFFFF"/></basematerials>
    <m:texture2dgroup id="2" texid="1"><m:tex2coord u="0" v="0"/></m:texture2dgroup>"##;
    let err = parse_model_xml(&model_xml(resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidModelResource));
}

const BASES: &str = r##"    <basematerials id="1">
      <base name="a" displaycolor="#FF0000"/>
      <base name="b" displaycolor="#00FF00"/>
      <base name="c" displaycolor="#0000FF"/>
    </basematerials>"##;

#[test]
fn test_composite_materials() {
    let resources = format!(
        r#"{}
    <m:compositematerials id="2" matid="1" matindices="0 2">
      <m:composite values="0.25 0.75"/>
      <m:composite values="1 0"/>
    </m:compositematerials>"#,
        BASES
    );
    let (model, _) = parse_model_xml(&model_xml(&resources, "")).unwrap();
    let composite = model.composite_materials(root_id(&model, 2)).unwrap();
    assert_eq!(composite.base_materials, root_id(&model, 1));
    assert_eq!(composite.mat_indices, vec![0, 2]);
    assert_eq!(composite.composites[0], vec![0.25, 0.75]);
}

#[test]
fn test_composite_errors() {
    let out_of_range = format!(
        r#"{}<m:compositematerials id="2" matid="1" matindices="0 3"/>"#,
        BASES
    );
    let err = parse_model_xml(&model_xml(&out_of_range, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidPropertyIndex));

    let wrong_count = format!(
        r#"{}<m:compositematerials id="2" matid="1" matindices="0 1">
      <m:composite values="1"/>
    </m:compositematerials>"#,
        BASES
    );
    let err = parse_model_xml(&model_xml(&wrong_count, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidParam));
}

#[test]
fn test_multi_properties() {
    let resources = format!(
        r##"{}
    <m:colorgroup id="2"><m:color color="#FFFFFF"/><m:color color="#000000"/></m:colorgroup>
    <m:multiproperties id="3" pids="1 2">
      <m:multi pindices="2 1"/>
      <m:multi pindices="0"/>
    </m:multiproperties>
    <m:multiproperties id="4" pids="1 2" blendmethods="multiply"/>"##,
        BASES
    );
    let (model, _) = parse_model_xml(&model_xml(&resources, "")).unwrap();

    let multi = model.multi_properties(root_id(&model, 3)).unwrap();
    assert_eq!(multi.pids, vec![root_id(&model, 1), root_id(&model, 2)]);
    assert_eq!(multi.blend_methods, vec![BlendMethod::Mix]);
    assert_eq!(multi.multis, vec![vec![2, 1], vec![0]]);

    let multiply = model.multi_properties(root_id(&model, 4)).unwrap();
    assert_eq!(multiply.blend_methods, vec![BlendMethod::Multiply]);
}

#[test]
fn test_multi_properties_errors() {
    let nested = format!(
        r#"{}
    <m:multiproperties id="2" pids="1"/>
    <m:multiproperties id="3" pids="1 2"/>"#,
        BASES
    );
    let err = parse_model_xml(&model_xml(&nested, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidModelResource));

    let blend_count = format!(
        r#"{}<m:multiproperties id="2" pids="1" blendmethods="mix"/>"#,
        BASES
    );
    let err = parse_model_xml(&model_xml(&blend_count, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidParam));

    let index = format!(
        r#"{}<m:multiproperties id="2" pids="1"><m:multi pindices="3"/></m:multiproperties>"#,
        BASES
    );
    let err = parse_model_xml(&model_xml(&index, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidPropertyIndex));
}

#[test]
fn test_material_groups_roundtrip() {
    let resources = format!(
        r##"{}
    <m:colorgroup id="2"><m:color color="#12345678"/></m:colorgroup>
    <m:compositematerials id="3" matid="1" matindices="1 2"><m:composite values="0.5 0.5"/></m:compositematerials>
    <m:multiproperties id="4" pids="1 2" blendmethods="multiply"><m:multi pindices="1 0"/></m:multiproperties>
{}"##,
        BASES,
        triangle_object(5, "", "pid=\"4\" p1=\"0\"")
    );
    let (model, _) = parse_model_xml(&model_xml(&resources, "<item objectid=\"5\"/>")).unwrap();
    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let (reread, warnings) = Model::from_reader(Cursor::new(bytes)).unwrap();
    assert!(warnings.is_empty());

    assert_eq!(
        reread.color_group(root_id(&reread, 2)).unwrap().colors,
        vec![(0x12, 0x34, 0x56, 0x78)]
    );
    assert_eq!(
        reread.composite_materials(root_id(&reread, 3)).unwrap().composites,
        vec![vec![0.5, 0.5]]
    );
    let multi = reread.multi_properties(root_id(&reread, 4)).unwrap();
    assert_eq!(multi.blend_methods, vec![BlendMethod::Multiply]);
    assert_eq!(multi.multis, vec![vec![1, 0]]);
    let triangle = &reread.object(root_id(&reread, 5)).unwrap().mesh().unwrap().triangles[0];
    assert_eq!(triangle.pid, Some(root_id(&reread, 4)));
}
