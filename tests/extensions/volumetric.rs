//! Volumetric extension tests
//!
//! Image stacks need their sheets in the package, so most tests read a
//! zipped package rather than a bare model part.

#[path = "../common/mod.rs"]
mod common;

use common::{model_xml, package, package_rels};
use lib3mf_model::codec::IDENTITY_TRANSFORM;
use lib3mf_model::parser::parse_model_xml;
use lib3mf_model::{BlendMethod, ErrorCode, FilterMode, Model, ResourceId, TileStyle};
use std::io::Cursor;

const SHEET: [u8; 4] = [0x89, b'P', b'N', b'G'];

fn volume_package(resources: &str, build: &str) -> Cursor<Vec<u8>> {
    let rels = package_rels("/3D/3dmodel.model");
    let xml = model_xml(resources, build);
    package(&[
        ("_rels/.rels", rels.as_bytes()),
        ("3D/3dmodel.model", xml.as_bytes()),
        ("3D/volume/sheet0.png", &SHEET),
        ("3D/volume/sheet1.png", &SHEET),
    ])
}

fn root_id(model: &Model, id: u32) -> ResourceId {
    model.find_package_resource_id(model.root_path(), id).unwrap()
}

const IMAGE_STACK: &str = r#"    <v:imagestack id="1" name="ct" rowcount="4" columncount="8" sheetcount="2">
      <v:imagesheet path="/3D/volume/sheet0.png"/>
      <v:imagesheet path="/3D/volume/sheet1.png" minvalue="0.1" maxvalue="0.9"/>
    </v:imagestack>
    <v:functionfromimage3d id="2" image3did="1" displayname="density" valueoffset="0.5" valuescale="2" tilestyleu="clamp" filter="nearest"/>"#;

#[test]
fn test_image_stack_and_image_function() {
    let (model, warnings) = Model::from_reader(volume_package(IMAGE_STACK, "")).unwrap();
    assert!(warnings.is_empty());

    let image = model.image3d(root_id(&model, 1)).unwrap();
    assert_eq!(image.name.as_deref(), Some("ct"));
    assert_eq!((image.row_count, image.column_count), (4, 8));
    assert_eq!(image.sheet_count(), 2);
    assert_eq!(image.sheets[0].path, "/3D/volume/sheet0.png");
    assert_eq!(image.sheets[1].min_value, 0.1);
    assert_eq!(image.sheets[1].max_value, 0.9);

    let function = model.function_from_image3d(root_id(&model, 2)).unwrap();
    assert_eq!(function.image, root_id(&model, 1));
    assert_eq!(function.display_name.as_deref(), Some("density"));
    assert_eq!(function.value_offset, 0.5);
    assert_eq!(function.value_scale, 2.0);
    assert_eq!(function.tile_style_u, TileStyle::Clamp);
    assert_eq!(function.tile_style_v, TileStyle::default());
    assert_eq!(function.filter, FilterMode::Nearest);
}

#[test]
fn test_image_function_defaults() {
    let resources = r#"<v:imagestack id="1" rowcount="1" columncount="1" sheetcount="1">
      <v:imagesheet path="/3D/volume/sheet0.png"/>
    </v:imagestack>
    <v:functionfromimage3d id="2" image3did="1"/>"#;
    let (model, _) = Model::from_reader(volume_package(resources, "")).unwrap();
    let function = model.function_from_image3d(root_id(&model, 2)).unwrap();
    assert_eq!(function.value_offset, 0.0);
    assert_eq!(function.value_scale, 1.0);
    assert_eq!(function.filter, FilterMode::default());
}

#[test]
fn test_image_stack_errors() {
    let missing_sheet = r#"<v:imagestack id="1" rowcount="1" columncount="1" sheetcount="1">
      <v:imagesheet path="/3D/volume/nope.png"/>
    </v:imagestack>"#;
    let err = Model::from_reader(volume_package(missing_sheet, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::AttachmentNotFound));

    let count_mismatch = r#"<v:imagestack id="1" rowcount="1" columncount="1" sheetcount="2">
      <v:imagesheet path="/3D/volume/sheet0.png"/>
    </v:imagestack>"#;
    let err = Model::from_reader(volume_package(count_mismatch, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidImageStack));

    let no_rows = r#"<v:imagestack id="1" columncount="1" sheetcount="1"/>"#;
    let err = Model::from_reader(volume_package(no_rows, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MissingVolumetricAttribute));

    let zero_columns = r#"<v:imagestack id="1" rowcount="1" columncount="0" sheetcount="1"/>"#;
    let err = Model::from_reader(volume_package(zero_columns, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidVolumetricValue));
}

#[test]
fn test_image_function_needs_an_image_stack() {
    let resources = r##"<basematerials id="1"><base name="a" displaycolor="#FFFFFF"/></basematerials>
    <v:functionfromimage3d id="2" image3did="1"/>"##;
    let err = parse_model_xml(&model_xml(resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidModelResource));
}

#[test]
fn test_volumetric_stack() {
    let resources = format!(
        r#"{}
    <v:volumetricstack id="3">
      <v:dstchannel name="red" background="0.2"/>
      <v:dstchannel name="alpha"/>
      <v:volumetriclayer transform="1 0 0 0 1 0 0 0 1 0 0 5" blendmethod="mix" srcalpha="0.5" dstalpha="1">
        <v:channelselector sourceid="1" srcchannel="R" dstchannel="red" minvalue="0.25"/>
        <v:maskchannelselector sourceid="1" srcchannel="A" dstchannel="alpha"/>
      </v:volumetriclayer>
      <v:volumetriclayer transform="1 0 0 0 1 0 0 0 1 0 0 0" blendmethod="multiply"/>
    </v:volumetricstack>"#,
        IMAGE_STACK
    );
    let (model, warnings) = Model::from_reader(volume_package(&resources, "")).unwrap();
    assert!(warnings.is_empty());

    let stack = model.volumetric_stack(root_id(&model, 3)).unwrap();
    assert_eq!(stack.dst_channels.len(), 2);
    assert_eq!(stack.dst_channel("red").unwrap().background, 0.2);
    assert_eq!(stack.dst_channel("alpha").unwrap().background, 0.0);

    let layer = &stack.layers[0];
    assert_eq!(layer.transform[11], 5.0);
    assert_eq!(layer.blend_method, BlendMethod::Mix);
    assert_eq!((layer.src_alpha, layer.dst_alpha), (Some(0.5), Some(1.0)));
    let selector = &layer.channel_selectors[0];
    assert_eq!(selector.image, root_id(&model, 1));
    assert_eq!(selector.src_channel, "R");
    assert_eq!(selector.min_value, 0.25);
    assert_eq!(layer.mask_selector.as_ref().unwrap().dst_channel, "alpha");
    assert_eq!(stack.layers[1].blend_method, BlendMethod::Multiply);
}

#[test]
fn test_volumetric_stack_errors() {
    let cases = [
        (
            r#"<v:dstchannel name="red"/><v:dstchannel name="red"/>"#,
            ErrorCode::DuplicateVolumetricAttribute,
        ),
        (
            r#"<v:dstchannel background="1"/>"#,
            ErrorCode::MissingVolumetricDstChannelName,
        ),
        (
            r#"<v:volumetriclayer blendmethod="mix" srcalpha="1" dstalpha="1"/>"#,
            ErrorCode::MissingVolumetricAttribute,
        ),
        (
            r#"<v:volumetriclayer transform="1 0 0 0 1 0 0 0 1 0 0 0" blendmethod="multiply">
          <v:maskchannelselector sourceid="1" srcchannel="A" dstchannel="a"/>
          <v:maskchannelselector sourceid="1" srcchannel="A" dstchannel="a"/>
        </v:volumetriclayer>"#,
            ErrorCode::DuplicateMaskChannelSelector,
        ),
    ];
    for (body, code) in cases {
        let resources = format!(
            r#"{}
    <v:volumetricstack id="3">{}</v:volumetricstack>"#,
            IMAGE_STACK, body
        );
        let err = Model::from_reader(volume_package(&resources, "")).unwrap_err();
        assert_eq!(err.code(), Some(code), "{}", body);
    }
}

#[test]
fn test_mix_layer_without_alpha_warns() {
    let resources = r#"<v:volumetricstack id="3">
      <v:volumetriclayer transform="1 0 0 0 1 0 0 0 1 0 0 0" blendmethod="mix"/>
    </v:volumetricstack>"#;
    let (model, warnings) = parse_model_xml(&model_xml(resources, "")).unwrap();
    assert!(warnings.contains(ErrorCode::MissingVolumetricAttribute));
    let layer = &model.volumetric_stack(root_id(&model, 3)).unwrap().layers[0];
    assert!(layer.src_alpha.is_none());
}

const VOLUME_DATA: &str = r#"    <v:volumedata id="4">
      <v:color functionid="2" transform="2 0 0 0 2 0 0 0 2 0 0 0"/>
      <v:property name="density" functionid="2" channel="value" required="true"/>
      <v:property name="temperature" functionid="2"/>
      <v:boundary functionid="2" solidthreshold="0.3"/>
    </v:volumedata>"#;

#[test]
fn test_volume_data() {
    let resources = format!("{}\n{}", IMAGE_STACK, VOLUME_DATA);
    let (model, warnings) = Model::from_reader(volume_package(&resources, "")).unwrap();
    assert!(warnings.is_empty());

    let function = root_id(&model, 2);
    let data = model.volume_data(root_id(&model, 4)).unwrap();
    let color = data.color.as_ref().unwrap();
    assert_eq!(color.function, function);
    assert_eq!(color.channel, "color");
    assert_eq!(color.transform[0], 2.0);

    let density = data.property("density").unwrap();
    assert!(density.required);
    assert_eq!(density.field.channel, "value");
    assert!(!data.property("temperature").unwrap().required);

    let boundary = data.boundary.as_ref().unwrap();
    assert_eq!(boundary.field.function, function);
    assert_eq!(boundary.field.channel, "shape");
    assert_eq!(boundary.field.transform, IDENTITY_TRANSFORM);
    assert_eq!(boundary.solid_threshold, 0.3);
}

#[test]
fn test_volume_data_errors() {
    let cases = [
        (r#"<v:color channel="red"/>"#, ErrorCode::MissingVolumeDataFieldId),
        (r#"<v:property functionid="2"/>"#, ErrorCode::MissingVolumeDataPropertyName),
        (
            r#"<v:boundary functionid="2"/><v:boundary functionid="2"/>"#,
            ErrorCode::DuplicateVolumeData,
        ),
        (r#"<v:color functionid="1"/>"#, ErrorCode::InvalidModelResource),
    ];
    for (body, code) in cases {
        let resources = format!(
            r#"{}
    <v:volumedata id="4">{}</v:volumedata>"#,
            IMAGE_STACK, body
        );
        let err = Model::from_reader(volume_package(&resources, "")).unwrap_err();
        assert_eq!(err.code(), Some(code), "{}", body);
    }
}

const BOX_MESH: &str = r#"    <object id="5" type="model">
      <mesh v:volumeid="4">
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
          <vertex x="0" y="0" z="10"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="2" v3="1"/>
          <triangle v1="0" v2="1" v3="3"/>
          <triangle v1="0" v2="3" v3="2"/>
          <triangle v1="1" v2="2" v3="3"/>
        </triangles>
      </mesh>
    </object>"#;

#[test]
fn test_mesh_volume_and_levelset_object() {
    let resources = format!(
        r#"{}
{}
{}
    <object id="6" type="model">
      <v:levelset functionid="2" meshid="5" minfeaturesize="0.1" fallbackvalue="-1" volumeid="4"/>
    </object>"#,
        IMAGE_STACK, VOLUME_DATA, BOX_MESH
    );
    let (model, warnings) =
        Model::from_reader(volume_package(&resources, "<item objectid=\"6\"/>")).unwrap();
    assert!(warnings.is_empty());

    let volume = root_id(&model, 4);
    let mesh = model.object(root_id(&model, 5)).unwrap().mesh().unwrap();
    assert_eq!(mesh.volume_data, Some(volume));

    let shape = model
        .object(root_id(&model, 6))
        .unwrap()
        .boundary_shape()
        .unwrap();
    assert_eq!(shape.function, root_id(&model, 2));
    assert_eq!(shape.channel, "shape");
    assert_eq!(shape.transform, IDENTITY_TRANSFORM);
    assert!(shape.mesh_bbox_only);
    assert_eq!(shape.min_feature_size, 0.1);
    assert_eq!(shape.fallback_value, -1.0);
    assert_eq!(shape.mesh, Some(root_id(&model, 5)));
    assert_eq!(shape.volume_data, Some(volume));
}

#[test]
fn test_levelset_errors() {
    let no_function = format!(
        r#"{}
    <object id="6"><v:levelset channel="shape"/></object>"#,
        IMAGE_STACK
    );
    let err = Model::from_reader(volume_package(&no_function, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MissingBoundaryShapeFunctionId));

    // Object 7 holds components, so it is not a mesh either
    let wrong_kinds = [
        r#"meshid="1""#,
        r#"meshid="7""#,
        r#"meshid="5" volumeid="5""#,
    ];
    for attributes in wrong_kinds {
        let resources = format!(
            r#"{}
{}
{}
    <object id="7"><components><component objectid="5"/></components></object>
    <object id="6"><v:levelset functionid="2" {}/></object>"#,
            IMAGE_STACK, VOLUME_DATA, BOX_MESH, attributes
        );
        let err = Model::from_reader(volume_package(&resources, "")).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidModelResource), "{}", attributes);
    }

    let valid = format!(
        r#"{}
{}
{}
    <object id="6"><v:levelset functionid="2" meshid="5" volumeid="4"/></object>"#,
        IMAGE_STACK, VOLUME_DATA, BOX_MESH
    );
    assert!(Model::from_reader(volume_package(&valid, "")).is_ok());

    let volume_not_volume = r#"<object id="5"><mesh v:volumeid="1"><vertices/><triangles/></mesh></object>"#;
    let resources = format!("{}\n{}", IMAGE_STACK, volume_not_volume);
    let err = Model::from_reader(volume_package(&resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidModelResource));
}

#[test]
fn test_volumetric_roundtrip() {
    let resources = format!(
        r#"{}
    <v:volumetricstack id="3">
      <v:dstchannel name="red" background="0.2"/>
      <v:volumetriclayer transform="1 0 0 0 1 0 0 0 1 0 0 5" blendmethod="mix" srcalpha="0.5" dstalpha="1">
        <v:channelselector sourceid="1" srcchannel="R" dstchannel="red" tilestyleu="mirror"/>
      </v:volumetriclayer>
    </v:volumetricstack>
{}
{}
    <object id="6" type="model">
      <v:levelset functionid="2" channel="density" meshid="5" meshbboxonly="false"/>
    </object>"#,
        IMAGE_STACK, VOLUME_DATA, BOX_MESH
    );
    let (model, _) =
        Model::from_reader(volume_package(&resources, "<item objectid=\"6\"/>")).unwrap();

    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let (reread, warnings) = Model::from_reader(Cursor::new(bytes)).unwrap();
    assert!(warnings.is_empty());

    assert_eq!(reread.attachment("/3D/volume/sheet1.png").unwrap().data, SHEET);
    for id in [1, 2, 3, 4] {
        let before = model.resource(root_id(&model, id)).unwrap();
        let after = reread.resource(root_id(&reread, id)).unwrap();
        assert_eq!(before.kind(), after.kind());
    }
    assert_eq!(
        reread.image3d(root_id(&reread, 1)).unwrap().sheets,
        model.image3d(root_id(&model, 1)).unwrap().sheets
    );
    assert_eq!(
        reread.volumetric_stack(root_id(&reread, 3)).unwrap().layers[0]
            .channel_selectors[0]
            .tile_style_u,
        TileStyle::Mirror
    );
    let data = reread.volume_data(root_id(&reread, 4)).unwrap();
    assert_eq!(data.properties.len(), 2);
    assert_eq!(data.boundary.as_ref().unwrap().solid_threshold, 0.3);

    let shape = reread
        .object(root_id(&reread, 6))
        .unwrap()
        .boundary_shape()
        .unwrap();
    assert_eq!(shape.channel, "density");
    assert!(!shape.mesh_bbox_only);
    assert_eq!(shape.mesh, Some(root_id(&reread, 5)));
}
