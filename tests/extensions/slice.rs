//! Slice extension tests

#[path = "../common/mod.rs"]
mod common;

use common::{model_part_rels, model_xml, package, package_rels};
use lib3mf_model::model::MeshResolution;
use lib3mf_model::parser::parse_model_xml;
use lib3mf_model::{ErrorCode, Model};
use std::io::Cursor;

const SQUARE_SLICE: &str = r#"<s:slice ztop="0.2">
        <s:vertices>
          <s:vertex x="0" y="0"/>
          <s:vertex x="5" y="0"/>
          <s:vertex x="5" y="5"/>
          <s:vertex x="0" y="5"/>
        </s:vertices>
        <s:polygon startv="0">
          <s:segment v2="1"/>
          <s:segment v2="2"/>
          <s:segment v2="3"/>
          <s:segment v2="0"/>
        </s:polygon>
      </s:slice>"#;

fn sliced_object(stack_id: u32) -> String {
    format!(
        r#"    <object id="9" s:slicestackid="{}" s:meshresolution="lowres">
      <mesh><vertices/><triangles/></mesh>
    </object>"#,
        stack_id
    )
}

#[test]
fn test_slice_stack_with_object() {
    let resources = format!(
        r#"    <s:slicestack id="1" zbottom="0.1">
      {}
      <s:slice ztop="0.4"/>
    </s:slicestack>
{}"#,
        SQUARE_SLICE,
        sliced_object(1)
    );
    let (model, warnings) = parse_model_xml(&model_xml(&resources, "")).unwrap();
    assert!(warnings.is_empty());

    let stack_id = model.find_package_resource_id(model.root_path(), 1).unwrap();
    let stack = model.slice_stack(stack_id).unwrap();
    assert_eq!(stack.zbottom, 0.1);
    assert_eq!(stack.slices.len(), 2);
    assert_eq!(stack.slices[0].vertices.len(), 4);
    assert_eq!(stack.slices[0].polygons[0].start_vertex, 0);
    assert_eq!(stack.slices[0].polygons[0].segments, vec![1, 2, 3, 0]);
    assert!(stack.slices[1].polygons.is_empty());

    let object_id = model.find_package_resource_id(model.root_path(), 9).unwrap();
    let object = model.object(object_id).unwrap();
    assert_eq!(object.slice_stack, Some(stack_id));
    assert_eq!(object.mesh_resolution, Some(MeshResolution::LowRes));
}

#[test]
fn test_slices_must_ascend() {
    let resources = r#"<s:slicestack id="1" zbottom="1">
      <s:slice ztop="2"/>
      <s:slice ztop="1.5"/>
    </s:slicestack>"#;
    let err = parse_model_xml(&model_xml(resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidSliceData));

    let below_bottom = r#"<s:slicestack id="1" zbottom="1"><s:slice ztop="0.5"/></s:slicestack>"#;
    let err = parse_model_xml(&model_xml(below_bottom, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidSliceData));
}

#[test]
fn test_segment_vertex_out_of_range() {
    let resources = r#"<s:slicestack id="1">
      <s:slice ztop="1">
        <s:vertices><s:vertex x="0" y="0"/><s:vertex x="1" y="0"/></s:vertices>
        <s:polygon startv="0"><s:segment v2="2"/></s:polygon>
      </s:slice>
    </s:slicestack>"#;
    let err = parse_model_xml(&model_xml(resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidSliceData));
}

#[test]
fn test_object_slice_stack_must_be_a_stack() {
    let resources = format!(
        r##"<basematerials id="1"><base name="a" displaycolor="#FFFFFF"/></basematerials>
{}"##,
        sliced_object(1)
    );
    let err = parse_model_xml(&model_xml(&resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidModelResource));
}

fn slice_ref_package(root_resources: &str) -> Cursor<Vec<u8>> {
    let rels = package_rels("/3D/3dmodel.model");
    let part_rels = model_part_rels(&["/3D/slices.model"]);
    let slices = model_xml(
        &format!(r#"<s:slicestack id="4" zbottom="0">{}</s:slicestack>"#, SQUARE_SLICE),
        "",
    );
    let root = model_xml(root_resources, "");
    package(&[
        ("_rels/.rels", rels.as_bytes()),
        ("3D/_rels/3dmodel.model.rels", part_rels.as_bytes()),
        ("3D/3dmodel.model", root.as_bytes()),
        ("3D/slices.model", slices.as_bytes()),
    ])
}

#[test]
fn test_slice_reference_into_other_part() {
    let resources = format!(
        r#"<s:slicestack id="1"><s:sliceref slicestackid="4" slicepath="/3D/slices.model"/></s:slicestack>
{}"#,
        sliced_object(1)
    );
    let (model, _) = Model::from_reader(slice_ref_package(&resources)).unwrap();

    let remote = model.find_package_resource_id("/3D/slices.model", 4).unwrap();
    let local = model.find_package_resource_id(model.root_path(), 1).unwrap();
    let stack = model.slice_stack(local).unwrap();
    assert_eq!(stack.slice_refs.len(), 1);
    assert_eq!(stack.slice_refs[0].slice_stack, remote);
    assert_eq!(stack.slice_refs[0].path, "/3D/slices.model");

    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let (reread, _) = Model::from_reader(Cursor::new(bytes)).unwrap();
    let remote = reread.find_package_resource_id("/3D/slices.model", 4).unwrap();
    assert_eq!(reread.slice_stack(remote).unwrap().slices.len(), 1);
    let local = reread.find_package_resource_id(reread.root_path(), 1).unwrap();
    assert_eq!(reread.slice_stack(local).unwrap().slice_refs[0].slice_stack, remote);
}

#[test]
fn test_slice_reference_errors() {
    let missing = r#"<s:slicestack id="1"><s:sliceref slicestackid="5" slicepath="/3D/slices.model"/></s:slicestack>"#;
    let err = Model::from_reader(slice_ref_package(missing)).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ResourceNotFound));

    let own_part = r#"<s:slicestack id="1"><s:sliceref slicestackid="4" slicepath="/3D/3dmodel.model"/></s:slicestack>"#;
    let err = Model::from_reader(slice_ref_package(own_part)).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidSliceData));

    let mixed = format!(
        r#"<s:slicestack id="1">{}<s:sliceref slicestackid="4" slicepath="/3D/slices.model"/></s:slicestack>"#,
        SQUARE_SLICE
    );
    let err = Model::from_reader(slice_ref_package(&mixed)).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidSliceData));
}
