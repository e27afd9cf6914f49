//! Implicit extension tests

#[path = "../common/mod.rs"]
mod common;

use common::{model_xml, package, package_rels, triangle_object};
use lib3mf_model::parser::parse_model_xml;
use lib3mf_model::{ErrorCode, Model, NodeConfiguration, NodePayload, NodeType, PortType};
use std::io::Cursor;

const SPHERE: &str = r#"    <i:implicitfunction id="10" identifier="sphere" displayname="Sphere">
      <i:in>
        <i:vector identifier="pos" displayname="position"/>
      </i:in>
      <i:subtraction identifier="sub" displayname="distance to surface">
        <i:in>
          <i:scalarref identifier="A" ref="len.result"/>
          <i:scalarref identifier="B" ref="radius.value"/>
        </i:in>
        <i:out>
          <i:scalar identifier="result"/>
        </i:out>
      </i:subtraction>
      <i:length identifier="len">
        <i:in>
          <i:vectorref identifier="A" ref="inputs.pos"/>
        </i:in>
        <i:out>
          <i:scalar identifier="result"/>
        </i:out>
      </i:length>
      <i:constant identifier="radius" value="12.5" tag="size">
        <i:out>
          <i:scalar identifier="value"/>
        </i:out>
      </i:constant>
      <i:out>
        <i:scalarref identifier="shape" ref="sub.result"/>
      </i:out>
    </i:implicitfunction>"#;

fn function_body(body: &str) -> String {
    format!(
        r#"<i:implicitfunction id="10" identifier="f">
      <i:in><i:vector identifier="pos"/><i:scalar identifier="s"/></i:in>
      {}
    </i:implicitfunction>"#,
        body
    )
}

#[test]
fn test_parse_function_graph() {
    let (model, warnings) = parse_model_xml(&model_xml(SPHERE, "")).unwrap();
    assert!(warnings.is_empty());

    let id = model.find_package_resource_id(model.root_path(), 10).unwrap();
    let function = model.implicit_function(id).unwrap();
    assert_eq!(function.identifier, "sphere");
    assert_eq!(function.display_name, "Sphere");
    assert_eq!(function.input("pos").unwrap().port_type, PortType::Vector);
    assert_eq!(
        function.output("shape").unwrap().reference.as_deref(),
        Some("sub.result")
    );

    let sub = function.node("sub").unwrap();
    assert_eq!(sub.node_type, NodeType::Subtraction);
    assert_eq!(sub.configuration, NodeConfiguration::ScalarToScalar);
    assert_eq!(sub.display_name, "distance to surface");
    let radius = function.node("radius").unwrap();
    assert_eq!(radius.constant().unwrap(), 12.5);
    assert_eq!(radius.tag, "size");

    // Nodes are stored as read; the sort puts producers first
    let order = function.sort_nodes_topologically().unwrap();
    let position = |id: &str| order.iter().position(|n| *n == id).unwrap();
    assert!(position("len") < position("sub"));
    assert!(position("radius") < position("sub"));
    assert!(function.are_types_valid());
    assert!(function.are_ports_valid());
    assert_eq!(function.links().len(), 4);
}

#[test]
fn test_function_graph_roundtrip() {
    let (model, _) = parse_model_xml(&model_xml(SPHERE, "")).unwrap();
    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let (reread, warnings) = Model::from_reader(Cursor::new(bytes)).unwrap();
    assert!(warnings.is_empty());

    let before = model.find_package_resource_id(model.root_path(), 10).unwrap();
    let after = reread.find_package_resource_id(reread.root_path(), 10).unwrap();
    assert_eq!(
        reread.implicit_function(after).unwrap(),
        model.implicit_function(before).unwrap()
    );
}

#[test]
fn test_vector_into_scalar_warns() {
    let body = r#"<i:sin identifier="sin">
        <i:in><i:scalarref identifier="A" ref="inputs.pos"/></i:in>
      </i:sin>
      <i:out><i:scalarref identifier="shape" ref="sin.result"/></i:out>"#;
    let (model, warnings) = parse_model_xml(&model_xml(&function_body(body), "")).unwrap();
    assert!(warnings.contains(ErrorCode::ImplicitTypeMismatch));

    let id = model.find_package_resource_id(model.root_path(), 10).unwrap();
    let function = model.implicit_function(id).unwrap();
    assert!(!function.are_types_valid());
    let violation = &function.type_violations()[0];
    assert_eq!(violation.source, "inputs.pos");
    assert_eq!(violation.expected, PortType::Scalar);
    assert_eq!(violation.found, Some(PortType::Vector));
    assert_eq!(function.sort_nodes_topologically().unwrap(), vec!["sin"]);
}

#[test]
fn test_declared_port_type_mismatch_warns() {
    let body = r#"<i:length identifier="len">
        <i:in><i:scalarref identifier="A" ref="inputs.s"/></i:in>
        <i:out><i:scalar identifier="result"/></i:out>
      </i:length>"#;
    let (_, warnings) = parse_model_xml(&model_xml(&function_body(body), "")).unwrap();
    assert!(warnings.contains(ErrorCode::ImplicitTypeMismatch));
}

#[test]
fn test_graph_errors() {
    let cases = [
        (
            r#"<i:length identifier="len"><i:in><i:vectorref identifier="A" ref="nope.result"/></i:in></i:length>"#,
            ErrorCode::UnresolvedPortReference,
        ),
        (
            r#"<i:out><i:scalarref identifier="shape" ref="inputs.missing"/></i:out>"#,
            ErrorCode::UnresolvedPortReference,
        ),
        (
            r#"<i:length identifier="len"><i:in><i:vectorref identifier="B" ref="inputs.pos"/></i:in></i:length>"#,
            ErrorCode::InvalidParam,
        ),
        (
            r#"<i:length identifier="len"><i:out><i:scalar identifier="extra"/></i:out></i:length>"#,
            ErrorCode::InvalidParam,
        ),
        (
            r#"<i:addition identifier="a"><i:in><i:scalarref identifier="A" ref="b.result"/></i:in></i:addition>
      <i:addition identifier="b"><i:in><i:scalarref identifier="A" ref="a.result"/></i:in></i:addition>"#,
            ErrorCode::CyclicGraph,
        ),
        (
            r#"<i:constant identifier="c" value="1"/><i:constant identifier="c" value="2"/>"#,
            ErrorCode::DuplicateIdentifier,
        ),
        (
            r#"<i:constresourceid identifier="r" value="99"/>"#,
            ErrorCode::UnknownModelResource,
        ),
    ];
    for (body, code) in cases {
        let err = parse_model_xml(&model_xml(&function_body(body), "")).unwrap_err();
        assert_eq!(err.code(), Some(code), "{}", body);
    }
}

const MESH_SAMPLER: &str = r#"<i:constresourceid identifier="target" value="1">
        <i:out><i:resourceid identifier="value"/></i:out>
      </i:constresourceid>
      <i:mesh identifier="dist">
        <i:in>
          <i:vectorref identifier="pos" ref="inputs.pos"/>
          <i:resourceref identifier="mesh" ref="target.value"/>
        </i:in>
        <i:out><i:scalar identifier="distance"/></i:out>
      </i:mesh>
      <i:out><i:scalarref identifier="shape" ref="dist.distance"/></i:out>"#;

#[test]
fn test_mesh_node_samples_mesh_object() {
    let resources = format!("{}\n{}", triangle_object(1, "", ""), function_body(MESH_SAMPLER));
    let (model, warnings) = parse_model_xml(&model_xml(&resources, "")).unwrap();
    assert!(warnings.is_empty());

    let mesh = model.find_package_resource_id(model.root_path(), 1).unwrap();
    let id = model.find_package_resource_id(model.root_path(), 10).unwrap();
    let function = model.implicit_function(id).unwrap();
    assert_eq!(
        function.node("target").unwrap().payload(),
        NodePayload::ResourceId(mesh)
    );
    assert_eq!(function.referenced_meshes(), vec![mesh]);

    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let (reread, _) = Model::from_reader(Cursor::new(bytes)).unwrap();
    let mesh = reread.find_package_resource_id(reread.root_path(), 1).unwrap();
    let id = reread.find_package_resource_id(reread.root_path(), 10).unwrap();
    assert_eq!(
        reread.implicit_function(id).unwrap().referenced_meshes(),
        vec![mesh]
    );
}

#[test]
fn test_mesh_node_rejects_components_object() {
    let resources = format!(
        r#"{}
    <object id="2"><components><component objectid="1"/></components></object>
{}"#,
        triangle_object(1, "", ""),
        function_body(&MESH_SAMPLER.replace("value=\"1\"", "value=\"2\""))
    );
    let err = parse_model_xml(&model_xml(&resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidModelResource));
}

#[test]
fn test_function_call() {
    let caller = r#"<i:implicitfunction id="20" identifier="scaled">
      <i:in><i:vector identifier="pos"/></i:in>
      <i:constresourceid identifier="callee" value="10">
        <i:out><i:resourceid identifier="value"/></i:out>
      </i:constresourceid>
      <i:functioncall identifier="call">
        <i:in>
          <i:resourceref identifier="functionID" ref="callee.value"/>
          <i:vectorref identifier="pos" ref="inputs.pos"/>
        </i:in>
        <i:out><i:scalar identifier="shape"/></i:out>
      </i:functioncall>
      <i:out><i:scalarref identifier="shape" ref="call.shape"/></i:out>
    </i:implicitfunction>"#;
    let resources = format!("{}\n    {}", SPHERE, caller);
    let (model, warnings) = parse_model_xml(&model_xml(&resources, "")).unwrap();
    assert!(warnings.is_empty());

    let sphere = model.find_package_resource_id(model.root_path(), 10).unwrap();
    let scaled = model.find_package_resource_id(model.root_path(), 20).unwrap();
    let function = model.implicit_function(scaled).unwrap();
    assert_eq!(function.called_functions(), vec![sphere]);
    let call = function.node("call").unwrap();
    assert_eq!(call.input("pos").unwrap().port_type, PortType::Vector);
    assert_eq!(call.output("shape").unwrap().port_type, PortType::Scalar);

    let order = model.resolve_function_calls().unwrap();
    let position = |id| order.iter().position(|f| *f == id).unwrap();
    assert!(position(sphere) < position(scaled));
}

#[test]
fn test_function_call_into_non_function() {
    let caller = r#"<i:constresourceid identifier="callee" value="1">
        <i:out><i:resourceid identifier="value"/></i:out>
      </i:constresourceid>
      <i:functioncall identifier="call">
        <i:in><i:resourceref identifier="functionID" ref="callee.value"/></i:in>
      </i:functioncall>"#;
    let resources = format!("{}\n{}", triangle_object(1, "", ""), function_body(caller));
    let err = parse_model_xml(&model_xml(&resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidModelResource));
}

#[test]
fn test_image_function_in_implicit_namespace() {
    let resources = r#"<v:imagestack id="1" rowcount="2" columncount="2" sheetcount="1">
      <v:imagesheet path="/3D/volume/sheet0.png"/>
    </v:imagestack>
    <i:functionfromimage3d id="2" image3did="1" valuescale="0.5"/>"#;
    let rels = package_rels("/3D/3dmodel.model");
    let xml = model_xml(resources, "");
    let cursor = package(&[
        ("_rels/.rels", rels.as_bytes()),
        ("3D/3dmodel.model", xml.as_bytes()),
        ("3D/volume/sheet0.png", b"png"),
    ]);
    let (model, warnings) = Model::from_reader(cursor).unwrap();
    assert!(warnings.is_empty());

    let image = model.find_package_resource_id(model.root_path(), 1).unwrap();
    let id = model.find_package_resource_id(model.root_path(), 2).unwrap();
    let function = model.function_from_image3d(id).unwrap();
    assert_eq!(function.image, image);
    assert_eq!(function.value_scale, 0.5);
}
