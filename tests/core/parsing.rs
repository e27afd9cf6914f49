//! Core model part parsing tests
//!
//! Covers vertices, triangles, property references, resource ids and
//! the build section.

#[path = "../common/mod.rs"]
mod common;

use common::{CORE_NS, init_tracing, model_xml, triangle_object};
use lib3mf_model::parser::{parse_model_xml, parse_model_xml_with_config};
use lib3mf_model::{ErrorCode, ObjectType, ParserConfig, Unit, WarningLevel};

#[test]
fn test_parse_triangle_mesh() {
    init_tracing();
    let xml = model_xml(&triangle_object(1, "name=\"tri\"", ""), "<item objectid=\"1\"/>");
    let (model, warnings) = parse_model_xml(&xml).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(model.unit, Unit::Millimeter);
    assert_eq!(model.language, "en-US");

    let id = model.find_package_resource_id("/3D/3dmodel.model", 1).unwrap();
    let object = model.object(id).unwrap();
    assert_eq!(object.name.as_deref(), Some("tri"));
    assert_eq!(object.object_type, ObjectType::Model);
    let mesh = object.mesh().unwrap();
    assert_eq!(mesh.vertices.len(), 3);
    assert_eq!(mesh.triangles.len(), 1);
    assert_eq!(mesh.vertices[1].x, 10.0);

    assert_eq!(model.build.items.len(), 1);
    assert_eq!(model.build.items[0].object, id);
}

#[test]
fn test_coordinates_above_limit_are_rejected() {
    for value in ["1000000001", "-1.5e9", "inf", "NaN"] {
        let object = format!(
            r#"<object id="1"><mesh><vertices><vertex x="{}" y="0" z="0"/></vertices><triangles/></mesh></object>"#,
            value
        );
        let err = parse_model_xml(&model_xml(&object, "")).unwrap_err();
        assert_eq!(
            err.code(),
            Some(ErrorCode::InvalidModelCoordinates),
            "value {}",
            value
        );
    }
}

#[test]
fn test_coordinates_within_limit_are_preserved() {
    let object = r#"<object id="1"><mesh><vertices>
        <vertex x="1000000000" y="-999999999" z="0.125"/>
    </vertices><triangles/></mesh></object>"#;
    let (model, _) = parse_model_xml(&model_xml(object, "")).unwrap();
    let id = model.find_package_resource_id(model.root_path(), 1).unwrap();
    let vertex = model.object(id).unwrap().mesh().unwrap().vertices[0];
    assert_eq!(vertex.x, 1.0e9);
    assert_eq!(vertex.y, -999999999.0_f32);
    assert_eq!(vertex.z, 0.125);
}

#[test]
fn test_unknown_vertex_attribute_warns() {
    let object = triangle_object(1, "", "").replace(
        r#"<vertex x="10" y="0" z="0"/>"#,
        r#"<vertex x="10" y="0" z="0" w="1"/>"#,
    );
    let (model, warnings) = parse_model_xml(&model_xml(&object, "")).unwrap();
    assert_eq!(warnings.len(), 1);
    let warning = warnings.get(0).unwrap();
    assert_eq!(warning.code, ErrorCode::NamespaceInvalidAttribute);
    assert_eq!(warning.level, WarningLevel::InvalidOptionalValue);

    let id = model.find_package_resource_id("/3D/3dmodel.model", 1).unwrap();
    assert_eq!(model.object(id).unwrap().mesh().unwrap().vertices[1].x, 10.0);
}

#[test]
fn test_missing_coordinate() {
    let object = r#"<object id="1"><mesh><vertices><vertex x="0" y="0"/></vertices></mesh></object>"#;
    let err = parse_model_xml(&model_xml(object, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ModelCoordinateMissing));
}

#[test]
fn test_unknown_triangle_pid_is_not_found() {
    let xml = model_xml(&triangle_object(1, "", "pid=\"7\" p1=\"0\""), "");
    let err = parse_model_xml(&xml).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ResourceNotFound));
}

#[test]
fn test_triangle_property_reference() {
    let resources = format!(
        r##"    <basematerials id="2">
      <base name="red" displaycolor="#FF0000"/>
      <base name="blue" displaycolor="#0000FF80"/>
    </basematerials>
{}"##,
        triangle_object(1, "", "pid=\"2\" p1=\"0\" p2=\"1\" p3=\"1\"")
    );
    let (model, _) = parse_model_xml(&model_xml(&resources, "")).unwrap();
    let materials = model.find_package_resource_id(model.root_path(), 2).unwrap();
    let object = model
        .object(model.find_package_resource_id(model.root_path(), 1).unwrap())
        .unwrap();
    let triangle = &object.mesh().unwrap().triangles[0];
    assert_eq!(triangle.pid, Some(materials));
    assert_eq!((triangle.p1, triangle.p2, triangle.p3), (Some(0), Some(1), Some(1)));

    let group = model.base_materials(materials).unwrap();
    assert_eq!(group.materials[1].display_color, (0, 0, 255, 128));
}

#[test]
fn test_property_index_out_of_range() {
    let resources = format!(
        r##"<basematerials id="2"><base name="red" displaycolor="#FF0000"/></basematerials>
{}"##,
        triangle_object(1, "", "pid=\"2\" p1=\"3\"")
    );
    let err = parse_model_xml(&model_xml(&resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidPropertyIndex));
}

#[test]
fn test_triangle_vertex_out_of_range() {
    let object = r#"<object id="1"><mesh>
        <vertices><vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/><vertex x="0" y="1" z="0"/></vertices>
        <triangles><triangle v1="0" v2="1" v3="3"/></triangles>
    </mesh></object>"#;
    let err = parse_model_xml(&model_xml(object, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidModelNodeIndex));
}

#[test]
fn test_degenerate_triangle_is_skipped_with_warning() {
    let object = r#"<object id="1"><mesh>
        <vertices><vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/><vertex x="0" y="1" z="0"/></vertices>
        <triangles><triangle v1="0" v2="1" v3="2"/><triangle v1="0" v2="0" v3="2"/></triangles>
    </mesh></object>"#;
    let (model, warnings) = parse_model_xml(&model_xml(object, "")).unwrap();
    assert!(warnings.contains(ErrorCode::DegenerateTriangle));
    let id = model.find_package_resource_id(model.root_path(), 1).unwrap();
    assert_eq!(model.object(id).unwrap().mesh().unwrap().triangles.len(), 1);
}

#[test]
fn test_duplicate_resource_id_in_part() {
    let resources = format!("{}\n{}", triangle_object(1, "", ""), triangle_object(1, "", ""));
    let err = parse_model_xml(&model_xml(&resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::DuplicateResourceId));
}

#[test]
fn test_object_without_content() {
    let err = parse_model_xml(&model_xml(r#"<object id="1"/>"#, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MissingObjectContent));
}

#[test]
fn test_object_with_mesh_and_components() {
    let resources = format!(
        r#"{}
    <object id="2"><mesh><vertices/><triangles/></mesh><components><component objectid="1"/></components></object>"#,
        triangle_object(1, "", "")
    );
    let err = parse_model_xml(&model_xml(&resources, "")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::AmbiguousObjectDefinition));
}

#[test]
fn test_build_item_errors() {
    let objects = triangle_object(1, "", "");
    let err = parse_model_xml(&model_xml(&objects, "<item objectid=\"9\"/>")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::CouldNotFindBuildItemObject));

    let err = parse_model_xml(&model_xml(&objects, "<item/>")).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MissingBuildItemObjectId));
}

#[test]
fn test_build_item_of_type_other_warns() {
    let xml = model_xml(&triangle_object(1, "", "").replace("type=\"model\"", "type=\"other\""), "<item objectid=\"1\"/>");
    let (model, warnings) = parse_model_xml(&xml).unwrap();
    assert!(warnings.contains(ErrorCode::InvalidBuildItemObjectType));
    assert_eq!(model.build.items.len(), 1);
}

#[test]
fn test_build_item_transform() {
    let build = r#"<item objectid="1" transform="1 0 0 0 1 0 0 0 1 5.5 -2 30"/>"#;
    let (model, _) = parse_model_xml(&model_xml(&triangle_object(1, "", ""), build)).unwrap();
    let transform = model.build.items[0].transform.unwrap();
    assert_eq!(&transform[9..], &[5.5, -2.0, 30.0]);
}

#[test]
fn test_duplicate_sections_rejected() {
    let xml = format!("<model xmlns='{}'><resources/><resources/></model>", CORE_NS);
    assert_eq!(
        parse_model_xml(&xml).unwrap_err().code(),
        Some(ErrorCode::DuplicateResources)
    );
    let xml = format!("<model xmlns='{}'><build/><build/></model>", CORE_NS);
    assert_eq!(
        parse_model_xml(&xml).unwrap_err().code(),
        Some(ErrorCode::DuplicateBuildSection)
    );
}

#[test]
fn test_unknown_unit_warns() {
    let xml = format!("<model xmlns='{}' unit='furlong'/>", CORE_NS);
    let (model, warnings) = parse_model_xml(&xml).unwrap();
    assert!(warnings.contains(ErrorCode::InvalidModelUnit));
    assert_eq!(model.unit, Unit::Millimeter);
}

#[test]
fn test_unknown_core_element_warns_and_is_skipped() {
    let resources = format!("<gizmo><mesh/></gizmo>\n{}", triangle_object(1, "", ""));
    let (model, warnings) = parse_model_xml(&model_xml(&resources, "")).unwrap();
    assert!(warnings.contains(ErrorCode::NamespaceInvalidElement));
    assert_eq!(model.resource_count(), 1);
}

#[test]
fn test_foreign_elements_are_skipped_silently() {
    let resources = format!(
        "<x:custom xmlns:x='urn:vendor'><x:deep/></x:custom>\n{}",
        triangle_object(1, "", "")
    );
    let (model, warnings) = parse_model_xml(&model_xml(&resources, "")).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(model.resource_count(), 1);
}

#[test]
fn test_warnings_escalate_with_critical_level() {
    let xml = format!("<model xmlns='{}' unit='furlong'/>", CORE_NS);

    // Default: only fatal warnings abort
    assert!(parse_model_xml_with_config(&xml, &ParserConfig::new()).is_ok());

    let strict = ParserConfig::new().with_critical_warning_level(WarningLevel::InvalidOptionalValue);
    let err = parse_model_xml_with_config(&xml, &strict).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidModelUnit));
}

#[test]
fn test_required_extension_not_enabled() {
    let xml = format!(
        "<model xmlns='{}' xmlns:s='{}' requiredextensions='s'/>",
        CORE_NS,
        common::SLICE_NS
    );
    assert!(parse_model_xml_with_config(&xml, &ParserConfig::new()).is_err());
    let (model, _) = parse_model_xml(&xml).unwrap();
    assert_eq!(model.required_extensions.len(), 1);
}

#[test]
fn test_required_extension_with_undeclared_prefix() {
    let xml = format!("<model xmlns='{}' requiredextensions='zz'/>", CORE_NS);
    let err = parse_model_xml(&xml).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidRequiredExtensionPrefix));
}

#[test]
fn test_nesting_depth_limit() {
    let mut nested = String::new();
    for _ in 0..20 {
        nested.push_str("<x:n xmlns:x='urn:deep'>");
    }
    for _ in 0..20 {
        nested.push_str("</x:n>");
    }
    let xml = model_xml(&nested, "");
    let config = ParserConfig::with_all_extensions().with_max_depth(8);
    let err = parse_model_xml_with_config(&xml, &config).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::XmlNestingTooDeep));
}

#[test]
fn test_core_093_namespace_warns_once() {
    let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/2013/01" unit="inch">
  <resources>
    <object id="1">
      <mesh>
        <vertices><vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/><vertex x="0" y="1" z="0"/></vertices>
        <triangles><triangle v1="0" v2="1" v3="2"/></triangles>
      </mesh>
    </object>
  </resources>
  <build><item objectid="1"/></build>
</model>"#;
    let (model, warnings) = parse_model_xml(xml).unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings.contains(ErrorCode::Version093NotSupported));
    assert_eq!(model.unit, Unit::Inch);
    assert_eq!(model.build.items.len(), 1);
}

#[test]
fn test_build_section_can_be_skipped() {
    let xml = model_xml(&triangle_object(1, "", ""), "<item objectid=\"42\"/>");
    assert!(parse_model_xml(&xml).is_err());

    let config = ParserConfig::with_all_extensions().with_ignore_build(true);
    let (model, _) = parse_model_xml_with_config(&xml, &config).unwrap();
    assert!(model.build.items.is_empty());
    assert_eq!(model.resource_count(), 1);
}

#[test]
fn test_warning_cap_limits_recorded_warnings() {
    let objects: String = (1..=5)
        .map(|id| triangle_object(id, "colour=\"red\"", ""))
        .collect();
    let xml = model_xml(&objects, "");
    let (_, all) = parse_model_xml(&xml).unwrap();

    let config = ParserConfig::with_all_extensions().with_max_warnings(2);
    let (_, capped) = parse_model_xml_with_config(&xml, &config).unwrap();
    assert!(all.len() > 2);
    assert_eq!(capped.len(), 2);
}
