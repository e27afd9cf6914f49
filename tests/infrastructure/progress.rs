//! Progress callback tests

#[path = "../common/mod.rs"]
mod common;

use common::{init_tracing, model_xml, single_part_package, triangle_object};
use lib3mf_model::parser::parse_model_xml_with_config;
use lib3mf_model::{ErrorCode, Model, ParserConfig, ProgressStage};
use std::sync::{Arc, Mutex};

fn large_mesh(vertices: usize) -> String {
    let vertex_list: String = (0..vertices)
        .map(|i| format!("<vertex x=\"{}\" y=\"{}\" z=\"0\"/>", i, i % 7))
        .collect();
    format!(
        r#"<object id="1"><mesh><vertices>{}</vertices><triangles><triangle v1="0" v2="1" v3="2"/></triangles></mesh></object>"#,
        vertex_list
    )
}

#[test]
fn test_progress_stages_are_reported() {
    init_tracing();
    let stages = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&stages);
    let config = ParserConfig::with_all_extensions().with_progress_callback(Arc::new(
        move |stage: ProgressStage, _: f64| {
            seen.lock().unwrap().push(stage);
            true
        },
    ));

    let xml = model_xml(&large_mesh(2100), "<item objectid=\"1\"/>");
    let (model, _) = Model::from_reader_with_config(single_part_package(&xml), config).unwrap();
    assert_eq!(model.build.items.len(), 1);

    let stages = stages.lock().unwrap();
    assert_eq!(stages.first(), Some(&ProgressStage::ReadingPackage));
    assert!(stages.contains(&ProgressStage::ReadingModelPart));
    assert_eq!(
        stages
            .iter()
            .filter(|s| **s == ProgressStage::ReadingMesh)
            .count(),
        2
    );
}

#[test]
fn test_cancel_while_opening_package() {
    let config = ParserConfig::with_all_extensions()
        .with_progress_callback(Arc::new(|_: ProgressStage, _: f64| false));
    let xml = model_xml(&triangle_object(1, "", ""), "");
    let err = Model::from_reader_with_config(single_part_package(&xml), config).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::UserAborted));
}

#[test]
fn test_cancel_while_reading_mesh() {
    let config = ParserConfig::with_all_extensions().with_progress_callback(Arc::new(
        |stage: ProgressStage, _: f64| stage != ProgressStage::ReadingMesh,
    ));

    // Small meshes finish before the first mesh report
    let small = model_xml(&triangle_object(1, "", ""), "");
    assert!(parse_model_xml_with_config(&small, &config).is_ok());

    let large = model_xml(&large_mesh(1500), "");
    let err = parse_model_xml_with_config(&large, &config).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::UserAborted));
}
