//! Shared fixtures for integration tests
//!
//! Packages are assembled in memory with `zip::ZipWriter`; model parts are
//! plain strings built from the namespace constants below.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Once;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const CORE_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";
pub const MATERIAL_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/material/2015/02";
pub const PRODUCTION_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/production/2015/06";
pub const SLICE_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/slice/2015/07";
pub const BEAM_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02";
pub const VOLUMETRIC_NS: &str = "http://schemas.3mf.io/3dmanufacturing/volumetric/2022/01";
pub const IMPLICIT_NS: &str = "http://schemas.3mf.io/3dmanufacturing/implicit/2023/12";

/// Route library logs to the test harness; `RUST_LOG` selects the level
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
  <Default Extension="png" ContentType="image/png"/>
</Types>"#;

fn model_with_namespaces(resources: &str, build: &str, production: bool) -> String {
    let production = if production {
        format!(" xmlns:p=\"{}\"", PRODUCTION_NS)
    } else {
        String::new()
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="{}" xmlns:m="{}"{} xmlns:s="{}" xmlns:b="{}" xmlns:v="{}" xmlns:i="{}">
  <resources>
{}
  </resources>
  <build>
{}
  </build>
</model>"#,
        CORE_NS,
        MATERIAL_NS,
        production,
        SLICE_NS,
        BEAM_NS,
        VOLUMETRIC_NS,
        IMPLICIT_NS,
        resources,
        build
    )
}

/// `<model>` root declaring every extension namespace except production
pub fn model_xml(resources: &str, build: &str) -> String {
    model_with_namespaces(resources, build, false)
}

/// `<model>` root that also declares the production namespace as `p`
///
/// Objects and build items without `p:UUID` then produce warnings.
pub fn production_model_xml(resources: &str, build: &str) -> String {
    model_with_namespaces(resources, build, true)
}

/// Mesh object with a single triangle; `triangle_attrs` is appended to the triangle
pub fn triangle_object(id: u32, object_attrs: &str, triangle_attrs: &str) -> String {
    format!(
        r#"    <object id="{}" type="model" {}>
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2" {}/>
        </triangles>
      </mesh>
    </object>"#,
        id, object_attrs, triangle_attrs
    )
}

/// Root relationships pointing at `root`
pub fn package_rels(root: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="{}" Id="rel0" Type="{}"/>
</Relationships>"#,
        root, MODEL_REL_TYPE
    )
}

/// Relationships of the root part pointing at further model parts
pub fn model_part_rels(parts: &[&str]) -> String {
    let entries: String = parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            format!(
                "  <Relationship Target=\"{}\" Id=\"rel{}\" Type=\"{}\"/>\n",
                part, i, MODEL_REL_TYPE
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\n{}</Relationships>",
        entries
    )
}

/// Zip `files` (name, contents) together with content types
pub fn package(files: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();
    for (name, data) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap()
}

/// Package with a single root model part at the default location
pub fn single_part_package(model: &str) -> Cursor<Vec<u8>> {
    let rels = package_rels("/3D/3dmodel.model");
    package(&[
        ("_rels/.rels", rels.as_bytes()),
        ("3D/3dmodel.model", model.as_bytes()),
    ])
}
