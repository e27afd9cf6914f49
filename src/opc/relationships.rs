//! Relationship parts (`_rels/*.rels`)

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use urlencoding::encode;

use crate::error::{Error, Result};

use super::validation::part_path;

/// 3D model relationship type
pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Texture relationship type
pub const TEXTURE_REL_TYPE: &str =
    "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dtexture";

/// Thumbnail relationship type (OPC standard)
pub const THUMBNAIL_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";

const RELATIONSHIPS_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";

/// One `<Relationship>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship id, unique within its part
    pub id: String,
    /// Absolute, decoded path of the target part
    pub target: String,
    /// Relationship type
    pub rel_type: String,
}

/// Unescaped attribute text
pub(crate) fn attribute_value(raw: &[u8]) -> Result<String> {
    let raw = std::str::from_utf8(raw).map_err(|e| Error::InvalidXml(e.to_string()))?;
    Ok(quick_xml::escape::unescape(raw)
        .map_err(|e| Error::InvalidXml(e.to_string()))?
        .into_owned())
}

/// Parse a relationships part whose source part is `source`
///
/// `source` is `/` for the package relationships.
pub(crate) fn parse_relationships(xml: &str, source: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::InvalidXml(e.to_string()))?;
                if !name_str.ends_with("Relationship") {
                    buf.clear();
                    continue;
                }

                let mut id = String::new();
                let mut target = None;
                let mut rel_type = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    let value = attribute_value(&attr.value)?;
                    match attr.key.as_ref() {
                        b"Id" => id = value,
                        b"Target" => target = Some(value),
                        b"Type" => rel_type = Some(value),
                        _ => {}
                    }
                }

                let (Some(target), Some(rel_type)) = (target, rel_type) else {
                    return Err(Error::InvalidFormat(format!(
                        "Relationship '{}' of {} needs Target and Type",
                        id, source
                    )));
                };
                if rel_type.contains('?') || rel_type.contains('#') {
                    return Err(Error::InvalidFormat(format!(
                        "Relationship Type cannot contain a query or fragment: {}",
                        rel_type
                    )));
                }
                relationships.push(Relationship {
                    id,
                    target: part_path(&target, source)?,
                    rel_type,
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

fn fail(e: impl std::fmt::Display) -> Error {
    Error::xml_write(format!("Failed to write relationships: {}", e))
}

/// Percent-encoded form of an absolute part path
fn encode_target(path: &str) -> String {
    path.split('/')
        .map(|segment| encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Serialize a relationships part
pub(crate) fn write_relationships(relationships: &[Relationship]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(fail)?;

    let mut root = BytesStart::new("Relationships");
    root.push_attribute(("xmlns", RELATIONSHIPS_NAMESPACE));
    writer.write_event(Event::Start(root)).map_err(fail)?;
    for rel in relationships {
        let mut elem = BytesStart::new("Relationship");
        elem.push_attribute(("Target", encode_target(&rel.target).as_str()));
        elem.push_attribute(("Id", rel.id.as_str()));
        elem.push_attribute(("Type", rel.rel_type.as_str()));
        writer.write_event(Event::Empty(elem)).map_err(fail)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("Relationships")))
        .map_err(fail)?;
    Ok(writer.into_inner())
}
