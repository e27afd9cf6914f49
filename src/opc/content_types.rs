//! `[Content_Types].xml` parsing and writing

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::error::{Error, Result};

use super::relationships::attribute_value;
use super::validation::zip_name;

/// Content type of relationship parts
pub const RELATIONSHIPS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.relationships+xml";

/// Content type of 3D model parts
pub const MODEL_CONTENT_TYPE: &str = "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";

const CONTENT_TYPES_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/package/2006/content-types";

/// Parsed `[Content_Types].xml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// `(extension, content type)` of `<Default>` entries
    pub defaults: Vec<(String, String)>,
    /// `(part name, content type)` of `<Override>` entries
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    /// Parse and check that relationships and models have a content type
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut types = ContentTypes::default();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    let name_str = std::str::from_utf8(name.as_ref())
                        .map_err(|e| Error::InvalidXml(e.to_string()))?;
                    let is_default = name_str.ends_with("Default");
                    if !is_default && !name_str.ends_with("Override") {
                        buf.clear();
                        continue;
                    }

                    let mut key = None;
                    let mut content_type = None;
                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"Extension" | b"PartName" => key = Some(attribute_value(&attr.value)?),
                            b"ContentType" => content_type = Some(attribute_value(&attr.value)?),
                            _ => {}
                        }
                    }
                    if let (Some(key), Some(ct)) = (key, content_type) {
                        if is_default {
                            if ct == MODEL_CONTENT_TYPE && !key.eq_ignore_ascii_case("model") {
                                return Err(Error::InvalidFormat(format!(
                                    "Content type '{}' must use Extension='model', not Extension='{}'",
                                    ct, key
                                )));
                            }
                            types.defaults.push((key, ct));
                        } else {
                            types.overrides.push((key, ct));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        let has_rels = types.defaults.iter().any(|(ext, ct)| {
            ext.eq_ignore_ascii_case("rels") && ct == RELATIONSHIPS_CONTENT_TYPE
        });
        if !has_rels {
            return Err(Error::InvalidFormat(
                "Content Types missing required 'rels' extension definition".to_string(),
            ));
        }
        let has_model = types
            .defaults
            .iter()
            .chain(types.overrides.iter())
            .any(|(_, ct)| ct == MODEL_CONTENT_TYPE);
        if !has_model {
            return Err(Error::InvalidFormat(
                "Content Types missing required model content type (Default or Override)"
                    .to_string(),
            ));
        }
        Ok(types)
    }

    /// Content type of a part, overrides first
    pub fn content_type_of(&self, path: &str) -> Option<&str> {
        let path = zip_name(path);
        if let Some((_, ct)) = self.overrides.iter().find(|(part, _)| zip_name(part) == path) {
            return Some(ct);
        }
        let extension = path.rsplit_once('.').map(|(_, ext)| ext)?;
        self.defaults
            .iter()
            .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
            .map(|(_, ct)| ct.as_str())
    }

    /// Register a default for an extension unless one exists
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        if !self
            .defaults
            .iter()
            .any(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        {
            self.defaults
                .push((extension.to_string(), content_type.to_string()));
        }
    }

    /// Register a content type for a part
    ///
    /// Falls back to an override when the extension already maps to
    /// another type.
    pub fn add_part(&mut self, path: &str, content_type: &str) {
        match path.rsplit_once('.').map(|(_, ext)| ext) {
            Some(ext) if !ext.contains('/') => {
                self.add_default(ext, content_type);
                if self.content_type_of(path) != Some(content_type) {
                    self.overrides
                        .push((path.to_string(), content_type.to_string()));
                }
            }
            _ => self
                .overrides
                .push((path.to_string(), content_type.to_string())),
        }
    }

    /// Serialize as `[Content_Types].xml`
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        fn fail(e: impl std::fmt::Display) -> Error {
            Error::xml_write(format!("Failed to write Content_Types: {}", e))
        }
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(fail)?;
        let mut root = BytesStart::new("Types");
        root.push_attribute(("xmlns", CONTENT_TYPES_NAMESPACE));
        writer.write_event(Event::Start(root)).map_err(fail)?;
        for (ext, ct) in &self.defaults {
            let mut elem = BytesStart::new("Default");
            elem.push_attribute(("Extension", ext.as_str()));
            elem.push_attribute(("ContentType", ct.as_str()));
            writer.write_event(Event::Empty(elem)).map_err(fail)?;
        }
        for (part, ct) in &self.overrides {
            let mut elem = BytesStart::new("Override");
            elem.push_attribute(("PartName", part.as_str()));
            elem.push_attribute(("ContentType", ct.as_str()));
            writer.write_event(Event::Empty(elem)).map_err(fail)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("Types")))
            .map_err(fail)?;
        Ok(writer.into_inner())
    }
}

/// Content type guessed from a file extension
pub(crate) fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "model" => MODEL_CONTENT_TYPE,
        "rels" => RELATIONSHIPS_CONTENT_TYPE,
        _ => "application/octet-stream",
    }
}
