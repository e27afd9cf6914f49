//! XML parsing for 3MF model parts
//!
//! Every element has a reader implementing [`ReaderNode`]. Readers are
//! driven by an [`XmlCursor`] over the part text and share a
//! [`ParseContext`] holding the model under construction, the warnings
//! collector and the namespace scope of the part.

pub mod context;
pub mod node;

mod beam_lattice;
mod core;
pub(crate) mod dispatch;
mod implicit;
mod material;
mod metadata;
mod slice;
mod volumetric;

use tracing::debug;

use crate::codec::parse_index;
use crate::error::{Error, ErrorCode, Result};
use crate::model::{CORE_093_NAMESPACE, Extension, Model, ParserConfig, ProgressStage};
use crate::warnings::Warnings;

pub use self::context::ParseContext;
pub use self::core::ModelReader;
pub use self::node::{
    AttributeReader, NodeState, ReaderNode, StartTag, XmlAttribute, XmlCursor, XmlToken,
    read_node,
};

/// Index attribute value (0 ..= 2^31-1)
pub(crate) fn index_value(attr: &XmlAttribute) -> Result<usize> {
    parse_usize(&attr.name, &attr.value)
}

pub(crate) fn parse_usize(field: &str, text: &str) -> Result<usize> {
    Ok(parse_index(field, text)? as usize)
}

/// Whitespace separated index list such as `pindices`
pub(crate) fn index_list(field: &str, text: &str) -> Result<Vec<usize>> {
    text.split_whitespace()
        .map(|item| parse_usize(field, item))
        .collect()
}

pub(crate) fn missing_id(element: &str) -> Error {
    Error::model(
        ErrorCode::MissingModelResourceId,
        format!("<{}> has no id", element),
    )
}

pub(crate) fn require_id(element: &str, id: Option<u32>) -> Result<u32> {
    id.ok_or_else(|| missing_id(element))
}

/// Parse one model part into `model`
///
/// Resources are registered under `path`; build items and model metadata
/// are only taken from the root part. Referenced parts must be parsed before
/// the parts referencing them.
pub fn parse_model_part(
    model: &mut Model,
    warnings: &mut Warnings,
    path: &str,
    xml: &str,
    config: &ParserConfig,
) -> Result<()> {
    config.report_progress(ProgressStage::ReadingModelPart, -1.0)?;
    let mut cursor = XmlCursor::new(xml, config.max_depth());
    let tag = match cursor.next_token()? {
        XmlToken::Start(tag) => tag,
        XmlToken::Eof => {
            return Err(Error::InvalidXml(format!("{} is empty", path)));
        }
        _ => {
            return Err(Error::InvalidXml(format!(
                "{} does not start with an element",
                path
            )));
        }
    };
    let core = tag.namespace == Extension::Core.namespace() || tag.namespace == CORE_093_NAMESPACE;
    if tag.local_name != "model" || !core {
        return Err(Error::InvalidXml(format!(
            "root element of {} is <{}> in '{}', expected a core <model>",
            path, tag.local_name, tag.namespace
        )));
    }

    let mut ctx = ParseContext::new(model, warnings, config, path);
    let mut reader = ModelReader::new(&mut ctx, &tag)?;
    read_node(&mut reader, &mut ctx, &mut cursor, &tag)?;
    debug!(path, resources = model.resources_in_part(path).len(), "model part parsed");
    Ok(())
}

/// Parse a root model part from a string with every extension enabled
#[doc(hidden)]
pub fn parse_model_xml(xml: &str) -> Result<(Model, Warnings)> {
    parse_model_xml_with_config(xml, &ParserConfig::with_all_extensions())
}

/// Parse a root model part from a string
#[doc(hidden)]
pub fn parse_model_xml_with_config(xml: &str, config: &ParserConfig) -> Result<(Model, Warnings)> {
    let mut model = Model::new();
    let mut warnings = config.new_warnings();
    let root = model.root_path().to_string();
    parse_model_part(&mut model, &mut warnings, &root, xml, config)?;
    model.resolve_function_calls()?;
    Ok((model, warnings))
}
