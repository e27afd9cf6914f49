//! Metadata readers

use crate::error::{Error, ErrorCode, Result};
use crate::model::{DEFAULT_METADATA_TYPE, MetaData, MetaDataGroup};
use crate::codec::parse_bool;
use crate::warnings::WarningLevel;

use super::context::ParseContext;
use super::dispatch::ElementKind;
use super::node::{NodeState, ReaderNode, StartTag, XmlAttribute, XmlCursor, read_node};

/// Reader of one `<metadata>` element
pub(super) struct MetadataReader {
    state: NodeState,
    declarations: Vec<(String, String)>,
    name: Option<String>,
    data_type: Option<String>,
    preserve: bool,
    value: String,
}

impl MetadataReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            declarations: tag.declarations.clone(),
            name: None,
            data_type: None,
            preserve: false,
            value: String::new(),
        })
    }

    /// Build the entry, resolving a `prefix:name` against the namespaces in
    /// scope
    pub(super) fn into_metadata(
        self,
        ctx: &ParseContext<'_>,
        cursor: &XmlCursor<'_>,
    ) -> Result<MetaData> {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::model(ErrorCode::InvalidMetadata, "metadata without a name"))?;

        let (namespace, local) = match name.split_once(':') {
            Some((prefix, local)) => {
                let namespace = self
                    .declarations
                    .iter()
                    .find(|(p, _)| p == prefix)
                    .map(|(_, ns)| ns.as_str())
                    .or_else(|| cursor.resolve_prefix(prefix))
                    .or_else(|| ctx.namespace_for_prefix(prefix))
                    .ok_or_else(|| {
                        Error::model(
                            ErrorCode::MetadataCouldNotGetNamespace,
                            format!("metadata '{}' uses an undeclared prefix", name),
                        )
                    })?;
                (namespace.to_string(), local.to_string())
            }
            None => (String::new(), name.clone()),
        };

        let mut entry = MetaData::new(namespace, local, self.value.trim());
        entry.data_type = self
            .data_type
            .unwrap_or_else(|| DEFAULT_METADATA_TYPE.to_string());
        entry.preserve = self.preserve;
        Ok(entry)
    }
}

impl ReaderNode for MetadataReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "name" => self.name = Some(attr.value.clone()),
            "type" => self.data_type = Some(attr.value.clone()),
            "preserve" => self.preserve = parse_bool("preserve", &attr.value)?,
            _ => {}
        }
        Ok(())
    }

    fn on_text(&mut self, _ctx: &mut ParseContext<'_>, text: &str) -> Result<()> {
        self.value.push_str(text);
        Ok(())
    }
}

/// Add model level metadata; repeated names only warn
pub(super) fn record_model_metadata(ctx: &mut ParseContext<'_>, entry: MetaData) -> Result<()> {
    let key = entry.key();
    match ctx.model.metadata_mut().add_metadata(entry).map(|_| ()) {
        Err(e) if e.code() == Some(ErrorCode::DuplicateMetadata) => ctx.warn(
            ErrorCode::DuplicateMetadata,
            format!("metadata '{}' repeated, keeping the first value", key),
            WarningLevel::InvalidMandatoryValue,
        ),
        other => other,
    }
}

/// Reader of `<metadatagroup>` filling a group owned by the parent
pub(super) struct MetadataGroupReader<'g> {
    state: NodeState,
    group: &'g mut MetaDataGroup,
}

impl<'g> MetadataGroupReader<'g> {
    pub(super) fn new(tag: &StartTag, group: &'g mut MetaDataGroup) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            group,
        })
    }
}

impl ReaderNode for MetadataGroupReader<'_> {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_child_element(
        &mut self,
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: StartTag,
    ) -> Result<()> {
        match ctx.kind_of(&tag) {
            Some(ElementKind::Metadata) => {
                let mut reader = MetadataReader::new(&tag)?;
                read_node(&mut reader, ctx, cursor, &tag)?;
                let entry = reader.into_metadata(ctx, cursor)?;
                self.group.add_metadata(entry)?;
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}
