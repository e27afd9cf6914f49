//! Streaming XML cursor and the reader node base
//!
//! [`XmlCursor`] turns a quick-xml event stream into namespace resolved
//! [`XmlToken`]s. Every element reader implements [`ReaderNode`]: the
//! provided `parse_attributes` and `parse_content` methods drive the cursor
//! and call the reader's hooks, and each may run only once per node.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, ErrorCode, Result};
use crate::model::XML_NAMESPACE;

use super::context::ParseContext;

/// Default buffer capacity for XML parsing (4KB)
const XML_BUFFER_CAPACITY: usize = 4096;

/// Attribute of a start tag, xmlns declarations excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Local name
    pub name: String,
    /// Resolved namespace, `None` for unprefixed attributes
    pub namespace: Option<String>,
    /// Unescaped value
    pub value: String,
}

/// Start of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Local name
    pub local_name: String,
    /// Resolved namespace, empty if none applies
    pub namespace: String,
    /// Attributes in document order
    pub attributes: Vec<XmlAttribute>,
    /// `(prefix, namespace)` pairs declared on this element; the default
    /// namespace has an empty prefix
    pub declarations: Vec<(String, String)>,
    /// Written as `<name/>`
    pub self_closing: bool,
}

impl StartTag {
    /// Value of an unprefixed attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// Token produced by [`XmlCursor::next_token`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlToken {
    /// Element start, also produced for self-closing elements
    Start(StartTag),
    /// Character data; whitespace-only runs are dropped
    Text(String),
    /// End of a non self-closing element
    End,
    /// End of input
    Eof,
}

/// Forward-only, namespace aware cursor over one XML document
pub struct XmlCursor<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    scopes: Vec<Vec<(String, String)>>,
    depth: usize,
    max_depth: usize,
    // Whitespace is content only when it follows text or an entity reference
    in_text: bool,
}

impl<'a> XmlCursor<'a> {
    /// Create a cursor allowing `max_depth` nested elements
    pub fn new(xml: &'a str, max_depth: usize) -> Self {
        let reader = Reader::from_str(xml);
        Self {
            reader,
            buf: Vec::with_capacity(XML_BUFFER_CAPACITY),
            scopes: Vec::new(),
            depth: 0,
            max_depth,
            in_text: false,
        }
    }

    /// Current element depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Namespace bound to `prefix` in the current scope
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(p, _)| p == prefix)
            .map(|(_, namespace)| namespace.as_str())
    }

    /// Read the next token
    pub fn next_token(&mut self) -> Result<XmlToken> {
        let mut buf = std::mem::take(&mut self.buf);
        let token = self.read_token(&mut buf);
        self.in_text = matches!(token, Ok(XmlToken::Text(_)));
        buf.clear();
        self.buf = buf;
        token
    }

    fn read_token(&mut self, buf: &mut Vec<u8>) -> Result<XmlToken> {
        loop {
            buf.clear();
            match self.reader.read_event_into(buf)? {
                Event::Start(ref e) => return self.open(e, false).map(XmlToken::Start),
                Event::Empty(ref e) => return self.open(e, true).map(XmlToken::Start),
                Event::End(_) => {
                    self.scopes.pop();
                    self.depth = self.depth.saturating_sub(1);
                    return Ok(XmlToken::End);
                }
                Event::Text(t) => {
                    let raw = t.decode().map_err(|e| Error::InvalidXml(e.to_string()))?;
                    let text = quick_xml::escape::unescape(&raw)
                        .map_err(|e| Error::InvalidXml(e.to_string()))?;
                    if self.in_text || !text.trim().is_empty() {
                        return Ok(XmlToken::Text(text.into_owned()));
                    }
                }
                Event::CData(c) => {
                    let bytes = c.into_inner();
                    return Ok(XmlToken::Text(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Event::GeneralRef(r) => {
                    let name = r.decode().map_err(|e| Error::InvalidXml(e.to_string()))?;
                    return resolve_entity(&name).map(XmlToken::Text);
                }
                Event::DocType(_) => {
                    return Err(Error::InvalidXml(
                        "DTD declarations are not allowed in 3MF files".to_string(),
                    ));
                }
                Event::Eof => return Ok(XmlToken::Eof),
                _ => {}
            }
        }
    }

    fn open(&mut self, e: &BytesStart<'_>, self_closing: bool) -> Result<StartTag> {
        if self.depth >= self.max_depth {
            return Err(Error::model(
                ErrorCode::XmlNestingTooDeep,
                format!("elements nested deeper than {}", self.max_depth),
            ));
        }

        let name = e.name();
        let qname =
            std::str::from_utf8(name.as_ref()).map_err(|e| Error::InvalidXml(e.to_string()))?;

        let mut declarations = Vec::new();
        let mut raw_attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::InvalidXml(e.to_string()))?;
            let raw_value =
                std::str::from_utf8(&attr.value).map_err(|e| Error::InvalidXml(e.to_string()))?;
            let value = quick_xml::escape::unescape(raw_value)
                .map_err(|e| Error::InvalidXml(e.to_string()))?
                .into_owned();
            if key == "xmlns" {
                declarations.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.push((prefix.to_string(), value));
            } else {
                raw_attributes.push((key.to_string(), value));
            }
        }

        self.scopes.push(declarations.clone());
        let tag = self.resolve_tag(qname, raw_attributes, declarations, self_closing);
        if self_closing {
            self.scopes.pop();
        } else {
            self.depth += 1;
        }
        tag
    }

    fn resolve_tag(
        &self,
        qname: &str,
        raw_attributes: Vec<(String, String)>,
        declarations: Vec<(String, String)>,
        self_closing: bool,
    ) -> Result<StartTag> {
        let (namespace, local_name) = match qname.split_once(':') {
            Some((prefix, local)) => (self.require_prefix(prefix, qname)?, local),
            None => (self.resolve_prefix("").unwrap_or_default(), qname),
        };

        let attributes = raw_attributes
            .into_iter()
            .map(|(key, value)| {
                let (namespace, name) = match key.split_once(':') {
                    Some((prefix, local)) => {
                        (Some(self.require_prefix(prefix, &key)?.to_string()), local)
                    }
                    None => (None, key.as_str()),
                };
                Ok(XmlAttribute {
                    name: name.to_string(),
                    namespace,
                    value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StartTag {
            local_name: local_name.to_string(),
            namespace: namespace.to_string(),
            attributes,
            declarations,
            self_closing,
        })
    }

    fn require_prefix(&self, prefix: &str, qname: &str) -> Result<&str> {
        self.resolve_prefix(prefix).ok_or_else(|| {
            Error::InvalidXml(format!(
                "undeclared namespace prefix '{}' in '{}'",
                prefix, qname
            ))
        })
    }

    /// Skip the content of an element whose start tag was just read
    pub fn skip_element(&mut self, tag: &StartTag) -> Result<()> {
        if tag.self_closing {
            return Ok(());
        }
        let mut level = 0usize;
        loop {
            match self.next_token()? {
                XmlToken::Start(child) if !child.self_closing => level += 1,
                XmlToken::End if level == 0 => return Ok(()),
                XmlToken::End => level -= 1,
                XmlToken::Eof => {
                    return Err(Error::invalid_xml_element(
                        &tag.local_name,
                        "unexpected end of document",
                    ));
                }
                _ => {}
            }
        }
    }
}

fn resolve_entity(name: &str) -> Result<String> {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(decimal) = name.strip_prefix('#') {
                decimal.parse().ok()
            } else {
                None
            };
            code.and_then(char::from_u32)
        }
    };
    resolved
        .map(String::from)
        .ok_or_else(|| Error::InvalidXml(format!("unknown entity reference '&{};'", name)))
}

/// Per node bookkeeping of the one-shot parse phases
#[derive(Debug, Clone)]
pub struct NodeState {
    name: String,
    self_closing: bool,
    attributes_parsed: bool,
    content_parsed: bool,
}

impl NodeState {
    /// Read the element name from its start tag
    ///
    /// Fails with `NodeNameIsEmpty` if the element has no local name.
    pub fn parse_name(tag: &StartTag) -> Result<Self> {
        if tag.local_name.is_empty() {
            return Err(Error::model(
                ErrorCode::NodeNameIsEmpty,
                "element without a local name",
            ));
        }
        Ok(Self {
            name: tag.local_name.clone(),
            self_closing: tag.self_closing,
            attributes_parsed: false,
            content_parsed: false,
        })
    }

    /// Element local name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if the element was written as `<name/>`
    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    fn already_parsed(&self, phase: &str) -> Error {
        Error::model(
            ErrorCode::AlreadyParsedXmlNode,
            format!("{} of <{}> parsed twice", phase, self.name),
        )
    }

    fn begin_attributes(&mut self) -> Result<()> {
        if self.attributes_parsed {
            return Err(self.already_parsed("attributes"));
        }
        self.attributes_parsed = true;
        Ok(())
    }

    fn begin_content(&mut self) -> Result<()> {
        if self.content_parsed {
            return Err(self.already_parsed("content"));
        }
        self.content_parsed = true;
        Ok(())
    }
}

/// Reader for one XML element
///
/// Implementors override the hooks they need; the provided methods drive
/// the cursor. The default child handler skips the child subtree.
pub trait ReaderNode {
    /// Parse phase bookkeeping
    fn state(&mut self) -> &mut NodeState;

    /// Unprefixed attribute
    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, _attr: &XmlAttribute) -> Result<()> {
        Ok(())
    }

    /// Attribute in `namespace`
    fn on_ns_attribute(
        &mut self,
        _ctx: &mut ParseContext<'_>,
        _attr: &XmlAttribute,
        _namespace: &str,
    ) -> Result<()> {
        Ok(())
    }

    /// All attributes were routed
    fn on_attributes_parsed(&mut self, _ctx: &mut ParseContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Child element start; the child's content is still unread
    fn on_child_element(
        &mut self,
        _ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: StartTag,
    ) -> Result<()> {
        cursor.skip_element(&tag)
    }

    /// Character data
    fn on_text(&mut self, _ctx: &mut ParseContext<'_>, _text: &str) -> Result<()> {
        Ok(())
    }

    /// End of the element
    fn on_end_element(&mut self, _ctx: &mut ParseContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Route the tag's attributes to the attribute hooks, once
    fn parse_attributes(&mut self, ctx: &mut ParseContext<'_>, tag: &StartTag) -> Result<()> {
        self.state().begin_attributes()?;
        for attr in &tag.attributes {
            match &attr.namespace {
                None => self.on_attribute(ctx, attr)?,
                Some(namespace) => self.on_ns_attribute(ctx, attr, namespace)?,
            }
        }
        self.on_attributes_parsed(ctx)
    }

    /// Read the element content up to its end tag, once
    fn parse_content(
        &mut self,
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
    ) -> Result<()> {
        self.state().begin_content()?;
        if !self.state().is_self_closing() {
            loop {
                match cursor.next_token()? {
                    XmlToken::Start(tag) => self.on_child_element(ctx, cursor, tag)?,
                    XmlToken::Text(text) => self.on_text(ctx, &text)?,
                    XmlToken::End => break,
                    XmlToken::Eof => {
                        let name = self.state().name().to_string();
                        return Err(Error::invalid_xml_element(
                            &name,
                            "unexpected end of document",
                        ));
                    }
                }
            }
        }
        self.on_end_element(ctx)
    }
}

/// Parse attributes and content of `node`, whose start tag is `tag`
pub fn read_node<N: ReaderNode>(
    node: &mut N,
    ctx: &mut ParseContext<'_>,
    cursor: &mut XmlCursor<'_>,
    tag: &StartTag,
) -> Result<()> {
    node.parse_attributes(ctx, tag)?;
    node.parse_content(ctx, cursor)
}

/// Reader for leaf elements whose attributes the parent interprets
#[derive(Debug)]
pub struct AttributeReader {
    state: NodeState,
    attributes: Vec<XmlAttribute>,
}

impl AttributeReader {
    /// Read the element started by `tag`, skipping any content
    pub fn read(
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: &StartTag,
    ) -> Result<Self> {
        let mut reader = Self {
            state: NodeState::parse_name(tag)?,
            attributes: Vec::new(),
        };
        read_node(&mut reader, ctx, cursor, tag)?;
        Ok(reader)
    }

    /// Element local name
    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// Unprefixed attribute value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Unprefixed attribute value, failing if absent
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| Error::missing_attribute(self.name(), name))
    }

    /// Value of an attribute in `namespace`
    pub fn get_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.name == name)
            .map(|a| a.value.as_str())
    }
}

impl ReaderNode for AttributeReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        self.attributes.push(attr.clone());
        Ok(())
    }

    fn on_ns_attribute(
        &mut self,
        _ctx: &mut ParseContext<'_>,
        attr: &XmlAttribute,
        _namespace: &str,
    ) -> Result<()> {
        self.attributes.push(attr.clone());
        Ok(())
    }
}
