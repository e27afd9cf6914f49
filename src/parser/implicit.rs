//! Implicit extension reader
//!
//! Port references are stored as written and resolved once the whole
//! `<i:implicitfunction>` is read, so nodes may consume outputs of nodes
//! declared further down.

use tracing::trace;

use crate::codec::{parse_f64, parse_matrix4, parse_resource_id};
use crate::error::{Error, ErrorCode, Result};
use crate::implicit::{ImplicitFunction, NodeConfiguration, NodeRule, NodeType, PortType};
use crate::model::Resource;
use crate::warnings::WarningLevel;

use super::context::ParseContext;
use super::dispatch::ElementKind;
use super::node::{
    AttributeReader, NodeState, ReaderNode, StartTag, XmlAttribute, XmlCursor, read_node,
};
use super::require_id;

/// Port as declared in an `<i:in>` or `<i:out>` block
#[derive(Debug, Clone)]
struct DeclaredPort {
    identifier: String,
    display_name: String,
    port_type: PortType,
    reference: Option<String>,
}

impl DeclaredPort {
    fn read(entry: &AttributeReader, port_type: PortType, is_ref: bool) -> Result<Self> {
        let identifier = entry.get("identifier").filter(|i| !i.is_empty()).ok_or_else(|| {
            Error::model(
                ErrorCode::MissingIdentifier,
                format!("<{}> without an identifier", entry.name()),
            )
        })?;
        let reference = if is_ref {
            Some(entry.require("ref")?.to_string())
        } else {
            None
        };
        Ok(Self {
            identifier: identifier.to_string(),
            display_name: entry.get("displayname").unwrap_or_default().to_string(),
            port_type,
            reference,
        })
    }
}

/// Reader of a port block collecting its declarations
struct PortsReader<'p> {
    state: NodeState,
    ports: &'p mut Vec<DeclaredPort>,
}

impl ReaderNode for PortsReader<'_> {
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
            Some(ElementKind::Port(port_type, is_ref)) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                self.ports.push(DeclaredPort::read(&entry, port_type, is_ref)?);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}

fn read_ports(
    ctx: &mut ParseContext<'_>,
    cursor: &mut XmlCursor<'_>,
    tag: &StartTag,
    ports: &mut Vec<DeclaredPort>,
) -> Result<()> {
    let mut reader = PortsReader {
        state: NodeState::parse_name(tag)?,
        ports,
    };
    read_node(&mut reader, ctx, cursor, tag)
}

/// Configuration whose rule agrees with every declared port it names
///
/// Falls back to the type's first rule when nothing is declared or no rule
/// agrees.
fn infer_configuration(
    node_type: NodeType,
    inputs: &[DeclaredPort],
    outputs: &[DeclaredPort],
) -> NodeConfiguration {
    let agrees = |rule: &NodeRule| {
        let matches = |specs: &[(&str, PortType)], declared: &[DeclaredPort]| {
            declared.iter().all(|port| {
                specs
                    .iter()
                    .find(|(id, _)| *id == port.identifier)
                    .is_none_or(|(_, t)| *t == port.port_type)
            })
        };
        matches(&rule.inputs, inputs) && matches(&rule.outputs, outputs)
    };
    node_type
        .rules()
        .iter()
        .find(|rule| agrees(rule))
        .map_or(NodeConfiguration::Default, |rule| rule.configuration)
}

/// Reader of one node element such as `<i:addition>`
struct NodeReader {
    state: NodeState,
    node_type: NodeType,
    identifier: String,
    display_name: String,
    tag: String,
    payload: Vec<(String, String)>,
    inputs: Vec<DeclaredPort>,
    outputs: Vec<DeclaredPort>,
}

impl NodeReader {
    fn new(tag: &StartTag, node_type: NodeType) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            node_type,
            identifier: String::new(),
            display_name: String::new(),
            tag: String::new(),
            payload: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        })
    }

    fn payload(&self, name: &str) -> Result<&str> {
        self.payload
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| Error::missing_attribute(self.node_type.xml_name(), name))
    }

    /// Add the node with its ports, references and payload to `function`
    fn install(self, ctx: &mut ParseContext<'_>, function: &mut ImplicitFunction) -> Result<()> {
        let resource = match self.node_type {
            NodeType::ConstResourceId => {
                let id = parse_resource_id("value", self.payload("value")?)?;
                Some(ctx.resolve_resource("constresourceid value", id)?)
            }
            _ => None,
        };
        let configuration = infer_configuration(self.node_type, &self.inputs, &self.outputs);
        let node = function.add_node(
            self.node_type,
            &self.identifier,
            configuration,
            &self.display_name,
            &self.tag,
        )?;

        match self.node_type {
            NodeType::Constant => node.set_constant(parse_f64("value", self.payload("value")?)?)?,
            NodeType::ConstVec => node.set_vector([
                parse_f64("x", self.payload("x")?)?,
                parse_f64("y", self.payload("y")?)?,
                parse_f64("z", self.payload("z")?)?,
            ])?,
            NodeType::ConstMat => node.set_matrix(parse_matrix4("matrix", self.payload("matrix")?)?)?,
            _ => {}
        }
        if let Some(id) = resource {
            node.set_model_resource_id(id)?;
        }

        let free_ports = self.node_type.has_free_ports();
        let mut mismatches = Vec::new();
        for declared in self.inputs {
            if node.input(&declared.identifier).is_none() {
                if !free_ports {
                    return Err(Error::model(
                        ErrorCode::InvalidParam,
                        format!(
                            "{} node '{}' has no input '{}'",
                            self.node_type, self.identifier, declared.identifier
                        ),
                    ));
                }
                node.add_input(
                    declared.identifier.as_str(),
                    declared.display_name.as_str(),
                    declared.port_type,
                )?;
            }
            let Some(port) = node.input_mut(&declared.identifier) else {
                continue;
            };
            if port.port_type != declared.port_type {
                mismatches.push((declared.identifier.clone(), port.port_type, declared.port_type));
            }
            if !declared.display_name.is_empty() {
                port.display_name = declared.display_name;
            }
            port.reference = declared.reference;
        }
        for declared in self.outputs {
            let existing = node
                .outputs
                .iter()
                .find(|p| p.identifier == declared.identifier)
                .map(|p| p.port_type);
            match existing {
                Some(port_type) if port_type != declared.port_type => {
                    mismatches.push((declared.identifier, port_type, declared.port_type));
                }
                Some(_) => {}
                None if free_ports => {
                    node.add_output(declared.identifier, declared.display_name, declared.port_type)?;
                }
                None => {
                    return Err(Error::model(
                        ErrorCode::InvalidParam,
                        format!(
                            "{} node '{}' has no output '{}'",
                            self.node_type, self.identifier, declared.identifier
                        ),
                    ));
                }
            }
        }

        for (port, expected, declared) in mismatches {
            ctx.warn(
                ErrorCode::ImplicitTypeMismatch,
                format!(
                    "port '{}.{}' is a {}, declared as {}",
                    self.identifier, port, expected, declared
                ),
                WarningLevel::InvalidOptionalValue,
            )?;
        }
        Ok(())
    }
}

impl ReaderNode for NodeReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "identifier" => self.identifier = attr.value.clone(),
            "displayname" => self.display_name = attr.value.clone(),
            "tag" => self.tag = attr.value.clone(),
            name => self.payload.push((name.to_string(), attr.value.clone())),
        }
        Ok(())
    }

    fn on_child_element(
        &mut self,
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: StartTag,
    ) -> Result<()> {
        match ctx.kind_of(&tag) {
            Some(ElementKind::PortsIn) => read_ports(ctx, cursor, &tag, &mut self.inputs),
            Some(ElementKind::PortsOut) => read_ports(ctx, cursor, &tag, &mut self.outputs),
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}

/// Reader of `<i:implicitfunction>`
pub(super) struct ImplicitFunctionReader {
    state: NodeState,
    id: Option<u32>,
    function: ImplicitFunction,
}

impl ImplicitFunctionReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            function: ImplicitFunction::default(),
        })
    }

    fn add_inputs(&mut self, ports: Vec<DeclaredPort>) -> Result<()> {
        for port in ports {
            self.function
                .add_input(port.identifier, port.display_name, port.port_type)?;
        }
        Ok(())
    }

    fn add_outputs(&mut self, ports: Vec<DeclaredPort>) -> Result<()> {
        for port in ports {
            let output =
                self.function
                    .add_output(port.identifier, port.display_name, port.port_type)?;
            output.reference = port.reference;
        }
        Ok(())
    }

    /// Every stored reference must name an existing source port
    fn check_references(&self) -> Result<()> {
        let function = &self.function;
        let targets = function
            .nodes()
            .iter()
            .flat_map(|node| node.inputs.iter())
            .chain(function.outputs.iter());
        for port in targets {
            if let Some(reference) = port.reference.as_deref()
                && function.resolve_source(reference).is_none()
            {
                return Err(Error::model(
                    ErrorCode::UnresolvedPortReference,
                    format!(
                        "function '{}' port '{}' references unknown '{}'",
                        function.identifier, port.identifier, reference
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl ReaderNode for ImplicitFunctionReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "id" => self.id = Some(parse_resource_id("implicitfunction id", &attr.value)?),
            "identifier" => self.function.identifier = attr.value.clone(),
            "displayname" => self.function.display_name = attr.value.clone(),
            _ => {}
        }
        Ok(())
    }

    fn on_child_element(
        &mut self,
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: StartTag,
    ) -> Result<()> {
        match ctx.kind_of(&tag) {
            Some(ElementKind::PortsIn) => {
                let mut ports = Vec::new();
                read_ports(ctx, cursor, &tag, &mut ports)?;
                self.add_inputs(ports)
            }
            Some(ElementKind::PortsOut) => {
                let mut ports = Vec::new();
                read_ports(ctx, cursor, &tag, &mut ports)?;
                self.add_outputs(ports)
            }
            Some(ElementKind::Node(node_type)) => {
                let mut reader = NodeReader::new(&tag, node_type)?;
                read_node(&mut reader, ctx, cursor, &tag)?;
                reader.install(ctx, &mut self.function)
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("implicitfunction", self.id)?;
        self.check_references()?;
        self.function.sort_nodes_topologically()?;
        for violation in self.function.type_violations() {
            ctx.warn(
                ErrorCode::ImplicitTypeMismatch,
                format!(
                    "{} expects a {} but '{}' provides {}",
                    violation.target.reference(),
                    violation.expected,
                    violation.source,
                    violation
                        .found
                        .map_or_else(|| "nothing".to_string(), |t| t.to_string())
                ),
                WarningLevel::InvalidOptionalValue,
            )?;
        }
        trace!(
            id,
            identifier = %self.function.identifier,
            nodes = self.function.nodes().len(),
            "implicit function read"
        );
        let function = std::mem::take(&mut self.function);
        ctx.add_resource(id, Resource::ImplicitFunction(function))?;
        Ok(())
    }
}
