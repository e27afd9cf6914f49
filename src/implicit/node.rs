//! Ports and nodes of an implicit function

use crate::codec::{Matrix4, Vector3};
use crate::error::{Error, ErrorCode, Result};
use crate::model::ResourceId;

use super::node_types::{NodeConfiguration, NodeType, PortType};

/// Named, typed port of a node or function
///
/// Input ports may carry a reference `"node.port"` (or `"inputs.port"` for
/// function inputs) naming the output that feeds them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitPort {
    /// Identifier, unique among the owner's ports of the same direction
    pub identifier: String,
    /// Display name
    pub display_name: String,
    /// Value type
    pub port_type: PortType,
    /// Source reference of an input port
    pub reference: Option<String>,
}

impl ImplicitPort {
    /// Create an unlinked port
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        port_type: PortType,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            port_type,
            reference: None,
        }
    }

    /// Split the reference into `(owner, port)`
    pub fn reference_parts(&self) -> Option<(&str, &str)> {
        self.reference.as_deref().and_then(split_reference)
    }
}

/// Split `"owner.port"` at the first dot
pub(crate) fn split_reference(reference: &str) -> Option<(&str, &str)> {
    let (owner, port) = reference.split_once('.')?;
    if owner.is_empty() || port.is_empty() {
        return None;
    }
    Some((owner, port))
}

pub(crate) fn add_port<'a>(
    ports: &'a mut Vec<ImplicitPort>,
    owner: &str,
    port: ImplicitPort,
) -> Result<&'a mut ImplicitPort> {
    if port.identifier.is_empty() {
        return Err(Error::model(
            ErrorCode::MissingIdentifier,
            format!("port of '{}' has no identifier", owner),
        ));
    }
    if ports.iter().any(|p| p.identifier == port.identifier) {
        return Err(Error::model(
            ErrorCode::DuplicateIdentifier,
            format!("'{}' already has a port '{}'", owner, port.identifier),
        ));
    }
    ports.push(port);
    let last = ports.len() - 1;
    Ok(&mut ports[last])
}

/// Value carried by constant nodes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum NodePayload {
    /// Nothing set
    #[default]
    None,
    /// `constant`
    Constant(f64),
    /// `constvec`
    Vector(Vector3),
    /// `constmat`
    Matrix(Matrix4),
    /// `constresourceid`
    ResourceId(ResourceId),
}

/// Node of an implicit function graph
#[derive(Debug, Clone, PartialEq)]
pub struct ImplicitNode {
    /// Node type
    pub node_type: NodeType,
    /// Identifier, unique within the function
    pub identifier: String,
    /// Display name
    pub display_name: String,
    /// Free-form tag
    pub tag: String,
    /// Configuration the ports were created from
    pub configuration: NodeConfiguration,
    /// Input ports
    pub inputs: Vec<ImplicitPort>,
    /// Output ports
    pub outputs: Vec<ImplicitPort>,
    payload: NodePayload,
}

impl ImplicitNode {
    /// Create a node with the ports listed by its type's rule
    pub fn new(
        node_type: NodeType,
        identifier: impl Into<String>,
        configuration: NodeConfiguration,
    ) -> Result<Self> {
        let rule = node_type.rule(configuration)?;
        let to_ports = |specs: &[(&'static str, PortType)]| -> Vec<ImplicitPort> {
            specs
                .iter()
                .map(|(id, port_type)| ImplicitPort::new(*id, *id, *port_type))
                .collect()
        };
        Ok(Self {
            node_type,
            identifier: identifier.into(),
            display_name: String::new(),
            tag: String::new(),
            configuration: rule.configuration,
            inputs: to_ports(&rule.inputs),
            outputs: to_ports(&rule.outputs),
            payload: NodePayload::None,
        })
    }

    /// Add an input port
    pub fn add_input(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        port_type: PortType,
    ) -> Result<&mut ImplicitPort> {
        let port = ImplicitPort::new(identifier, display_name, port_type);
        add_port(&mut self.inputs, &self.identifier, port)
    }

    /// Add an output port
    pub fn add_output(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        port_type: PortType,
    ) -> Result<&mut ImplicitPort> {
        let port = ImplicitPort::new(identifier, display_name, port_type);
        add_port(&mut self.outputs, &self.identifier, port)
    }

    /// Input port by identifier
    pub fn input(&self, identifier: &str) -> Option<&ImplicitPort> {
        self.inputs.iter().find(|p| p.identifier == identifier)
    }

    /// Mutable input port by identifier
    pub fn input_mut(&mut self, identifier: &str) -> Option<&mut ImplicitPort> {
        self.inputs.iter_mut().find(|p| p.identifier == identifier)
    }

    /// Output port by identifier
    pub fn output(&self, identifier: &str) -> Option<&ImplicitPort> {
        self.outputs.iter().find(|p| p.identifier == identifier)
    }

    /// True if the ports match one rule of the node type
    ///
    /// Every rule port must be present with its type. Function calls may
    /// carry extra ports beyond the `functionID` input.
    pub fn are_ports_valid(&self) -> bool {
        let fits = |specs: &[(&'static str, PortType)], ports: &[ImplicitPort]| {
            let all_present = specs.iter().all(|(id, port_type)| {
                ports
                    .iter()
                    .any(|p| p.identifier == *id && p.port_type == *port_type)
            });
            all_present && (self.node_type.has_free_ports() || specs.len() == ports.len())
        };
        self.node_type
            .rules()
            .iter()
            .any(|rule| fits(&rule.inputs, &self.inputs) && fits(&rule.outputs, &self.outputs))
    }

    /// Current payload
    pub fn payload(&self) -> NodePayload {
        self.payload
    }

    fn expect_type(&self, expected: NodeType) -> Result<()> {
        if self.node_type == expected {
            Ok(())
        } else {
            Err(Error::model(
                ErrorCode::InvalidParam,
                format!(
                    "node '{}' is a {} node, not {}",
                    self.identifier, self.node_type, expected
                ),
            ))
        }
    }

    fn unset(&self) -> Error {
        Error::model(
            ErrorCode::InvalidParam,
            format!("node '{}' has no value", self.identifier),
        )
    }

    /// Set the value of a `constant` node
    pub fn set_constant(&mut self, value: f64) -> Result<()> {
        self.expect_type(NodeType::Constant)?;
        self.payload = NodePayload::Constant(value);
        Ok(())
    }

    /// Value of a `constant` node
    pub fn constant(&self) -> Result<f64> {
        self.expect_type(NodeType::Constant)?;
        match self.payload {
            NodePayload::Constant(value) => Ok(value),
            _ => Err(self.unset()),
        }
    }

    /// Set the value of a `constvec` node
    pub fn set_vector(&mut self, value: Vector3) -> Result<()> {
        self.expect_type(NodeType::ConstVec)?;
        self.payload = NodePayload::Vector(value);
        Ok(())
    }

    /// Value of a `constvec` node
    pub fn vector(&self) -> Result<Vector3> {
        self.expect_type(NodeType::ConstVec)?;
        match self.payload {
            NodePayload::Vector(value) => Ok(value),
            _ => Err(self.unset()),
        }
    }

    /// Set the value of a `constmat` node
    pub fn set_matrix(&mut self, value: Matrix4) -> Result<()> {
        self.expect_type(NodeType::ConstMat)?;
        self.payload = NodePayload::Matrix(value);
        Ok(())
    }

    /// Value of a `constmat` node
    pub fn matrix(&self) -> Result<Matrix4> {
        self.expect_type(NodeType::ConstMat)?;
        match self.payload {
            NodePayload::Matrix(value) => Ok(value),
            _ => Err(self.unset()),
        }
    }

    /// Set the resource of a `constresourceid` node
    pub fn set_model_resource_id(&mut self, id: ResourceId) -> Result<()> {
        self.expect_type(NodeType::ConstResourceId)?;
        self.payload = NodePayload::ResourceId(id);
        Ok(())
    }

    /// Resource of a `constresourceid` node
    pub fn model_resource_id(&self) -> Result<ResourceId> {
        self.expect_type(NodeType::ConstResourceId)?;
        match self.payload {
            NodePayload::ResourceId(id) => Ok(id),
            _ => Err(self.unset()),
        }
    }
}
