//! Implicit function graph
//!
//! Links are stored on the consuming side: a node input (or function output)
//! references the port feeding it as `"node.port"`, or `"inputs.port"` for
//! function inputs. All graph queries are derived from those references.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, ErrorCode, Result};
use crate::model::ResourceId;

use super::node::{ImplicitNode, ImplicitPort, NodePayload, add_port, split_reference};
use super::node_types::{NodeConfiguration, NodeType, PortType};

/// Owner name addressing the function's own inputs in references
pub const INPUTS_OWNER: &str = "inputs";

/// Owner name addressing the function's own outputs in link targets
pub const OUTPUTS_OWNER: &str = "outputs";

/// Address of a port inside a function
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    /// Node identifier, or `inputs` / `outputs`
    pub owner: String,
    /// Port identifier
    pub port: String,
}

impl PortRef {
    /// Address a port
    pub fn new(owner: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            port: port.into(),
        }
    }

    /// Parse `"owner.port"`
    pub fn parse(text: &str) -> Result<Self> {
        let (owner, port) = split_reference(text).ok_or_else(|| {
            Error::model(
                ErrorCode::InvalidParam,
                format!("'{}' is not of the form node.port", text),
            )
        })?;
        Ok(Self::new(owner, port))
    }

    pub(crate) fn reference(&self) -> String {
        format!("{}.{}", self.owner, self.port)
    }
}

/// Directed edge from an output to an input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Feeding port
    pub source: PortRef,
    /// Consuming port
    pub target: PortRef,
}

/// Link whose endpoints disagree on the value type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeViolation {
    /// Consuming port
    pub target: PortRef,
    /// Reference text of the feeding port
    pub source: String,
    /// Type of the consuming port
    pub expected: PortType,
    /// Type of the feeding port, `None` if the reference does not resolve
    pub found: Option<PortType>,
}

/// Function defined by a node graph (`<i:implicitfunction>`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImplicitFunction {
    /// Identifier attribute
    pub identifier: String,
    /// Display name
    pub display_name: String,
    /// Function inputs
    pub inputs: Vec<ImplicitPort>,
    /// Function outputs, each referencing the node output it returns
    pub outputs: Vec<ImplicitPort>,
    nodes: Vec<ImplicitNode>,
}

impl ImplicitFunction {
    /// Create an empty function
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// Add a node with the ports of the rule selected by `configuration`
    pub fn add_node(
        &mut self,
        node_type: NodeType,
        identifier: &str,
        configuration: NodeConfiguration,
        display_name: &str,
        tag: &str,
    ) -> Result<&mut ImplicitNode> {
        if identifier.is_empty() {
            return Err(Error::model(
                ErrorCode::MissingIdentifier,
                format!("{} node has no identifier", node_type),
            ));
        }
        if identifier == INPUTS_OWNER || identifier == OUTPUTS_OWNER || identifier.contains('.') {
            return Err(Error::model(
                ErrorCode::InvalidParam,
                format!("'{}' cannot be used as node identifier", identifier),
            ));
        }
        if self.node(identifier).is_some() {
            return Err(Error::model(
                ErrorCode::DuplicateIdentifier,
                format!("function already has a node '{}'", identifier),
            ));
        }
        let mut node = ImplicitNode::new(node_type, identifier, configuration)?;
        node.display_name = display_name.to_string();
        node.tag = tag.to_string();
        self.nodes.push(node);
        let last = self.nodes.len() - 1;
        Ok(&mut self.nodes[last])
    }

    /// Add a function input
    pub fn add_input(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        port_type: PortType,
    ) -> Result<&mut ImplicitPort> {
        let port = ImplicitPort::new(identifier, display_name, port_type);
        add_port(&mut self.inputs, INPUTS_OWNER, port)
    }

    /// Add a function output
    pub fn add_output(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        port_type: PortType,
    ) -> Result<&mut ImplicitPort> {
        let port = ImplicitPort::new(identifier, display_name, port_type);
        add_port(&mut self.outputs, OUTPUTS_OWNER, port)
    }

    /// Nodes in storage order
    pub fn nodes(&self) -> &[ImplicitNode] {
        &self.nodes
    }

    /// Node by identifier
    pub fn node(&self, identifier: &str) -> Option<&ImplicitNode> {
        self.nodes.iter().find(|n| n.identifier == identifier)
    }

    /// Mutable node by identifier
    pub fn node_mut(&mut self, identifier: &str) -> Option<&mut ImplicitNode> {
        self.nodes.iter_mut().find(|n| n.identifier == identifier)
    }

    /// Function input by identifier
    pub fn input(&self, identifier: &str) -> Option<&ImplicitPort> {
        self.inputs.iter().find(|p| p.identifier == identifier)
    }

    /// Function output by identifier
    pub fn output(&self, identifier: &str) -> Option<&ImplicitPort> {
        self.outputs.iter().find(|p| p.identifier == identifier)
    }

    /// Port feeding a reference: a node output or a function input
    pub fn resolve_source(&self, reference: &str) -> Option<&ImplicitPort> {
        let (owner, port) = split_reference(reference)?;
        if owner == INPUTS_OWNER {
            self.input(port)
        } else {
            self.node(owner)?.output(port)
        }
    }

    fn target_port_mut(&mut self, target: &PortRef) -> Option<&mut ImplicitPort> {
        if target.owner == OUTPUTS_OWNER {
            self.outputs.iter_mut().find(|p| p.identifier == target.port)
        } else {
            self.node_mut(&target.owner)?.input_mut(&target.port)
        }
    }

    /// Link an output (or function input) to an input (or function output)
    ///
    /// Replaces any previous link into `target`. Fails with `InvalidParam`
    /// when either end does not name an existing port.
    pub fn add_link(&mut self, source: &PortRef, target: &PortRef) -> Result<()> {
        let reference = source.reference();
        if self.resolve_source(&reference).is_none() {
            return Err(Error::model(
                ErrorCode::InvalidParam,
                format!("link source '{}' does not exist", reference),
            ));
        }
        let port = self.target_port_mut(target).ok_or_else(|| {
            Error::model(
                ErrorCode::InvalidParam,
                format!("link target '{}' does not exist", target.reference()),
            )
        })?;
        port.reference = Some(reference);
        Ok(())
    }

    /// [`add_link`](Self::add_link) with `"owner.port"` names
    pub fn add_link_by_names(&mut self, source: &str, target: &str) -> Result<()> {
        let source = PortRef::parse(source)?;
        let target = PortRef::parse(target)?;
        self.add_link(&source, &target)
    }

    /// All links, in node order followed by function outputs
    pub fn links(&self) -> Vec<Link> {
        let node_inputs = self.nodes.iter().flat_map(|node| {
            node.inputs
                .iter()
                .map(move |port| (node.identifier.as_str(), port))
        });
        let function_outputs = self.outputs.iter().map(|port| (OUTPUTS_OWNER, port));
        node_inputs
            .chain(function_outputs)
            .filter_map(|(owner, port)| {
                let (src_owner, src_port) = port.reference_parts()?;
                Some(Link {
                    source: PortRef::new(src_owner, src_port),
                    target: PortRef::new(owner, port.identifier.as_str()),
                })
            })
            .collect()
    }

    /// Remove a node and every reference to it
    ///
    /// Inputs of other nodes and function outputs that referenced the node
    /// are left unlinked.
    pub fn remove_node(&mut self, identifier: &str) -> Result<ImplicitNode> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.identifier == identifier)
            .ok_or_else(|| {
                Error::model(
                    ErrorCode::InvalidParam,
                    format!("function has no node '{}'", identifier),
                )
            })?;
        let removed = self.nodes.remove(index);
        let ports = self
            .nodes
            .iter_mut()
            .flat_map(|n| n.inputs.iter_mut())
            .chain(self.outputs.iter_mut());
        for port in ports {
            if port.reference_parts().map(|(owner, _)| owner) == Some(identifier) {
                port.reference = None;
            }
        }
        debug!(node = identifier, "removed implicit node");
        Ok(removed)
    }

    /// Remove all nodes; function ports stay but lose their links
    pub fn clear(&mut self) {
        self.nodes.clear();
        for port in &mut self.outputs {
            port.reference = None;
        }
    }

    /// Node identifiers ordered so that every node follows the nodes it consumes
    ///
    /// References to unknown nodes are ignored here; they show up in
    /// [`type_violations`](Self::type_violations). A cycle fails with
    /// `CyclicGraph` naming a node on it.
    pub fn sort_nodes_topologically(&self) -> Result<Vec<&str>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let index: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.identifier.as_str(), i))
            .collect();
        let dependencies: Vec<Vec<usize>> = self
            .nodes
            .iter()
            .map(|node| {
                node.inputs
                    .iter()
                    .filter_map(|port| port.reference_parts())
                    .filter_map(|(owner, _)| index.get(owner).copied())
                    .collect()
            })
            .collect();

        let mut marks = vec![Mark::New; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        for start in 0..self.nodes.len() {
            if marks[start] != Mark::New {
                continue;
            }
            marks[start] = Mark::Active;
            let mut stack = vec![(start, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (node, next) = *top;
                if let Some(&dependency) = dependencies[node].get(next) {
                    top.1 += 1;
                    match marks[dependency] {
                        Mark::New => {
                            marks[dependency] = Mark::Active;
                            stack.push((dependency, 0));
                        }
                        Mark::Active => {
                            return Err(Error::model(
                                ErrorCode::CyclicGraph,
                                format!(
                                    "node '{}' depends on itself",
                                    self.nodes[dependency].identifier
                                ),
                            ));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    order.push(self.nodes[node].identifier.as_str());
                    stack.pop();
                }
            }
        }
        Ok(order)
    }

    /// Links whose endpoint types differ, plus dangling references
    pub fn type_violations(&self) -> Vec<TypeViolation> {
        let targets = self
            .nodes
            .iter()
            .flat_map(|node| {
                node.inputs
                    .iter()
                    .map(move |port| (node.identifier.as_str(), port))
            })
            .chain(self.outputs.iter().map(|port| (OUTPUTS_OWNER, port)));

        targets
            .filter_map(|(owner, port)| {
                let reference = port.reference.as_deref()?;
                let found = self.resolve_source(reference).map(|p| p.port_type);
                if found.is_some_and(|t| t.can_feed(port.port_type)) {
                    return None;
                }
                Some(TypeViolation {
                    target: PortRef::new(owner, port.identifier.as_str()),
                    source: reference.to_string(),
                    expected: port.port_type,
                    found,
                })
            })
            .collect()
    }

    /// True if every link connects ports of the same type
    pub fn are_types_valid(&self) -> bool {
        self.type_violations().is_empty()
    }

    /// True if every node's ports match a rule of its type
    pub fn are_ports_valid(&self) -> bool {
        self.nodes.iter().all(ImplicitNode::are_ports_valid)
    }

    /// Resource fed into `input` of `node` by a `constresourceid` node
    pub fn resource_feeding(&self, node: &ImplicitNode, input: &str) -> Option<ResourceId> {
        let (owner, _) = node.input(input)?.reference_parts()?;
        match self.node(owner)?.payload() {
            NodePayload::ResourceId(id) => Some(id),
            _ => None,
        }
    }

    /// Functions invoked by `functioncall` nodes
    pub fn called_functions(&self) -> Vec<ResourceId> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == NodeType::FunctionCall)
            .filter_map(|n| self.resource_feeding(n, "functionID"))
            .collect()
    }

    /// Mesh objects sampled by `mesh` and `unsignedmesh` nodes
    pub fn referenced_meshes(&self) -> Vec<ResourceId> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.node_type, NodeType::Mesh | NodeType::UnsignedMesh))
            .filter_map(|n| self.resource_feeding(n, "mesh"))
            .collect()
    }
}
