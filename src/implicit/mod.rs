//! Implicit function graphs
//!
//! An [`ImplicitFunction`] owns typed nodes whose inputs reference the
//! outputs feeding them. The module provides the structural queries a
//! consumer needs before evaluating a function: topological order, cycle
//! detection and link type checks. Evaluation itself is left to consumers.

mod function;
mod node;
mod node_types;

pub use function::{ImplicitFunction, INPUTS_OWNER, Link, OUTPUTS_OWNER, PortRef, TypeViolation};
pub use node::{ImplicitNode, ImplicitPort, NodePayload};
pub use node_types::{NodeConfiguration, NodeRule, NodeType, PortSpec, PortType};
