//! Fixed node type table
//!
//! Every node type lists one or more port rules. A rule names a
//! configuration and the identifiers and value types of the inputs and
//! outputs a node of that type carries under it.

use std::fmt;

use crate::error::{Error, ErrorCode, Result};

/// Value type carried by a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortType {
    /// Single number
    Scalar,
    /// Three numbers
    Vector,
    /// 4x4 matrix
    Matrix,
    /// Model resource id
    ResourceId,
}

impl PortType {
    /// Element name declaring a port of this type
    pub fn element_name(&self) -> &'static str {
        match self {
            PortType::Scalar => "scalar",
            PortType::Vector => "vector",
            PortType::Matrix => "matrix",
            PortType::ResourceId => "resourceid",
        }
    }

    /// Element name of a referencing input port of this type
    pub fn reference_element_name(&self) -> &'static str {
        match self {
            PortType::Scalar => "scalarref",
            PortType::Vector => "vectorref",
            PortType::Matrix => "matrixref",
            PortType::ResourceId => "resourceref",
        }
    }

    /// Parse either element name form, returning the type and whether it is a reference
    pub fn from_element_name(name: &str) -> Option<(PortType, bool)> {
        [
            PortType::Scalar,
            PortType::Vector,
            PortType::Matrix,
            PortType::ResourceId,
        ]
        .into_iter()
        .find_map(|t| {
            if t.element_name() == name {
                Some((t, false))
            } else if t.reference_element_name() == name {
                Some((t, true))
            } else {
                None
            }
        })
    }

    /// Whether a value of type `self` may feed a port of type `target`
    ///
    /// No implicit conversions exist, so only identical types are compatible.
    pub fn can_feed(&self, target: PortType) -> bool {
        *self == target
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Port layout variant of a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeConfiguration {
    /// First rule listed for the type
    #[default]
    Default,
    /// Scalar inputs and outputs
    ScalarToScalar,
    /// Vector inputs and outputs
    VectorToVector,
    /// Matrix inputs and outputs
    MatrixToMatrix,
}

/// Identifier and type of one port in a rule
pub type PortSpec = (&'static str, PortType);

/// Port layout of a node type under one configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRule {
    /// Configuration the rule belongs to
    pub configuration: NodeConfiguration,
    /// Input ports
    pub inputs: Vec<PortSpec>,
    /// Output ports
    pub outputs: Vec<PortSpec>,
}

impl NodeRule {
    fn new(configuration: NodeConfiguration, inputs: &[PortSpec], outputs: &[PortSpec]) -> Self {
        Self {
            configuration,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        }
    }
}

macro_rules! node_types {
    ($($variant:ident => $name:literal,)*) => {
        /// Kind of an implicit node
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeType {
            $(
                #[doc = concat!("`<", $name, ">`")]
                $variant,
            )*
        }

        impl NodeType {
            /// All node types
            pub const ALL: &'static [NodeType] = &[$(NodeType::$variant,)*];

            /// XML element name
            pub fn xml_name(&self) -> &'static str {
                match self {
                    $(NodeType::$variant => $name,)*
                }
            }

            /// Look up a node type by its XML element name
            pub fn from_xml_name(name: &str) -> Option<NodeType> {
                match name {
                    $($name => Some(NodeType::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

node_types! {
    Addition => "addition",
    Subtraction => "subtraction",
    Multiplication => "multiplication",
    Division => "division",
    Constant => "constant",
    ConstVec => "constvec",
    ConstMat => "constmat",
    ComposeVector => "composevector",
    DecomposeVector => "decomposevector",
    ComposeMatrix => "composematrix",
    MatrixFromColumns => "matrixfromcolumns",
    MatrixFromRows => "matrixfromrows",
    Dot => "dot",
    Cross => "cross",
    MatVecMultiplication => "matvecmultiplication",
    Transpose => "transpose",
    Inverse => "inverse",
    Sin => "sin",
    Cos => "cos",
    Tan => "tan",
    ArcSin => "asin",
    ArcCos => "acos",
    ArcTan => "atan",
    ArcTan2 => "atan2",
    Min => "min",
    Max => "max",
    Abs => "abs",
    Fmod => "fmod",
    Mod => "mod",
    Pow => "pow",
    Sqrt => "sqrt",
    Exp => "exp",
    Log => "log",
    Log2 => "log2",
    Log10 => "log10",
    Select => "select",
    Clamp => "clamp",
    Cosh => "cosh",
    Sinh => "sinh",
    Tanh => "tanh",
    Round => "round",
    Ceil => "ceil",
    Floor => "floor",
    Sign => "sign",
    Fract => "fract",
    FunctionCall => "functioncall",
    Mesh => "mesh",
    UnsignedMesh => "unsignedmesh",
    Length => "length",
    ConstResourceId => "constresourceid",
    VectorFromScalar => "vectorfromscalar",
}

const SAME_DIMENSION_CONFIGURATIONS: [(NodeConfiguration, PortType); 3] = [
    (NodeConfiguration::ScalarToScalar, PortType::Scalar),
    (NodeConfiguration::VectorToVector, PortType::Vector),
    (NodeConfiguration::MatrixToMatrix, PortType::Matrix),
];

fn same_dimension_rules(inputs: &[&'static str]) -> Vec<NodeRule> {
    SAME_DIMENSION_CONFIGURATIONS
        .iter()
        .map(|(configuration, port_type)| NodeRule {
            configuration: *configuration,
            inputs: inputs.iter().map(|name| (*name, *port_type)).collect(),
            outputs: vec![("result", *port_type)],
        })
        .collect()
}

const COMPOSE_MATRIX_INPUTS: [PortSpec; 16] = [
    ("m00", PortType::Scalar),
    ("m01", PortType::Scalar),
    ("m02", PortType::Scalar),
    ("m03", PortType::Scalar),
    ("m10", PortType::Scalar),
    ("m11", PortType::Scalar),
    ("m12", PortType::Scalar),
    ("m13", PortType::Scalar),
    ("m20", PortType::Scalar),
    ("m21", PortType::Scalar),
    ("m22", PortType::Scalar),
    ("m23", PortType::Scalar),
    ("m30", PortType::Scalar),
    ("m31", PortType::Scalar),
    ("m32", PortType::Scalar),
    ("m33", PortType::Scalar),
];

impl NodeType {
    /// Port rules of this type, the default rule first
    pub fn rules(&self) -> Vec<NodeRule> {
        use NodeConfiguration::Default as D;
        use NodeType::*;
        use PortType::{Matrix as M, ResourceId as R, Scalar as S, Vector as V};

        match self {
            Addition | Subtraction | Multiplication | Division | ArcTan2 | Min | Max | Fmod
            | Mod | Pow => same_dimension_rules(&["A", "B"]),
            Sin | Cos | Tan | ArcSin | ArcCos | ArcTan | Abs | Sqrt | Exp | Log | Log2
            | Log10 | Cosh | Sinh | Tanh | Round | Ceil | Floor | Sign | Fract => {
                same_dimension_rules(&["A"])
            }
            Select => same_dimension_rules(&["A", "B", "C", "D"]),
            Clamp => same_dimension_rules(&["A", "min", "max"]),
            Constant => vec![NodeRule::new(D, &[], &[("value", S)])],
            ConstVec => vec![NodeRule::new(D, &[], &[("vector", V)])],
            ConstMat => vec![NodeRule::new(D, &[], &[("matrix", M)])],
            ComposeVector => vec![NodeRule::new(
                D,
                &[("x", S), ("y", S), ("z", S)],
                &[("result", V)],
            )],
            DecomposeVector => vec![NodeRule::new(
                D,
                &[("A", V)],
                &[("x", S), ("y", S), ("z", S)],
            )],
            ComposeMatrix => vec![NodeRule::new(D, &COMPOSE_MATRIX_INPUTS, &[("result", M)])],
            MatrixFromColumns | MatrixFromRows => vec![NodeRule::new(
                D,
                &[("A", V), ("B", V), ("C", V), ("D", V)],
                &[("result", M)],
            )],
            Dot => vec![NodeRule::new(D, &[("A", V), ("B", V)], &[("result", S)])],
            Cross => vec![NodeRule::new(D, &[("A", V), ("B", V)], &[("result", V)])],
            MatVecMultiplication => {
                vec![NodeRule::new(D, &[("A", M), ("B", V)], &[("result", V)])]
            }
            Transpose | Inverse => vec![NodeRule::new(D, &[("A", M)], &[("result", M)])],
            Length => vec![NodeRule::new(D, &[("A", V)], &[("result", S)])],
            VectorFromScalar => vec![NodeRule::new(D, &[("A", S)], &[("result", V)])],
            ConstResourceId => vec![NodeRule::new(D, &[], &[("value", R)])],
            Mesh | UnsignedMesh => vec![NodeRule::new(
                D,
                &[("pos", V), ("mesh", R)],
                &[("distance", S)],
            )],
            FunctionCall => vec![NodeRule::new(D, &[("functionID", R)], &[])],
        }
    }

    /// Rule selected by `configuration`
    ///
    /// `Default` selects the first rule. Types with a single rule accept no
    /// other configuration; any configuration the type does not list fails
    /// with `InvalidNodeConfiguration`.
    pub fn rule(&self, configuration: NodeConfiguration) -> Result<NodeRule> {
        let mut rules = self.rules();
        if configuration == NodeConfiguration::Default {
            return Ok(rules.swap_remove(0));
        }
        rules
            .into_iter()
            .find(|rule| rule.configuration == configuration)
            .ok_or_else(|| {
                Error::model(
                    ErrorCode::InvalidNodeConfiguration,
                    format!(
                        "node type '{}' has no {:?} configuration",
                        self.xml_name(),
                        configuration
                    ),
                )
            })
    }

    /// True if nodes of this type carry user defined ports besides the rule's
    pub fn has_free_ports(&self) -> bool {
        matches!(self, NodeType::FunctionCall)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xml_name())
    }
}
