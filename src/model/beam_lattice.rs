//! Beam Lattice extension types

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ErrorCode, Result};

use super::resources::ResourceId;

/// Beam cap mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeamCapMode {
    /// Spherical cap
    #[default]
    Sphere,
    /// Flat cap
    Butt,
    /// Half sphere cap
    Hemisphere,
}

impl fmt::Display for BeamCapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeamCapMode::Sphere => write!(f, "sphere"),
            BeamCapMode::Butt => write!(f, "butt"),
            BeamCapMode::Hemisphere => write!(f, "hemisphere"),
        }
    }
}

impl FromStr for BeamCapMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sphere" => Ok(BeamCapMode::Sphere),
            "butt" => Ok(BeamCapMode::Butt),
            "hemisphere" => Ok(BeamCapMode::Hemisphere),
            _ => Err(Error::model(
                ErrorCode::InvalidBeamLattice,
                format!("invalid cap mode '{}'", s),
            )),
        }
    }
}

/// A beam between two mesh vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Beam {
    /// First vertex
    pub v1: usize,
    /// Second vertex
    pub v2: usize,
    /// Radius at v1, lattice default when absent
    pub r1: Option<f64>,
    /// Radius at v2, r1 when absent
    pub r2: Option<f64>,
    /// Cap at v1
    pub cap1: Option<BeamCapMode>,
    /// Cap at v2
    pub cap2: Option<BeamCapMode>,
    /// Property group
    pub pid: Option<ResourceId>,
    /// Property index at v1
    pub p1: Option<usize>,
    /// Property index at v2
    pub p2: Option<usize>,
}

impl Beam {
    /// Create a beam with lattice defaults
    pub fn new(v1: usize, v2: usize) -> Self {
        Self {
            v1,
            v2,
            r1: None,
            r2: None,
            cap1: None,
            cap2: None,
            pid: None,
            p1: None,
            p2: None,
        }
    }
}

/// A ball on a mesh vertex
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    /// Vertex index
    pub vindex: usize,
    /// Radius, lattice ball radius when absent
    pub radius: Option<f64>,
    /// Property group
    pub pid: Option<ResourceId>,
    /// Property index
    pub pindex: Option<usize>,
}

/// Named set of beams and balls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeamSet {
    /// Name
    pub name: Option<String>,
    /// Identifier
    pub identifier: Option<String>,
    /// Beam indices
    pub beam_refs: Vec<usize>,
    /// Ball indices
    pub ball_refs: Vec<usize>,
}

/// Beam lattice attached to a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct BeamLattice {
    /// Default radius
    pub radius: f64,
    /// Minimum beam length
    pub min_length: f64,
    /// Default cap mode
    pub cap_mode: BeamCapMode,
    /// Clipping mode (`none`, `inside`, `outside`)
    pub clipping_mode: Option<String>,
    /// Clipping mesh object
    pub clipping_mesh: Option<ResourceId>,
    /// Representation mesh object
    pub representation_mesh: Option<ResourceId>,
    /// Ball mode (`none`, `mixed`, `all`)
    pub ball_mode: Option<String>,
    /// Default ball radius
    pub ball_radius: Option<f64>,
    /// Property group
    pub pid: Option<ResourceId>,
    /// Property index
    pub pindex: Option<usize>,
    /// Beams
    pub beams: Vec<Beam>,
    /// Balls
    pub balls: Vec<Ball>,
    /// Beam sets
    pub beam_sets: Vec<BeamSet>,
}

impl BeamLattice {
    /// Create a lattice with the given default radius and minimum length
    pub fn new(radius: f64, min_length: f64) -> Self {
        Self {
            radius,
            min_length,
            cap_mode: BeamCapMode::Sphere,
            clipping_mode: None,
            clipping_mesh: None,
            representation_mesh: None,
            ball_mode: None,
            ball_radius: None,
            pid: None,
            pindex: None,
            beams: Vec::new(),
            balls: Vec::new(),
            beam_sets: Vec::new(),
        }
    }
}
