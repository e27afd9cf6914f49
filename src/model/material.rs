//! Material extension types

use std::fmt;
use std::str::FromStr;

use crate::codec::Color;
use crate::error::{Error, ErrorCode, Result};

use super::resources::ResourceId;

/// A base material with name and display color
#[derive(Debug, Clone, PartialEq)]
pub struct BaseMaterial {
    /// Material name
    pub name: String,
    /// Display color
    pub display_color: Color,
}

impl BaseMaterial {
    /// Create a base material
    pub fn new(name: impl Into<String>, display_color: Color) -> Self {
        Self {
            name: name.into(),
            display_color,
        }
    }
}

/// Base materials group (`<basematerials>`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseMaterials {
    /// Materials, addressed by index
    pub materials: Vec<BaseMaterial>,
}

/// Color group (`<m:colorgroup>`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorGroup {
    /// Colors, addressed by index
    pub colors: Vec<Color>,
}

/// Texture tile style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileStyle {
    /// Repeat the texture
    #[default]
    Wrap,
    /// Mirror the texture
    Mirror,
    /// Clamp to edge pixels
    Clamp,
    /// Treat samples outside the texture as empty
    None,
}

impl fmt::Display for TileStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TileStyle::Wrap => "wrap",
            TileStyle::Mirror => "mirror",
            TileStyle::Clamp => "clamp",
            TileStyle::None => "none",
        })
    }
}

impl FromStr for TileStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wrap" => Ok(TileStyle::Wrap),
            "mirror" => Ok(TileStyle::Mirror),
            "clamp" => Ok(TileStyle::Clamp),
            "none" => Ok(TileStyle::None),
            _ => Err(Error::model(
                ErrorCode::InvalidTileStyle,
                format!("unknown tile style '{}'", s),
            )),
        }
    }
}

/// Texture filter mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Auto select best quality
    #[default]
    Auto,
    /// Bilinear interpolation
    Linear,
    /// Nearest neighbor
    Nearest,
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterMode::Auto => "auto",
            FilterMode::Linear => "linear",
            FilterMode::Nearest => "nearest",
        })
    }
}

impl FromStr for FilterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(FilterMode::Auto),
            "linear" => Ok(FilterMode::Linear),
            "nearest" => Ok(FilterMode::Nearest),
            _ => Err(Error::model(
                ErrorCode::InvalidFilter,
                format!("unknown filter '{}'", s),
            )),
        }
    }
}

/// 2D texture (`<m:texture2d>`)
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2D {
    /// Attachment path
    pub path: String,
    /// Content type, e.g. `image/png`
    pub content_type: String,
    /// Tile style along u
    pub tile_style_u: TileStyle,
    /// Tile style along v
    pub tile_style_v: TileStyle,
    /// Filter
    pub filter: FilterMode,
}

impl Texture2D {
    /// Create a texture with default tiling and filter
    pub fn new(path: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
            tile_style_u: TileStyle::Wrap,
            tile_style_v: TileStyle::Wrap,
            filter: FilterMode::Auto,
        }
    }
}

/// Texture coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tex2Coord {
    /// U coordinate
    pub u: f64,
    /// V coordinate
    pub v: f64,
}

/// Texture coordinate group (`<m:texture2dgroup>`)
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2DGroup {
    /// Texture resource
    pub texture: ResourceId,
    /// Coordinates, addressed by index
    pub coords: Vec<Tex2Coord>,
}

/// Composite materials (`<m:compositematerials>`)
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeMaterials {
    /// Base materials group
    pub base_materials: ResourceId,
    /// Indices into the base materials group
    pub mat_indices: Vec<usize>,
    /// Mixing ratios, one value per index
    pub composites: Vec<Vec<f64>>,
}

/// Multi-property blend method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMethod {
    /// Linear interpolation
    #[default]
    Mix,
    /// Multiplication
    Multiply,
}

impl fmt::Display for BlendMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlendMethod::Mix => "mix",
            BlendMethod::Multiply => "multiply",
        })
    }
}

impl FromStr for BlendMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mix" => Ok(BlendMethod::Mix),
            "multiply" => Ok(BlendMethod::Multiply),
            _ => Err(Error::model(
                ErrorCode::InvalidBlendMethod,
                format!("unknown blend method '{}'", s),
            )),
        }
    }
}

/// Multi properties (`<m:multiproperties>`)
#[derive(Debug, Clone, PartialEq)]
pub struct MultiProperties {
    /// Layered property groups
    pub pids: Vec<ResourceId>,
    /// Blend method between consecutive layers
    pub blend_methods: Vec<BlendMethod>,
    /// Index tuples, one index per layer
    pub multis: Vec<Vec<usize>>,
}
