//! Volumetric extension types
//!
//! Image stacks provide sampled 3D data, functions turn images or node graphs
//! into fields, and volume data / boundary shapes attach those fields to
//! objects.

use crate::codec::{IDENTITY_TRANSFORM, Transform};
use crate::implicit::{ImplicitPort, PortType};

use super::material::{BlendMethod, FilterMode, TileStyle};
use super::resources::ResourceId;

/// One depth slice of an image stack
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSheet {
    /// Attachment path of the image
    pub path: String,
    /// Value mapped from intensity 0
    pub min_value: f64,
    /// Value mapped from full intensity
    pub max_value: f64,
}

impl ImageSheet {
    /// Create a sheet with the default `0..1` range
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            min_value: 0.0,
            max_value: 1.0,
        }
    }
}

/// 3D image built from a stack of 2D sheets (`<v:imagestack>`)
#[derive(Debug, Clone, PartialEq)]
pub struct Image3D {
    /// Optional name
    pub name: Option<String>,
    /// Pixel rows per sheet
    pub row_count: u32,
    /// Pixel columns per sheet
    pub column_count: u32,
    /// Sheets, bottom to top
    pub sheets: Vec<ImageSheet>,
}

impl Image3D {
    /// Create an image stack with no sheets
    pub fn new(row_count: u32, column_count: u32) -> Self {
        Self {
            name: None,
            row_count,
            column_count,
            sheets: Vec::new(),
        }
    }

    /// Number of sheets
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }
}

/// Function sampling a 3D image (`<v:functionfromimage3d>` / `<i:functionfromimage3d>`)
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionFromImage3D {
    /// Optional display name
    pub display_name: Option<String>,
    /// Sampled image
    pub image: ResourceId,
    /// Offset added after scaling
    pub value_offset: f64,
    /// Scale applied to samples
    pub value_scale: f64,
    /// Tile style along u
    pub tile_style_u: TileStyle,
    /// Tile style along v
    pub tile_style_v: TileStyle,
    /// Tile style along w
    pub tile_style_w: TileStyle,
    /// Filter
    pub filter: FilterMode,
}

impl FunctionFromImage3D {
    /// Create a function with unit scale and no offset
    pub fn new(image: ResourceId) -> Self {
        Self {
            display_name: None,
            image,
            value_offset: 0.0,
            value_scale: 1.0,
            tile_style_u: TileStyle::Wrap,
            tile_style_v: TileStyle::Wrap,
            tile_style_w: TileStyle::Wrap,
            filter: FilterMode::Linear,
        }
    }

    /// Fixed input ports
    pub fn inputs(&self) -> Vec<ImplicitPort> {
        vec![ImplicitPort::new("pos", "position", PortType::Vector)]
    }

    /// Fixed output ports
    pub fn outputs(&self) -> Vec<ImplicitPort> {
        vec![
            ImplicitPort::new("color", "color", PortType::Vector),
            ImplicitPort::new("red", "red", PortType::Scalar),
            ImplicitPort::new("green", "green", PortType::Scalar),
            ImplicitPort::new("blue", "blue", PortType::Scalar),
            ImplicitPort::new("alpha", "alpha", PortType::Scalar),
        ]
    }
}

/// Destination channel of a volumetric stack
#[derive(Debug, Clone, PartialEq)]
pub struct DstChannel {
    /// Channel name
    pub name: String,
    /// Value before any layer is applied
    pub background: f64,
}

/// Selects one channel of a 3D image
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSelector {
    /// Source image
    pub image: ResourceId,
    /// Channel read from the image
    pub src_channel: String,
    /// Channel written in the stack
    pub dst_channel: String,
    /// Value for intensity 0
    pub min_value: f64,
    /// Value for full intensity
    pub max_value: f64,
    /// Tile style along u
    pub tile_style_u: TileStyle,
    /// Tile style along v
    pub tile_style_v: TileStyle,
    /// Tile style along w
    pub tile_style_w: TileStyle,
    /// Filter
    pub filter: FilterMode,
}

/// One layer of a volumetric stack
#[derive(Debug, Clone, PartialEq)]
pub struct VolumetricLayer {
    /// Transform into image space
    pub transform: Transform,
    /// Blend method
    pub blend_method: BlendMethod,
    /// Source alpha for `mix`
    pub src_alpha: Option<f64>,
    /// Destination alpha for `mix`
    pub dst_alpha: Option<f64>,
    /// Channel selectors
    pub channel_selectors: Vec<ChannelSelector>,
    /// Optional mask selector
    pub mask_selector: Option<ChannelSelector>,
}

impl VolumetricLayer {
    /// Create a layer without selectors
    pub fn new(transform: Transform, blend_method: BlendMethod) -> Self {
        Self {
            transform,
            blend_method,
            src_alpha: None,
            dst_alpha: None,
            channel_selectors: Vec::new(),
            mask_selector: None,
        }
    }
}

/// Volumetric stack (`<v:volumetricstack>`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumetricStack {
    /// Destination channels
    pub dst_channels: Vec<DstChannel>,
    /// Layers, applied in order
    pub layers: Vec<VolumetricLayer>,
}

impl VolumetricStack {
    /// Index of a destination channel by name
    pub fn dst_channel(&self, name: &str) -> Option<&DstChannel> {
        self.dst_channels.iter().find(|c| c.name == name)
    }
}

/// Function reference used by volume data elements
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReference {
    /// Function resource
    pub function: ResourceId,
    /// Transform into function space
    pub transform: Transform,
    /// Output port of the function
    pub channel: String,
}

impl FieldReference {
    /// Reference a function output without transform
    pub fn new(function: ResourceId, channel: impl Into<String>) -> Self {
        Self {
            function,
            transform: IDENTITY_TRANSFORM,
            channel: channel.into(),
        }
    }
}

/// Named property field of volume data
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeDataProperty {
    /// Property name
    pub name: String,
    /// Field
    pub field: FieldReference,
    /// Consumers must understand the property
    pub required: bool,
}

/// Levelset boundary of volume data
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeDataBoundary {
    /// Field
    pub field: FieldReference,
    /// Threshold separating inside and outside
    pub solid_threshold: f64,
}

/// Volume data (`<v:volumedata>`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeData {
    /// Color field
    pub color: Option<FieldReference>,
    /// Property fields
    pub properties: Vec<VolumeDataProperty>,
    /// Boundary field
    pub boundary: Option<VolumeDataBoundary>,
}

impl VolumeData {
    /// Property by name
    pub fn property(&self, name: &str) -> Option<&VolumeDataProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Default channel of a boundary shape
pub const DEFAULT_BOUNDARY_CHANNEL: &str = "shape";

/// Object geometry defined by a function levelset (`<levelset>`)
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryShape {
    /// Function resource
    pub function: ResourceId,
    /// Output port of the function
    pub channel: String,
    /// Transform into function space
    pub transform: Transform,
    /// Smallest feature the consumer must resolve
    pub min_feature_size: f64,
    /// Only the mesh bounding box limits evaluation
    pub mesh_bbox_only: bool,
    /// Value used where the function is undefined
    pub fallback_value: f64,
    /// Mesh object bounding the evaluation domain
    pub mesh: Option<ResourceId>,
    /// Volume data attached to the shape
    pub volume_data: Option<ResourceId>,
}

impl BoundaryShape {
    /// Create a shape on the default channel
    pub fn new(function: ResourceId) -> Self {
        Self {
            function,
            channel: DEFAULT_BOUNDARY_CHANNEL.to_string(),
            transform: IDENTITY_TRANSFORM,
            min_feature_size: 0.0,
            mesh_bbox_only: true,
            fallback_value: 0.0,
            mesh: None,
            volume_data: None,
        }
    }
}
