//! Resource handles and the resource variants stored in a model

use std::fmt;

use crate::implicit::ImplicitFunction;

use super::core::Object;
use super::material::{
    BaseMaterials, ColorGroup, CompositeMaterials, MultiProperties, Texture2D, Texture2DGroup,
};
use super::slice::SliceStack;
use super::volumetric::{FunctionFromImage3D, Image3D, VolumeData, VolumetricStack};

/// Model-scoped unique resource handle
///
/// Handles are handed out by [`Model`](super::Model) in increasing order and
/// never reused, even after the resource is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u32);

impl ResourceId {
    /// Wrap a raw handle value
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw handle value
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a resource inside the package: part path plus the `id`
/// attribute it carries in that part
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageResourceId {
    /// Part path, e.g. `/3D/3dmodel.model`
    pub path: String,
    /// Id attribute within the part
    pub model_resource_id: u32,
    /// Model-scoped handle
    pub unique_id: ResourceId,
}

/// Any resource owned by a model
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// Mesh, components or boundary shape object
    Object(Object),
    /// Base materials group
    BaseMaterials(BaseMaterials),
    /// Color group
    ColorGroup(ColorGroup),
    /// 2D texture
    Texture2D(Texture2D),
    /// Texture coordinate group
    Texture2DGroup(Texture2DGroup),
    /// Composite materials
    CompositeMaterials(CompositeMaterials),
    /// Multi properties
    MultiProperties(MultiProperties),
    /// Slice stack
    SliceStack(SliceStack),
    /// Image stack
    Image3D(Image3D),
    /// Implicit node graph function
    ImplicitFunction(ImplicitFunction),
    /// Function sampling a 3D image
    FunctionFromImage3D(FunctionFromImage3D),
    /// Volumetric stack
    VolumetricStack(VolumetricStack),
    /// Volume data
    VolumeData(VolumeData),
}

impl Resource {
    /// Short kind name used in messages
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Object(_) => "object",
            Resource::BaseMaterials(_) => "basematerials",
            Resource::ColorGroup(_) => "colorgroup",
            Resource::Texture2D(_) => "texture2d",
            Resource::Texture2DGroup(_) => "texture2dgroup",
            Resource::CompositeMaterials(_) => "compositematerials",
            Resource::MultiProperties(_) => "multiproperties",
            Resource::SliceStack(_) => "slicestack",
            Resource::Image3D(_) => "imagestack",
            Resource::ImplicitFunction(_) => "implicitfunction",
            Resource::FunctionFromImage3D(_) => "functionfromimage3d",
            Resource::VolumetricStack(_) => "volumetricstack",
            Resource::VolumeData(_) => "volumedata",
        }
    }

    /// True for resources usable as a function
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Resource::ImplicitFunction(_) | Resource::FunctionFromImage3D(_)
        )
    }

    /// True for resources a triangle `pid` may point at
    pub fn is_property_group(&self) -> bool {
        matches!(
            self,
            Resource::BaseMaterials(_)
                | Resource::ColorGroup(_)
                | Resource::Texture2DGroup(_)
                | Resource::CompositeMaterials(_)
                | Resource::MultiProperties(_)
        )
    }

    /// Number of entries addressable by a property index
    pub fn property_count(&self) -> Option<usize> {
        match self {
            Resource::BaseMaterials(g) => Some(g.materials.len()),
            Resource::ColorGroup(g) => Some(g.colors.len()),
            Resource::Texture2DGroup(g) => Some(g.coords.len()),
            Resource::CompositeMaterials(g) => Some(g.composites.len()),
            Resource::MultiProperties(g) => Some(g.multis.len()),
            _ => None,
        }
    }

    /// Object, if this is one
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Resource::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Implicit function, if this is one
    pub fn as_implicit_function(&self) -> Option<&ImplicitFunction> {
        match self {
            Resource::ImplicitFunction(function) => Some(function),
            _ => None,
        }
    }
}

/// Non-XML payload stored in the package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Part path, starting with `/`
    pub path: String,
    /// Relationship type pointing at the part, empty if none
    pub relationship_type: String,
    /// Raw bytes
    pub data: Vec<u8>,
}

impl Attachment {
    /// Create an attachment
    pub fn new(
        path: impl Into<String>,
        relationship_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            path: path.into(),
            relationship_type: relationship_type.into(),
            data,
        }
    }
}
