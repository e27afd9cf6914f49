//! Element classification table
//!
//! Maps a namespace and local name to the closed set of elements the
//! readers understand. Readers match on [`ElementKind`] for the children
//! they accept and skip everything else.

use crate::implicit::{NodeType, PortType};
use crate::model::{CORE_093_NAMESPACE, Extension};

/// Known 3MF element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    // core
    Model,
    Resources,
    Build,
    Item,
    Metadata,
    MetadataGroup,
    Object,
    Mesh,
    Vertices,
    Vertex,
    Triangles,
    Triangle,
    Components,
    Component,
    BaseMaterials,
    Base,
    // materials
    ColorGroup,
    Color,
    Texture2D,
    Texture2DGroup,
    Tex2Coord,
    CompositeMaterials,
    Composite,
    MultiProperties,
    Multi,
    // slices
    SliceStack,
    Slice,
    SliceRef,
    SliceVertices,
    SliceVertex,
    Polygon,
    Segment,
    // beam lattice
    BeamLattice,
    Beams,
    Beam,
    Balls,
    Ball,
    BeamSets,
    BeamSet,
    BeamRef,
    BallRef,
    // volumetric
    ImageStack,
    ImageSheet,
    FunctionFromImage3D,
    VolumetricStack,
    DstChannel,
    VolumetricLayer,
    ChannelSelector,
    MaskChannelSelector,
    VolumeData,
    VolumeColor,
    VolumeProperty,
    VolumeBoundary,
    BoundaryShape,
    // implicit
    ImplicitFunction,
    PortsIn,
    PortsOut,
    Port(PortType, bool),
    Node(NodeType),
}

/// Classify an element by namespace and local name
pub fn element_kind(namespace: &str, local_name: &str) -> Option<ElementKind> {
    use ElementKind as K;

    let extension = if namespace == CORE_093_NAMESPACE {
        Extension::Core
    } else {
        Extension::from_namespace(namespace)?
    };

    let kind = match (extension, local_name) {
        (Extension::Core, "model") => K::Model,
        (Extension::Core, "resources") => K::Resources,
        (Extension::Core, "build") => K::Build,
        (Extension::Core, "item") => K::Item,
        (Extension::Core, "metadata") => K::Metadata,
        (Extension::Core, "metadatagroup") => K::MetadataGroup,
        (Extension::Core, "object") => K::Object,
        (Extension::Core, "mesh") => K::Mesh,
        (Extension::Core, "vertices") => K::Vertices,
        (Extension::Core, "vertex") => K::Vertex,
        (Extension::Core, "triangles") => K::Triangles,
        (Extension::Core, "triangle") => K::Triangle,
        (Extension::Core, "components") => K::Components,
        (Extension::Core, "component") => K::Component,
        (Extension::Core, "basematerials") => K::BaseMaterials,
        (Extension::Core, "base") => K::Base,

        (Extension::Material, "colorgroup") => K::ColorGroup,
        (Extension::Material, "color") => K::Color,
        (Extension::Material, "texture2d") => K::Texture2D,
        (Extension::Material, "texture2dgroup") => K::Texture2DGroup,
        (Extension::Material, "tex2coord") => K::Tex2Coord,
        (Extension::Material, "compositematerials") => K::CompositeMaterials,
        (Extension::Material, "composite") => K::Composite,
        (Extension::Material, "multiproperties") => K::MultiProperties,
        (Extension::Material, "multi") => K::Multi,

        (Extension::Slice, "slicestack") => K::SliceStack,
        (Extension::Slice, "slice") => K::Slice,
        (Extension::Slice, "sliceref") => K::SliceRef,
        (Extension::Slice, "vertices") => K::SliceVertices,
        (Extension::Slice, "vertex") => K::SliceVertex,
        (Extension::Slice, "polygon") => K::Polygon,
        (Extension::Slice, "segment") => K::Segment,

        (Extension::BeamLattice, "beamlattice") => K::BeamLattice,
        (Extension::BeamLattice, "beams") => K::Beams,
        (Extension::BeamLattice, "beam") => K::Beam,
        (Extension::BeamLattice, "balls") => K::Balls,
        (Extension::BeamLattice, "ball") => K::Ball,
        (Extension::BeamLattice, "beamsets") => K::BeamSets,
        (Extension::BeamLattice, "beamset") => K::BeamSet,
        (Extension::BeamLattice, "ref") => K::BeamRef,
        (Extension::BeamLattice, "ballref") => K::BallRef,

        (Extension::Volumetric, "imagestack") => K::ImageStack,
        (Extension::Volumetric, "imagesheet") => K::ImageSheet,
        (Extension::Volumetric, "functionfromimage3d") => K::FunctionFromImage3D,
        (Extension::Volumetric, "volumetricstack") => K::VolumetricStack,
        (Extension::Volumetric, "dstchannel") => K::DstChannel,
        (Extension::Volumetric, "volumetriclayer") => K::VolumetricLayer,
        (Extension::Volumetric, "channelselector") => K::ChannelSelector,
        (Extension::Volumetric, "maskchannelselector") => K::MaskChannelSelector,
        (Extension::Volumetric, "volumedata") => K::VolumeData,
        (Extension::Volumetric, "color") => K::VolumeColor,
        (Extension::Volumetric, "property") => K::VolumeProperty,
        (Extension::Volumetric, "boundary") => K::VolumeBoundary,
        (Extension::Volumetric, "levelset" | "boundaryshape") => K::BoundaryShape,

        (Extension::Implicit, "implicitfunction") => K::ImplicitFunction,
        (Extension::Implicit, "functionfromimage3d") => K::FunctionFromImage3D,
        (Extension::Implicit, "in") => K::PortsIn,
        (Extension::Implicit, "out") => K::PortsOut,
        (Extension::Implicit, name) => {
            if let Some((port_type, is_ref)) = PortType::from_element_name(name) {
                K::Port(port_type, is_ref)
            } else {
                K::Node(NodeType::from_xml_name(name)?)
            }
        }

        _ => return None,
    };
    Some(kind)
}
