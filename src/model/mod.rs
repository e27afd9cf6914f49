//! Data structures representing 3MF models

mod beam_lattice;
mod core;
mod document;
mod material;
mod metadata;
mod resources;
mod slice;
mod volumetric;

// Document root and configuration
pub use core::{
    Build, BuildItem, CORE_093_NAMESPACE, Component, DEFAULT_MAX_DEPTH, Extension, Mesh,
    MeshResolution, Object, ObjectContent, ObjectType, ParserConfig, ProgressCallback,
    ProgressStage, Triangle, Unit, Vertex, XML_NAMESPACE,
};
pub use document::{DEFAULT_LANGUAGE, Model, ROOT_MODEL_PATH};
pub use metadata::{DEFAULT_METADATA_TYPE, MetaData, MetaDataGroup};
pub use resources::{Attachment, PackageResourceId, Resource, ResourceId};

// Materials and properties
pub use material::{
    BaseMaterial, BaseMaterials, BlendMethod, ColorGroup, CompositeMaterials, FilterMode,
    MultiProperties, Tex2Coord, Texture2D, Texture2DGroup, TileStyle,
};

// Slices and beam lattices
pub use beam_lattice::{Ball, Beam, BeamCapMode, BeamLattice, BeamSet};
pub use slice::{Slice, SlicePolygon, SliceRef, SliceStack, Vertex2D};

// Volumetric data
pub use volumetric::{
    BoundaryShape, ChannelSelector, DEFAULT_BOUNDARY_CHANNEL, DstChannel, FieldReference,
    FunctionFromImage3D, Image3D, ImageSheet, VolumeData, VolumeDataBoundary, VolumeDataProperty,
    VolumetricLayer, VolumetricStack,
};
