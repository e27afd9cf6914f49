//! Core 3MF types and structures

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::codec::{IDENTITY_TRANSFORM, Transform};
use crate::error::{Error, ErrorCode, Result};
use crate::warnings::{DEFAULT_MAX_WARNINGS, WarningLevel, Warnings};

use super::beam_lattice::BeamLattice;
use super::metadata::MetaDataGroup;
use super::resources::ResourceId;
use super::volumetric::BoundaryShape;

/// Namespace of the 2013/01 (0.9.3) core specification
pub const CORE_093_NAMESPACE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01";

/// Namespace bound to the reserved `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// 3MF extension specification
///
/// Represents the official 3MF extensions this crate reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Extension {
    /// Core 3MF specification (always required)
    Core,
    /// Materials & Properties Extension
    Material,
    /// Production Extension
    Production,
    /// Slice Extension
    Slice,
    /// Beam Lattice Extension
    BeamLattice,
    /// Volumetric Extension
    Volumetric,
    /// Implicit Extension
    Implicit,
}

impl Extension {
    /// All known extensions
    pub const ALL: [Extension; 7] = [
        Extension::Core,
        Extension::Material,
        Extension::Production,
        Extension::Slice,
        Extension::BeamLattice,
        Extension::Volumetric,
        Extension::Implicit,
    ];

    /// Get the namespace URI for this extension
    pub fn namespace(&self) -> &'static str {
        match self {
            Extension::Core => "http://schemas.microsoft.com/3dmanufacturing/core/2015/02",
            Extension::Material => "http://schemas.microsoft.com/3dmanufacturing/material/2015/02",
            Extension::Production => {
                "http://schemas.microsoft.com/3dmanufacturing/production/2015/06"
            }
            Extension::Slice => "http://schemas.microsoft.com/3dmanufacturing/slice/2015/07",
            Extension::BeamLattice => {
                "http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02"
            }
            Extension::Volumetric => "http://schemas.3mf.io/3dmanufacturing/volumetric/2022/01",
            Extension::Implicit => "http://schemas.3mf.io/3dmanufacturing/implicit/2023/12",
        }
    }

    /// Get extension from namespace URI
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        Extension::ALL
            .into_iter()
            .find(|ext| ext.namespace() == namespace)
    }

    /// Prefix used by the writer
    pub fn prefix(&self) -> &'static str {
        match self {
            Extension::Core => "",
            Extension::Material => "m",
            Extension::Production => "p",
            Extension::Slice => "s",
            Extension::BeamLattice => "b",
            Extension::Volumetric => "v",
            Extension::Implicit => "i",
        }
    }

    /// Get a human-readable name for this extension
    pub fn name(&self) -> &'static str {
        match self {
            Extension::Core => "Core",
            Extension::Material => "Material",
            Extension::Production => "Production",
            Extension::Slice => "Slice",
            Extension::BeamLattice => "BeamLattice",
            Extension::Volumetric => "Volumetric",
            Extension::Implicit => "Implicit",
        }
    }
}

/// Stage reported to a progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    /// Opening the package and loading attachments
    ReadingPackage,
    /// Parsing a model part
    ReadingModelPart,
    /// Reading mesh vertices and triangles
    ReadingMesh,
}

/// Progress callback
///
/// Receives the stage and a fraction in `0.0..=1.0` (or a negative value when
/// the fraction is unknown). Returning `false` cancels the parse.
pub type ProgressCallback = Arc<dyn Fn(ProgressStage, f64) -> bool + Send + Sync>;

/// Configuration for parsing 3MF files
///
/// Allows consumers to specify which extensions they support and how strict
/// the reader should be.
#[derive(Clone)]
pub struct ParserConfig {
    /// Set of extensions supported by the consumer
    /// Core is always implicitly supported
    supported_extensions: HashSet<Extension>,
    critical_warning_level: WarningLevel,
    max_warnings: usize,
    max_depth: usize,
    ignore_metadata: bool,
    ignore_build: bool,
    progress: Option<ProgressCallback>,
}

/// Default element nesting limit
pub const DEFAULT_MAX_DEPTH: usize = 256;

impl ParserConfig {
    /// Create a new parser configuration with only core support
    pub fn new() -> Self {
        let mut supported = HashSet::new();
        supported.insert(Extension::Core);
        Self {
            supported_extensions: supported,
            critical_warning_level: WarningLevel::InvalidMandatoryValue,
            max_warnings: DEFAULT_MAX_WARNINGS,
            max_depth: DEFAULT_MAX_DEPTH,
            ignore_metadata: false,
            ignore_build: false,
            progress: None,
        }
    }

    /// Create a parser configuration that supports all known extensions
    pub fn with_all_extensions() -> Self {
        let mut config = Self::new();
        config.supported_extensions.extend(Extension::ALL);
        config
    }

    /// Add support for a specific extension
    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.supported_extensions.insert(extension);
        self
    }

    /// Check if an extension is supported
    pub fn supports(&self, extension: &Extension) -> bool {
        self.supported_extensions.contains(extension)
    }

    /// Get the set of supported extensions
    pub fn supported_extensions(&self) -> &HashSet<Extension> {
        &self.supported_extensions
    }

    /// Warnings more severe than `level` abort the parse
    ///
    /// The default is `InvalidMandatoryValue`, so only fatal warnings abort.
    pub fn with_critical_warning_level(mut self, level: WarningLevel) -> Self {
        self.critical_warning_level = level;
        self
    }

    /// Current critical warning level
    pub fn critical_warning_level(&self) -> WarningLevel {
        self.critical_warning_level
    }

    /// Cap the number of recorded warnings
    pub fn with_max_warnings(mut self, max: usize) -> Self {
        self.max_warnings = max;
        self
    }

    /// Limit element nesting depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Current nesting limit
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Skip model and object metadata while reading
    pub fn with_ignore_metadata(mut self, ignore: bool) -> Self {
        self.ignore_metadata = ignore;
        self
    }

    /// True if metadata is skipped
    pub fn ignores_metadata(&self) -> bool {
        self.ignore_metadata
    }

    /// Skip the build section while reading
    pub fn with_ignore_build(mut self, ignore: bool) -> Self {
        self.ignore_build = ignore;
        self
    }

    /// True if the build section is skipped
    pub fn ignores_build(&self) -> bool {
        self.ignore_build
    }

    /// Register a progress callback
    ///
    /// # Example
    ///
    /// ```
    /// use lib3mf_model::ParserConfig;
    /// use std::sync::Arc;
    ///
    /// let config = ParserConfig::with_all_extensions()
    ///     .with_progress_callback(Arc::new(|_stage, _fraction| true));
    /// ```
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Report progress, failing with `UserAborted` when the callback cancels
    pub fn report_progress(&self, stage: ProgressStage, fraction: f64) -> Result<()> {
        match &self.progress {
            Some(callback) if !callback(stage, fraction) => Err(Error::model(
                ErrorCode::UserAborted,
                format!("parse cancelled during {:?}", stage),
            )),
            _ => Ok(()),
        }
    }

    /// Fresh warnings collector honouring this configuration
    pub fn new_warnings(&self) -> Warnings {
        Warnings::with_limits(self.critical_warning_level, self.max_warnings)
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("supported_extensions", &self.supported_extensions)
            .field("critical_warning_level", &self.critical_warning_level)
            .field("max_warnings", &self.max_warnings)
            .field("max_depth", &self.max_depth)
            .field("ignore_metadata", &self.ignore_metadata)
            .field("ignore_build", &self.ignore_build)
            .field("has_progress_callback", &self.progress.is_some())
            .finish()
    }
}

/// Model unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    /// Micrometre
    Micron,
    /// Millimetre
    #[default]
    Millimeter,
    /// Centimetre
    Centimeter,
    /// Inch
    Inch,
    /// Foot
    Foot,
    /// Metre
    Meter,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Unit::Micron => "micron",
            Unit::Millimeter => "millimeter",
            Unit::Centimeter => "centimeter",
            Unit::Inch => "inch",
            Unit::Foot => "foot",
            Unit::Meter => "meter",
        };
        f.write_str(name)
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "micron" => Ok(Unit::Micron),
            "millimeter" => Ok(Unit::Millimeter),
            "centimeter" => Ok(Unit::Centimeter),
            "inch" => Ok(Unit::Inch),
            "foot" => Ok(Unit::Foot),
            "meter" => Ok(Unit::Meter),
            _ => Err(Error::model(
                ErrorCode::InvalidModelUnit,
                format!("unknown unit '{}'", s),
            )),
        }
    }
}

/// A 3D vertex with x, y, z coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
    /// Z coordinate
    pub z: f32,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A triangle defined by three vertex indices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Index of first vertex
    pub v1: usize,
    /// Index of second vertex
    pub v2: usize,
    /// Index of third vertex
    pub v3: usize,
    /// Optional property group
    pub pid: Option<ResourceId>,
    /// Optional property index for vertex 1
    pub p1: Option<usize>,
    /// Optional property index for vertex 2
    pub p2: Option<usize>,
    /// Optional property index for vertex 3
    pub p3: Option<usize>,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v1: usize, v2: usize, v3: usize) -> Self {
        Self {
            v1,
            v2,
            v3,
            pid: None,
            p1: None,
            p2: None,
            p3: None,
        }
    }

    /// True if two corners share a vertex
    pub fn is_degenerate(&self) -> bool {
        self.v1 == self.v2 || self.v2 == self.v3 || self.v1 == self.v3
    }
}

/// A 3D mesh containing vertices and triangles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// List of vertices
    pub vertices: Vec<Vertex>,
    /// List of triangles
    pub triangles: Vec<Triangle>,
    /// Optional beam lattice (Beam Lattice Extension)
    pub beam_lattice: Option<BeamLattice>,
    /// Optional volume data (Volumetric Extension)
    pub volume_data: Option<ResourceId>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new mesh with pre-allocated capacity
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
            ..Self::default()
        }
    }

    /// Append a triangle, checking its vertex indices
    pub fn add_triangle(&mut self, triangle: Triangle) -> Result<()> {
        let count = self.vertices.len();
        for index in [triangle.v1, triangle.v2, triangle.v3] {
            if index >= count {
                return Err(Error::model(
                    ErrorCode::InvalidModelNodeIndex,
                    format!("vertex index {} out of range ({} vertices)", index, count),
                ));
            }
        }
        self.triangles.push(triangle);
        Ok(())
    }
}

/// Type of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectType {
    /// A printable model
    #[default]
    Model,
    /// Support structure
    Support,
    /// Solid support structure
    SolidSupport,
    /// Surface geometry
    Surface,
    /// Anything else; not allowed as a build item
    Other,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Model => "model",
            ObjectType::Support => "support",
            ObjectType::SolidSupport => "solidsupport",
            ObjectType::Surface => "surface",
            ObjectType::Other => "other",
        };
        f.write_str(name)
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "model" => Ok(ObjectType::Model),
            "support" => Ok(ObjectType::Support),
            "solidsupport" => Ok(ObjectType::SolidSupport),
            "surface" => Ok(ObjectType::Surface),
            "other" => Ok(ObjectType::Other),
            _ => Err(Error::model(
                ErrorCode::InvalidObjectType,
                format!("unknown object type '{}'", s),
            )),
        }
    }
}

/// Resolution of a mesh relative to its slice stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshResolution {
    /// The mesh is the full resolution geometry
    FullRes,
    /// The mesh is a low resolution stand-in
    LowRes,
}

impl fmt::Display for MeshResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MeshResolution::FullRes => "fullres",
            MeshResolution::LowRes => "lowres",
        })
    }
}

impl FromStr for MeshResolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fullres" => Ok(MeshResolution::FullRes),
            "lowres" => Ok(MeshResolution::LowRes),
            _ => Err(Error::parse_error_with_context(
                "meshresolution",
                s,
                "'fullres' or 'lowres'",
            )),
        }
    }
}

/// A component referencing another object
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Referenced object
    pub object: ResourceId,
    /// Optional transform
    pub transform: Option<Transform>,
    /// Optional production UUID
    pub uuid: Option<String>,
}

impl Component {
    /// Create a component without transform
    pub fn new(object: ResourceId) -> Self {
        Self {
            object,
            transform: None,
            uuid: None,
        }
    }

    /// Create a component with a transform
    pub fn with_transform(object: ResourceId, transform: Transform) -> Self {
        Self {
            object,
            transform: Some(transform),
            uuid: None,
        }
    }

    /// Transform, defaulting to identity
    pub fn transform_or_identity(&self) -> Transform {
        self.transform.unwrap_or(IDENTITY_TRANSFORM)
    }
}

/// Geometry of an object
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectContent {
    /// Triangle mesh
    Mesh(Mesh),
    /// Assembly of other objects
    Components(Vec<Component>),
    /// Implicit boundary shape (levelset)
    BoundaryShape(BoundaryShape),
}

/// An object resource
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Object type
    pub object_type: ObjectType,
    /// Optional name
    pub name: Option<String>,
    /// Optional part number
    pub part_number: Option<String>,
    /// Optional thumbnail path
    pub thumbnail: Option<String>,
    /// Default property group
    pub pid: Option<ResourceId>,
    /// Default property index
    pub pindex: Option<usize>,
    /// Production UUID
    pub uuid: Option<String>,
    /// Object metadata
    pub metadata: MetaDataGroup,
    /// Slice stack (Slice Extension)
    pub slice_stack: Option<ResourceId>,
    /// Mesh resolution relative to the slice stack
    pub mesh_resolution: Option<MeshResolution>,
    /// Geometry
    pub content: ObjectContent,
}

impl Object {
    fn with_content(content: ObjectContent) -> Self {
        Self {
            object_type: ObjectType::Model,
            name: None,
            part_number: None,
            thumbnail: None,
            pid: None,
            pindex: None,
            uuid: None,
            metadata: MetaDataGroup::new(),
            slice_stack: None,
            mesh_resolution: None,
            content,
        }
    }

    /// Create a mesh object
    pub fn new_mesh(mesh: Mesh) -> Self {
        Self::with_content(ObjectContent::Mesh(mesh))
    }

    /// Create an empty components object
    pub fn new_components() -> Self {
        Self::with_content(ObjectContent::Components(Vec::new()))
    }

    /// Create a boundary shape object
    pub fn new_boundary_shape(shape: BoundaryShape) -> Self {
        Self::with_content(ObjectContent::BoundaryShape(shape))
    }

    /// True if the object holds a mesh
    pub fn is_mesh_object(&self) -> bool {
        matches!(self.content, ObjectContent::Mesh(_))
    }

    /// True if the object holds components
    pub fn is_components_object(&self) -> bool {
        matches!(self.content, ObjectContent::Components(_))
    }

    /// True if the object is defined by a boundary shape
    pub fn is_boundary_shape_object(&self) -> bool {
        matches!(self.content, ObjectContent::BoundaryShape(_))
    }

    /// Mesh, if this is a mesh object
    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.content {
            ObjectContent::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Mutable mesh, if this is a mesh object
    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.content {
            ObjectContent::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Components, if this is a components object
    pub fn components(&self) -> Option<&[Component]> {
        match &self.content {
            ObjectContent::Components(components) => Some(components),
            _ => None,
        }
    }

    /// Boundary shape, if present
    pub fn boundary_shape(&self) -> Option<&BoundaryShape> {
        match &self.content {
            ObjectContent::BoundaryShape(shape) => Some(shape),
            _ => None,
        }
    }
}

/// A build item placing an object
#[derive(Debug, Clone, PartialEq)]
pub struct BuildItem {
    /// Placed object
    pub object: ResourceId,
    /// Optional transform
    pub transform: Option<Transform>,
    /// Optional part number
    pub part_number: Option<String>,
    /// Production UUID
    pub uuid: Option<String>,
    /// Item metadata
    pub metadata: MetaDataGroup,
}

impl BuildItem {
    /// Create a build item without transform
    pub fn new(object: ResourceId) -> Self {
        Self {
            object,
            transform: None,
            part_number: None,
            uuid: None,
            metadata: MetaDataGroup::new(),
        }
    }
}

/// Build section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Build {
    /// Items in document order
    pub items: Vec<BuildItem>,
    /// Production UUID of the build
    pub uuid: Option<String>,
}

impl Build {
    /// Create an empty build
    pub fn new() -> Self {
        Self::default()
    }
}
