//! # lib3mf-model
//!
//! A pure Rust reader and writer for 3MF (3D Manufacturing Format) models.
//!
//! 3MF files are ZIP-based containers following the Open Packaging
//! Conventions (OPC) and holding XML model parts. This crate parses those
//! parts into an in-memory [`Model`] and writes models back out.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Streaming, namespace-aware XML reader with one reader per element kind
//! - Resource arena with package-wide handles ([`ResourceId`]) and
//!   per-part ids ([`PackageResourceId`])
//! - Core, material, production, slice, beam lattice, volumetric and
//!   implicit extensions
//! - Implicit function graphs with link checks, topological ordering and
//!   type validation
//! - Non-fatal problems collected as [`Warnings`] with a configurable
//!   escalation level
//!
//! ## Example
//!
//! ```no_run
//! use lib3mf_model::Model;
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("model.3mf")?;
//! let (model, warnings) = Model::from_reader(file)?;
//!
//! println!("Model contains {} resources", model.resource_count());
//! for warning in warnings.iter() {
//!     println!("{}: {}", warning.code, warning.message);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod implicit;
pub mod model;
pub mod opc;
pub mod parser;
pub mod warnings;
pub mod writer;

pub use error::{Error, ErrorCode, Result};
pub use implicit::{
    ImplicitFunction, ImplicitNode, ImplicitPort, NodeConfiguration, NodePayload, NodeType,
    PortRef, PortType,
};
pub use model::{
    Attachment, BaseMaterial, BaseMaterials, Beam, BeamCapMode, BeamLattice, BeamSet, BlendMethod,
    BoundaryShape, Build, BuildItem, ColorGroup, Component, CompositeMaterials, Extension,
    FilterMode, FunctionFromImage3D, Image3D, Mesh, MetaData, MetaDataGroup, Model,
    MultiProperties, Object, ObjectContent, ObjectType, PackageResourceId, ParserConfig,
    ProgressStage, Resource, ResourceId, SliceStack, Texture2D, Texture2DGroup, TileStyle,
    Triangle, Unit, Vertex, VolumeData, VolumetricStack,
};
pub use parser::{parse_model_xml, parse_model_xml_with_config};
pub use warnings::{Warning, WarningLevel, Warnings};

use std::io::{Read, Seek, Write};

impl Model {
    /// Parse a 3MF file from a reader
    ///
    /// Every known extension is accepted. Returns the model together with
    /// the warnings collected while reading.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_model::Model;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let file = File::open("model.3mf")?;
    /// let (model, warnings) = Model::from_reader(file)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<(Self, Warnings)> {
        Self::from_reader_with_config(reader, ParserConfig::with_all_extensions())
    }

    /// Parse a 3MF file from a reader with custom configuration
    ///
    /// If the file requires an extension the configuration does not
    /// support, an error is returned.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_model::{Extension, Model, ParserConfig, WarningLevel};
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let file = File::open("model.3mf")?;
    ///
    /// // Core and materials only; every warning is an error
    /// let config = ParserConfig::new()
    ///     .with_extension(Extension::Material)
    ///     .with_critical_warning_level(WarningLevel::InvalidOptionalValue);
    ///
    /// let (model, _) = Model::from_reader_with_config(file, config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_reader_with_config<R: Read + Seek>(
        reader: R,
        config: ParserConfig,
    ) -> Result<(Self, Warnings)> {
        let mut package = opc::Package::open(reader)?;
        package.read_model(&config)
    }

    /// Write a 3MF file to a writer
    ///
    /// Writes every model part, the attachments and the relationships
    /// between them.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_model::Model;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let model = Model::new();
    /// let file = File::create("output.3mf")?;
    /// model.to_writer(file)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn to_writer<W: Write + Seek>(&self, writer: W) -> Result<W> {
        opc::create_package(writer, self)
    }

    /// Write a 3MF file to a file path
    pub fn write_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_writer(file)?;
        Ok(())
    }
}
