//! OPC (Open Packaging Conventions) handling for 3MF files
//!
//! 3MF files are ZIP archives following the OPC standard, containing
//! model parts, attachments such as textures, and the relationships
//! between them.

mod content_types;
mod reader;
mod relationships;
mod validation;
mod writer;

pub use content_types::{ContentTypes, MODEL_CONTENT_TYPE, RELATIONSHIPS_CONTENT_TYPE};
pub use reader::Package;
pub use relationships::{MODEL_REL_TYPE, Relationship, TEXTURE_REL_TYPE, THUMBNAIL_REL_TYPE};
pub use writer::create_package;

/// Main 3D model file path within the 3MF archive
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// Content types file path
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Relationships file path
pub const RELS_PATH: &str = "_rels/.rels";

/// Model relationships file path
pub const MODEL_RELS_PATH: &str = "3D/_rels/3dmodel.model.rels";
