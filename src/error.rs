//! Error types for 3MF reading and writing
//!
//! All errors carry a code so callers can categorize failures without
//! matching on message text.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: XML parsing and structure errors
//! - **E3xxx**: Numeric parse errors
//! - **E4xxx**: Unsupported features
//! - **E5xxx**: 3MF model errors, see [`ErrorCode`]
//!
//! Model errors wrap an [`ErrorCode`], which is also what recorded
//! [`Warning`](crate::warnings::Warning)s carry.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for 3MF operations
pub type Result<T> = std::result::Result<T, Error>;

macro_rules! error_codes {
    ($($(#[$doc:meta])* $variant:ident = $number:literal => $name:literal,)*) => {
        /// Typed 3MF error code
        ///
        /// Each code has a stable numeric tag (`E5xxx`) and an upper snake case
        /// name used in messages.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorCode {
            $($(#[$doc])* $variant,)*
        }

        impl ErrorCode {
            /// Numeric part of the code
            pub fn number(&self) -> u32 {
                match self {
                    $(ErrorCode::$variant => $number,)*
                }
            }

            /// Upper snake case name of the code
            pub fn name(&self) -> &'static str {
                match self {
                    $(ErrorCode::$variant => $name,)*
                }
            }

            /// All known codes, in numeric order
            pub fn all() -> &'static [ErrorCode] {
                &[$(ErrorCode::$variant,)*]
            }
        }
    };
}

error_codes! {
    /// A reader node was asked to parse its attributes or content twice
    AlreadyParsedXmlNode = 5001 => "ALREADY_PARSED_XML_NODE",
    /// The current element has no local name
    NodeNameIsEmpty = 5002 => "NODE_NAME_IS_EMPTY",
    /// Element nesting exceeded the configured depth
    XmlNestingTooDeep = 5003 => "XML_NESTING_TOO_DEEP",
    /// `xml:space` or another forbidden XML attribute was used
    ForbiddenXmlAttribute = 5004 => "FORBIDDEN_XML_ATTRIBUTE",
    /// A `requiredextensions` prefix has no namespace declaration
    InvalidRequiredExtensionPrefix = 5005 => "INVALID_REQUIRED_EXTENSION_PREFIX",
    /// A required extension namespace is not known to this reader
    RequiredExtensionNotSupported = 5006 => "REQUIRED_EXTENSION_NOT_SUPPORTED",
    /// More than one `<resources>` element
    DuplicateResources = 5007 => "DUPLICATE_RESOURCES",
    /// More than one `<build>` element
    DuplicateBuildSection = 5008 => "DUPLICATE_BUILD_SECTION",
    /// Unknown element in a known namespace
    NamespaceInvalidElement = 5009 => "NAMESPACE_INVALID_ELEMENT",
    /// Unknown attribute in a known namespace
    NamespaceInvalidAttribute = 5010 => "NAMESPACE_INVALID_ATTRIBUTE",
    /// The 2013/01 core namespace was used
    Version093NotSupported = 5011 => "VERSION_093_NOT_SUPPORTED",
    /// Unknown model unit
    InvalidModelUnit = 5012 => "INVALID_MODEL_UNIT",
    /// Invalid parameter passed to a model operation
    InvalidParam = 5013 => "INVALID_PARAM",
    /// Index or id outside its valid range
    InvalidIndex = 5014 => "INVALID_INDEX",
    /// Resource id already used in the same part
    DuplicateResourceId = 5015 => "DUPLICATE_RESOURCE_ID",
    /// Mandatory resource id attribute is missing
    MissingModelResourceId = 5016 => "MISSING_MODEL_RESOURCE_ID",
    /// Referenced resource does not exist
    ResourceNotFound = 5017 => "RESOURCE_NOT_FOUND",
    /// Referenced model resource id is unknown in the current part
    UnknownModelResource = 5018 => "UNKNOWN_MODEL_RESOURCE",
    /// Referenced resource has the wrong kind
    InvalidModelResource = 5019 => "INVALID_MODEL_RESOURCE",
    /// UUID already registered in this document
    DuplicateUuid = 5020 => "DUPLICATE_UUID",
    /// UUID text is not 8-4-4-4-12 hex
    InvalidUuid = 5021 => "INVALID_UUID",
    /// UUID missing where the production extension expects one
    MissingUuid = 5022 => "MISSING_UUID",
    /// `p:path` used outside the root model part
    ReferencesTooDeep = 5023 => "REFERENCES_TOO_DEEP",
    /// Vertex coordinate out of range or not finite
    InvalidModelCoordinates = 5024 => "INVALID_MODEL_COORDINATES",
    /// Vertex coordinate attribute missing
    ModelCoordinateMissing = 5025 => "MODEL_COORDINATE_MISSING",
    /// Vertex index out of range
    InvalidModelNodeIndex = 5026 => "INVALID_MODEL_NODE_INDEX",
    /// Triangle with repeated vertex indices
    DegenerateTriangle = 5027 => "DEGENERATE_TRIANGLE",
    /// Component reference would create a cycle
    ForbiddenCyclicReference = 5028 => "FORBIDDEN_CYCLIC_REFERENCE",
    /// Object has both mesh and components
    AmbiguousObjectDefinition = 5029 => "AMBIGUOUS_OBJECT_DEFINITION",
    /// Object has neither mesh, components nor boundary shape
    MissingObjectContent = 5030 => "MISSING_OBJECT_CONTENT",
    /// `type` given twice on an object
    DuplicateObjectType = 5031 => "DUPLICATE_OBJECT_TYPE",
    /// Unknown object type
    InvalidObjectType = 5032 => "INVALID_OBJECT_TYPE",
    /// `objectid` given twice on a component
    DuplicateComponentObjectId = 5033 => "DUPLICATE_COMPONENT_OBJECT_ID",
    /// Component references an unknown object
    CouldNotFindComponentObject = 5034 => "COULD_NOT_FIND_COMPONENT_OBJECT",
    /// Build item without `objectid`
    MissingBuildItemObjectId = 5035 => "MISSING_BUILD_ITEM_OBJECT_ID",
    /// `objectid` given twice on a build item
    DuplicateBuildItemObjectId = 5036 => "DUPLICATE_BUILD_ITEM_OBJECT_ID",
    /// Build item references an unknown object
    CouldNotFindBuildItemObject = 5037 => "COULD_NOT_FIND_BUILD_ITEM_OBJECT",
    /// Build item references an object of type "other"
    InvalidBuildItemObjectType = 5038 => "INVALID_BUILD_ITEM_OBJECT_TYPE",
    /// Metadata key already present in the group
    DuplicateMetadata = 5039 => "DUPLICATE_METADATA",
    /// Metadata without a usable name
    InvalidMetadata = 5040 => "INVALID_METADATA",
    /// Metadata name prefix could not be resolved
    MetadataCouldNotGetNamespace = 5041 => "METADATA_COULD_NOT_GET_NAMESPACE",
    /// Attachment referenced by a texture or image sheet is missing
    AttachmentNotFound = 5042 => "ATTACHMENT_NOT_FOUND",
    /// Attachment path already used
    DuplicateAttachment = 5043 => "DUPLICATE_ATTACHMENT",
    /// Image stack sheet count does not match the sheets read
    InvalidImageStack = 5044 => "INVALID_IMAGE_STACK",
    /// Unknown tile style text
    InvalidTileStyle = 5045 => "INVALID_TILE_STYLE",
    /// Unknown texture filter text
    InvalidFilter = 5046 => "INVALID_FILTER",
    /// Unknown blend method text
    InvalidBlendMethod = 5047 => "INVALID_BLEND_METHOD",
    /// Color text is not `#RRGGBB[AA]`
    InvalidColor = 5048 => "INVALID_COLOR",
    /// Volume data element without a function id
    MissingVolumeDataFieldId = 5049 => "MISSING_VOLUME_DATA_FIELD_ID",
    /// Volume data property without a name
    MissingVolumeDataPropertyName = 5050 => "MISSING_VOLUME_DATA_PROPERTY_NAME",
    /// Attribute or child given twice in volume data
    DuplicateVolumeData = 5051 => "DUPLICATE_VOLUME_DATA",
    /// Destination channel without a name
    MissingVolumetricDstChannelName = 5052 => "MISSING_VOLUMETRIC_DST_CHANNEL_NAME",
    /// Attribute given twice in a volumetric stack element
    DuplicateVolumetricAttribute = 5053 => "DUPLICATE_VOLUMETRIC_ATTRIBUTE",
    /// Mandatory volumetric stack attribute missing
    MissingVolumetricAttribute = 5054 => "MISSING_VOLUMETRIC_ATTRIBUTE",
    /// Second mask channel selector in one layer
    DuplicateMaskChannelSelector = 5055 => "DUPLICATE_MASK_CHANNEL_SELECTOR",
    /// Numeric volumetric value is NaN or out of range
    InvalidVolumetricValue = 5056 => "INVALID_VOLUMETRIC_VALUE",
    /// Attribute given twice on a boundary shape
    DuplicateBoundaryShapeAttribute = 5057 => "DUPLICATE_BOUNDARY_SHAPE_ATTRIBUTE",
    /// Boundary shape without a function id
    MissingBoundaryShapeFunctionId = 5058 => "MISSING_BOUNDARY_SHAPE_FUNCTION_ID",
    /// Node configuration not listed for its node type
    InvalidNodeConfiguration = 5059 => "INVALID_NODE_CONFIGURATION",
    /// Node or function graph contains a cycle
    CyclicGraph = 5060 => "CYCLIC_GRAPH",
    /// Identifier already used by a sibling
    DuplicateIdentifier = 5061 => "DUPLICATE_IDENTIFIER",
    /// Element without a mandatory identifier
    MissingIdentifier = 5062 => "MISSING_IDENTIFIER",
    /// Port reference does not name an existing port
    UnresolvedPortReference = 5063 => "UNRESOLVED_PORT_REFERENCE",
    /// Linked ports carry different value types
    ImplicitTypeMismatch = 5064 => "IMPLICIT_TYPE_MISMATCH",
    /// Slice or beam data is inconsistent
    InvalidSliceData = 5065 => "INVALID_SLICE_DATA",
    /// Beam lattice data is inconsistent
    InvalidBeamLattice = 5066 => "INVALID_BEAM_LATTICE",
    /// Property index outside its group
    InvalidPropertyIndex = 5067 => "INVALID_PROPERTY_INDEX",
    /// Progress callback requested cancellation
    UserAborted = 5068 => "USER_ABORTED",
}

impl ErrorCode {
    /// Tag in the `E5xxx` form used inside messages
    pub fn tag(&self) -> String {
        format!("E{}", self.number())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur when reading or writing 3MF files
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading the file
    ///
    /// **Error Code**: E1001
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted ZIP file
    /// - Truncated archive
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Missing required file in the 3MF archive
    ///
    /// **Error Code**: E1003
    #[error("[E1003] Missing required file: {0}")]
    MissingFile(String),

    /// XML parsing error
    ///
    /// **Error Code**: E2001
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Invalid XML structure
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - Missing required XML elements or attributes
    /// - Invalid element nesting
    /// - DTD declarations
    #[error("[E2003] Invalid XML structure: {0}")]
    InvalidXml(String),

    /// Invalid 3MF package format
    ///
    /// **Error Code**: E2004
    ///
    /// **Common Causes**:
    /// - Non-compliant OPC structure
    /// - Invalid content types
    /// - Missing required OPC relationships
    #[error("[E2004] Invalid 3MF format: {0}")]
    InvalidFormat(String),

    /// XML writing error
    ///
    /// **Error Code**: E2005
    #[error("[E2005] XML writing error: {0}")]
    XmlWrite(String),

    /// Parse error for numeric values
    ///
    /// **Error Code**: E3002
    ///
    /// **Suggestions**:
    /// - Verify numeric values use proper format (e.g., "1.5" not "1,5")
    #[error("[E3002] Parse error: {0}")]
    ParseError(String),

    /// Required extension not supported by the parser configuration
    ///
    /// **Error Code**: E4002
    #[error("[E4002] Required extension not supported: {0}")]
    UnsupportedExtension(String),

    /// 3MF model error with a typed code
    ///
    /// **Error Code**: E5xxx, see [`ErrorCode`]
    #[error("[{tag}] {code}: {message}", tag = .code.tag())]
    Model {
        /// Typed error code
        code: ErrorCode,
        /// Human readable detail
        message: String,
    },
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseError(format!("Failed to parse integer: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Create a model error with a typed code
    ///
    /// # Example
    /// ```
    /// use lib3mf_model::{Error, ErrorCode};
    ///
    /// let err = Error::model(ErrorCode::InvalidIndex, "resource id 0");
    /// assert_eq!(err.code(), Some(ErrorCode::InvalidIndex));
    /// ```
    pub fn model(code: ErrorCode, message: impl Into<String>) -> Self {
        Error::Model {
            code,
            message: message.into(),
        }
    }

    /// The typed model error code, if this is a model error
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Model { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Create an InvalidXml error with element context
    pub fn invalid_xml_element(element: &str, message: &str) -> Self {
        Error::InvalidXml(format!("Element '<{}>': {}", element, message))
    }

    /// Create an InvalidXml error for a missing required attribute
    ///
    /// # Example
    /// ```ignore
    /// Error::missing_attribute("object", "id")
    /// ```
    pub fn missing_attribute(element: &str, attribute: &str) -> Self {
        Error::InvalidXml(format!(
            "Element '<{}>' is missing required attribute '{}'",
            element, attribute
        ))
    }

    /// Create an InvalidFormat error with context about what structure is invalid
    pub fn invalid_format_context(context: &str, message: &str) -> Self {
        Error::InvalidFormat(format!("{}: {}", context, message))
    }

    /// Create a ParseError with context about what was being parsed
    ///
    /// # Arguments
    /// * `field_name` - The name of the field being parsed (e.g., "vertex x coordinate")
    /// * `value` - The value that failed to parse
    /// * `expected_type` - The expected type (e.g., "floating-point number")
    pub fn parse_error_with_context(field_name: &str, value: &str, expected_type: &str) -> Self {
        Error::ParseError(format!(
            "Failed to parse '{}': expected {}, got '{}'",
            field_name, expected_type, value
        ))
    }

    /// Create an XmlWrite error
    pub fn xml_write(message: String) -> Self {
        Error::XmlWrite(message)
    }
}
