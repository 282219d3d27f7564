//! Error types for the busframe system.
//!
//! Structural problems (a record that cannot be flattened, a type with no
//! width, a record instance that does not match its plan) are reported as
//! errors and abort whatever was being built. A frame that fails length
//! validation is NOT an error: the decoder reports it as data through its
//! `success` flag.

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Schema: the extraction input is not a usable record
/// - Layout: a field list cannot be turned into a codec plan
/// - Encode: a record instance disagrees with the plan it is encoded against
/// - Emit: the target emitter cannot render the plan
/// - I/O and JSON: loading records or writing artifacts
#[derive(Debug, Error)]
pub enum Error {
    /// Extraction input is invalid (not a record, empty, malformed members)
    #[error("invalid input: {0}")]
    Schema(#[from] SchemaError),

    /// Layout planning failed (unsupported type, duplicate names, overflow)
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Record instance does not match the plan
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Artifact generation failed
    #[error("emit error: {0}")]
    Emit(#[from] EmitError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON syntax or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Schema extraction errors (the `InvalidInput` class).
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The root value is a leaf, not a structured record
    #[error("input is not a structured record")]
    NotARecord,

    /// A record (root or nested) has no members
    #[error("record `{path}` has no members")]
    EmptyRecord { path: String },

    /// Member name is empty or contains the path separator
    #[error("invalid member name {name:?} under `{parent}`")]
    InvalidMemberName { parent: String, name: String },

    /// Two siblings share a name
    #[error("duplicate member `{path}`")]
    DuplicateMember { path: String },

    /// Dimensions are empty or contain a zero
    #[error("invalid dimensions {dims:?} for `{path}`")]
    InvalidDimensions { path: String, dims: Vec<usize> },

    /// Element count differs from the product of the dimensions
    #[error("`{path}` has {actual} elements but dimensions {dims:?} need {expected}")]
    ElementCount {
        path: String,
        dims: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// Enumeration tags stored in a non-integer type
    #[error("enumeration `{path}` is stored as {storage}, not an integer type")]
    EnumStorage { path: String, storage: String },

    /// A JSON document does not describe a record
    #[error("malformed record document at `{path}`: {reason}")]
    Malformed { path: String, reason: String },
}

/// Layout planning errors.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The field's type has no entry in the width table
    #[error("field `{field}` has unsupported type {ty}")]
    UnsupportedType { field: String, ty: String },

    /// Field list is empty
    #[error("cannot plan an empty field list")]
    EmptySchema,

    /// Two fields share a name
    #[error("duplicate field `{field}`")]
    DuplicateField { field: String },

    /// Dimensions are empty or contain a zero
    #[error("field `{field}` has invalid dimensions {dims:?}")]
    InvalidDimensions { field: String, dims: Vec<usize> },

    /// Width or offset arithmetic overflowed
    #[error("frame size overflows at field `{field}`")]
    FrameTooLarge { field: String },
}

/// Encode-time errors. A frame is never partially returned.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The record has no value at the field's path
    #[error("record has no value at `{path}`")]
    FieldMissing { path: String },

    /// The value's type or shape disagrees with the field
    #[error("`{path}` expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

/// Target emitter errors.
#[derive(Debug, Error)]
pub enum EmitError {
    /// A field path or type name does not map to a valid identifier
    #[error("`{name}` is not a valid identifier")]
    InvalidIdent { name: String },

    /// Two field paths map to the same identifier
    #[error("fields `{first}` and `{second}` both map to `{ident}`")]
    IdentCollision {
        first: String,
        second: String,
        ident: String,
    },

    /// Generated tokens failed to parse back as a source file
    #[error("generated code does not parse: {0}")]
    Syntax(String),
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
