//! Error types for all parsing and schema-declaration operations.

use failure::Fail;
use json_pointer::JsonPointer;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// The taxonomy of failures a parse can end with.
///
/// Every failure is fatal to the `parse` call that produced it. The first
/// violation encountered during the depth-first traversal is the one
/// reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A required property was absent under all of its candidate names.
    MissingProperty,

    /// A value was present but of the wrong JSON kind, or an array field had
    /// no element type.
    InvalidType,

    /// A field slot has no property-name declaration.
    MissingAnnotation,

    /// The target type has neither a schema nor a matching custom mapper, or
    /// its schema cannot produce a value.
    InvalidModelClass,

    /// A validation rule reported a violation.
    ValidationFailed,

    /// The input nests deeper than the configured maximum depth.
    MaxDepthExceeded,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingProperty => "MISSING_PROPERTY",
            ErrorCode::InvalidType => "INVALID_TYPE",
            ErrorCode::MissingAnnotation => "MISSING_ANNOTATION",
            ErrorCode::InvalidModelClass => "INVALID_MODEL_CLASS",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::MaxDepthExceeded => "MAX_DEPTH_EXCEEDED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pointer into the input, as accumulated from the root of a parse.
pub type Path = JsonPointer<String, Vec<String>>;

/// The error returned by every parse entry point.
///
/// A `ParseError` is built at the failure site and travels up unchanged. It
/// carries the taxonomy code, a human-readable message, and a
/// [`JsonPointer`](https://docs.rs/json-pointer) to the part of the input
/// which was rejected.
#[derive(Debug, Fail, Clone, PartialEq, Serialize)]
#[fail(display = "{}", message)]
pub struct ParseError {
    code: ErrorCode,
    message: String,
    #[serde(serialize_with = "serialize_path")]
    path: Path,
}

impl ParseError {
    pub fn new(code: ErrorCode, message: impl Into<String>, path: Path) -> ParseError {
        ParseError {
            code,
            message: message.into(),
            path,
        }
    }

    /// The taxonomy code of this failure.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// A pointer into the part of the input which was rejected.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn serialize_path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(path)
}

/// A defect in a schema declaration, found when the schema is registered.
#[derive(Debug, Fail, PartialEq, Clone, Eq, Hash)]
pub enum SchemaError {
    /// An argument slot of a type has no property-name declaration.
    ///
    /// This arises when a slot below the factory's arity was never declared,
    /// when only validation rules were declared for it, or when its
    /// declared names are all blank.
    #[fail(display = "missing field declaration for argument {} of {}", index, type_id)]
    MissingAnnotation { type_id: String, index: usize },

    /// A field was declared at an argument position the factory does not take.
    #[fail(
        display = "{} declares a field at argument {} but its factory takes {} arguments",
        type_id, index, arity
    )]
    ArityMismatch {
        type_id: String,
        index: usize,
        arity: usize,
    },

    /// A declarative schema gave a field neither a type nor an element type.
    #[fail(display = "no type declared for {} of {}", property, type_id)]
    MissingType { type_id: String, property: String },

    /// A declarative schema named a rule whose parameters are unusable, such
    /// as an invalid regular expression or an unparseable date bound.
    #[fail(display = "invalid rule for {} of {}: {}", property, type_id, reason)]
    InvalidRule {
        type_id: String,
        property: String,
        reason: String,
    },
}

impl SchemaError {
    /// The taxonomy code this defect corresponds to.
    pub fn code(&self) -> ErrorCode {
        match self {
            SchemaError::MissingAnnotation { .. } => ErrorCode::MissingAnnotation,
            SchemaError::ArityMismatch { .. }
            | SchemaError::MissingType { .. }
            | SchemaError::InvalidRule { .. } => ErrorCode::InvalidModelClass,
        }
    }
}

/// A factory asked its arguments for something they cannot provide.
#[derive(Debug, Fail, PartialEq, Clone, Eq, Hash)]
pub enum ArgError {
    #[fail(display = "argument {}: expected {}, found {}", index, expected, found)]
    Mismatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[fail(display = "argument {} requested but only {} were parsed", index, len)]
    Exhausted { index: usize, len: usize },
}
