//! Error model for binding runs.
//!
//! Every failure the engine reports is scoped to a field. Conversion,
//! transformer, and nested-schema failures surface as [`BindError`] values;
//! the schema wraps each one in a [`FieldError`] carrying the field name, its
//! description, and the [`Phase`] that produced it. A run collects all of them
//! into an ordered [`FieldErrors`] list.
//!
//! # Rendering
//!
//! ```
//! use databind_core::{BindError, FieldError, FieldErrors, Phase, ValidationError};
//!
//! let mut errors = FieldErrors::new();
//! errors.push(FieldError::new(
//!     "name",
//!     None,
//!     Phase::Validate,
//!     BindError::Validation(ValidationError::new("field is required")),
//! ));
//! errors.push(FieldError::new(
//!     "tags",
//!     None,
//!     Phase::Assign,
//!     BindError::LengthMismatch { expected: 3, actual: 2 },
//! ));
//!
//! assert_eq!(
//!     errors.to_string(),
//!     "name: field is required; tags: length mismatch: expected 3, got 2"
//! );
//! ```

use std::fmt;

use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to convert a dynamic value into a statically expected type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// No conversion rule exists between the two types.
    #[error("cannot convert {from} to {to}")]
    Unsupported {
        /// Dynamic kind of the input (`string`, `number`, ...).
        from: &'static str,
        /// Name of the target type.
        to: &'static str,
    },
    /// The input is textual but does not parse as the target type.
    #[error("cannot parse {input:?} as {to}")]
    Parse {
        /// The offending input text.
        input: String,
        /// Name of the target type.
        to: &'static str,
    },
    /// The input is numeric but does not fit the target type.
    #[error("value {value} out of range for {to}")]
    OutOfRange {
        /// The offending input, rendered as text.
        value: String,
        /// Name of the target type.
        to: &'static str,
    },
    /// Strict boolean parsing met a token outside the known vocabulary.
    #[error("unrecognized boolean {0:?}")]
    InvalidBool(String),
    /// Failure reported by a settable wrapper type.
    #[error("{0}")]
    Custom(String),
}

/// Failure raised by a [`Transformer`](crate::Transformer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransformError(String);

impl TransformError {
    /// Creates a transformer error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Failure raised by a [`Validator`](crate::Validator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    /// Creates a validation error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Location of a failing element inside a collection field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Zero-based index into a sequence.
    Index(usize),
    /// Key of a mapping entry.
    Key(String),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Index(index) => write!(f, "element {index}"),
            Position::Key(key) => write!(f, "entry {key:?}"),
        }
    }
}

/// Error produced while assigning or validating a single field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    /// The raw value could not be converted to the field's type.
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// A nested-object field received something other than a mapping.
    #[error("expected object, got {0}")]
    ExpectedObject(&'static str),

    /// A collection field received something other than a sequence.
    #[error("expected array, got {0}")]
    ExpectedArray(&'static str),

    /// A fixed-size sequence received the wrong number of elements.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Declared length of the array.
        expected: usize,
        /// Length of the input sequence.
        actual: usize,
    },

    /// Failure of one element or entry of a collection.
    #[error("{position}: {error}")]
    At {
        /// Which element failed.
        position: Position,
        /// What went wrong with it.
        error: Box<BindError>,
    },

    /// Errors reported by a nested schema.
    #[error("{0}")]
    Nested(FieldErrors),

    /// Several independent failures inside one field.
    #[error("{}", join(.0))]
    Multiple(Vec<BindError>),

    /// A transformer rejected the converted value.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// A validator rejected the bound value.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A union resolver could not produce a value.
    #[error("{0}")]
    Resolve(String),

    /// A caller-supplied converter failed.
    #[error("{0}")]
    Converter(String),

    /// A union payload lacks its discriminator key.
    #[error("missing discriminator {0:?}")]
    MissingDiscriminator(String),

    /// A union discriminator names no known variant.
    #[error("unknown variant {0:?}")]
    UnknownVariant(String),
}

impl BindError {
    /// Wraps `self` with the position of the element that produced it.
    pub fn at(self, position: Position) -> Self {
        BindError::At {
            position,
            error: Box::new(self),
        }
    }
}

impl From<FieldErrors> for BindError {
    fn from(errors: FieldErrors) -> Self {
        BindError::Nested(errors)
    }
}

fn join(errors: &[BindError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Phase of a run that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Conversion, transformation, or nested assignment.
    Assign,
    /// Business-rule validation.
    Validate,
}

/// A failure scoped to one field of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Payload key of the field.
    pub field: String,
    /// Human-readable description of the field, if configured.
    pub description: Option<String>,
    /// Phase that produced the error.
    pub phase: Phase,
    /// The underlying failure.
    pub error: BindError,
}

impl FieldError {
    /// Creates a field error.
    pub fn new(
        field: impl Into<String>,
        description: Option<String>,
        phase: Phase,
        error: BindError,
    ) -> Self {
        Self {
            field: field.into(),
            description,
            phase,
            error,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.error)
    }
}

impl std::error::Error for FieldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl Serialize for FieldError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("FieldError", 4)?;
        record.serialize_field("field", &self.field)?;
        record.serialize_field("description", &self.description)?;
        record.serialize_field("phase", &self.phase)?;
        record.serialize_field("message", &self.error.to_string())?;
        record.end()
    }
}

/// Ordered collection of field errors produced by one run.
///
/// Assignment errors come first in field order, followed by validation
/// errors in field order. An empty collection means success.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an error.
    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// Returns `true` when no error was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of recorded errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the errors in order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Returns the first error recorded for `field`, if any.
    pub fn for_field(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|error| error.field == field)
    }

    /// Converts the collection into `Ok(())` when empty, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

impl IntoIterator for FieldErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<FieldError> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
