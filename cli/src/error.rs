//! Error types for loading schema definitions and payloads.

use databind_core::ConvertError;
use thiserror::Error;

use crate::definition::FieldKind;

/// Errors raised before a payload is bound.
///
/// Binding failures are not errors here; they are reported as the
/// [`FieldErrors`](databind_core::FieldErrors) of the run.
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Schema definition is not valid YAML for [`SchemaDef`](crate::definition::SchemaDef).
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Output serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Payload could not be decoded.
    #[error("payload error: {0}")]
    InputError(#[from] databind_input::InputError),

    /// Two fields at the same level share a name.
    #[error("duplicate field '{0}'")]
    DuplicateField(String),

    /// A `default` that does not convert to the field's type.
    #[error("invalid default for field '{field}': {source}")]
    InvalidDefault {
        field: String,
        #[source]
        source: ConvertError,
    },

    /// A `pattern` rule that is not a valid regular expression.
    #[error("invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// A definition key that the field type cannot honour.
    #[error("field '{field}' of type {kind} does not support {feature}")]
    Unsupported {
        field: String,
        kind: FieldKind,
        feature: &'static str,
    },
}

/// Convenience alias for results with [`CliError`].
pub type Result<T> = std::result::Result<T, CliError>;
