//! Run options shared by a schema and every nested schema it applies.

use serde::{Deserialize, Serialize};

use crate::convert::{BoolParsing, ConvertOptions};

/// What a run does after an assignment error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Keep assigning the remaining fields and run validation anyway.
    #[default]
    Continue,
    /// Return immediately with the first assignment error.
    Stop,
}

/// Options for [`Schema::apply`](crate::Schema::apply).
///
/// Deserializable so that applications can keep them in their own
/// configuration files; every field has a default.
///
/// ```
/// use databind_core::{ApplyOptions, BoolParsing, ErrorPolicy};
///
/// let options: ApplyOptions =
///     serde_json::from_str(r#"{"bool_parsing": "strict"}"#).unwrap();
/// assert_eq!(options.bool_parsing, BoolParsing::Strict);
/// assert_eq!(options.on_assign_error, ErrorPolicy::Continue);
/// assert!(!options.skip_validation);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOptions {
    /// Omit the validation phase; only assignment errors are reported.
    pub skip_validation: bool,
    /// Boolean string policy used by conversions.
    pub bool_parsing: BoolParsing,
    /// Behaviour after an assignment error.
    pub on_assign_error: ErrorPolicy,
}

impl ApplyOptions {
    /// Returns the subset consumed by the conversion chain.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            bool_parsing: self.bool_parsing,
        }
    }
}
