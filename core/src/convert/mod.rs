//! Conversion of dynamically typed values into statically expected types.
//!
//! [`convert`] drives a fixed fallback chain for every target type:
//!
//! 1. **Direct match**: the input already has the target's dynamic shape.
//! 2. **Settable wrapper**: the target knows how to set itself from a dynamic
//!    value (see [`SetDynamic`] and [`Nullable`]); its failure is propagated
//!    verbatim.
//! 3. **Structural coercion**: type-directed rules (number parsing, boolean
//!    vocabulary, stringification, ...).
//! 4. **Failure**: [`ConvertError::Unsupported`].
//!
//! Each step is a hook on the [`Dynamic`] trait; a type opts into a step by
//! overriding the corresponding method.
//!
//! ```
//! use databind_core::ConvertOptions;
//! use databind_core::convert::convert;
//! use serde_json::json;
//!
//! let options = ConvertOptions::default();
//! assert_eq!(convert::<i32>(&json!("42"), &options).unwrap(), 42);
//! assert_eq!(convert::<u8>(&json!(7.9), &options).unwrap(), 7);
//! assert_eq!(convert::<String>(&json!(42), &options).unwrap(), "42");
//! assert!(convert::<bool>(&json!("yes"), &options).unwrap());
//! assert!(convert::<u8>(&json!(300), &options).is_err());
//! ```

mod nullable;
mod primitive;
mod time;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConvertError;

pub use nullable::{Nullable, SetDynamic};

/// How strings are interpreted when the target is a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolParsing {
    /// Truthy tokens map to `true`; any other string maps to `false`.
    #[default]
    Lenient,
    /// Truthy and falsy tokens are recognised; anything else is an error.
    Strict,
}

/// Options consulted by the conversion chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Boolean string policy.
    #[serde(default)]
    pub bool_parsing: BoolParsing,
}

/// A type that can be produced from a dynamic [`Value`].
///
/// All hooks default to "not applicable"; [`convert`] tries them in order
/// and fails with [`ConvertError::Unsupported`] when none applies.
pub trait Dynamic: Sized {
    /// Type name used in conversion errors.
    fn type_name() -> &'static str;

    /// Returns the value unchanged when the input already has this type.
    fn direct(_value: &Value) -> Option<Self> {
        None
    }

    /// Delegates to a settable wrapper, if this type is one.
    fn settable(_value: &Value, _options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        None
    }

    /// Applies type-directed coercion rules.
    fn coerce(_value: &Value, _options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        None
    }
}

/// Converts `value` into `T` using the fallback chain described in the
/// module documentation.
///
/// # Errors
///
/// Returns the wrapper's or coercion rule's error when one of them applies
/// and fails, and [`ConvertError::Unsupported`] when none applies.
pub fn convert<T: Dynamic>(value: &Value, options: &ConvertOptions) -> Result<T, ConvertError> {
    if let Some(converted) = T::direct(value) {
        return Ok(converted);
    }
    if let Some(result) = T::settable(value, options) {
        return result;
    }
    if let Some(result) = T::coerce(value, options) {
        return result;
    }
    Err(ConvertError::Unsupported {
        from: kind_of(value),
        to: T::type_name(),
    })
}

/// Returns the dynamic kind of a value, as used in error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Renders a value using its default string representation.
///
/// Strings are returned as-is; everything else is rendered as compact JSON.
pub fn format_dynamic(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Serializes a bound value back into a dynamic [`Value`].
///
/// Returns `None` when the type refuses to serialize (for example a map with
/// non-string keys).
pub fn to_dynamic<T: Serialize + ?Sized>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unsupported_names_both_types() {
        let err = convert::<i64>(&json!([1, 2]), &ConvertOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "cannot convert array to i64");
    }

    #[test]
    fn test_format_dynamic_round_trips_scalars() {
        let options = ConvertOptions::default();
        for input in [json!("42"), json!("-7"), json!("2.5"), json!("true")] {
            let text = format_dynamic(&input);
            let back = match text.as_str() {
                "true" => to_dynamic(&convert::<bool>(&input, &options).unwrap()),
                t if t.contains('.') => to_dynamic(&convert::<f64>(&input, &options).unwrap()),
                _ => to_dynamic(&convert::<i64>(&input, &options).unwrap()),
            }
            .unwrap();
            assert_eq!(format_dynamic(&back), text);
        }
    }

    #[test]
    fn test_kind_of() {
        assert_eq!(kind_of(&json!(null)), "null");
        assert_eq!(kind_of(&json!({"a": 1})), "object");
        assert_eq!(kind_of(&json!(1.5)), "number");
    }
}
