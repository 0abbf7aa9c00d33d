use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ConvertOptions, Dynamic, convert};
use crate::error::ConvertError;

/// A type that can set itself from a dynamic value.
///
/// Types implementing this capability take over conversion entirely: the
/// conversion chain hands them the raw value and propagates their error
/// unchanged.
///
/// ```
/// use databind_core::{ConvertError, ConvertOptions, Dynamic, SetDynamic};
/// use databind_core::convert::convert;
/// use serde_json::{Value, json};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Percent(u8);
///
/// impl SetDynamic for Percent {
///     fn set_dynamic(&mut self, value: &Value, options: &ConvertOptions) -> Result<(), ConvertError> {
///         let n: u8 = convert(value, options)?;
///         if n > 100 {
///             return Err(ConvertError::Custom(format!("{n}% is more than everything")));
///         }
///         self.0 = n;
///         Ok(())
///     }
/// }
///
/// impl Dynamic for Percent {
///     fn type_name() -> &'static str {
///         "percent"
///     }
///
///     fn settable(value: &Value, options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
///         let mut percent = Percent::default();
///         Some(percent.set_dynamic(value, options).map(|()| percent))
///     }
/// }
///
/// let options = ConvertOptions::default();
/// assert_eq!(convert::<Percent>(&json!("40"), &options).unwrap(), Percent(40));
/// let err = convert::<Percent>(&json!(120), &options).unwrap_err();
/// assert_eq!(err.to_string(), "120% is more than everything");
/// ```
pub trait SetDynamic {
    /// Updates `self` from `value`.
    ///
    /// # Errors
    ///
    /// Returns the wrapper's own conversion failure.
    fn set_dynamic(&mut self, value: &Value, options: &ConvertOptions) -> Result<(), ConvertError>;
}

/// Nullable scalar wrapper.
///
/// Unlike `Option<T>` at field level, a `Nullable<T>` treats an explicit
/// `null` as a regular value (the "null" state) instead of a reset, which
/// makes it usable inside collections.
///
/// ```
/// use databind_core::{ConvertOptions, Nullable};
/// use databind_core::convert::convert;
/// use serde_json::json;
///
/// let options = ConvertOptions::default();
/// let values: Vec<Nullable<i64>> = [json!(1), json!(null), json!("3")]
///     .iter()
///     .map(|v| convert(v, &options).unwrap())
///     .collect();
///
/// assert_eq!(values[0].get(), Some(&1));
/// assert!(values[1].is_null());
/// assert_eq!(values[2].get(), Some(&3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nullable<T> {
    value: Option<T>,
}

impl<T> Nullable<T> {
    /// Creates a wrapper holding `value`.
    pub fn new(value: T) -> Self {
        Self { value: Some(value) }
    }

    /// Creates a wrapper in the null state.
    pub fn null() -> Self {
        Self { value: None }
    }

    /// Returns `true` when the wrapper holds no value.
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Returns the wrapped value, if any.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Unwraps into an `Option`.
    pub fn into_option(self) -> Option<T> {
        self.value
    }
}

impl<T> Default for Nullable<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        Self { value }
    }
}

impl<T: Dynamic> SetDynamic for Nullable<T> {
    fn set_dynamic(&mut self, value: &Value, options: &ConvertOptions) -> Result<(), ConvertError> {
        self.value = match value {
            Value::Null => None,
            other => Some(convert(other, options)?),
        };
        Ok(())
    }
}

impl<T: Dynamic> Dynamic for Nullable<T> {
    fn type_name() -> &'static str {
        T::type_name()
    }

    fn settable(value: &Value, options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        let mut wrapper = Self::null();
        Some(wrapper.set_dynamic(value, options).map(|()| wrapper))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_null_sets_null_state() {
        let n: Nullable<String> = convert(&json!(null), &ConvertOptions::default()).unwrap();
        assert!(n.is_null());
    }

    #[test]
    fn test_inner_failure_propagates_verbatim() {
        let err = convert::<Nullable<u8>>(&json!("many"), &ConvertOptions::default()).unwrap_err();
        assert_eq!(
            err,
            ConvertError::Parse {
                input: "many".into(),
                to: "u8"
            }
        );
    }

    #[derive(Debug, Default, PartialEq)]
    struct Even(u32);

    impl SetDynamic for Even {
        fn set_dynamic(
            &mut self,
            value: &Value,
            options: &ConvertOptions,
        ) -> Result<(), ConvertError> {
            let n: u32 = convert(value, options)?;
            if n % 2 == 1 {
                return Err(ConvertError::Custom(format!("{n} is odd")));
            }
            self.0 = n;
            Ok(())
        }
    }

    impl Dynamic for Even {
        fn type_name() -> &'static str {
            "even number"
        }

        fn settable(value: &Value, options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
            let mut even = Even::default();
            Some(even.set_dynamic(value, options).map(|()| even))
        }
    }

    #[test]
    fn test_custom_wrapper_error_propagates() {
        let options = ConvertOptions::default();
        assert_eq!(convert::<Even>(&json!("4"), &options).unwrap(), Even(4));
        assert_eq!(
            convert::<Nullable<Even>>(&json!(3), &options).unwrap_err(),
            ConvertError::Custom("3 is odd".into())
        );
    }

    #[test]
    fn test_serializes_transparently() {
        assert_eq!(serde_json::to_value(Nullable::new(5)).unwrap(), json!(5));
        assert_eq!(serde_json::to_value(Nullable::<i32>::null()).unwrap(), json!(null));
    }
}
