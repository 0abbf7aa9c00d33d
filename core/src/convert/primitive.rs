//! Coercion rules for strings, numbers, booleans, and raw JSON values.

use serde_json::{Map, Number, Value};

use super::{BoolParsing, ConvertOptions, Dynamic};
use crate::error::ConvertError;

const TRUTHY: &[&str] = &["true", "1", "yes", "y", "on", "t"];
const FALSY: &[&str] = &["false", "0", "no", "n", "off", "f", ""];

// 2^63 and 2^64 as floats; `as` casts below these bounds are exact after trunc.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

impl Dynamic for String {
    fn type_name() -> &'static str {
        "string"
    }

    fn direct(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }

    fn coerce(value: &Value, _options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        Some(Ok(value.to_string()))
    }
}

impl Dynamic for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn direct(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn coerce(value: &Value, options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        value
            .as_str()
            .map(|s| parse_bool(s, options.bool_parsing))
    }
}

/// Interprets `input` with the fixed truthy/falsy vocabulary.
fn parse_bool(input: &str, policy: BoolParsing) -> Result<bool, ConvertError> {
    let token = input.trim().to_ascii_lowercase();
    if TRUTHY.contains(&token.as_str()) {
        return Ok(true);
    }
    match policy {
        BoolParsing::Lenient => Ok(false),
        BoolParsing::Strict if FALSY.contains(&token.as_str()) => Ok(false),
        BoolParsing::Strict => Err(ConvertError::InvalidBool(input.to_string())),
    }
}

impl Dynamic for Value {
    fn type_name() -> &'static str {
        "value"
    }

    fn direct(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl Dynamic for Map<String, Value> {
    fn type_name() -> &'static str {
        "object"
    }

    fn direct(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

fn out_of_range<T: Dynamic>(value: impl ToString) -> ConvertError {
    ConvertError::OutOfRange {
        value: value.to_string(),
        to: T::type_name(),
    }
}

fn unparsable<T: Dynamic>(input: &str) -> ConvertError {
    ConvertError::Parse {
        input: input.to_string(),
        to: T::type_name(),
    }
}

fn integer_from_float<T>(float: f64) -> Result<T, ConvertError>
where
    T: Dynamic + TryFrom<i64> + TryFrom<u64>,
{
    if !float.is_finite() {
        return Err(out_of_range::<T>(float));
    }
    let truncated = float.trunc();
    if (-I64_BOUND..I64_BOUND).contains(&truncated) {
        T::try_from(truncated as i64).map_err(|_| out_of_range::<T>(float))
    } else if (0.0..U64_BOUND).contains(&truncated) {
        T::try_from(truncated as u64).map_err(|_| out_of_range::<T>(float))
    } else {
        Err(out_of_range::<T>(float))
    }
}

fn integer_from_number<T>(number: &Number) -> Result<T, ConvertError>
where
    T: Dynamic + TryFrom<i64> + TryFrom<u64>,
{
    if let Some(signed) = number.as_i64() {
        return T::try_from(signed).map_err(|_| out_of_range::<T>(number));
    }
    if let Some(unsigned) = number.as_u64() {
        return T::try_from(unsigned).map_err(|_| out_of_range::<T>(number));
    }
    match number.as_f64() {
        Some(float) => integer_from_float(float),
        None => Err(unparsable::<T>(&number.to_string())),
    }
}

fn integer_from_str<T>(input: &str) -> Result<T, ConvertError>
where
    T: Dynamic + TryFrom<i64> + TryFrom<u64>,
{
    let trimmed = input.trim();
    if let Ok(signed) = trimmed.parse::<i64>() {
        return T::try_from(signed).map_err(|_| out_of_range::<T>(trimmed));
    }
    if let Ok(unsigned) = trimmed.parse::<u64>() {
        return T::try_from(unsigned).map_err(|_| out_of_range::<T>(trimmed));
    }
    match trimmed.parse::<f64>() {
        Ok(float) if float.is_finite() => integer_from_float(float),
        Ok(_) | Err(_) => Err(unparsable::<T>(input)),
    }
}

macro_rules! integer_dynamic {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Dynamic for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }

                fn coerce(
                    value: &Value,
                    _options: &ConvertOptions,
                ) -> Option<Result<Self, ConvertError>> {
                    match value {
                        Value::Number(number) => Some(integer_from_number(number)),
                        Value::String(s) => Some(integer_from_str(s)),
                        _ => None,
                    }
                }
            }
        )*
    };
}

integer_dynamic!(i8, i16, i32, u8, u16, u32, isize, usize);

impl Dynamic for i64 {
    fn type_name() -> &'static str {
        "i64"
    }

    fn direct(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn coerce(value: &Value, _options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        match value {
            Value::Number(number) => Some(integer_from_number(number)),
            Value::String(s) => Some(integer_from_str(s)),
            _ => None,
        }
    }
}

impl Dynamic for u64 {
    fn type_name() -> &'static str {
        "u64"
    }

    fn direct(value: &Value) -> Option<Self> {
        value.as_u64()
    }

    fn coerce(value: &Value, _options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        match value {
            Value::Number(number) => Some(integer_from_number(number)),
            Value::String(s) => Some(integer_from_str(s)),
            _ => None,
        }
    }
}

fn float_from_str(input: &str) -> Result<f64, ConvertError> {
    input
        .trim()
        .parse::<f64>()
        .map_err(|_| unparsable::<f64>(input))
}

impl Dynamic for f64 {
    fn type_name() -> &'static str {
        "f64"
    }

    fn direct(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_f64(),
            _ => None,
        }
    }

    fn coerce(value: &Value, _options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        value.as_str().map(float_from_str)
    }
}

impl Dynamic for f32 {
    fn type_name() -> &'static str {
        "f32"
    }

    fn coerce(value: &Value, _options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        let wide = match value {
            Value::Number(number) => number.as_f64().map(Ok),
            Value::String(s) => Some(float_from_str(s)),
            _ => None,
        }?;
        Some(wide.and_then(|float| {
            if float.is_finite() && float.abs() > f64::from(f32::MAX) {
                Err(out_of_range::<f32>(float))
            } else {
                Ok(float as f32)
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::convert::convert;

    fn lenient() -> ConvertOptions {
        ConvertOptions::default()
    }

    fn strict() -> ConvertOptions {
        ConvertOptions {
            bool_parsing: BoolParsing::Strict,
        }
    }

    #[test]
    fn test_string_target_stringifies_everything() {
        assert_eq!(convert::<String>(&json!("x"), &lenient()).unwrap(), "x");
        assert_eq!(convert::<String>(&json!(42), &lenient()).unwrap(), "42");
        assert_eq!(convert::<String>(&json!(1.5), &lenient()).unwrap(), "1.5");
        assert_eq!(convert::<String>(&json!(true), &lenient()).unwrap(), "true");
        assert_eq!(
            convert::<String>(&json!({"a": 1}), &lenient()).unwrap(),
            r#"{"a":1}"#
        );
    }

    #[test]
    fn test_integer_targets() {
        assert_eq!(convert::<i32>(&json!(" 42 "), &lenient()).unwrap(), 42);
        assert_eq!(convert::<i64>(&json!(-3.9), &lenient()).unwrap(), -3);
        assert_eq!(convert::<u16>(&json!("3.7"), &lenient()).unwrap(), 3);
        assert_eq!(convert::<u64>(&json!(u64::MAX), &lenient()).unwrap(), u64::MAX);
        assert_eq!(convert::<i8>(&json!(-128), &lenient()).unwrap(), -128);
    }

    #[test]
    fn test_integer_rejections() {
        assert!(matches!(
            convert::<i32>(&json!("abc"), &lenient()),
            Err(ConvertError::Parse { .. })
        ));
        assert!(matches!(
            convert::<i32>(&json!("1.2.3"), &lenient()),
            Err(ConvertError::Parse { .. })
        ));
        assert!(matches!(
            convert::<u8>(&json!(256), &lenient()),
            Err(ConvertError::OutOfRange { .. })
        ));
        assert!(matches!(
            convert::<u32>(&json!("-1"), &lenient()),
            Err(ConvertError::OutOfRange { .. })
        ));
        assert!(matches!(
            convert::<i64>(&json!(true), &lenient()),
            Err(ConvertError::Unsupported { from: "bool", to: "i64" })
        ));
    }

    #[test]
    fn test_float_targets() {
        assert_eq!(convert::<f64>(&json!(3), &lenient()).unwrap(), 3.0);
        assert_eq!(convert::<f64>(&json!("2.25"), &lenient()).unwrap(), 2.25);
        assert!(convert::<f64>(&json!("inf"), &lenient()).unwrap().is_infinite());
        assert!(convert::<f64>(&json!("NaN"), &lenient()).unwrap().is_nan());
        assert_eq!(convert::<f32>(&json!(0.5), &lenient()).unwrap(), 0.5);
        assert!(matches!(
            convert::<f32>(&json!(1e300), &lenient()),
            Err(ConvertError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_bool_vocabulary_lenient() {
        for token in ["true", "TRUE", "True", "1", "yes", "y", "on", "t", " Yes "] {
            assert!(convert::<bool>(&json!(token), &lenient()).unwrap(), "{token}");
        }
        for token in ["false", "0", "yess", "nope", ""] {
            assert!(!convert::<bool>(&json!(token), &lenient()).unwrap(), "{token}");
        }
        assert!(convert::<bool>(&json!(true), &lenient()).unwrap());
    }

    #[test]
    fn test_bool_vocabulary_strict() {
        assert!(!convert::<bool>(&json!("off"), &strict()).unwrap());
        assert!(convert::<bool>(&json!("on"), &strict()).unwrap());
        assert_eq!(
            convert::<bool>(&json!("yess"), &strict()).unwrap_err(),
            ConvertError::InvalidBool("yess".into())
        );
    }

    #[test]
    fn test_bool_rejects_numbers() {
        assert!(convert::<bool>(&json!(1), &lenient()).is_err());
    }

    #[test]
    fn test_value_and_map_targets() {
        let input = json!({"a": [1, 2]});
        assert_eq!(convert::<Value>(&input, &lenient()).unwrap(), input);
        let map = convert::<Map<String, Value>>(&input, &lenient()).unwrap();
        assert_eq!(map["a"], json!([1, 2]));
        assert!(convert::<Map<String, Value>>(&json!("x"), &lenient()).is_err());
    }
}
