//! Date and time coercions backed by `chrono`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use super::{ConvertOptions, Dynamic};
use crate::error::ConvertError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn unparsable<T: Dynamic>(input: &str) -> ConvertError {
    ConvertError::Parse {
        input: input.to_string(),
        to: T::type_name(),
    }
}

impl Dynamic for NaiveDate {
    fn type_name() -> &'static str {
        "date"
    }

    fn coerce(value: &Value, _options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        let input = value.as_str()?;
        let trimmed = input.trim();
        Some(
            NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.date_naive()))
                .map_err(|_| unparsable::<Self>(input)),
        )
    }
}

impl Dynamic for NaiveDateTime {
    fn type_name() -> &'static str {
        "datetime"
    }

    fn coerce(value: &Value, _options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        let input = value.as_str()?;
        let trimmed = input.trim();
        let parsed = DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok());
        Some(parsed.ok_or_else(|| unparsable::<Self>(input)))
    }
}

impl Dynamic for DateTime<Utc> {
    fn type_name() -> &'static str {
        "timestamp"
    }

    fn coerce(value: &Value, _options: &ConvertOptions) -> Option<Result<Self, ConvertError>> {
        match value {
            Value::String(input) => Some(
                DateTime::parse_from_rfc3339(input.trim())
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| unparsable::<Self>(input)),
            ),
            Value::Number(number) => {
                let seconds = number.as_i64()?;
                Some(
                    DateTime::from_timestamp(seconds, 0).ok_or(ConvertError::OutOfRange {
                        value: number.to_string(),
                        to: Self::type_name(),
                    }),
                )
            }
            _ => None,
        }
    }
}
