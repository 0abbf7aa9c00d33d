//! Validator pipeline and the built-in validator catalogue.
//!
//! A [`Validator`] is a predicate over a field's current value. It receives
//! `None` when the field was not assigned during the run and must not fail
//! on that alone; only [`Required`] treats absence as a failure, and it asks
//! the run for the field's presence instead of inspecting the value.
//!
//! Validators run in declaration order and the first failure is reported.
//!
//! ```
//! use databind_core::*;
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct Signup {
//!     age: u32,
//! }
//!
//! let schema = Schema::new().field(
//!     Scalar::new("age", |s: &mut Signup| &mut s.age)
//!         .validator(required())
//!         .validator(min(18).with_message("too young")),
//! );
//!
//! let data = json!({"age": 12});
//! let mut signup = Signup::default();
//! let errors = schema.apply(data.as_object().unwrap(), &mut signup).unwrap_err();
//! assert_eq!(errors.to_string(), "age: too young");
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::convert::format_dynamic;
use crate::error::ValidationError;
use crate::schema::FieldContext;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("static regex must compile")
});

/// A named predicate over a field's current value.
pub trait Validator: Send + Sync {
    /// Checks `value`, the field's value for this run (`None` when unassigned).
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the violated rule.
    fn validate(&self, value: Option<&Value>, cx: &FieldContext<'_>) -> Result<(), ValidationError>;
}

impl Validator for Box<dyn Validator> {
    fn validate(&self, value: Option<&Value>, cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        (**self).validate(value, cx)
    }
}

/// Extension methods available on every validator.
pub trait ValidatorExt: Validator + Sized {
    /// Replaces the validator's error message with `message`.
    fn with_message(self, message: impl Into<String>) -> WithMessage<Self> {
        WithMessage {
            inner: self,
            message: message.into(),
        }
    }
}

impl<V: Validator> ValidatorExt for V {}

/// Validator wrapper overriding the inner validator's message.
pub struct WithMessage<V> {
    inner: V,
    message: String,
}

impl<V> WithMessage<V> {
    /// Wraps `inner`, reporting `message` on failure.
    pub fn new(inner: V, message: impl Into<String>) -> Self {
        Self {
            inner,
            message: message.into(),
        }
    }
}

impl<V: Validator> Validator for WithMessage<V> {
    fn validate(&self, value: Option<&Value>, cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        self.inner
            .validate(value, cx)
            .map_err(|_| ValidationError::new(self.message.clone()))
    }
}

/// Returns `true` for values that count as empty for [`Required`].
///
/// Empty strings, empty collections, and `null` are empty; numbers and
/// booleans never are, whatever their value.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Requires the field's key to be present and its value non-empty.
///
/// A field whose assignment failed is not reported again.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

/// Returns a [`Required`] validator.
pub fn required() -> Required {
    Required
}

impl Validator for Required {
    fn validate(&self, value: Option<&Value>, cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        if cx.assign_failed() {
            return Ok(());
        }
        if !cx.is_present() || value.is_none_or(is_empty_value) {
            return Err(ValidationError::new("field is required"));
        }
        Ok(())
    }
}

/// Lower bound on numeric values.
#[derive(Debug, Clone, Copy)]
pub struct Min(f64);

/// Returns a validator requiring numeric values of at least `bound`.
pub fn min(bound: impl Into<f64>) -> Min {
    Min(bound.into())
}

impl Validator for Min {
    fn validate(&self, value: Option<&Value>, _cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        match value.and_then(Value::as_f64) {
            Some(n) if n < self.0 => Err(ValidationError::new(format!(
                "value must be at least {}",
                self.0
            ))),
            _ => Ok(()),
        }
    }
}

/// Upper bound on numeric values.
#[derive(Debug, Clone, Copy)]
pub struct Max(f64);

/// Returns a validator requiring numeric values of at most `bound`.
pub fn max(bound: impl Into<f64>) -> Max {
    Max(bound.into())
}

impl Validator for Max {
    fn validate(&self, value: Option<&Value>, _cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        match value.and_then(Value::as_f64) {
            Some(n) if n > self.0 => Err(ValidationError::new(format!(
                "value must be at most {}",
                self.0
            ))),
            _ => Ok(()),
        }
    }
}

/// Length of strings (in characters), sequences, and mappings.
fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(entries) => Some(entries.len()),
        _ => None,
    }
}

/// Bounds on the length of strings, sequences, and mappings.
#[derive(Debug, Clone, Copy)]
pub struct Length {
    min: Option<usize>,
    max: Option<usize>,
}

/// Requires a length of at least `min`.
pub fn min_length(min: usize) -> Length {
    Length {
        min: Some(min),
        max: None,
    }
}

/// Requires a length of at most `max`.
pub fn max_length(max: usize) -> Length {
    Length {
        min: None,
        max: Some(max),
    }
}

/// Requires a length within `min..=max`.
pub fn length(min: usize, max: usize) -> Length {
    Length {
        min: Some(min),
        max: Some(max),
    }
}

impl Validator for Length {
    fn validate(&self, value: Option<&Value>, _cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        let Some(len) = value.and_then(length_of) else {
            return Ok(());
        };
        if let Some(min) = self.min.filter(|&min| len < min) {
            return Err(ValidationError::new(format!(
                "length must be at least {min}"
            )));
        }
        if let Some(max) = self.max.filter(|&max| len > max) {
            return Err(ValidationError::new(format!("length must be at most {max}")));
        }
        Ok(())
    }
}

/// Restricts values to a fixed set.
#[derive(Debug, Clone)]
pub struct OneOf(Vec<Value>);

/// Returns a validator accepting only the listed values.
pub fn one_of<I, V>(allowed: I) -> OneOf
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    OneOf(allowed.into_iter().map(Into::into).collect())
}

impl Validator for OneOf {
    fn validate(&self, value: Option<&Value>, _cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        match value {
            Some(v) if !self.0.contains(v) => {
                let allowed: Vec<String> = self.0.iter().map(format_dynamic).collect();
                Err(ValidationError::new(format!(
                    "value must be one of: {}",
                    allowed.join(", ")
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Requires string values to match a regular expression.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Wraps an already compiled expression.
    pub fn from_regex(regex: Regex) -> Self {
        Self(regex)
    }
}

/// Compiles `pattern` into a validator.
///
/// # Errors
///
/// Returns the regex compilation error for invalid patterns.
pub fn pattern(pattern: &str) -> Result<Pattern, regex::Error> {
    Regex::new(pattern).map(Pattern)
}

impl Validator for Pattern {
    fn validate(&self, value: Option<&Value>, _cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        match value.and_then(Value::as_str) {
            Some(s) if !self.0.is_match(s) => Err(ValidationError::new(format!(
                "value does not match pattern {}",
                self.0.as_str()
            ))),
            _ => Ok(()),
        }
    }
}

/// Requires string values to look like an email address.
#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

/// Returns an [`Email`] validator.
pub fn email() -> Email {
    Email
}

impl Validator for Email {
    fn validate(&self, value: Option<&Value>, _cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        match value.and_then(Value::as_str) {
            Some(s) if !s.is_empty() && !EMAIL_RE.is_match(s) => Err(ValidationError::new(
                "value must be a valid email address",
            )),
            _ => Ok(()),
        }
    }
}

/// Requires the value to equal another field's value in the same run.
#[derive(Debug, Clone)]
pub struct EqualsField(String);

/// Returns a validator comparing against the field named `other`.
pub fn equals_field(other: impl Into<String>) -> EqualsField {
    EqualsField(other.into())
}

impl Validator for EqualsField {
    fn validate(&self, value: Option<&Value>, cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        let Some(value) = value else {
            return Ok(());
        };
        if cx.field_value(&self.0) == Some(value) {
            Ok(())
        } else {
            Err(ValidationError::new(format!("value must match {}", self.0)))
        }
    }
}

/// Validator built from a closure.
pub struct FnValidator<F>(F);

/// Wraps a closure as a validator.
///
/// The closure receives the value and the field context and returns the
/// failure message on rejection.
pub fn from_fn<F, E>(f: F) -> FnValidator<F>
where
    F: Fn(Option<&Value>, &FieldContext<'_>) -> Result<(), E> + Send + Sync,
    E: fmt::Display,
{
    FnValidator(f)
}

impl<F, E> Validator for FnValidator<F>
where
    F: Fn(Option<&Value>, &FieldContext<'_>) -> Result<(), E> + Send + Sync,
    E: fmt::Display,
{
    fn validate(&self, value: Option<&Value>, cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        (self.0)(value, cx).map_err(|e| ValidationError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::Run;

    fn run_with(name: &str, present: bool, value: Option<Value>) -> Run {
        let mut run = Run::detached([name]);
        if present {
            run.set_field_present(name);
        }
        run.set_value(name, value);
        run
    }

    fn check(validator: &dyn Validator, present: bool, value: Option<Value>) -> Result<(), String> {
        let run = run_with("f", present, value);
        let cx = run.context(0).expect("field exists");
        validator
            .validate(cx.value(), &cx)
            .map_err(|e| e.message().to_string())
    }

    #[test]
    fn test_required_presence_semantics() {
        assert!(check(&required(), true, Some(json!(0))).is_ok());
        assert!(check(&required(), true, Some(json!(false))).is_ok());
        assert!(check(&required(), true, Some(json!("x"))).is_ok());
        assert_eq!(
            check(&required(), true, Some(json!(""))),
            Err("field is required".into())
        );
        assert!(check(&required(), true, Some(json!([]))).is_err());
        assert!(check(&required(), true, None).is_err());
        assert!(check(&required(), false, None).is_err());
    }

    #[test]
    fn test_min_max() {
        assert_eq!(
            check(&min(18), true, Some(json!(10))),
            Err("value must be at least 18".into())
        );
        assert_eq!(
            check(&max(120), true, Some(json!(121))),
            Err("value must be at most 120".into())
        );
        assert!(check(&min(0.5), true, Some(json!(0.5))).is_ok());
        assert!(check(&min(18), false, None).is_ok());
        assert!(check(&min(18), true, Some(json!("text"))).is_ok());
    }

    #[test]
    fn test_length_counts_chars() {
        assert!(check(&max_length(3), true, Some(json!("äöü"))).is_ok());
        assert_eq!(
            check(&length(2, 3), true, Some(json!([1]))),
            Err("length must be at least 2".into())
        );
        assert_eq!(
            check(&min_length(1), true, Some(json!({}))),
            Err("length must be at least 1".into())
        );
    }

    #[test]
    fn test_one_of_and_pattern() {
        let v = one_of(["red", "green"]);
        assert!(check(&v, true, Some(json!("red"))).is_ok());
        assert_eq!(
            check(&v, true, Some(json!("blue"))),
            Err("value must be one of: red, green".into())
        );

        let p = pattern(r"^\d{4}$").unwrap();
        assert!(check(&p, true, Some(json!("2024"))).is_ok());
        assert!(check(&p, true, Some(json!("24"))).is_err());
        assert!(pattern("(").is_err());
    }

    #[test]
    fn test_email() {
        assert!(check(&email(), true, Some(json!("a.b@example.org"))).is_ok());
        assert!(check(&email(), true, Some(json!("not-an-email"))).is_err());
    }

    #[test]
    fn test_equals_field_reads_other_value() {
        let mut run = Run::detached(["password", "confirm"]);
        run.set_value("password", Some(json!("s3cret")));
        run.set_value("confirm", Some(json!("s3cret")));
        let cx = run.context(1).unwrap();
        assert!(equals_field("password").validate(cx.value(), &cx).is_ok());

        run.set_value("confirm", Some(json!("other")));
        let cx = run.context(1).unwrap();
        assert_eq!(
            equals_field("password")
                .validate(cx.value(), &cx)
                .unwrap_err()
                .message(),
            "value must match password"
        );
    }

    #[test]
    fn test_with_message_and_from_fn() {
        let v = min(5).with_message("too small");
        assert_eq!(check(&v, true, Some(json!(1))), Err("too small".into()));

        let even = from_fn(|value: Option<&Value>, _cx: &FieldContext<'_>| match value
            .and_then(Value::as_i64)
        {
            Some(n) if n % 2 != 0 => Err("must be even"),
            _ => Ok(()),
        });
        assert_eq!(check(&even, true, Some(json!(3))), Err("must be even".into()));
        assert!(check(&even, true, Some(json!(4))).is_ok());
    }
}
