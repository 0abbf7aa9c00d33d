//! Transformer pipeline and built-in string/ordering transformers.
//!
//! Transformers run after conversion and before the value is written to its
//! target, in declaration order. The first failure aborts the pipeline and
//! becomes the field's assignment error.

use std::fmt;

use crate::error::TransformError;

/// A fallible `T -> T` mapping.
pub trait Transformer<T>: Send + Sync {
    /// Maps `value` to its transformed form.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] when the value cannot be transformed.
    fn transform(&self, value: T) -> Result<T, TransformError>;
}

impl<T> Transformer<T> for Box<dyn Transformer<T>> {
    fn transform(&self, value: T) -> Result<T, TransformError> {
        (**self).transform(value)
    }
}

/// Runs `value` through `transformers` in order.
pub(crate) fn run_pipeline<T>(
    transformers: &[Box<dyn Transformer<T>>],
    value: T,
) -> Result<T, TransformError> {
    transformers
        .iter()
        .try_fold(value, |value, transformer| transformer.transform(value))
}

/// Removes leading and trailing whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trim;

/// Returns a [`Trim`] transformer.
pub fn trim() -> Trim {
    Trim
}

impl Transformer<String> for Trim {
    fn transform(&self, value: String) -> Result<String, TransformError> {
        Ok(value.trim().to_string())
    }
}

/// Lowercases the whole string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lowercase;

/// Returns a [`Lowercase`] transformer.
pub fn lowercase() -> Lowercase {
    Lowercase
}

impl Transformer<String> for Lowercase {
    fn transform(&self, value: String) -> Result<String, TransformError> {
        Ok(value.to_lowercase())
    }
}

/// Uppercases the whole string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uppercase;

/// Returns an [`Uppercase`] transformer.
pub fn uppercase() -> Uppercase {
    Uppercase
}

impl Transformer<String> for Uppercase {
    fn transform(&self, value: String) -> Result<String, TransformError> {
        Ok(value.to_uppercase())
    }
}

/// Uppercases the first character and leaves the rest untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capitalize;

/// Returns a [`Capitalize`] transformer.
pub fn capitalize() -> Capitalize {
    Capitalize
}

impl Transformer<String> for Capitalize {
    fn transform(&self, value: String) -> Result<String, TransformError> {
        let mut chars = value.chars();
        Ok(match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => value,
        })
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollapseWhitespace;

/// Returns a [`CollapseWhitespace`] transformer.
pub fn collapse_whitespace() -> CollapseWhitespace {
    CollapseWhitespace
}

impl Transformer<String> for CollapseWhitespace {
    fn transform(&self, value: String) -> Result<String, TransformError> {
        Ok(value.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Cuts strings down to at most `n` characters.
#[derive(Debug, Clone, Copy)]
pub struct Truncate(usize);

/// Returns a transformer keeping the first `n` characters.
pub fn truncate(n: usize) -> Truncate {
    Truncate(n)
}

impl Transformer<String> for Truncate {
    fn transform(&self, value: String) -> Result<String, TransformError> {
        match value.char_indices().nth(self.0) {
            Some((cut, _)) => Ok(value[..cut].to_string()),
            None => Ok(value),
        }
    }
}

/// Restricts ordered values to `min..=max`.
#[derive(Debug, Clone)]
pub struct Clamp<T> {
    min: T,
    max: T,
}

/// Returns a transformer clamping values into `min..=max`.
pub fn clamp<T: PartialOrd>(min: T, max: T) -> Clamp<T> {
    Clamp { min, max }
}

impl<T> Transformer<T> for Clamp<T>
where
    T: PartialOrd + Clone + Send + Sync,
{
    fn transform(&self, value: T) -> Result<T, TransformError> {
        if value < self.min {
            Ok(self.min.clone())
        } else if value > self.max {
            Ok(self.max.clone())
        } else {
            Ok(value)
        }
    }
}

/// Transformer built from a closure.
pub struct FnTransformer<F>(F);

/// Wraps a fallible closure as a transformer.
///
/// ```
/// use databind_core::{Transformer, transform};
///
/// let slug = transform::from_fn(|s: String| {
///     if s.contains('/') {
///         Err("slashes are not allowed")
///     } else {
///         Ok(s.replace(' ', "-"))
///     }
/// });
/// assert_eq!(slug.transform("a b".to_string()).unwrap(), "a-b");
/// assert!(slug.transform("a/b".to_string()).is_err());
/// ```
pub fn from_fn<F, T, E>(f: F) -> FnTransformer<F>
where
    F: Fn(T) -> Result<T, E> + Send + Sync,
    E: fmt::Display,
{
    FnTransformer(f)
}

impl<F, T, E> Transformer<T> for FnTransformer<F>
where
    F: Fn(T) -> Result<T, E> + Send + Sync,
    E: fmt::Display,
{
    fn transform(&self, value: T) -> Result<T, TransformError> {
        (self.0)(value).map_err(|e| TransformError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_runs_in_order() {
        let pipeline: Vec<Box<dyn Transformer<String>>> =
            vec![Box::new(trim()), Box::new(capitalize())];
        assert_eq!(run_pipeline(&pipeline, "  john  ".into()).unwrap(), "John");
    }

    #[test]
    fn test_pipeline_stops_at_first_failure() {
        let pipeline: Vec<Box<dyn Transformer<i32>>> = vec![
            Box::new(from_fn(|n: i32| if n < 0 { Err("negative") } else { Ok(n) })),
            Box::new(from_fn(|_: i32| -> Result<i32, &str> { Err("unreachable") })),
        ];
        assert_eq!(run_pipeline(&pipeline, -1).unwrap_err().message(), "negative");
    }

    #[test]
    fn test_string_transformers() {
        assert_eq!(lowercase().transform("AbC".into()).unwrap(), "abc");
        assert_eq!(uppercase().transform("abc".into()).unwrap(), "ABC");
        assert_eq!(capitalize().transform(String::new()).unwrap(), "");
        assert_eq!(capitalize().transform("élan".into()).unwrap(), "Élan");
        assert_eq!(
            collapse_whitespace().transform(" a \t b\n c ".into()).unwrap(),
            "a b c"
        );
        assert_eq!(truncate(2).transform("äöü".into()).unwrap(), "äö");
        assert_eq!(truncate(5).transform("ab".into()).unwrap(), "ab");
    }

    #[test]
    fn test_clamp() {
        let c = clamp(1, 10);
        assert_eq!(c.transform(0).unwrap(), 1);
        assert_eq!(c.transform(11).unwrap(), 10);
        assert_eq!(c.transform(5).unwrap(), 5);
    }
}
