use serde::Serialize;
use serde_json::{Map, Value};

use super::{
    AcceptsDefault, AcceptsTransformers, Assignment, Context, Field, FieldMeta, FieldShape, Lens,
    field_common,
};
use crate::convert::{Dynamic, to_dynamic};
use crate::error::BindError;
use crate::transform::{Transformer, run_pipeline};
use crate::validate::Validator;

/// Binds a single primitive or value type.
///
/// An explicit empty string resets the target to `T::default()` instead of
/// being converted; `null` leaves the target untouched.
///
/// ```
/// use databind_core::*;
/// use serde_json::json;
///
/// #[derive(Default)]
/// struct Person {
///     name: String,
///     age: u32,
/// }
///
/// let schema = Schema::new()
///     .field(
///         Scalar::new("name", |p: &mut Person| &mut p.name)
///             .transformer(trim())
///             .transformer(capitalize()),
///     )
///     .field(Scalar::new("age", |p: &mut Person| &mut p.age).default_value(25));
///
/// let mut person = Person::default();
/// let data = json!({"name": "  john  "});
/// schema.apply(data.as_object().unwrap(), &mut person).unwrap();
/// assert_eq!(person.name, "John");
/// assert_eq!(person.age, 25);
/// ```
pub struct Scalar<S, T> {
    meta: FieldMeta,
    lens: Lens<S, T>,
    transformers: Vec<Box<dyn Transformer<T>>>,
    default: Option<T>,
}

field_common!(Scalar<S, T>);

impl<S, T> Scalar<S, T>
where
    T: Dynamic + Serialize + Default + Clone + Send + Sync + 'static,
{
    /// Creates a field reading `name` into the part of `S` returned by `lens`.
    pub fn new<F>(name: impl Into<String>, lens: F) -> Self
    where
        F: Fn(&mut S) -> &mut T + Send + Sync + 'static,
    {
        Self {
            meta: FieldMeta::new(name),
            lens: Box::new(lens),
            transformers: Vec::new(),
            default: None,
        }
    }
}

impl<S, T> AcceptsDefault<T> for Scalar<S, T> {
    fn set_default(&mut self, value: T) {
        self.default = Some(value);
    }
}

impl<S, T> AcceptsTransformers<T> for Scalar<S, T> {
    fn add_transformer(&mut self, transformer: Box<dyn Transformer<T>>) {
        self.transformers.push(transformer);
    }
}

impl<S, T> Field<S> for Scalar<S, T>
where
    T: Dynamic + Serialize + Default + Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    fn shape(&self) -> FieldShape {
        FieldShape::Scalar
    }

    fn validators(&self) -> &[Box<dyn Validator>] {
        &self.meta.validators
    }

    fn assign(
        &self,
        data: &Map<String, Value>,
        target: &mut S,
        cx: &Context<'_>,
    ) -> Result<Assignment, BindError> {
        let Some(raw) = data.get(&self.meta.name) else {
            return Ok(match &self.default {
                Some(default) => {
                    let snapshot = to_dynamic(default);
                    *(self.lens)(target) = default.clone();
                    Assignment::Defaulted(snapshot)
                }
                None => Assignment::Absent,
            });
        };

        match raw {
            Value::Null => Ok(Assignment::Reset),
            Value::String(s) if s.is_empty() => {
                *(self.lens)(target) = T::default();
                Ok(Assignment::Reset)
            }
            _ => {
                let value = cx.convert::<T>(raw)?;
                let value = run_pipeline(&self.transformers, value)?;
                let snapshot = to_dynamic(&value);
                *(self.lens)(target) = value;
                Ok(Assignment::Assigned(snapshot))
            }
        }
    }
}
