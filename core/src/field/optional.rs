use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{
    AcceptsDefault, AcceptsTransformers, Assignment, Context, Decode, Field, FieldMeta,
    FieldShape, Lens, Preset, Snapshot, configure, field_common, object_decoder, raw,
    serialized, value_decoder,
};
use crate::convert::Dynamic;
use crate::error::BindError;
use crate::schema::Schema;
use crate::transform::{Transformer, run_pipeline};
use crate::validate::Validator;

/// Binds a nullable value or a nullable nested object into `Option<T>`.
///
/// An explicit empty string resets the target to `None`; `null` leaves it
/// untouched. Nested objects are bound into a fresh `T::default()`.
///
/// ```
/// use databind_core::*;
/// use serde_json::json;
///
/// #[derive(Default)]
/// struct Address {
///     city: String,
/// }
///
/// #[derive(Default)]
/// struct Customer {
///     nickname: Option<String>,
///     billing: Option<Address>,
/// }
///
/// let schema = Schema::new()
///     .field(Optional::new("nickname", |c: &mut Customer| &mut c.nickname))
///     .field(Optional::object("billing", |c: &mut Customer| &mut c.billing, |s| {
///         s.field(Scalar::new("city", |a: &mut Address| &mut a.city).validator(required()))
///     }));
///
/// let mut customer = Customer::default();
/// let data = json!({"nickname": "JJ", "billing": {"city": "Oslo"}});
/// schema.apply(data.as_object().unwrap(), &mut customer).unwrap();
/// assert_eq!(customer.nickname.as_deref(), Some("JJ"));
/// assert_eq!(customer.billing.unwrap().city, "Oslo");
/// ```
pub struct Optional<S, T> {
    meta: FieldMeta,
    lens: Lens<S, Option<T>>,
    decode: Decode<T>,
    snapshot: Snapshot<T>,
    transformers: Vec<Box<dyn Transformer<T>>>,
    default: Option<Preset<T>>,
}

field_common!(Optional<S, T>);

impl<S, T> Optional<S, T>
where
    T: Send + Sync + 'static,
{
    /// Creates a nullable value field.
    pub fn new<F>(name: impl Into<String>, lens: F) -> Self
    where
        F: Fn(&mut S) -> &mut Option<T> + Send + Sync + 'static,
        T: Dynamic + Serialize,
    {
        Self {
            meta: FieldMeta::new(name),
            lens: Box::new(lens),
            decode: value_decoder(),
            snapshot: serialized::<T>,
            transformers: Vec::new(),
            default: None,
        }
    }

    /// Creates a nullable nested-object field whose schema is built by
    /// `build`.
    pub fn object<F, B>(name: impl Into<String>, lens: F, build: B) -> Self
    where
        F: Fn(&mut S) -> &mut Option<T> + Send + Sync + 'static,
        B: FnOnce(Schema<T>) -> Schema<T>,
        T: Default,
    {
        Self::object_with(name, lens, configure(build))
    }

    /// Creates a nullable nested-object field bound through `schema`.
    pub fn object_with<F>(name: impl Into<String>, lens: F, schema: Arc<Schema<T>>) -> Self
    where
        F: Fn(&mut S) -> &mut Option<T> + Send + Sync + 'static,
        T: Default,
    {
        Self {
            meta: FieldMeta::new(name),
            lens: Box::new(lens),
            decode: object_decoder(schema),
            snapshot: raw::<T>,
            transformers: Vec::new(),
            default: None,
        }
    }
}

impl<S, T> AcceptsDefault<T> for Optional<S, T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    fn set_default(&mut self, value: T) {
        self.default = Some(Preset::new(value));
    }
}

impl<S, T> AcceptsTransformers<T> for Optional<S, T> {
    fn add_transformer(&mut self, transformer: Box<dyn Transformer<T>>) {
        self.transformers.push(transformer);
    }
}

impl<S, T> Field<S> for Optional<S, T>
where
    T: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    fn shape(&self) -> FieldShape {
        FieldShape::Optional
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
                    let (value, snapshot) = default.apply();
                    *(self.lens)(target) = Some(value);
                    Assignment::Defaulted(snapshot)
                }
                None => Assignment::Absent,
            });
        };

        match raw {
            Value::Null => Ok(Assignment::Reset),
            Value::String(s) if s.is_empty() => {
                *(self.lens)(target) = None;
                Ok(Assignment::Reset)
            }
            _ => {
                let value = (self.decode)(raw, cx)?;
                let value = run_pipeline(&self.transformers, value)?;
                let snapshot = (self.snapshot)(&value, raw);
                *(self.lens)(target) = Some(value);
                Ok(Assignment::Assigned(snapshot))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{AcceptsValidators, Scalar, required};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Inner {
        id: u32,
    }

    #[derive(Debug, Default)]
    struct Outer {
        note: Option<String>,
        inner: Option<Inner>,
    }

    fn schema() -> Schema<Outer> {
        Schema::new()
            .field(Optional::new("note", |o: &mut Outer| &mut o.note))
            .field(Optional::object("inner", |o: &mut Outer| &mut o.inner, |s| {
                s.field(Scalar::new("id", |i: &mut Inner| &mut i.id).validator(required()))
            }))
    }

    #[test]
    fn test_empty_string_resets_to_none_and_null_keeps() {
        let mut outer = Outer {
            note: Some("old".into()),
            inner: Some(Inner { id: 4 }),
        };
        let binding = schema().run(
            json!({"note": "", "inner": null}).as_object().unwrap(),
            &mut outer,
        );
        assert!(binding.errors().is_empty());
        assert_eq!(outer.note, None);
        assert_eq!(outer.inner, Some(Inner { id: 4 }));
        assert!(!binding.run().was_assigned("inner"));
    }

    #[test]
    fn test_nested_object_errors_propagate() {
        let mut outer = Outer::default();
        let errors = schema()
            .apply(json!({"inner": {}}).as_object().unwrap(), &mut outer)
            .unwrap_err();
        assert_eq!(errors.to_string(), "inner: id: field is required");
        assert_eq!(outer.inner, None);
    }

    #[test]
    fn test_nested_object_requires_mapping() {
        let mut outer = Outer::default();
        let errors = schema()
            .apply(json!({"inner": [1]}).as_object().unwrap(), &mut outer)
            .unwrap_err();
        assert_eq!(errors.to_string(), "inner: expected object, got array");
    }
}
