use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{
    AcceptsDefault, AcceptsTransformers, Assignment, Context, Decode, Field, FieldMeta,
    FieldShape, Lens, Preset, Snapshot, collected, configure, expect_array, field_common,
    object_decoder, raw, value_decoder,
};
use crate::convert::{Dynamic, to_dynamic};
use crate::error::{BindError, Position};
use crate::schema::Schema;
use crate::transform::{Transformer, run_pipeline};
use crate::validate::Validator;

fn serialized_slice<T: Serialize>(values: &[T]) -> Option<Value> {
    to_dynamic(values)
}

/// Binds a JSON array of exactly `N` elements into `[T; N]`.
///
/// The length is checked before any element is converted; on mismatch the
/// target is left untouched.
pub struct Array<S, T, const N: usize> {
    meta: FieldMeta,
    lens: Lens<S, [T; N]>,
    transformers: Vec<Box<dyn Transformer<T>>>,
    default: Option<Preset<[T; N]>>,
}

field_common!(Array<S, T; const N: usize>);

impl<S, T, const N: usize> Array<S, T, N>
where
    T: Dynamic + Serialize + Send + Sync + 'static,
{
    /// Creates a fixed-size sequence field.
    pub fn new<F>(name: impl Into<String>, lens: F) -> Self
    where
        F: Fn(&mut S) -> &mut [T; N] + Send + Sync + 'static,
    {
        Self {
            meta: FieldMeta::new(name),
            lens: Box::new(lens),
            transformers: Vec::new(),
            default: None,
        }
    }
}

impl<S, T, const N: usize> AcceptsDefault<[T; N]> for Array<S, T, N>
where
    T: Clone + Serialize + Send + Sync + 'static,
    [T; N]: Serialize,
{
    fn set_default(&mut self, value: [T; N]) {
        self.default = Some(Preset::new(value));
    }
}

impl<S, T, const N: usize> AcceptsTransformers<T> for Array<S, T, N> {
    fn add_transformer(&mut self, transformer: Box<dyn Transformer<T>>) {
        self.transformers.push(transformer);
    }
}

impl<S, T, const N: usize> Field<S> for Array<S, T, N>
where
    T: Dynamic + Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    fn shape(&self) -> FieldShape {
        FieldShape::Array
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
                    *(self.lens)(target) = value;
                    Assignment::Defaulted(snapshot)
                }
                None => Assignment::Absent,
            });
        };
        if raw.is_null() {
            return Ok(Assignment::Reset);
        }

        let items = expect_array(raw)?;
        if items.len() != N {
            return Err(BindError::LengthMismatch {
                expected: N,
                actual: items.len(),
            });
        }

        let mut values = Vec::with_capacity(N);
        for (index, item) in items.iter().enumerate() {
            let value = cx
                .convert::<T>(item)
                .map_err(BindError::from)
                .and_then(|value| Ok(run_pipeline(&self.transformers, value)?))
                .map_err(|err| err.at(Position::Index(index)))?;
            values.push(value);
        }

        let snapshot = serialized_slice(&values);
        let values: [T; N] = values.try_into().map_err(|values: Vec<T>| {
            BindError::LengthMismatch {
                expected: N,
                actual: values.len(),
            }
        })?;
        *(self.lens)(target) = values;
        Ok(Assignment::Assigned(snapshot))
    }
}

/// Binds a JSON array of any length into `Vec<T>`.
///
/// Value lists stop at the first failing element. Object lists bind every
/// element into a fresh `T::default()` through the element schema and report
/// all failing elements together. In both cases the target is replaced only
/// when every element succeeded.
///
/// ```
/// use databind_core::*;
/// use serde_json::json;
///
/// #[derive(Default)]
/// struct Line {
///     sku: String,
///     qty: u32,
/// }
///
/// #[derive(Default)]
/// struct Order {
///     tags: Vec<String>,
///     lines: Vec<Line>,
/// }
///
/// let schema = Schema::new()
///     .field(List::new("tags", |o: &mut Order| &mut o.tags).transformer(lowercase()))
///     .field(List::objects("lines", |o: &mut Order| &mut o.lines, |s| {
///         s.field(Scalar::new("sku", |l: &mut Line| &mut l.sku).validator(required()))
///             .field(Scalar::new("qty", |l: &mut Line| &mut l.qty).validator(min(1)))
///     }));
///
/// let mut order = Order::default();
/// let data = json!({
///     "tags": ["RUSH", "Gift"],
///     "lines": [{"sku": "A-1", "qty": 2}, {"sku": "", "qty": 0}],
/// });
/// let errors = schema.apply(data.as_object().unwrap(), &mut order).unwrap_err();
/// assert_eq!(order.tags, ["rush", "gift"]);
/// assert!(order.lines.is_empty());
/// assert_eq!(
///     errors.to_string(),
///     "lines: element 1: sku: field is required; qty: value must be at least 1"
/// );
/// ```
pub struct List<S, T> {
    meta: FieldMeta,
    lens: Lens<S, Vec<T>>,
    decode: Decode<T>,
    snapshot: Snapshot<Vec<T>>,
    collect_all: bool,
    transformers: Vec<Box<dyn Transformer<T>>>,
    default: Option<Preset<Vec<T>>>,
}

field_common!(List<S, T>);

fn serialized_vec<T: Serialize>(values: &Vec<T>, _raw: &Value) -> Option<Value> {
    serialized_slice(values)
}

impl<S, T> List<S, T>
where
    T: Send + Sync + 'static,
{
    /// Creates a list of convertible values.
    pub fn new<F>(name: impl Into<String>, lens: F) -> Self
    where
        F: Fn(&mut S) -> &mut Vec<T> + Send + Sync + 'static,
        T: Dynamic + Serialize,
    {
        Self {
            meta: FieldMeta::new(name),
            lens: Box::new(lens),
            decode: value_decoder(),
            snapshot: serialized_vec::<T>,
            collect_all: false,
            transformers: Vec::new(),
            default: None,
        }
    }

    /// Creates a list of nested objects whose element schema is built by
    /// `build`.
    pub fn objects<F, B>(name: impl Into<String>, lens: F, build: B) -> Self
    where
        F: Fn(&mut S) -> &mut Vec<T> + Send + Sync + 'static,
        B: FnOnce(Schema<T>) -> Schema<T>,
        T: Default,
    {
        Self::objects_with(name, lens, configure(build))
    }

    /// Creates a list of nested objects bound through `schema`.
    pub fn objects_with<F>(name: impl Into<String>, lens: F, schema: Arc<Schema<T>>) -> Self
    where
        F: Fn(&mut S) -> &mut Vec<T> + Send + Sync + 'static,
        T: Default,
    {
        Self {
            meta: FieldMeta::new(name),
            lens: Box::new(lens),
            decode: object_decoder(schema),
            snapshot: raw::<Vec<T>>,
            collect_all: true,
            transformers: Vec::new(),
            default: None,
        }
    }
}

impl<S, T> AcceptsDefault<Vec<T>> for List<S, T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    fn set_default(&mut self, value: Vec<T>) {
        self.default = Some(Preset::new(value));
    }
}

impl<S, T> AcceptsTransformers<T> for List<S, T> {
    fn add_transformer(&mut self, transformer: Box<dyn Transformer<T>>) {
        self.transformers.push(transformer);
    }
}

impl<S, T> List<S, T> {
    fn element(&self, item: &Value, cx: &Context<'_>) -> Result<T, BindError> {
        let value = (self.decode)(item, cx)?;
        Ok(run_pipeline(&self.transformers, value)?)
    }
}

impl<S, T> Field<S> for List<S, T>
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
        FieldShape::List
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
                    *(self.lens)(target) = value;
                    Assignment::Defaulted(snapshot)
                }
                None => Assignment::Absent,
            });
        };
        if raw.is_null() {
            return Ok(Assignment::Reset);
        }

        let items = expect_array(raw)?;
        let mut values = Vec::with_capacity(items.len());
        let mut failures = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match self.element(item, cx) {
                Ok(value) => values.push(value),
                Err(err) if self.collect_all => failures.push(err.at(Position::Index(index))),
                Err(err) => return Err(err.at(Position::Index(index))),
            }
        }
        collected(failures)?;

        let snapshot = (self.snapshot)(&values, raw);
        *(self.lens)(target) = values;
        Ok(Assignment::Assigned(snapshot))
    }
}
