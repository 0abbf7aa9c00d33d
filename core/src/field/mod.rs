//! Field variants: the unit of binding between a payload key and a target.
//!
//! Every variant implements the sealed [`Field`] trait and reports its
//! [`FieldShape`], so code that needs to treat shapes differently can match
//! exhaustively on the tag. Configuration is applied through capability
//! traits that each variant implements directly:
//!
//! - [`AcceptsValidators`]: every variant.
//! - [`AcceptsDefault`]: value-bearing variants, applied only when the key is
//!   absent from the payload.
//! - [`AcceptsTransformers`]: value-bearing variants; collections transform
//!   element-wise.
//!
//! Targets are reached through accessor closures of the form
//! `Fn(&mut S) -> &mut T`, which keeps a [`Schema`](crate::Schema) immutable
//! and shareable across runs.

mod check;
mod converted;
mod map;
mod object;
mod optional;
mod scalar;
mod sequence;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::convert::{Dynamic, convert, kind_of, to_dynamic};
use crate::error::{BindError, ConvertError, ValidationError};
use crate::options::ApplyOptions;
use crate::schema::{FieldContext, Schema};
use crate::transform::Transformer;
use crate::validate::Validator;

pub use check::Check;
pub use converted::Converted;
pub use map::{IndexedMap, Mapping, NestedMap, reassemble_indexed};
pub use object::{Object, Union, discriminator};
pub use optional::Optional;
pub use scalar::Scalar;
pub use sequence::{Array, List};

mod sealed {
    pub trait Sealed {}
}

/// Shape tag of a field variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    /// Single primitive or value type.
    Scalar,
    /// Nullable value or nullable nested object.
    Optional,
    /// Fixed-size sequence.
    Array,
    /// Dynamic sequence of values or nested objects.
    List,
    /// Key/value mapping with optional per-pair checks.
    Map,
    /// Mapping whose values are each bound through a schema.
    NestedMap,
    /// Mapping rebuilt from bracketed form keys.
    IndexedMap,
    /// Single embedded object bound through its own schema.
    Object,
    /// Value chosen at runtime by a resolver.
    Union,
    /// Value produced by a caller-supplied converter.
    Converted,
    /// Value validated without being written anywhere.
    Check,
}

impl FieldShape {
    /// Snake-case name of the shape.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldShape::Scalar => "scalar",
            FieldShape::Optional => "optional",
            FieldShape::Array => "array",
            FieldShape::List => "list",
            FieldShape::Map => "map",
            FieldShape::NestedMap => "nested_map",
            FieldShape::IndexedMap => "indexed_map",
            FieldShape::Object => "object",
            FieldShape::Union => "union",
            FieldShape::Converted => "converted",
            FieldShape::Check => "check",
        }
    }
}

impl fmt::Display for FieldShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful assign step, recorded into the run.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// Key absent and no default configured; target untouched.
    Absent,
    /// Key absent; the default was written.
    Defaulted(Option<Value>),
    /// Key present with `null`, or an empty string on a scalar/optional
    /// field; nothing counts as assigned.
    Reset,
    /// A converted and transformed value was written.
    Assigned(Option<Value>),
    /// A converter declined to produce a value; target untouched.
    Abstained,
    /// The value was inspected but not written anywhere.
    Observed(Value),
}

/// Options view passed to fields while assigning.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    options: &'a ApplyOptions,
}

impl<'a> Context<'a> {
    pub(crate) fn new(options: &'a ApplyOptions) -> Self {
        Self { options }
    }

    /// Options of the current run.
    pub fn options(&self) -> &'a ApplyOptions {
        self.options
    }

    /// Converts `value` with the run's conversion options.
    ///
    /// # Errors
    ///
    /// Propagates the conversion chain's error.
    pub fn convert<T: Dynamic>(&self, value: &Value) -> Result<T, ConvertError> {
        convert(value, &self.options.convert_options())
    }
}

/// A binding between one payload key and a part of the target `S`.
///
/// This trait is sealed; the variants in this module are its only
/// implementations.
pub trait Field<S>: sealed::Sealed + Send + Sync {
    /// Payload key read by this field.
    fn name(&self) -> &str;

    /// Human-readable description propagated into errors.
    fn description(&self) -> Option<&str>;

    /// Shape tag of the variant.
    fn shape(&self) -> FieldShape;

    /// Validators in declaration order.
    fn validators(&self) -> &[Box<dyn Validator>];

    /// Whether the payload carries data for this field.
    fn is_present_in(&self, data: &Map<String, Value>) -> bool {
        data.contains_key(self.name())
    }

    /// Reads this field's key from `data` and writes the result into `target`.
    ///
    /// # Errors
    ///
    /// Returns the conversion, transformer, shape, or nested-schema failure.
    fn assign(
        &self,
        data: &Map<String, Value>,
        target: &mut S,
        cx: &Context<'_>,
    ) -> Result<Assignment, BindError>;

    /// Runs the validators in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first validator failure.
    fn validate(&self, cx: &FieldContext<'_>) -> Result<(), ValidationError> {
        self.validators()
            .iter()
            .try_for_each(|validator| validator.validate(cx.value(), cx))
    }
}

/// Capability: the field runs validators.
pub trait AcceptsValidators: Sized {
    /// Appends a boxed validator.
    fn add_validator(&mut self, validator: Box<dyn Validator>);

    /// Appends `validator` and returns the field.
    fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.add_validator(Box::new(validator));
        self
    }
}

/// Capability: the field writes a default when its key is absent.
pub trait AcceptsDefault<T>: Sized {
    /// Sets the default value.
    fn set_default(&mut self, value: T);

    /// Sets the default value and returns the field.
    fn default_value(mut self, value: T) -> Self {
        self.set_default(value);
        self
    }
}

/// Capability: the field transforms values before writing them.
pub trait AcceptsTransformers<T>: Sized {
    /// Appends a boxed transformer.
    fn add_transformer(&mut self, transformer: Box<dyn Transformer<T>>);

    /// Appends `transformer` and returns the field.
    fn transformer(mut self, transformer: impl Transformer<T> + 'static) -> Self {
        self.add_transformer(Box::new(transformer));
        self
    }
}

/// A mapping type that keyed fields can fill.
pub trait MapTarget<K, V>: Default {
    /// Inserts one entry.
    fn insert_entry(&mut self, key: K, value: V);
}

impl<K: Eq + Hash, V, H: BuildHasher + Default> MapTarget<K, V> for HashMap<K, V, H> {
    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
}

impl<K: Ord, V> MapTarget<K, V> for BTreeMap<K, V> {
    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
}

/// Name, description, and validators shared by all variants.
pub(crate) struct FieldMeta {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) validators: Vec<Box<dyn Validator>>,
}

impl FieldMeta {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            validators: Vec::new(),
        }
    }
}

pub(crate) type Lens<S, T> = Box<dyn Fn(&mut S) -> &mut T + Send + Sync>;
pub(crate) type Decode<T> = Box<dyn Fn(&Value, &Context<'_>) -> Result<T, BindError> + Send + Sync>;
pub(crate) type Snapshot<T> = fn(&T, &Value) -> Option<Value>;

/// A configured default and the value validators see when it is applied.
///
/// Fields need `Clone` and `Serialize` only when a default is actually
/// configured.
pub(crate) struct Preset<T> {
    make: Box<dyn Fn() -> T + Send + Sync>,
    snapshot: Option<Value>,
}

impl<T> Preset<T> {
    pub(crate) fn new(value: T) -> Self
    where
        T: Clone + Serialize + Send + Sync + 'static,
    {
        Self {
            snapshot: to_dynamic(&value),
            make: Box::new(move || value.clone()),
        }
    }

    /// Returns a fresh copy of the default and its snapshot.
    pub(crate) fn apply(&self) -> (T, Option<Value>) {
        ((self.make)(), self.snapshot.clone())
    }
}

/// Snapshot of a value-bearing field: the bound value itself.
pub(crate) fn serialized<T: Serialize>(value: &T, _raw: &Value) -> Option<Value> {
    to_dynamic(value)
}

/// Snapshot of an object-shaped field: the raw input.
pub(crate) fn raw<T>(_value: &T, raw: &Value) -> Option<Value> {
    Some(raw.clone())
}

pub(crate) fn value_decoder<T: Dynamic + 'static>() -> Decode<T> {
    Box::new(|raw: &Value, cx: &Context<'_>| {
        cx.convert::<T>(raw).map_err(BindError::from)
    })
}

/// Binds a mapping into a fresh `C` through `schema`.
pub(crate) fn object_decoder<C>(schema: Arc<Schema<C>>) -> Decode<C>
where
    C: Default + 'static,
{
    Box::new(move |raw: &Value, cx: &Context<'_>| {
        let data = expect_object(raw)?;
        let mut child = C::default();
        schema.apply_in(data, &mut child, cx)?;
        Ok(child)
    })
}

/// Folds per-element failures into one error, if any.
pub(crate) fn collected(mut failures: Vec<BindError>) -> Result<(), BindError> {
    match failures.len() {
        0 => Ok(()),
        1 => Err(failures.remove(0)),
        _ => Err(BindError::Multiple(failures)),
    }
}

pub(crate) fn expect_object(raw: &Value) -> Result<&Map<String, Value>, BindError> {
    raw.as_object()
        .ok_or_else(|| BindError::ExpectedObject(kind_of(raw)))
}

pub(crate) fn expect_array(raw: &Value) -> Result<&Vec<Value>, BindError> {
    raw.as_array()
        .ok_or_else(|| BindError::ExpectedArray(kind_of(raw)))
}

/// Builds a nested schema from a configuration closure.
pub(crate) fn configure<C, F>(build: F) -> Arc<Schema<C>>
where
    F: FnOnce(Schema<C>) -> Schema<C>,
{
    Arc::new(build(Schema::new()))
}

/// Shared builder plumbing: description and the validator capability.
macro_rules! field_common {
    ($ty:ident < $($param:ident),* $(; const $n:ident: usize)? >) => {
        impl<$($param),* $(, const $n: usize)?> $ty<$($param),* $(, $n)?> {
            /// Sets the human-readable description reported with errors.
            pub fn with_description(mut self, description: impl Into<String>) -> Self {
                self.meta.description = Some(description.into());
                self
            }
        }

        impl<$($param),* $(, const $n: usize)?> crate::field::AcceptsValidators
            for $ty<$($param),* $(, $n)?>
        {
            fn add_validator(&mut self, validator: Box<dyn crate::validate::Validator>) {
                self.meta.validators.push(validator);
            }
        }

        impl<$($param),* $(, const $n: usize)?> crate::field::sealed::Sealed
            for $ty<$($param),* $(, $n)?>
        {
        }
    };
}

pub(crate) use field_common;
