use std::fmt::Display;
use std::marker::PhantomData;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{
    AcceptsDefault, AcceptsTransformers, Assignment, Context, Field, FieldMeta,
    FieldShape, Preset, field_common,
};
use crate::convert::{Dynamic, to_dynamic};
use crate::error::BindError;
use crate::transform::{Transformer, run_pipeline};
use crate::validate::Validator;

type Writer<S, T> = Box<dyn Fn(&mut S, T) + Send + Sync>;
type Converter<I, T> = Box<dyn Fn(I) -> Result<Option<T>, String> + Send + Sync>;

/// Binds a value produced by a caller-supplied converter.
///
/// The raw value is first converted to the converter's input type `I`. The
/// converter then returns `Ok(Some(value))` to assign, `Ok(None)` to abstain
/// (the target is left untouched and the field counts as unassigned), or an
/// error.
///
/// ```
/// use chrono::NaiveDate;
/// use databind_core::*;
/// use serde_json::json;
///
/// #[derive(Default)]
/// struct Event {
///     starts_on: Option<NaiveDate>,
/// }
///
/// let schema = Schema::new().field(
///     Converted::optional("starts_on", |e: &mut Event| &mut e.starts_on, |raw: String| {
///         if raw.trim().is_empty() {
///             return Ok(None);
///         }
///         NaiveDate::parse_from_str(raw.trim(), "%d.%m.%Y").map(Some)
///     })
///     .validator(required()),
/// );
///
/// let mut event = Event::default();
/// schema.apply(json!({"starts_on": "01.02.2025"}).as_object().unwrap(), &mut event).unwrap();
/// assert_eq!(event.starts_on, NaiveDate::from_ymd_opt(2025, 2, 1));
///
/// let errors = schema
///     .apply(json!({"starts_on": "  "}).as_object().unwrap(), &mut event)
///     .unwrap_err();
/// assert_eq!(errors.to_string(), "starts_on: field is required");
/// ```
pub struct Converted<S, I, T> {
    meta: FieldMeta,
    write: Writer<S, T>,
    convert: Converter<I, T>,
    transformers: Vec<Box<dyn Transformer<T>>>,
    default: Option<Preset<T>>,
    input: PhantomData<fn(I)>,
}

field_common!(Converted<S, I, T>);

impl<S, I, T> Converted<S, I, T>
where
    S: 'static,
    I: Dynamic + 'static,
    T: Serialize + 'static,
{
    /// Creates a converted field writing into the part of `S` returned by
    /// `lens`.
    pub fn new<F, C, E>(name: impl Into<String>, lens: F, converter: C) -> Self
    where
        F: Fn(&mut S) -> &mut T + Send + Sync + 'static,
        C: Fn(I) -> Result<Option<T>, E> + Send + Sync + 'static,
        E: Display,
    {
        Self::with_writer(name, move |target: &mut S, value| *lens(target) = value, converter)
    }

    /// Creates a converted field whose target is an `Option<T>`; assignment
    /// writes `Some(value)`.
    pub fn optional<F, C, E>(name: impl Into<String>, lens: F, converter: C) -> Self
    where
        F: Fn(&mut S) -> &mut Option<T> + Send + Sync + 'static,
        C: Fn(I) -> Result<Option<T>, E> + Send + Sync + 'static,
        E: Display,
    {
        Self::with_writer(
            name,
            move |target: &mut S, value| *lens(target) = Some(value),
            converter,
        )
    }

    /// Creates a converted field that hands produced values to `write`.
    pub fn with_writer<W, C, E>(name: impl Into<String>, write: W, converter: C) -> Self
    where
        W: Fn(&mut S, T) + Send + Sync + 'static,
        C: Fn(I) -> Result<Option<T>, E> + Send + Sync + 'static,
        E: Display,
    {
        Self {
            meta: FieldMeta::new(name),
            write: Box::new(write),
            convert: Box::new(move |input: I| converter(input).map_err(|err| err.to_string())),
            transformers: Vec::new(),
            default: None,
            input: PhantomData,
        }
    }
}

impl<S, I, T> AcceptsDefault<T> for Converted<S, I, T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    fn set_default(&mut self, value: T) {
        self.default = Some(Preset::new(value));
    }
}

impl<S, I, T> AcceptsTransformers<T> for Converted<S, I, T> {
    fn add_transformer(&mut self, transformer: Box<dyn Transformer<T>>) {
        self.transformers.push(transformer);
    }
}

impl<S, I, T> Field<S> for Converted<S, I, T>
where
    I: Dynamic,
    T: Serialize,
{
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    fn shape(&self) -> FieldShape {
        FieldShape::Converted
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
                    (self.write)(target, value);
                    Assignment::Defaulted(snapshot)
                }
                None => Assignment::Absent,
            });
        };
        if raw.is_null() {
            return Ok(Assignment::Reset);
        }

        let input = cx.convert::<I>(raw)?;
        let Some(value) = (self.convert)(input).map_err(BindError::Converter)? else {
            return Ok(Assignment::Abstained);
        };
        let value = run_pipeline(&self.transformers, value)?;
        let snapshot = to_dynamic(&value);
        (self.write)(target, value);
        Ok(Assignment::Assigned(snapshot))
    }
}
