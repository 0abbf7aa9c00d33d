use std::marker::PhantomData;

use serde_json::{Map, Value};

use super::{Assignment, Context, Field, FieldMeta, FieldShape, field_common};
use crate::error::BindError;
use crate::validate::Validator;

/// Validates a key's raw value without writing it anywhere.
///
/// Mostly used inside [`Mapping::each_pair`](crate::Mapping::each_pair),
/// where the pair schema has no target of its own.
pub struct Check<S> {
    meta: FieldMeta,
    target: PhantomData<fn(&mut S)>,
}

field_common!(Check<S>);

impl<S> Check<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: FieldMeta::new(name),
            target: PhantomData,
        }
    }
}

impl<S> Field<S> for Check<S> {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    fn shape(&self) -> FieldShape {
        FieldShape::Check
    }

    fn validators(&self) -> &[Box<dyn Validator>] {
        &self.meta.validators
    }

    fn assign(
        &self,
        data: &Map<String, Value>,
        _target: &mut S,
        _cx: &Context<'_>,
    ) -> Result<Assignment, BindError> {
        Ok(match data.get(&self.meta.name) {
            None => Assignment::Absent,
            Some(Value::Null) => Assignment::Reset,
            Some(raw) => Assignment::Observed(raw.clone()),
        })
    }
}
