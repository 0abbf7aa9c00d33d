//! Per-run bookkeeping: key presence and per-field assignment state.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::field::Assignment;

/// State of one field after the assign phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldState {
    name: String,
    present: bool,
    assigned: bool,
    failed: bool,
    value: Option<Value>,
}

impl FieldState {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Payload key of the field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the key existed in the payload (or a default was applied).
    pub fn was_present(&self) -> bool {
        self.present
    }

    /// Whether a value was written to the target during this run.
    pub fn was_assigned(&self) -> bool {
        self.assigned
    }

    /// Whether the assign phase reported an error for this field.
    pub fn assign_failed(&self) -> bool {
        self.failed
    }

    /// Snapshot of the value seen by validators, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// State of a single [`Schema`](crate::Schema) application.
///
/// A run starts with the payload's key set as its presence set and one
/// [`FieldState`] per schema field, in declaration order. Fields are looked
/// up by name; with duplicate names the first field wins.
#[derive(Debug, Clone, Default)]
pub struct Run {
    present: HashSet<String>,
    fields: Vec<FieldState>,
}

impl Run {
    pub(crate) fn start<'a>(
        data: &Map<String, Value>,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            present: data.keys().cloned().collect(),
            fields: names.into_iter().map(FieldState::new).collect(),
        }
    }

    /// Returns `true` when `name` is in the presence set.
    pub fn is_field_present(&self, name: &str) -> bool {
        self.present.contains(name)
    }

    /// Adds `name` to the presence set.
    pub fn set_field_present(&mut self, name: &str) {
        if !self.present.contains(name) {
            self.present.insert(name.to_string());
        }
    }

    /// Returns the current value of the field named `name`.
    ///
    /// `None` when the field does not exist or produced no value this run.
    pub fn field_value(&self, name: &str) -> Option<&Value> {
        self.state(name).and_then(FieldState::value)
    }

    /// Returns `true` when the field named `name` was present this run.
    pub fn was_present(&self, name: &str) -> bool {
        self.state(name).is_some_and(FieldState::was_present)
    }

    /// Returns `true` when the field named `name` was assigned this run.
    pub fn was_assigned(&self, name: &str) -> bool {
        self.state(name).is_some_and(FieldState::was_assigned)
    }

    /// Returns the state of the field named `name`.
    pub fn state(&self, name: &str) -> Option<&FieldState> {
        self.fields.iter().find(|state| state.name == name)
    }

    /// Returns all field states in declaration order.
    pub fn states(&self) -> &[FieldState] {
        &self.fields
    }

    /// Returns the validation context of the field at `index`.
    pub fn context(&self, index: usize) -> Option<FieldContext<'_>> {
        (index < self.fields.len()).then_some(FieldContext {
            run: self,
            index,
            description: None,
        })
    }

    pub(crate) fn record(&mut self, index: usize, assignment: Assignment) {
        let name = self.fields[index].name.clone();
        let state = &mut self.fields[index];
        match assignment {
            Assignment::Absent => return,
            Assignment::Defaulted(value) | Assignment::Assigned(value) => {
                state.present = true;
                state.assigned = true;
                state.value = value;
            }
            Assignment::Observed(value) => {
                state.present = true;
                state.assigned = false;
                state.value = Some(value);
            }
            Assignment::Reset | Assignment::Abstained => {
                state.present = true;
                state.assigned = false;
                state.value = None;
            }
        }
        self.set_field_present(&name);
    }

    pub(crate) fn mark_failed(&mut self, index: usize, present: bool) {
        self.fields[index].failed = true;
        if present {
            self.fields[index].present = true;
            let name = self.fields[index].name.clone();
            self.set_field_present(&name);
        }
    }

    #[cfg(test)]
    pub(crate) fn detached<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self::start(&Map::new(), names)
    }

    #[cfg(test)]
    pub(crate) fn set_value(&mut self, name: &str, value: Option<Value>) {
        if let Some(state) = self.fields.iter_mut().find(|state| state.name == name) {
            state.value = value;
        }
    }
}

/// View of a run handed to validators of one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'r> {
    run: &'r Run,
    index: usize,
    description: Option<&'r str>,
}

impl<'r> FieldContext<'r> {
    pub(crate) fn new(run: &'r Run, index: usize, description: Option<&'r str>) -> Self {
        Self {
            run,
            index,
            description,
        }
    }

    /// Payload key of the field being validated.
    pub fn name(&self) -> &'r str {
        &self.run.fields[self.index].name
    }

    /// Description of the field being validated.
    pub fn description(&self) -> Option<&'r str> {
        self.description
    }

    /// Whether the field's key is in the run's presence set.
    pub fn is_present(&self) -> bool {
        self.run.is_field_present(self.name())
    }

    /// Whether this field's assignment already reported an error.
    pub fn assign_failed(&self) -> bool {
        self.run.fields[self.index].failed
    }

    /// The field's value for this run, if it produced one.
    pub fn value(&self) -> Option<&'r Value> {
        self.run.fields[self.index].value.as_ref()
    }

    /// Looks up another field's current value in the same run.
    pub fn field_value(&self, name: &str) -> Option<&'r Value> {
        self.run.field_value(name)
    }

    /// The whole run.
    pub fn run(&self) -> &'r Run {
        self.run
    }
}
