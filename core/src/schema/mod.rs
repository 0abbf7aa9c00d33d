//! Schema definitions and the two-phase apply protocol.
//!
//! A [`Schema`] is an immutable, ordered list of fields for one target type.
//! It can be shared between threads and applied any number of times; each
//! application gets its own [`Run`] holding presence and assignment state.
//!
//! Applying a schema happens in two phases:
//!
//! 1. **Assign**: every field, in declaration order, reads its key from the
//!    payload and writes into the target. A failing field does not stop the
//!    others unless [`ErrorPolicy::Stop`] is configured.
//! 2. **Validate**: every field's validators run against the value recorded
//!    for that field, even after assignment errors, so one call reports
//!    every independent problem. Skipped with
//!    [`ApplyOptions::skip_validation`].
//!
//! Nested schemas (objects, lists of objects, maps) run with the options of
//! the outermost schema.

mod run;

use std::fmt;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{BindError, FieldError, FieldErrors, Phase};
use crate::field::{Context, Field};
use crate::options::{ApplyOptions, ErrorPolicy};

pub use run::{FieldContext, FieldState, Run};

/// Field name used for errors about the payload itself.
pub const ROOT_FIELD: &str = "$root";

/// Immutable binding definition for targets of type `S`.
///
/// # Examples
///
/// ```
/// use databind_core::*;
/// use serde_json::json;
///
/// #[derive(Default)]
/// struct Signup {
///     email: String,
///     age: u8,
/// }
///
/// let schema = Schema::new()
///     .field(Scalar::new("email", |s: &mut Signup| &mut s.email).validator(email()))
///     .field(Scalar::new("age", |s: &mut Signup| &mut s.age).validator(min(13)));
///
/// let mut signup = Signup::default();
/// let data = json!({"email": "not-an-email", "age": "abc"});
/// let errors = schema.apply(data.as_object().unwrap(), &mut signup).unwrap_err();
///
/// assert_eq!(errors.len(), 2);
/// assert_eq!(errors.for_field("age").unwrap().phase, Phase::Assign);
/// assert_eq!(errors.for_field("email").unwrap().phase, Phase::Validate);
/// ```
pub struct Schema<S> {
    fields: Vec<Box<dyn Field<S>>>,
    options: ApplyOptions,
}

/// Result of [`Schema::run`]: the run state together with its errors.
#[derive(Debug, Clone)]
pub struct Binding {
    run: Run,
    errors: FieldErrors,
}

impl Binding {
    /// Per-field state of the run.
    pub fn run(&self) -> &Run {
        &self.run
    }

    /// Errors in report order.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Returns `true` when the run produced no error.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Discards the run state.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        self.errors.into_result()
    }
}

impl<S> Default for Schema<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Schema<S> {
    /// Creates an empty schema with default options.
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            options: ApplyOptions::default(),
        }
    }

    /// Appends a field and returns the schema.
    pub fn field(mut self, field: impl Field<S> + 'static) -> Self {
        self.push(field);
        self
    }

    /// Appends a field.
    pub fn push(&mut self, field: impl Field<S> + 'static) {
        self.fields.push(Box::new(field));
    }

    /// Appends an already boxed field.
    pub fn push_boxed(&mut self, field: Box<dyn Field<S>>) {
        self.fields.push(field);
    }

    /// Replaces the run options.
    pub fn with_options(mut self, options: ApplyOptions) -> Self {
        self.options = options;
        self
    }

    /// Omits the validation phase.
    pub fn skip_validation(mut self) -> Self {
        self.options.skip_validation = true;
        self
    }

    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &dyn Field<S>> {
        self.fields.iter().map(|field| field.as_ref())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the first field named `name`.
    pub fn field_by_name(&self, name: &str) -> Option<&dyn Field<S>> {
        self.fields().find(|field| field.name() == name)
    }

    /// Binds `data` into `target`.
    ///
    /// # Errors
    ///
    /// Returns every assignment and validation failure of the run, in report
    /// order.
    pub fn apply(&self, data: &Map<String, Value>, target: &mut S) -> Result<(), FieldErrors> {
        self.run(data, target).into_result()
    }

    /// Binds an arbitrary value, which must be an object.
    ///
    /// # Errors
    ///
    /// A non-object payload is reported as a single error on
    /// [`ROOT_FIELD`]; otherwise as [`apply`](Schema::apply).
    pub fn apply_value(&self, data: &Value, target: &mut S) -> Result<(), FieldErrors> {
        match data {
            Value::Object(object) => self.apply(object, target),
            other => {
                let mut errors = FieldErrors::new();
                errors.push(FieldError::new(
                    ROOT_FIELD,
                    None,
                    Phase::Assign,
                    BindError::ExpectedObject(crate::convert::kind_of(other)),
                ));
                Err(errors)
            }
        }
    }

    /// Binds `data` into `target` and returns the run state with the errors.
    pub fn run(&self, data: &Map<String, Value>, target: &mut S) -> Binding {
        self.execute(data, target, &self.options)
    }

    /// Binds a nested payload with the options of an enclosing run.
    ///
    /// Used by nested fields and by union resolvers that apply a variant
    /// schema to the same object.
    ///
    /// # Errors
    ///
    /// As [`apply`](Schema::apply).
    pub fn apply_in(
        &self,
        data: &Map<String, Value>,
        target: &mut S,
        cx: &Context<'_>,
    ) -> Result<(), FieldErrors> {
        self.execute(data, target, cx.options()).into_result()
    }

    fn execute(&self, data: &Map<String, Value>, target: &mut S, options: &ApplyOptions) -> Binding {
        debug!(
            fields = self.fields.len(),
            keys = data.len(),
            skip_validation = options.skip_validation,
            "Applying schema"
        );

        let cx = Context::new(options);
        let mut run = Run::start(data, self.fields.iter().map(|field| field.name()));
        let mut errors = FieldErrors::new();

        for (index, field) in self.fields.iter().enumerate() {
            match field.assign(data, target, &cx) {
                Ok(assignment) => {
                    trace!(field = field.name(), outcome = ?assignment, "Assigned field");
                    run.record(index, assignment);
                }
                Err(error) => {
                    debug!(field = field.name(), error = %error, "Assignment failed");
                    run.mark_failed(index, field.is_present_in(data));
                    errors.push(FieldError::new(
                        field.name(),
                        field.description().map(str::to_string),
                        Phase::Assign,
                        error,
                    ));
                    if options.on_assign_error == ErrorPolicy::Stop {
                        return Binding { run, errors };
                    }
                }
            }
        }

        if !options.skip_validation {
            for (index, field) in self.fields.iter().enumerate() {
                let cx = FieldContext::new(&run, index, field.description());
                if let Err(error) = field.validate(&cx) {
                    errors.push(FieldError::new(
                        field.name(),
                        field.description().map(str::to_string),
                        Phase::Validate,
                        error.into(),
                    ));
                }
            }
        }

        debug!(errors = errors.len(), "Schema applied");
        Binding { run, errors }
    }
}

impl<S> fmt::Debug for Schema<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<_> = self
            .fields
            .iter()
            .map(|field| (field.name(), field.shape()))
            .collect();
        f.debug_struct("Schema")
            .field("fields", &fields)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{AcceptsDefault, AcceptsValidators, FieldShape, Scalar, max, required};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Account {
        user: String,
        quota: i32,
        active: bool,
    }

    fn schema() -> Schema<Account> {
        Schema::new()
            .field(
                Scalar::new("user", |a: &mut Account| &mut a.user)
                    .with_description("login name")
                    .validator(required()),
            )
            .field(
                Scalar::new("quota", |a: &mut Account| &mut a.quota)
                    .default_value(10)
                    .validator(max(100)),
            )
            .field(Scalar::new("active", |a: &mut Account| &mut a.active))
    }

    #[test]
    fn test_assign_errors_precede_validation_errors() {
        let mut account = Account::default();
        let errors = schema()
            .apply(
                json!({"quota": "x", "active": "maybe"}).as_object().unwrap(),
                &mut account,
            )
            .unwrap_err();
        let phases: Vec<(&str, Phase)> = errors
            .iter()
            .map(|error| (error.field.as_str(), error.phase))
            .collect();
        assert_eq!(
            phases,
            vec![("quota", Phase::Assign), ("user", Phase::Validate)]
        );
        assert_eq!(errors.for_field("user").unwrap().description.as_deref(), Some("login name"));
        assert!(!account.active);
    }

    #[test]
    fn test_strict_bools_fail_assignment() {
        let schema = schema().with_options(ApplyOptions {
            bool_parsing: crate::BoolParsing::Strict,
            ..ApplyOptions::default()
        });
        let mut account = Account::default();
        let errors = schema
            .apply(
                json!({"user": "ann", "active": "maybe"}).as_object().unwrap(),
                &mut account,
            )
            .unwrap_err();
        assert_eq!(errors.to_string(), "active: unrecognized boolean \"maybe\"");
        assert_eq!(errors.for_field("active").unwrap().phase, Phase::Assign);
    }

    #[test]
    fn test_stop_policy_returns_first_assignment_error() {
        let schema = schema().with_options(ApplyOptions {
            on_assign_error: ErrorPolicy::Stop,
            ..ApplyOptions::default()
        });
        let mut account = Account::default();
        let binding = schema.run(
            json!({"quota": "lots", "active": true}).as_object().unwrap(),
            &mut account,
        );
        assert_eq!(binding.errors().len(), 1);
        assert_eq!(binding.errors().to_string(), "quota: cannot parse \"lots\" as i32");
        assert!(binding.run().was_present("quota"));
        assert!(!account.active);
    }

    #[test]
    fn test_skip_validation() {
        let schema = schema().skip_validation();
        let mut account = Account::default();
        schema
            .apply(json!({"quota": 1000}).as_object().unwrap(), &mut account)
            .unwrap();
        assert_eq!(account.quota, 1000);
    }

    #[test]
    fn test_apply_value_requires_object() {
        let mut account = Account::default();
        let errors = schema().apply_value(&json!([1, 2]), &mut account).unwrap_err();
        assert_eq!(errors.to_string(), "$root: expected object, got array");
    }

    #[test]
    fn test_introspection() {
        let schema = schema();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.field_by_name("quota").unwrap().shape(), FieldShape::Scalar);
        assert!(schema.field_by_name("missing").is_none());
        assert!(format!("{schema:?}").contains("\"active\""));
    }

    #[test]
    fn test_schema_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema<Account>>();
    }
}
