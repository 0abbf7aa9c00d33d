use std::sync::Arc;

use serde_json::{Map, Value};

use super::{
    Assignment, Context, Field, FieldMeta, FieldShape, Lens, configure, expect_object,
    field_common,
};
use crate::error::BindError;
use crate::schema::Schema;
use crate::validate::Validator;

/// Binds a single embedded object, in place, through its own schema.
///
/// Fields of the embedded value that the payload does not mention keep their
/// current values.
pub struct Object<S, C> {
    meta: FieldMeta,
    lens: Lens<S, C>,
    schema: Arc<Schema<C>>,
}

field_common!(Object<S, C>);

impl<S, C: 'static> Object<S, C> {
    /// Creates an object field whose schema is built by `build`.
    pub fn new<F, B>(name: impl Into<String>, lens: F, build: B) -> Self
    where
        F: Fn(&mut S) -> &mut C + Send + Sync + 'static,
        B: FnOnce(Schema<C>) -> Schema<C>,
    {
        Self::with_schema(name, lens, configure(build))
    }

    /// Creates an object field bound through a shared `schema`.
    pub fn with_schema<F>(name: impl Into<String>, lens: F, schema: Arc<Schema<C>>) -> Self
    where
        F: Fn(&mut S) -> &mut C + Send + Sync + 'static,
    {
        Self {
            meta: FieldMeta::new(name),
            lens: Box::new(lens),
            schema,
        }
    }
}

impl<S, C: 'static> Field<S> for Object<S, C> {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    fn shape(&self) -> FieldShape {
        FieldShape::Object
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
            return Ok(Assignment::Absent);
        };
        if raw.is_null() {
            return Ok(Assignment::Reset);
        }
        let object = expect_object(raw)?;
        self.schema.apply_in(object, (self.lens)(target), cx)?;
        Ok(Assignment::Assigned(Some(raw.clone())))
    }
}

type Resolver<T> =
    Box<dyn Fn(&Map<String, Value>, &Context<'_>) -> Result<T, BindError> + Send + Sync>;

/// Binds a value whose concrete shape is chosen at runtime.
///
/// The resolver receives the raw object and returns the bound value, usually
/// by inspecting a [`discriminator`] and applying the schema of the matching
/// variant. Its errors become this field's error.
///
/// ```
/// use databind_core::*;
/// use serde_json::{Map, Value, json};
///
/// #[derive(Debug, PartialEq)]
/// enum Payment {
///     Card { last4: String },
///     Invoice { days: u32 },
/// }
///
/// #[derive(Default)]
/// struct Card {
///     last4: String,
/// }
///
/// #[derive(Default)]
/// struct Invoice {
///     days: u32,
/// }
///
/// #[derive(Default)]
/// struct Checkout {
///     payment: Option<Payment>,
/// }
///
/// let card = Schema::new()
///     .field(Scalar::new("last4", |c: &mut Card| &mut c.last4).validator(length(4, 4)));
/// let invoice = Schema::new()
///     .field(Scalar::new("days", |i: &mut Invoice| &mut i.days).default_value(30));
///
/// let resolve = move |data: &Map<String, Value>,
///                     cx: &Context<'_>|
///       -> Result<Option<Payment>, BindError> {
///     match discriminator(data, "type")? {
///         "card" => {
///             let mut c = Card::default();
///             card.apply_in(data, &mut c, cx)?;
///             Ok(Some(Payment::Card { last4: c.last4 }))
///         }
///         "invoice" => {
///             let mut i = Invoice::default();
///             invoice.apply_in(data, &mut i, cx)?;
///             Ok(Some(Payment::Invoice { days: i.days }))
///         }
///         other => Err(BindError::UnknownVariant(other.to_string())),
///     }
/// };
///
/// let schema = Schema::new()
///     .field(Union::new("payment", |c: &mut Checkout| &mut c.payment, resolve));
///
/// let mut checkout = Checkout::default();
/// schema
///     .apply(json!({"payment": {"type": "invoice"}}).as_object().unwrap(), &mut checkout)
///     .unwrap();
/// assert_eq!(checkout.payment, Some(Payment::Invoice { days: 30 }));
///
/// let errors = schema
///     .apply(json!({"payment": {"type": "cash"}}).as_object().unwrap(), &mut checkout)
///     .unwrap_err();
/// assert_eq!(errors.to_string(), "payment: unknown variant \"cash\"");
/// ```
pub struct Union<S, T> {
    meta: FieldMeta,
    lens: Lens<S, T>,
    resolve: Resolver<T>,
}

field_common!(Union<S, T>);

impl<S, T> Union<S, T> {
    /// Creates a union field resolved by `resolve`.
    pub fn new<F, R>(name: impl Into<String>, lens: F, resolve: R) -> Self
    where
        F: Fn(&mut S) -> &mut T + Send + Sync + 'static,
        R: Fn(&Map<String, Value>, &Context<'_>) -> Result<T, BindError> + Send + Sync + 'static,
    {
        Self {
            meta: FieldMeta::new(name),
            lens: Box::new(lens),
            resolve: Box::new(resolve),
        }
    }
}

impl<S, T> Field<S> for Union<S, T> {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    fn shape(&self) -> FieldShape {
        FieldShape::Union
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
            return Ok(Assignment::Absent);
        };
        if raw.is_null() {
            return Ok(Assignment::Reset);
        }
        let object = expect_object(raw)?;
        let value = (self.resolve)(object, cx)?;
        *(self.lens)(target) = value;
        Ok(Assignment::Assigned(Some(raw.clone())))
    }
}

/// Reads the string discriminator `key` from a union's raw object.
///
/// # Errors
///
/// Returns [`BindError::MissingDiscriminator`] when `key` is absent or not a
/// string.
pub fn discriminator<'a>(data: &'a Map<String, Value>, key: &str) -> Result<&'a str, BindError> {
    data.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| BindError::MissingDiscriminator(key.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{AcceptsDefault, AcceptsValidators, Scalar, required};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Address {
        street: String,
        zip: String,
    }

    #[derive(Debug, Default)]
    struct Profile {
        home: Address,
    }

    fn schema() -> Schema<Profile> {
        Schema::new().field(Object::new("home", |p: &mut Profile| &mut p.home, |s| {
            s.field(Scalar::new("street", |a: &mut Address| &mut a.street).validator(required()))
                .field(
                    Scalar::new("zip", |a: &mut Address| &mut a.zip)
                        .default_value("0000".to_string()),
                )
        }))
    }

    #[test]
    fn test_object_binds_in_place() {
        let mut profile = Profile {
            home: Address {
                street: "Old".into(),
                zip: "1234".into(),
            },
        };
        schema()
            .apply(json!({"home": {"street": "New"}}).as_object().unwrap(), &mut profile)
            .unwrap();
        assert_eq!(profile.home.street, "New");
        assert_eq!(profile.home.zip, "0000");
    }

    #[test]
    fn test_object_reports_nested_errors() {
        let mut profile = Profile::default();
        let binding = schema().run(json!({"home": {}}).as_object().unwrap(), &mut profile);
        assert_eq!(binding.errors().to_string(), "home: street: field is required");
        assert!(binding.run().was_present("home"));
        assert!(!binding.run().was_assigned("home"));
    }

    #[test]
    fn test_object_rejects_scalar() {
        let mut profile = Profile::default();
        let errors = schema()
            .apply(json!({"home": "street"}).as_object().unwrap(), &mut profile)
            .unwrap_err();
        assert_eq!(errors.to_string(), "home: expected object, got string");
    }

    trait Shape: Send + Sync {
        fn area(&self) -> f64;
    }

    #[derive(Default)]
    struct Square {
        side: f64,
    }

    impl Shape for Square {
        fn area(&self) -> f64 {
            self.side * self.side
        }
    }

    #[derive(Default)]
    struct Canvas {
        shape: Option<Box<dyn Shape>>,
    }

    fn canvas_schema() -> Schema<Canvas> {
        let square = Schema::new().field(Scalar::new("side", |s: &mut Square| &mut s.side));
        Schema::new().field(Union::new(
            "shape",
            |c: &mut Canvas| &mut c.shape,
            move |data: &Map<String, Value>,
                  cx: &Context<'_>|
                  -> Result<Option<Box<dyn Shape>>, BindError> {
                match discriminator(data, "kind")? {
                    "square" => {
                        let mut s = Square::default();
                        square.apply_in(data, &mut s, cx)?;
                        Ok(Some(Box::new(s)))
                    }
                    other => Err(BindError::UnknownVariant(other.to_string())),
                }
            },
        ))
    }

    #[test]
    fn test_union_resolves_trait_object() {
        let mut canvas = Canvas::default();
        canvas_schema()
            .apply(
                json!({"shape": {"kind": "square", "side": "3"}}).as_object().unwrap(),
                &mut canvas,
            )
            .unwrap();
        assert_eq!(canvas.shape.map(|s| s.area()), Some(9.0));
    }

    #[test]
    fn test_union_missing_discriminator() {
        let mut canvas = Canvas::default();
        let errors = canvas_schema()
            .apply(json!({"shape": {"side": 1}}).as_object().unwrap(), &mut canvas)
            .unwrap_err();
        assert_eq!(errors.to_string(), "shape: missing discriminator \"kind\"");
        assert!(canvas.shape.is_none());
    }
}
