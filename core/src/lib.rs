//! Schema-driven binding and validation of untyped payloads.
//!
//! This crate binds a string-keyed mapping of dynamic values (a decoded JSON
//! body, form, or query string) into typed Rust targets and validates the
//! result:
//!
//! - [`Schema`] — an immutable, shareable list of fields for a target type,
//!   applied in two phases (assign, then validate).
//! - Field variants — [`Scalar`], [`Optional`], [`Array`], [`List`],
//!   [`Mapping`], [`NestedMap`], [`IndexedMap`], [`Object`], [`Union`],
//!   [`Converted`], and [`Check`], each tagged with a [`FieldShape`].
//! - [`convert`] — the dynamic-value conversion chain behind every field.
//! - [`validate`] and [`transform`] — the per-field pipelines and their
//!   built-in catalogues.
//! - [`Run`] — per-call presence and assignment state, exposed to
//!   validators through [`FieldContext`].
//!
//! Failures are collected into [`FieldErrors`], which render as
//! `"field: message; other: message"`.
//!
//! # Example
//!
//! ```
//! use databind_core::*;
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct Member {
//!     name: String,
//!     age: u32,
//!     roles: Vec<String>,
//! }
//!
//! let schema = Schema::new()
//!     .field(
//!         Scalar::new("name", |m: &mut Member| &mut m.name)
//!             .transformer(trim())
//!             .validator(required()),
//!     )
//!     .field(
//!         Scalar::new("age", |m: &mut Member| &mut m.age)
//!             .default_value(25)
//!             .validator(min(18)),
//!     )
//!     .field(List::new("roles", |m: &mut Member| &mut m.roles).transformer(lowercase()));
//!
//! let mut member = Member::default();
//! let data = json!({"name": " ada ", "roles": ["ADMIN"]});
//! schema.apply(data.as_object().unwrap(), &mut member).unwrap();
//!
//! assert_eq!(member.name, "ada");
//! assert_eq!(member.age, 25);
//! assert_eq!(member.roles, ["admin"]);
//! ```

pub mod convert;
mod error;
mod field;
mod options;
mod schema;
pub mod transform;
pub mod validate;

pub use convert::{
    BoolParsing, ConvertOptions, Dynamic, Nullable, SetDynamic, format_dynamic, kind_of,
    to_dynamic,
};
pub use error::{
    BindError, ConvertError, FieldError, FieldErrors, Phase, Position, TransformError,
    ValidationError,
};
pub use field::{
    AcceptsDefault, AcceptsTransformers, AcceptsValidators, Array, Assignment, Check, Context,
    Converted, Field, FieldShape, IndexedMap, List, MapTarget, Mapping, NestedMap, Object,
    Optional, Scalar, Union, discriminator, reassemble_indexed,
};
pub use options::{ApplyOptions, ErrorPolicy};
pub use schema::{Binding, FieldContext, FieldState, ROOT_FIELD, Run, Schema};
pub use transform::{
    Transformer, capitalize, clamp, collapse_whitespace, lowercase, trim, truncate, uppercase,
};
pub use validate::{
    Validator, ValidatorExt, WithMessage, email, equals_field, length, max, max_length, min,
    min_length, one_of, pattern, required,
};
