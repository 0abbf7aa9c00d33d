//! Dynamic binding targets built from a [`SchemaDef`].
//!
//! A [`Record`] keeps one map per value type, keyed by field name, so that a
//! schema defined at runtime can still bind through typed fields.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use databind_core::{
    AcceptsDefault, AcceptsTransformers, AcceptsValidators, ConvertError, ConvertOptions,
    Converted, Dynamic, Field, List, Object, Scalar, Schema, kind_of,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::definition::{DEFAULT_DATE_FORMAT, FieldDef, FieldKind, SchemaDef};
use crate::error::{CliError, Result};

/// Bound values of one level of a definition.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Record {
    strings: BTreeMap<String, String>,
    integers: BTreeMap<String, i64>,
    floats: BTreeMap<String, f64>,
    booleans: BTreeMap<String, bool>,
    dates: BTreeMap<String, NaiveDate>,
    lists: BTreeMap<String, Vec<String>>,
    objects: BTreeMap<String, Record>,
    collections: BTreeMap<String, Vec<Record>>,
}

impl Record {
    /// Renders the bound values of `fields` as a JSON object.
    ///
    /// Fields that were never written are omitted.
    pub fn to_json(&self, fields: &[FieldDef]) -> Value {
        let mut out = Map::new();
        for def in fields {
            let key = def.name.as_str();
            let value = match def.kind {
                FieldKind::String => self.strings.get(key).map(|s| Value::from(s.as_str())),
                FieldKind::Integer => self.integers.get(key).map(|n| Value::from(*n)),
                FieldKind::Float => self.floats.get(key).map(|n| Value::from(*n)),
                FieldKind::Boolean => self.booleans.get(key).map(|b| Value::from(*b)),
                FieldKind::Date => self
                    .dates
                    .get(key)
                    .map(|date| Value::from(date.format(DEFAULT_DATE_FORMAT).to_string())),
                FieldKind::Strings => self.lists.get(key).map(|list| Value::from(list.clone())),
                FieldKind::Object => self.objects.get(key).map(|record| record.to_json(&def.fields)),
                FieldKind::Objects => self.collections.get(key).map(|records| {
                    Value::Array(records.iter().map(|r| r.to_json(&def.fields)).collect())
                }),
            };
            if let Some(value) = value {
                out.insert(def.name.clone(), value);
            }
        }
        Value::Object(out)
    }
}

/// Builds the schema described by `def`, carrying its run options.
pub fn build_schema(def: &SchemaDef) -> Result<Schema<Record>> {
    let schema = build_fields(&def.fields, &def.options.convert_options())?;
    debug!(fields = schema.len(), "Built schema from definition");
    Ok(schema.with_options(def.options))
}

/// Builds the schema of one level of fields.
pub fn build_fields(fields: &[FieldDef], convert: &ConvertOptions) -> Result<Schema<Record>> {
    let mut seen = BTreeSet::new();
    let mut schema = Schema::new();
    for def in fields {
        if !seen.insert(def.name.as_str()) {
            return Err(CliError::DuplicateField(def.name.clone()));
        }
        def.check_supported()?;
        schema.push_boxed(build_field(def, convert)?);
    }
    Ok(schema)
}

macro_rules! finish {
    ($field:expr, $def:expr) => {{
        let mut field = $field;
        if let Some(description) = &$def.description {
            field = field.with_description(description.clone());
        }
        for rule in &$def.rules {
            field.add_validator(rule.build(&$def.name)?);
        }
        Box::new(field) as Box<dyn Field<Record>>
    }};
}

fn build_field(def: &FieldDef, convert: &ConvertOptions) -> Result<Box<dyn Field<Record>>> {
    let key = def.name.clone();
    let field = match def.kind {
        FieldKind::String => {
            let mut field = scalar(def, convert, move |r: &mut Record| {
                r.strings.entry(key.clone()).or_default()
            })?;
            for transform in &def.transforms {
                field.add_transformer(transform.build());
            }
            finish!(field, def)
        }
        FieldKind::Integer => finish!(
            scalar(def, convert, move |r: &mut Record| {
                r.integers.entry(key.clone()).or_default()
            })?,
            def
        ),
        FieldKind::Float => finish!(
            scalar(def, convert, move |r: &mut Record| {
                r.floats.entry(key.clone()).or_default()
            })?,
            def
        ),
        FieldKind::Boolean => finish!(
            scalar(def, convert, move |r: &mut Record| {
                r.booleans.entry(key.clone()).or_default()
            })?,
            def
        ),
        FieldKind::Date => {
            let format = def
                .format
                .clone()
                .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
            let default = def
                .default
                .as_ref()
                .map(|value| date_default(def, value, &format))
                .transpose()?;
            let mut field = Converted::with_writer(
                def.name.clone(),
                move |r: &mut Record, date: NaiveDate| {
                    r.dates.insert(key.clone(), date);
                },
                move |raw: String| parse_date(&raw, &format),
            );
            if let Some(value) = default {
                field.set_default(value);
            }
            finish!(field, def)
        }
        FieldKind::Strings => {
            let mut field = List::new(def.name.clone(), move |r: &mut Record| {
                r.lists.entry(key.clone()).or_default()
            });
            if let Some(value) = &def.default {
                field.set_default(string_list(def, value, convert)?);
            }
            for transform in &def.transforms {
                field.add_transformer(transform.build());
            }
            finish!(field, def)
        }
        FieldKind::Object => {
            let schema = Arc::new(build_fields(&def.fields, convert)?);
            finish!(
                Object::with_schema(
                    def.name.clone(),
                    move |r: &mut Record| r.objects.entry(key.clone()).or_default(),
                    schema,
                ),
                def
            )
        }
        FieldKind::Objects => {
            let schema = Arc::new(build_fields(&def.fields, convert)?);
            finish!(
                List::objects_with(
                    def.name.clone(),
                    move |r: &mut Record| r.collections.entry(key.clone()).or_default(),
                    schema,
                ),
                def
            )
        }
    };
    Ok(field)
}

fn scalar<T, F>(def: &FieldDef, convert: &ConvertOptions, lens: F) -> Result<Scalar<Record, T>>
where
    T: Dynamic + Serialize + Default + Clone + Send + Sync + 'static,
    F: Fn(&mut Record) -> &mut T + Send + Sync + 'static,
{
    let mut field = Scalar::new(def.name.clone(), lens);
    if let Some(value) = default_of::<T>(def, convert)? {
        field.set_default(value);
    }
    Ok(field)
}

fn invalid_default(def: &FieldDef, source: ConvertError) -> CliError {
    CliError::InvalidDefault {
        field: def.name.clone(),
        source,
    }
}

fn default_of<T: Dynamic>(def: &FieldDef, convert: &ConvertOptions) -> Result<Option<T>> {
    def.default
        .as_ref()
        .map(|value| databind_core::convert::convert(value, convert))
        .transpose()
        .map_err(|source| invalid_default(def, source))
}

/// Parses `raw` with `format`; blank input yields no date.
fn parse_date(
    raw: &str,
    format: &str,
) -> std::result::Result<Option<NaiveDate>, chrono::ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, format).map(Some)
}

fn date_default(def: &FieldDef, value: &Value, format: &str) -> Result<NaiveDate> {
    let Value::String(raw) = value else {
        return Err(invalid_default(
            def,
            ConvertError::Unsupported {
                from: kind_of(value),
                to: "date",
            },
        ));
    };
    match parse_date(raw, format) {
        Ok(Some(date)) => Ok(date),
        Ok(None) | Err(_) => Err(invalid_default(
            def,
            ConvertError::Parse {
                input: raw.clone(),
                to: "date",
            },
        )),
    }
}

fn string_list(def: &FieldDef, value: &Value, convert: &ConvertOptions) -> Result<Vec<String>> {
    let Value::Array(items) = value else {
        return Err(invalid_default(
            def,
            ConvertError::Unsupported {
                from: kind_of(value),
                to: "list of strings",
            },
        ));
    };
    items
        .iter()
        .map(|item| databind_core::convert::convert::<String>(item, convert))
        .collect::<std::result::Result<_, _>>()
        .map_err(|source| invalid_default(def, source))
}
