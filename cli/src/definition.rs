//! YAML schema definitions for the `databind` command.
//!
//! A definition lists run options and fields. Each field names a payload key,
//! a value type, and optional defaults, rules, and transforms. Object fields
//! carry nested `fields`.
//!
//! # Example YAML
//!
//! ```yaml
//! options:
//!   bool_parsing: strict
//! fields:
//!   - name: email
//!     type: string
//!     description: contact address
//!     transforms: [trim, lowercase]
//!     rules:
//!       - rule: required
//!       - rule: email
//!         message: please enter a real address
//!   - name: age
//!     type: integer
//!     default: 25
//!     rules:
//!       - rule: min
//!         value: 18
//!   - name: born
//!     type: date
//!     format: "%d.%m.%Y"
//!   - name: address
//!     type: object
//!     fields:
//!       - name: city
//!         type: string
//! ```

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use databind_core::{
    ApplyOptions, Transformer, Validator, WithMessage, capitalize, collapse_whitespace, email,
    equals_field, length, lowercase, max, max_length, min, min_length, one_of, pattern, required,
    trim, uppercase,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{CliError, Result};

/// Date format used when a `date` field does not set `format`.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Top-level schema definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDef {
    /// Options applied to the whole run.
    #[serde(default)]
    pub options: ApplyOptions,
    /// Fields in declaration order.
    pub fields: Vec<FieldDef>,
}

impl SchemaDef {
    /// Loads a definition from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let def: Self = serde_yaml::from_reader(reader)?;
        debug!(path = %path.display(), fields = def.fields.len(), "Loaded schema definition");
        Ok(def)
    }

    /// Parses a definition from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Value type of a defined field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    /// List of strings.
    Strings,
    /// Single nested record.
    Object,
    /// List of nested records.
    Objects,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Strings => "strings",
            FieldKind::Object => "object",
            FieldKind::Objects => "objects",
        }
    }

    /// Returns `true` for kinds that bind nested records.
    pub fn is_nested(self) -> bool {
        matches!(self, FieldKind::Object | FieldKind::Objects)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    /// Payload key.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub description: Option<String>,
    /// Value written when the key is absent.
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub rules: Vec<RuleDef>,
    /// String transforms, applied in order.
    #[serde(default)]
    pub transforms: Vec<TransformDef>,
    /// `chrono` format string for `date` fields.
    #[serde(default)]
    pub format: Option<String>,
    /// Nested fields of `object` and `objects` fields.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl FieldDef {
    /// Rejects keys that the field's type cannot honour.
    pub fn check_supported(&self) -> Result<()> {
        let unsupported = |feature| CliError::Unsupported {
            field: self.name.clone(),
            kind: self.kind,
            feature,
        };

        if !self.transforms.is_empty()
            && !matches!(self.kind, FieldKind::String | FieldKind::Strings)
        {
            return Err(unsupported("transforms"));
        }
        if self.default.is_some() && self.kind.is_nested() {
            return Err(unsupported("default"));
        }
        if self.format.is_some() && self.kind != FieldKind::Date {
            return Err(unsupported("format"));
        }
        if !self.fields.is_empty() && !self.kind.is_nested() {
            return Err(unsupported("nested fields"));
        }
        Ok(())
    }
}

/// A validation rule with an optional replacement message.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDef {
    #[serde(flatten)]
    pub rule: Rule,
    #[serde(default)]
    pub message: Option<String>,
}

/// Built-in rules, tagged by `rule`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    Required,
    Min { value: f64 },
    Max { value: f64 },
    MinLength { value: usize },
    MaxLength { value: usize },
    Length { min: usize, max: usize },
    OneOf { values: Vec<Value> },
    Pattern { value: String },
    Email,
    EqualsField { field: String },
}

impl RuleDef {
    /// Builds the validator for a rule of field `field`.
    pub fn build(&self, field: &str) -> Result<Box<dyn Validator>> {
        let validator: Box<dyn Validator> = match &self.rule {
            Rule::Required => Box::new(required()),
            Rule::Min { value } => Box::new(min(*value)),
            Rule::Max { value } => Box::new(max(*value)),
            Rule::MinLength { value } => Box::new(min_length(*value)),
            Rule::MaxLength { value } => Box::new(max_length(*value)),
            Rule::Length { min: low, max: high } => Box::new(length(*low, *high)),
            Rule::OneOf { values } => Box::new(one_of(values.iter().cloned())),
            Rule::Pattern { value } => {
                Box::new(pattern(value).map_err(|source| CliError::InvalidPattern {
                    field: field.to_string(),
                    source,
                })?)
            }
            Rule::Email => Box::new(email()),
            Rule::EqualsField { field: other } => Box::new(equals_field(other.clone())),
        };

        Ok(match &self.message {
            Some(message) => Box::new(WithMessage::new(validator, message.clone())),
            None => validator,
        })
    }
}

/// Built-in string transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformDef {
    Trim,
    Lowercase,
    Uppercase,
    Capitalize,
    CollapseWhitespace,
}

impl TransformDef {
    pub fn build(self) -> Box<dyn Transformer<String>> {
        match self {
            TransformDef::Trim => Box::new(trim()),
            TransformDef::Lowercase => Box::new(lowercase()),
            TransformDef::Uppercase => Box::new(uppercase()),
            TransformDef::Capitalize => Box::new(capitalize()),
            TransformDef::CollapseWhitespace => Box::new(collapse_whitespace()),
        }
    }
}
