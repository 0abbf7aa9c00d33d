use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{
    AcceptsDefault, AcceptsTransformers, Assignment, Context, Field, FieldMeta,
    FieldShape, Lens, MapTarget, Preset, collected, configure, expect_object, field_common,
};
use crate::convert::{Dynamic, to_dynamic};
use crate::error::{BindError, Position};
use crate::schema::Schema;
use crate::transform::{Transformer, run_pipeline};
use crate::validate::Validator;

static INDEXED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\[([A-Za-z0-9_-]+)\]\[([A-Za-z0-9_-]+)\]$")
        .expect("static regex must compile")
});

/// Binds a JSON object into any [`MapTarget`], converting keys and values.
///
/// Value conversion stops at the first failing entry. Per-pair checks, when
/// configured with [`each_pair`](Mapping::each_pair), run against every entry
/// presented as `{"key": k, "value": v}` and all failing entries are
/// reported.
///
/// ```
/// use std::collections::BTreeMap;
///
/// use databind_core::*;
/// use serde_json::json;
///
/// #[derive(Default)]
/// struct Limits {
///     quotas: BTreeMap<String, u32>,
/// }
///
/// let schema = Schema::new().field(
///     Mapping::new("quotas", |l: &mut Limits| &mut l.quotas).each_pair(|pair| {
///         pair.field(Check::new("key").validator(pattern("^[a-z]+$").unwrap()))
///             .field(Check::new("value").validator(max(100)))
///     }),
/// );
///
/// let mut limits = Limits::default();
/// let data = json!({"quotas": {"cpu": 4, "Disk": 500}});
/// let errors = schema.apply(data.as_object().unwrap(), &mut limits).unwrap_err();
/// assert_eq!(
///     errors.to_string(),
///     "quotas: entry \"Disk\": key: value does not match pattern ^[a-z]+$; \
///      value: value must be at most 100"
/// );
/// ```
pub struct Mapping<S, K, V, M> {
    meta: FieldMeta,
    lens: Lens<S, M>,
    pairs: Option<Arc<Schema<()>>>,
    transformers: Vec<Box<dyn Transformer<V>>>,
    default: Option<Preset<M>>,
    entry: PhantomData<fn() -> (K, V)>,
}

field_common!(Mapping<S, K, V, M>);

impl<S, K, V, M> Mapping<S, K, V, M>
where
    K: Dynamic + 'static,
    V: Dynamic + Serialize + 'static,
    M: MapTarget<K, V> + 'static,
{
    /// Creates a mapping field.
    pub fn new<F>(name: impl Into<String>, lens: F) -> Self
    where
        F: Fn(&mut S) -> &mut M + Send + Sync + 'static,
    {
        Self {
            meta: FieldMeta::new(name),
            lens: Box::new(lens),
            pairs: None,
            transformers: Vec::new(),
            default: None,
            entry: PhantomData,
        }
    }

    /// Validates every pair through a schema of [`Check`](crate::Check)
    /// fields named `key` and `value`.
    pub fn each_pair<B>(mut self, build: B) -> Self
    where
        B: FnOnce(Schema<()>) -> Schema<()>,
    {
        self.pairs = Some(configure(build));
        self
    }
}

impl<S, K, V, M> AcceptsDefault<M> for Mapping<S, K, V, M>
where
    M: Clone + Serialize + Send + Sync + 'static,
{
    fn set_default(&mut self, value: M) {
        self.default = Some(Preset::new(value));
    }
}

impl<S, K, V, M> AcceptsTransformers<V> for Mapping<S, K, V, M> {
    fn add_transformer(&mut self, transformer: Box<dyn Transformer<V>>) {
        self.transformers.push(transformer);
    }
}

impl<S, K, V, M> Mapping<S, K, V, M>
where
    K: Dynamic,
    V: Dynamic + Serialize,
    M: MapTarget<K, V>,
{
    fn entry(&self, key: &str, value: &Value, cx: &Context<'_>) -> Result<(K, V), BindError> {
        let k = cx.convert::<K>(&Value::String(key.to_string()))?;
        let v = cx.convert::<V>(value)?;
        Ok((k, run_pipeline(&self.transformers, v)?))
    }

    fn check_pairs(&self, object: &Map<String, Value>, cx: &Context<'_>) -> Result<(), BindError> {
        let Some(pairs) = &self.pairs else {
            return Ok(());
        };
        let failures = object
            .iter()
            .filter_map(|(key, value)| {
                let mut pair = Map::new();
                pair.insert("key".to_string(), Value::String(key.clone()));
                pair.insert("value".to_string(), value.clone());
                pairs
                    .apply_in(&pair, &mut (), cx)
                    .err()
                    .map(|errors| BindError::from(errors).at(Position::Key(key.clone())))
            })
            .collect();
        collected(failures)
    }
}

impl<S, K, V, M> Field<S> for Mapping<S, K, V, M>
where
    K: Dynamic + 'static,
    V: Dynamic + Serialize + 'static,
    M: MapTarget<K, V> + 'static,
{
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    fn shape(&self) -> FieldShape {
        FieldShape::Map
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

        let object = expect_object(raw)?;
        self.check_pairs(object, cx)?;

        let mut entries = M::default();
        let mut snapshot = Map::new();
        for (key, value) in object {
            let (k, v) = self
                .entry(key, value, cx)
                .map_err(|err| err.at(Position::Key(key.clone())))?;
            if let Some(bound) = to_dynamic(&v) {
                snapshot.insert(key.clone(), bound);
            }
            entries.insert_entry(k, v);
        }

        *(self.lens)(target) = entries;
        Ok(Assignment::Assigned(Some(Value::Object(snapshot))))
    }
}

/// Binds a JSON object whose values are each bound through a schema.
///
/// Every failing entry is reported; the target is replaced only when all
/// entries succeed.
pub struct NestedMap<S, V, M> {
    meta: FieldMeta,
    lens: Lens<S, M>,
    schema: Arc<Schema<V>>,
}

field_common!(NestedMap<S, V, M>);

impl<S, V, M> NestedMap<S, V, M>
where
    V: Default + 'static,
    M: MapTarget<String, V> + 'static,
{
    /// Creates a nested map whose value schema is built by `build`.
    pub fn new<F, B>(name: impl Into<String>, lens: F, build: B) -> Self
    where
        F: Fn(&mut S) -> &mut M + Send + Sync + 'static,
        B: FnOnce(Schema<V>) -> Schema<V>,
    {
        Self::with_schema(name, lens, configure(build))
    }

    /// Creates a nested map bound through `schema`.
    pub fn with_schema<F>(name: impl Into<String>, lens: F, schema: Arc<Schema<V>>) -> Self
    where
        F: Fn(&mut S) -> &mut M + Send + Sync + 'static,
    {
        Self {
            meta: FieldMeta::new(name),
            lens: Box::new(lens),
            schema,
        }
    }
}

impl<S, V, M> Field<S> for NestedMap<S, V, M>
where
    V: Default + 'static,
    M: MapTarget<String, V> + 'static,
{
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    fn shape(&self) -> FieldShape {
        FieldShape::NestedMap
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
        let entries = bind_entries(&self.schema, object.iter(), cx)?;
        *(self.lens)(target) = entries;
        Ok(Assignment::Assigned(Some(raw.clone())))
    }
}

fn bind_entries<'v, V, M>(
    schema: &Schema<V>,
    entries: impl Iterator<Item = (&'v String, &'v Value)>,
    cx: &Context<'_>,
) -> Result<M, BindError>
where
    V: Default,
    M: MapTarget<String, V>,
{
    let mut bound = M::default();
    let mut failures = Vec::new();
    for (key, value) in entries {
        let result = expect_object(value).and_then(|data| {
            let mut child = V::default();
            schema.apply_in(data, &mut child, cx)?;
            Ok(child)
        });
        match result {
            Ok(child) => bound.insert_entry(key.clone(), child),
            Err(err) => failures.push(err.at(Position::Key(key.clone()))),
        }
    }
    collected(failures)?;
    Ok(bound)
}

/// Rebuilds the entries of an indexed form field.
///
/// Keys of the form `name[id][sub]` become `{id: {sub: value}}`. An object
/// already stored under `name` is merged in first, so JSON and form
/// payloads produce the same shape. Returns `None` when `data` carries
/// nothing for `name`.
///
/// ```
/// use databind_core::reassemble_indexed;
/// use serde_json::json;
///
/// let data = json!({
///     "items[b7][qty]": "2",
///     "items[a1][qty]": "1",
///     "items[a1][sku]": "X",
///     "other": true,
/// });
/// let entries = reassemble_indexed(data.as_object().unwrap(), "items").unwrap();
/// assert_eq!(
///     serde_json::Value::Object(entries),
///     json!({"a1": {"qty": "1", "sku": "X"}, "b7": {"qty": "2"}})
/// );
/// ```
pub fn reassemble_indexed(data: &Map<String, Value>, name: &str) -> Option<Map<String, Value>> {
    let mut entries: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    let mut found = false;

    if let Some(Value::Object(existing)) = data.get(name) {
        found = true;
        for (id, entry) in existing {
            if let Value::Object(fields) = entry {
                entries.insert(id.clone(), fields.clone());
            }
        }
    }

    for (key, value) in data {
        let Some(captures) = INDEXED_KEY.captures(key) else {
            continue;
        };
        if &captures[1] != name {
            continue;
        }
        found = true;
        entries
            .entry(captures[2].to_string())
            .or_default()
            .insert(captures[3].to_string(), value.clone());
    }

    found.then(|| {
        entries
            .into_iter()
            .map(|(id, fields)| (id, Value::Object(fields)))
            .collect()
    })
}

fn has_indexed_keys(data: &Map<String, Value>, name: &str) -> bool {
    data.keys().any(|key| {
        INDEXED_KEY
            .captures(key)
            .is_some_and(|captures| &captures[1] == name)
    })
}

/// Binds bracketed form keys (`name[id][sub]`) into a map of objects.
///
/// Identifiers are arbitrary `[A-Za-z0-9_-]` tokens; entries are bound in
/// identifier order and every failing entry is reported.
pub struct IndexedMap<S, V, M> {
    meta: FieldMeta,
    lens: Lens<S, M>,
    schema: Arc<Schema<V>>,
}

field_common!(IndexedMap<S, V, M>);

impl<S, V, M> IndexedMap<S, V, M>
where
    V: Default + 'static,
    M: MapTarget<String, V> + 'static,
{
    /// Creates an indexed map whose entry schema is built by `build`.
    pub fn new<F, B>(name: impl Into<String>, lens: F, build: B) -> Self
    where
        F: Fn(&mut S) -> &mut M + Send + Sync + 'static,
        B: FnOnce(Schema<V>) -> Schema<V>,
    {
        Self::with_schema(name, lens, configure(build))
    }

    /// Creates an indexed map bound through `schema`.
    pub fn with_schema<F>(name: impl Into<String>, lens: F, schema: Arc<Schema<V>>) -> Self
    where
        F: Fn(&mut S) -> &mut M + Send + Sync + 'static,
    {
        Self {
            meta: FieldMeta::new(name),
            lens: Box::new(lens),
            schema,
        }
    }
}

impl<S, V, M> Field<S> for IndexedMap<S, V, M>
where
    V: Default + 'static,
    M: MapTarget<String, V> + 'static,
{
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    fn shape(&self) -> FieldShape {
        FieldShape::IndexedMap
    }

    fn validators(&self) -> &[Box<dyn Validator>] {
        &self.meta.validators
    }

    fn is_present_in(&self, data: &Map<String, Value>) -> bool {
        data.contains_key(&self.meta.name) || has_indexed_keys(data, &self.meta.name)
    }

    fn assign(
        &self,
        data: &Map<String, Value>,
        target: &mut S,
        cx: &Context<'_>,
    ) -> Result<Assignment, BindError> {
        match data.get(&self.meta.name) {
            Some(Value::Null) if !has_indexed_keys(data, &self.meta.name) => {
                return Ok(Assignment::Reset);
            }
            Some(raw) if !raw.is_null() => {
                expect_object(raw)?;
            }
            _ => {}
        }

        let Some(entries) = reassemble_indexed(data, &self.meta.name) else {
            return Ok(Assignment::Absent);
        };
        let bound = bind_entries(&self.schema, entries.iter(), cx)?;
        *(self.lens)(target) = bound;
        Ok(Assignment::Assigned(Some(Value::Object(entries))))
    }
}
