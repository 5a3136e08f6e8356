//! Layered merge of per-item JSON documents.
//!
//! Each layer maps item id -> partial attribute object. Layers are merged in
//! order with a deep structural merge (objects merge key by key, anything else
//! is replaced wholesale by the later layer), then records carrying an
//! `item_id` override are re-keyed, and `size` blocks are flattened into the
//! canonical `{kind: scalar | {size, units}}` shape.

use crate::error::CatalogError;
use crate::sorting::natural_cmp;
use anyhow::{Context, Result, bail};
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::Path;

/// Attribute that renames a record during merge.
pub const ITEM_ID_OVERRIDE: &str = "item_id";
const SORT_KEY: &str = "sort_as";
const SIZE_KEY: &str = "size";

/// Parse one JSON document, failing on a key repeated inside any object.
pub fn parse_document(text: &str) -> Result<Value> {
    let duplicate = RefCell::new(None);
    let mut de = serde_json::Deserializer::from_str(text);
    let parsed = StrictSeed {
        duplicate: &duplicate,
    }
    .deserialize(&mut de)
    .and_then(|value| de.end().map(|()| value));

    match parsed {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Some(key) = duplicate.into_inner() {
                return Err(CatalogError::DuplicateKey { key }.into());
            }
            Err(err).context("invalid JSON")
        }
    }
}

/// Read a layer file: a JSON object of item id -> attribute object.
pub fn read_layer(path: &Path) -> Result<Map<String, Value>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value = parse_document(&text).with_context(|| format!("parsing {}", path.display()))?;
    let Value::Object(layer) = value else {
        bail!("{} must contain a JSON object", path.display());
    };
    for (item_id, record) in &layer {
        if !record.is_object() {
            bail!(
                "{}: record {item_id:?} must be a JSON object",
                path.display()
            );
        }
    }
    Ok(layer)
}

/// Deep-merge `source` into `target`; `source` wins per leaf.
pub fn deep_merge(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, incoming) in source {
        match (target.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, incoming) => {
                target.insert(key, incoming);
            }
        }
    }
}

/// Merge layers in order into one mapping.
pub fn merge_layers<I>(layers: I) -> Map<String, Value>
where
    I: IntoIterator<Item = Map<String, Value>>,
{
    let mut merged = Map::new();
    for layer in layers {
        deep_merge(&mut merged, layer);
    }
    merged
}

/// Move records with an `item_id` override under their new id.
pub fn rekey_items(merged: Map<String, Value>) -> Result<Map<String, Value>> {
    let mut rekeyed = Map::new();
    for (item_id, mut record) in merged {
        let target = match record
            .as_object_mut()
            .and_then(|fields| fields.remove(ITEM_ID_OVERRIDE))
        {
            Some(Value::String(new_id)) => new_id,
            Some(other) => bail!("record {item_id:?} has non-string item_id override {other}"),
            None => item_id,
        };
        if rekeyed.contains_key(&target) {
            bail!(CatalogError::DuplicateItem { item_id: target });
        }
        rekeyed.insert(target, record);
    }
    Ok(rekeyed)
}

/// Flatten every record's `size` block in place.
pub fn normalize_sizes(records: &mut Map<String, Value>) -> Result<()> {
    for (item_id, record) in records.iter_mut() {
        let Some(fields) = record.as_object_mut() else {
            continue;
        };
        if let Some(size) = fields.remove(SIZE_KEY) {
            let normalized = normalize_size_block(size)
                .with_context(|| format!("normalizing size of {item_id:?}"))?;
            fields.insert(SIZE_KEY.to_string(), normalized);
        }
    }
    Ok(())
}

fn normalize_size_block(size: Value) -> Result<Value> {
    match size {
        Value::Object(entries) => {
            let mut out = Map::new();
            for (kind, entry) in entries {
                out.insert(kind, normalize_size_entry(entry)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(legacy) => {
            let mut out = Map::new();
            for entry in legacy {
                let Value::Object(mut fields) = entry else {
                    bail!("legacy size entries must be objects");
                };
                let Some(Value::String(kind)) = fields.remove("type") else {
                    bail!("legacy size entry is missing a string \"type\"");
                };
                out.insert(kind, normalize_size_entry(Value::Object(fields))?);
            }
            Ok(Value::Object(out))
        }
        other => bail!("size must be an object or a list, got {other}"),
    }
}

fn normalize_size_entry(entry: Value) -> Result<Value> {
    match entry {
        Value::Object(mut fields) => {
            let Some(size) = fields.remove("size") else {
                bail!("size entry is missing \"size\"");
            };
            match fields.remove("units") {
                Some(Value::Null) | None => Ok(size),
                Some(units) => {
                    let mut pair = Map::new();
                    pair.insert("size".to_string(), size);
                    pair.insert("units".to_string(), units);
                    Ok(Value::Object(pair))
                }
            }
        }
        Value::Array(_) => normalize_size_block(entry),
        scalar => Ok(scalar),
    }
}

/// Sort key of a record: `sort_as` when present, else its id.
pub fn sort_key<'a>(item_id: &'a str, record: &'a Value) -> &'a str {
    record
        .get(SORT_KEY)
        .and_then(Value::as_str)
        .unwrap_or(item_id)
}

/// Full pipeline: merge, re-key, normalize, then order naturally by sort key.
pub fn resolve_layers<I>(layers: I) -> Result<Vec<(String, Value)>>
where
    I: IntoIterator<Item = Map<String, Value>>,
{
    let mut records = rekey_items(merge_layers(layers))?;
    normalize_sizes(&mut records)?;
    let mut ordered: Vec<(String, Value)> = records.into_iter().collect();
    ordered.sort_by(|(a_id, a), (b_id, b)| {
        natural_cmp(sort_key(a_id, a), sort_key(b_id, b)).then_with(|| natural_cmp(a_id, b_id))
    });
    Ok(ordered)
}

#[derive(Clone, Copy)]
struct StrictSeed<'a> {
    duplicate: &'a RefCell<Option<String>>,
}

impl<'de> DeserializeSeed<'de> for StrictSeed<'_> {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for StrictSeed<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_u64<E>(self, v: u64) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(self)? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = Map::new();
        while let Some(key) = access.next_key::<String>()? {
            if map.contains_key(&key) {
                let message = format!("duplicate key: {key:?}");
                *self.duplicate.borrow_mut() = Some(key);
                return Err(de::Error::custom(message));
            }
            let value = access.next_value_seed(self)?;
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }
}
