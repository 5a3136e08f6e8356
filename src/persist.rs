//! Whole-file JSON write-back.
//!
//! Output is deterministic: object keys sorted, 4-space indentation,
//! non-ASCII written literally. Files are replaced by writing a temp file in
//! the same directory and renaming it over the target, so readers never see a
//! half-written document.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Render `data` in the archive's canonical JSON layout.
pub fn to_canonical_json<T: Serialize>(data: &T) -> Result<String> {
    let value = sort_keys(serde_json::to_value(data).context("serializing document")?);
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .context("formatting document")?;
    String::from_utf8(buf).context("formatted document is not UTF-8")
}

/// Atomically replace `path` with the canonical JSON of `data`.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let rendered = to_canonical_json(data)?;
    write_atomic(path, rendered.as_bytes())
}

/// Atomically replace `path` with `contents`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    temp.write_all(contents)
        .with_context(|| format!("writing temp file for {}", path.display()))?;
    temp.as_file()
        .sync_all()
        .with_context(|| format!("syncing temp file for {}", path.display()))?;
    temp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

// Rebuilds every object in key order, independent of how serde_json's Map is
// backed.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
