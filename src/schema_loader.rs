//! JSON Schema loading for archive config documents.
//!
//! Schemas under `schema/` are compiled into the binary, so an installed
//! `canon` never reads them from disk. A schema is compiled once per load and
//! every validation failure is reported together with the document path, so a
//! broken config lists all of its problems at once.

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::path::Path;

pub const GLOBAL_CONFIG_SCHEMA: &str = "global_config.schema.json";
pub const SITE_CONFIG_SCHEMA: &str = "site_config.schema.json";

const BUNDLED: &[(&str, &str)] = &[
    (
        GLOBAL_CONFIG_SCHEMA,
        include_str!("../schema/global_config.schema.json"),
    ),
    (
        SITE_CONFIG_SCHEMA,
        include_str!("../schema/site_config.schema.json"),
    ),
];

/// A compiled schema plus its bundled name.
pub(crate) struct LoadedSchema {
    pub name: &'static str,
    pub compiled: JSONSchema,
}

pub(crate) fn load_json_schema(name: &str) -> Result<LoadedSchema> {
    let (name, text) = BUNDLED
        .iter()
        .copied()
        .find(|(bundled, _)| *bundled == name)
        .ok_or_else(|| anyhow!("no bundled schema named {name}"))?;
    let raw: Value =
        serde_json::from_str(text).with_context(|| format!("parsing schema {name}"))?;
    let compiled =
        JSONSchema::compile(&raw).map_err(|err| anyhow!("compiling schema {name}: {err}"))?;
    Ok(LoadedSchema { name, compiled })
}

impl LoadedSchema {
    /// Validate `document` (read from `origin`) against this schema.
    pub fn validate(&self, document: &Value, origin: &Path) -> Result<()> {
        if let Err(errors) = self.compiled.validate(document) {
            let details = errors
                .map(|err| format!("{}: {err}", err.instance_path))
                .collect::<Vec<_>>()
                .join("\n");
            bail!(
                "{} failed validation against {}:\n{}",
                origin.display(),
                self.name,
                details
            );
        }
        Ok(())
    }
}
