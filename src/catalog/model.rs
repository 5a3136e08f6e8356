//! Item and model records.
//!
//! Both records have a fixed field set. Construction goes through
//! `from_value`, which checks the incoming object against the allow-list
//! first so schema drift surfaces as `CatalogError::UnknownField` naming every
//! offending key, then deserializes with `deny_unknown_fields` as a backstop.

use crate::catalog::identity::{ItemId, ModelId, QualifiedItem};
use crate::error::CatalogError;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Keys an item record may carry after merge.
pub const ITEM_FIELDS: &[&str] = &[
    "description",
    "name",
    "previews",
    "date",
    "url",
    "archive_url",
    "size",
    "sort_as",
    "price",
];

/// Keys a model record may carry.
pub const MODEL_FIELDS: &[&str] = &[
    "name",
    "biography",
    "links",
    "alt_spelling",
    "display_name",
    "aliases",
];

/// Size-kind key used for videos.
pub const VIDEO_KIND: &str = "duration";
/// Size-kind key used for photo sets.
pub const PHOTO_KIND: &str = "images";

fn check_fields(record: &'static str, id: &str, value: &Value, allowed: &[&str]) -> Result<()> {
    let Some(fields) = value.as_object() else {
        bail!("{record} {id:?} must be a JSON object");
    };
    let unknown: Vec<String> = fields
        .keys()
        .filter(|key| !allowed.contains(&key.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        bail!(CatalogError::UnknownField {
            record,
            id: id.to_string(),
            fields: unknown,
        });
    }
    Ok(())
}

/// Magnitude of a size entry: numeric or free text (e.g. `"1:02:33"`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Magnitude {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Magnitude::Number(n) => write!(f, "{n}"),
            Magnitude::Text(t) => f.write_str(t),
        }
    }
}

/// One normalized size entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Size {
    Measured { size: Magnitude, units: String },
    Bare(Magnitude),
}

impl Size {
    pub fn magnitude(&self) -> &Magnitude {
        match self {
            Size::Measured { size, .. } | Size::Bare(size) => size,
        }
    }

    pub fn units(&self) -> Option<&str> {
        match self {
            Size::Measured { units, .. } => Some(units),
            Size::Bare(_) => None,
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Size::Measured { size, units } => write!(f, "{size} {units}"),
            Size::Bare(size) => write!(f, "{size}"),
        }
    }
}

/// Attributes of one item as stored in info layers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemRecord {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub previews: Vec<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub archive_url: String,
    #[serde(default)]
    pub size: BTreeMap<String, Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_as: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
}

/// A resolved item: its record plus the fields computed while loading a site.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(flatten)]
    pub record: ItemRecord,
    pub internal_url: String,
    pub related: Vec<QualifiedItem>,
}

impl Item {
    /// Validate and build an item from its merged, normalized JSON.
    pub fn from_value(id: &str, value: Value) -> Result<Self> {
        check_fields("item", id, &value, ITEM_FIELDS)?;
        let record: ItemRecord =
            serde_json::from_value(value).with_context(|| format!("decoding item {id:?}"))?;
        Ok(Self {
            id: ItemId(id.to_string()),
            record,
            internal_url: String::new(),
            related: Vec::new(),
        })
    }

    /// `sort_as` when present, otherwise the id.
    pub fn sort_key(&self) -> &str {
        self.record.sort_as.as_deref().unwrap_or(&self.id.0)
    }

    pub fn is_video(&self) -> bool {
        self.record.size.contains_key(VIDEO_KIND)
    }

    pub fn is_photo_set(&self) -> bool {
        self.record.size.contains_key(PHOTO_KIND)
    }

    pub fn display_name(&self) -> &str {
        if self.record.name.is_empty() {
            &self.id.0
        } else {
            &self.record.name
        }
    }
}

/// A person credited across sites.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_spelling: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
}

/// Biography stub given to freshly minted models.
pub const DEFAULT_BIOGRAPHY: &str = "<h2>Biography</h2>";

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            biography: DEFAULT_BIOGRAPHY.to_string(),
            links: Vec::new(),
            alt_spelling: None,
            display_name: None,
            aliases: None,
        }
    }

    pub fn from_value(id: &ModelId, value: Value) -> Result<Self> {
        check_fields("model", &id.0, &value, MODEL_FIELDS)?;
        serde_json::from_value(value).with_context(|| format!("decoding model {id}"))
    }

    /// Name used on rendered pages.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn aliases(&self) -> &[String] {
        self.aliases.as_deref().unwrap_or_default()
    }

    /// Links as a bulleted text block, one per line.
    pub fn links_block(&self) -> String {
        self.links
            .iter()
            .map(|link| format!(" * {link}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
