//! Site <-> model associations.
//!
//! A site's models file maps model id -> credit list. A credit is either a bare
//! item pattern or an object with a pattern list and an optional
//! `credited_as` name:
//!
//! ```json
//! {
//!     "k3Xa9QmT": ["vid_0{1,2}", "photo_*"],
//!     "Pq7Lm2Zr": [{"items": ["vid_03"], "credited_as": "Jo"}]
//! }
//! ```
//!
//! `AssociationIndex` resolves every credit once against the site catalog and
//! keeps both projections (model -> items, item -> credits) built from that
//! single pass.

use crate::catalog::{ItemId, ModelId, SiteCatalog, SiteId};
use crate::config::SiteEntry;
use crate::error::CatalogError;
use crate::merge::parse_document;
use crate::pattern::Pattern;
use crate::persist::write_json_atomic;
use crate::registry::ModelRegistry;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// One entry of a model's credit list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credit {
    Pattern(String),
    Detailed(CreditDetail),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditDetail {
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credited_as: Option<String>,
    // Accepted while parsing so it can be rejected with a precise error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Credit {
    pub fn patterns(&self) -> &[String] {
        match self {
            Credit::Pattern(pattern) => std::slice::from_ref(pattern),
            Credit::Detailed(detail) => &detail.items,
        }
    }

    pub fn credited_as(&self) -> Option<&str> {
        match self {
            Credit::Pattern(_) => None,
            Credit::Detailed(detail) => detail.credited_as.as_deref(),
        }
    }
}

/// The raw credit lists of one site.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteModels {
    credits: BTreeMap<ModelId, Vec<Credit>>,
}

impl SiteModels {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading models file {}", path.display()))?;
        let document =
            parse_document(&text).with_context(|| format!("parsing {}", path.display()))?;
        serde_json::from_value(document)
            .with_context(|| format!("decoding credits in {}", path.display()))
    }

    /// Credits of a configured site; a site without a models file has none.
    pub fn for_site(entry: &SiteEntry) -> Result<Self> {
        match &entry.config.models_file {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn credits(&self, model: &ModelId) -> &[Credit] {
        self.credits.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModelId, &[Credit])> {
        self.credits
            .iter()
            .map(|(model, credits)| (model, credits.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }

    /// Register bare item patterns for `model`, skipping ones already listed.
    ///
    /// Returns how many credits were added.
    pub fn add_credit(&mut self, model: &ModelId, item_ids: &[ItemId]) -> usize {
        let credits = self.credits.entry(model.clone()).or_default();
        let mut added = 0;
        for item in item_ids {
            let credit = Credit::Pattern(item.0.clone());
            if credits.contains(&credit) {
                warn!(item = %item, model = %model, "item already registered for model");
                continue;
            }
            credits.push(credit);
            added += 1;
        }
        added
    }

    /// Rewrite the whole models file.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, &self.credits)
            .with_context(|| format!("saving models file {}", path.display()))
    }
}

/// A model's credit on one item, ordered by display name then id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ItemCredit {
    pub display_name: String,
    pub model_id: ModelId,
}

/// Both directions of one site's model credits.
#[derive(Clone, Debug)]
pub struct AssociationIndex {
    site: SiteId,
    by_model: BTreeMap<ModelId, Vec<ItemId>>,
    by_item: BTreeMap<ItemId, Vec<ItemCredit>>,
}

impl AssociationIndex {
    /// Resolve every credit against `catalog`.
    ///
    /// Fails when a pattern matches nothing, a credit overrides the display
    /// name, or a credited id is missing from the registry.
    pub fn build(
        models: &SiteModels,
        catalog: &SiteCatalog,
        registry: &ModelRegistry,
    ) -> Result<Self> {
        let site = catalog.site_id().clone();
        let mut by_model: BTreeMap<ModelId, Vec<ItemId>> = BTreeMap::new();
        let mut by_item: BTreeMap<ItemId, Vec<ItemCredit>> = BTreeMap::new();

        for (model_id, credits) in models.iter() {
            let Some(model) = registry.get(model_id) else {
                bail!(CatalogError::UnknownModel {
                    site,
                    model: model_id.clone(),
                });
            };
            let items = by_model.entry(model_id.clone()).or_default();

            for credit in credits {
                if let Credit::Detailed(CreditDetail {
                    display_name: Some(_),
                    ..
                }) = credit
                {
                    bail!(CatalogError::CreditDisplayName {
                        site,
                        model: model_id.clone(),
                    });
                }

                let mut display_name = model.display_name().to_string();
                if let Some(alias) = credit.credited_as() {
                    display_name.push_str(&format!(" (as {alias})"));
                }
                let entry = ItemCredit {
                    display_name,
                    model_id: model_id.clone(),
                };

                let mut matched: Vec<ItemId> = Vec::new();
                for pattern in credit.patterns() {
                    for item in resolve_pattern(catalog, model_id, pattern)? {
                        if !matched.contains(&item) {
                            matched.push(item);
                        }
                    }
                }
                for item in matched {
                    by_item.entry(item.clone()).or_default().push(entry.clone());
                    if !items.contains(&item) {
                        items.push(item);
                    }
                }
            }
        }

        for credits in by_item.values_mut() {
            credits.sort();
        }
        debug!(site = %site, models = by_model.len(), items = by_item.len(), "built associations");
        Ok(Self {
            site,
            by_model,
            by_item,
        })
    }

    pub fn site(&self) -> &SiteId {
        &self.site
    }

    /// Items credited to `model`, in credit order; empty when uncredited.
    pub fn items_for_model(&self, model: &ModelId) -> &[ItemId] {
        self.by_model.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Credits on `item`, sorted; empty when nobody is credited.
    pub fn credits_for_item(&self, item: &ItemId) -> &[ItemCredit] {
        self.by_item.get(item).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Credited model ids in id order.
    pub fn models(&self) -> impl Iterator<Item = &ModelId> {
        self.by_model.keys()
    }

    pub fn contains_model(&self, model: &ModelId) -> bool {
        self.by_model.contains_key(model)
    }
}

/// Items a credit pattern names in `catalog`. A literal item id is taken
/// as-is; anything else goes through the matcher and must hit something.
pub fn resolve_pattern(
    catalog: &SiteCatalog,
    model: &ModelId,
    pattern: &str,
) -> Result<Vec<ItemId>> {
    if catalog.contains(pattern) {
        return Ok(vec![ItemId(pattern.to_string())]);
    }
    let compiled = Pattern::new(pattern);
    let matches: Vec<ItemId> = catalog
        .ids()
        .filter(|id| compiled.is_match(id.as_str()))
        .cloned()
        .collect();
    if matches.is_empty() {
        bail!(CatalogError::UnresolvedPattern {
            site: catalog.site_id().clone(),
            model: model.clone(),
            pattern: pattern.to_string(),
        });
    }
    Ok(matches)
}
