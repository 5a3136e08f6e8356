//! One site's resolved item catalog.
//!
//! Built from the site's info layers through the merge pipeline; afterwards
//! the catalog is read-only except for the relation cross-references filled in
//! by `CatalogRepository`.

use crate::catalog::identity::{ItemId, SiteId};
use crate::catalog::model::Item;
use crate::config::SiteEntry;
use crate::merge::{read_layer, resolve_layers};
use crate::sorting::natural_cmp;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SiteCatalog {
    site_id: SiteId,
    family: String,
    display_name: String,
    // Natural order of sort key; `by_id` indexes into it.
    items: Vec<Item>,
    by_id: BTreeMap<ItemId, usize>,
}

/// Release-interval summary over a site's distinct item dates.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseCadence {
    pub releases: usize,
    pub mean_interval_days: f64,
    pub median_interval_days: f64,
}

impl SiteCatalog {
    /// Read every info layer of a configured site and resolve it.
    pub fn load(entry: &SiteEntry) -> Result<Self> {
        let mut layers = Vec::new();
        for path in entry.config.info_layers() {
            layers.push(read_layer(path)?);
        }
        let catalog = Self::from_layers(
            entry.id.clone(),
            &entry.family,
            entry.config.display_name(),
            layers,
        )
        .with_context(|| format!("resolving items of {}", entry.id))?;
        debug!(site = %entry.id, items = catalog.len(), "loaded site catalog");
        Ok(catalog)
    }

    /// Resolve already-parsed layers (merge, re-key, normalize, validate).
    pub fn from_layers<I>(
        site_id: SiteId,
        family: &str,
        display_name: String,
        layers: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let mut items = Vec::new();
        let mut by_id = BTreeMap::new();
        for (id, value) in resolve_layers(layers)? {
            let mut item = Item::from_value(&id, value)?;
            item.internal_url = format!("{site_id}/index.html#{id}");
            by_id.insert(item.id.clone(), items.len());
            items.push(item);
        }
        Ok(Self {
            site_id,
            family: family.to_string(),
            display_name,
            items,
            by_id,
        })
    }

    pub fn site_id(&self) -> &SiteId {
        &self.site_id
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.by_id.get(id).map(|&idx| &self.items[idx])
    }

    pub(crate) fn get_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        let idx = *self.by_id.get(id)?;
        self.items.get_mut(idx)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(&ItemId(id.to_string()))
    }

    /// Items in natural order of their sort key.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Item ids in natural order of their sort key.
    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter().map(|item| &item.id)
    }

    /// Order foreign ids by this site's sort keys; unknown ids sort by id.
    pub fn sort_item_ids(&self, ids: &mut [ItemId]) {
        ids.sort_by(|a, b| {
            let key_a = self.get(a).map_or(a.as_str(), Item::sort_key);
            let key_b = self.get(b).map_or(b.as_str(), Item::sort_key);
            natural_cmp(key_a, key_b)
        });
    }

    /// Most recent dated video.
    pub fn latest_video(&self) -> Option<&Item> {
        self.latest_where(Item::is_video)
    }

    /// Most recent dated photo set.
    pub fn latest_photo(&self) -> Option<&Item> {
        self.latest_where(Item::is_photo_set)
    }

    fn latest_where(&self, keep: fn(&Item) -> bool) -> Option<&Item> {
        self.items
            .iter()
            .filter(|item| keep(item) && !item.record.date.is_empty())
            .max_by(|a, b| a.record.date.cmp(&b.record.date))
    }

    /// Source URLs of every item that has one.
    pub fn source_urls(&self) -> Vec<&str> {
        self.items
            .iter()
            .map(|item| item.record.url.as_str())
            .filter(|url| !url.is_empty())
            .collect()
    }

    /// Interval statistics over distinct `YYYY-MM-DD` release dates.
    ///
    /// Returns `None` with fewer than two distinct parseable dates.
    pub fn release_cadence(&self) -> Option<ReleaseCadence> {
        let dates: BTreeSet<NaiveDate> = self
            .items
            .iter()
            .filter_map(|item| NaiveDate::parse_from_str(&item.record.date, "%Y-%m-%d").ok())
            .collect();
        let dates: Vec<NaiveDate> = dates.into_iter().collect();
        if dates.len() < 2 {
            return None;
        }

        let span = (dates[dates.len() - 1] - dates[0]).num_days() as f64;
        let mut intervals: Vec<i64> = dates
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_days())
            .collect();
        intervals.sort_unstable();
        let mid = intervals.len() / 2;
        let median = if intervals.len() % 2 == 0 {
            (intervals[mid - 1] + intervals[mid]) as f64 / 2.0
        } else {
            intervals[mid] as f64
        };

        Some(ReleaseCadence {
            releases: dates.len(),
            mean_interval_days: span / dates.len() as f64,
            median_interval_days: median,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object layer")
    }

    fn catalog(layers: Vec<Value>) -> Result<SiteCatalog> {
        SiteCatalog::from_layers(
            SiteId::from("fam/site"),
            "Fam",
            "Site".to_string(),
            layers.into_iter().map(layer),
        )
    }

    #[test]
    fn merges_layers_and_orders_naturally() {
        let site = catalog(vec![
            json!({"vid_10": {"name": "Ten"}, "vid_2": {"name": "Two"}}),
            json!({"vid_2": {"description": "extra"}, "old": {"item_id": "vid_1"}}),
        ])
        .unwrap();
        let ids: Vec<&str> = site.ids().map(ItemId::as_str).collect();
        assert_eq!(ids, vec!["vid_1", "vid_2", "vid_10"]);

        let two = site.get(&ItemId::from("vid_2")).unwrap();
        assert_eq!(two.record.name, "Two");
        assert_eq!(two.record.description, "extra");
        assert_eq!(two.internal_url, "fam/site/index.html#vid_2");
        assert!(site.contains("vid_1"));
        assert!(!site.contains("old"));
    }

    #[test]
    fn unknown_field_aborts_the_site() {
        let err = catalog(vec![json!({"vid_1": {"nmae": "typo"}})]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::CatalogError>(),
            Some(crate::error::CatalogError::UnknownField { .. })
        ));
    }

    #[test]
    fn latest_by_kind() {
        let site = catalog(vec![json!({
            "v1": {"date": "2020-01-01", "size": {"duration": 10}},
            "v2": {"date": "2021-06-01", "size": {"duration": 12}},
            "v3": {"size": {"duration": 1}},
            "p1": {"date": "2022-01-01", "size": {"images": 30}}
        })])
        .unwrap();
        assert_eq!(site.latest_video().map(|i| i.id.as_str()), Some("v2"));
        assert_eq!(site.latest_photo().map(|i| i.id.as_str()), Some("p1"));
    }

    #[test]
    fn sort_item_ids_uses_sort_keys() {
        let site = catalog(vec![json!({"b": {"sort_as": "1"}, "a": {"sort_as": "2"}})]).unwrap();
        let mut ids = vec![ItemId::from("a"), ItemId::from("b")];
        site.sort_item_ids(&mut ids);
        assert_eq!(ids, vec![ItemId::from("b"), ItemId::from("a")]);
    }

    #[test]
    fn cadence_over_distinct_dates() {
        let site = catalog(vec![json!({
            "a": {"date": "2020-01-01"},
            "b": {"date": "2020-01-11"},
            "c": {"date": "2020-01-11"},
            "d": {"date": "2020-01-31", "url": "https://example.test/d"}
        })])
        .unwrap();
        let cadence = site.release_cadence().expect("cadence");
        assert_eq!(cadence.releases, 3);
        assert_eq!(cadence.median_interval_days, 15.0);
        assert_eq!(cadence.mean_interval_days, 10.0);
        assert_eq!(site.source_urls(), vec!["https://example.test/d"]);
    }
}
