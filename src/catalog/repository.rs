//! Every configured site's catalog, keyed by `SiteId`.
//!
//! The repository is the one place that resolves `QualifiedItem` references
//! across sites, and it fills each item's `related` list from a
//! `RelationIndex` once all sites are loaded.

use crate::catalog::identity::{QualifiedItem, SiteId};
use crate::catalog::index::SiteCatalog;
use crate::catalog::model::Item;
use crate::config::ArchiveConfig;
use crate::relation::RelationIndex;
use anyhow::{Result, bail};
use std::collections::BTreeMap;

#[derive(Default, Debug)]
pub struct CatalogRepository {
    sites: BTreeMap<SiteId, SiteCatalog>,
}

impl CatalogRepository {
    /// Load every configured site.
    pub fn load(config: &ArchiveConfig) -> Result<Self> {
        let mut repo = Self::default();
        for entry in config.sites.values() {
            repo.register(SiteCatalog::load(entry)?);
        }
        Ok(repo)
    }

    /// Load only the named sites.
    pub fn load_sites(config: &ArchiveConfig, ids: &[SiteId]) -> Result<Self> {
        let mut repo = Self::default();
        for id in ids {
            let Some(entry) = config.site(id) else {
                bail!("site {id} is not registered in the archive config");
            };
            repo.register(SiteCatalog::load(entry)?);
        }
        Ok(repo)
    }

    /// Register a catalog for later lookup.
    pub fn register(&mut self, catalog: SiteCatalog) {
        self.sites.insert(catalog.site_id().clone(), catalog);
    }

    pub fn site(&self, id: &SiteId) -> Option<&SiteCatalog> {
        self.sites.get(id)
    }

    pub fn sites(&self) -> impl Iterator<Item = &SiteCatalog> {
        self.sites.values()
    }

    /// Resolve an archive-wide reference.
    pub fn resolve(&self, item: &QualifiedItem) -> Option<&Item> {
        self.site(&item.site)?.get(&item.item)
    }

    /// Copy each loaded item's siblings from the relation index.
    pub fn attach_relations(&mut self, relations: &RelationIndex) {
        for catalog in self.sites.values_mut() {
            let site = catalog.site_id().clone();
            let ids: Vec<_> = catalog.ids().cloned().collect();
            for id in ids {
                let key = QualifiedItem {
                    site: site.clone(),
                    item: id,
                };
                let related = relations.related(&key);
                if let Some(item) = catalog.get_mut(&key.item) {
                    item.related = related.to_vec();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemId;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn site(id: &str, items: serde_json::Value) -> SiteCatalog {
        SiteCatalog::from_layers(
            SiteId::from(id),
            "Fam",
            id.to_string(),
            [items.as_object().cloned().unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn resolves_across_sites_and_attaches_relations() {
        let mut repo = CatalogRepository::default();
        repo.register(site("fam/a", json!({"x": {"name": "X"}, "y": {}})));
        repo.register(site("fam/b", json!({"z": {"name": "Z"}})));

        let relations = RelationIndex::from_groups([BTreeSet::from([
            QualifiedItem::new("fam/a", "x"),
            QualifiedItem::new("fam/b", "z"),
        ])]);
        repo.attach_relations(&relations);

        let x = repo.resolve(&QualifiedItem::new("fam/a", "x")).unwrap();
        assert_eq!(x.related, vec![QualifiedItem::new("fam/b", "z")]);
        let sibling = repo.resolve(&x.related[0]).unwrap();
        assert_eq!(sibling.record.name, "Z");

        let y = repo
            .site(&SiteId::from("fam/a"))
            .and_then(|s| s.get(&ItemId::from("y")))
            .unwrap();
        assert!(y.related.is_empty());
        assert!(repo.resolve(&QualifiedItem::new("fam/c", "x")).is_none());
    }
}
