//! A fully resolved archive.
//!
//! Loads every store once, in dependency order: site catalogs, relations,
//! the model registry, privacy markers, then one association index per site.
//! Everything downstream reads from this value and never mutates it.

use crate::association::{AssociationIndex, SiteModels};
use crate::catalog::{CatalogRepository, ModelId, SiteCatalog, SiteId};
use crate::config::ArchiveConfig;
use crate::privacy::PrivateModels;
use crate::registry::ModelRegistry;
use crate::relation::RelationIndex;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug)]
pub struct Archive {
    pub config: ArchiveConfig,
    pub catalogs: CatalogRepository,
    pub relations: RelationIndex,
    pub registry: ModelRegistry,
    pub private: PrivateModels,
    associations: BTreeMap<SiteId, AssociationIndex>,
}

impl Archive {
    pub fn load(config: ArchiveConfig) -> Result<Self> {
        let mut catalogs = CatalogRepository::load(&config)?;
        let relations = RelationIndex::load(&config.relations_dir)?;
        catalogs.attach_relations(&relations);
        let registry = ModelRegistry::load(&config.model_registry)?;
        let private = PrivateModels::load(&config.private_models)?;

        let mut associations = BTreeMap::new();
        for entry in config.sites.values() {
            let Some(catalog) = catalogs.site(&entry.id) else {
                continue;
            };
            let credits = SiteModels::for_site(entry)?;
            let index = AssociationIndex::build(&credits, catalog, &registry)
                .with_context(|| format!("resolving model credits of {}", entry.id))?;
            associations.insert(entry.id.clone(), index);
        }

        info!(
            sites = associations.len(),
            models = registry.len(),
            related = relations.len(),
            "archive loaded"
        );
        Ok(Self {
            config,
            catalogs,
            relations,
            registry,
            private,
            associations,
        })
    }

    pub fn catalog(&self, site: &SiteId) -> Option<&SiteCatalog> {
        self.catalogs.site(site)
    }

    pub fn associations(&self, site: &SiteId) -> Option<&AssociationIndex> {
        self.associations.get(site)
    }

    /// Sites crediting `model`, in site id order.
    pub fn sites_crediting<'a>(
        &'a self,
        model: &'a ModelId,
    ) -> impl Iterator<Item = &'a AssociationIndex> + 'a {
        self.associations
            .values()
            .filter(move |index| index.contains_model(model))
    }
}
