//! The global model registry.
//!
//! The registry file maps model id -> model record and is the only persistent
//! store of models. Read-only callers use `ModelRegistry::load`; anything that
//! mutates goes through a `RegistrySession`, which writes the whole file back
//! on `commit` and leaves it untouched otherwise.
//!
//! Every mutating entry point resolves user input through `resolve_id`, the
//! three-way contract: an existing id passes through, a unique exact name
//! resolves to its id, and anything else fails with `NotFound` (carrying the
//! closest name) or `AmbiguousName` (carrying every candidate).

use crate::catalog::{Model, ModelId};
use crate::error::CatalogError;
use crate::fuzzy::{edit_distance, min_substring_distance};
use crate::merge::parse_document;
use crate::persist::write_json_atomic;
use anyhow::{Context, Result, bail};
use rand::seq::IndexedRandom;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Names starting with this are placeholders, not real names.
pub const PLACEHOLDER_SENTINEL: char = '#';
/// How many hits `extensive_search` returns.
pub const SEARCH_LIMIT: usize = 4;
const ID_LENGTH: usize = 8;
const ID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// One ranked hit from `extensive_search`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredModel<'a> {
    pub id: &'a ModelId,
    pub model: &'a Model,
    pub score: usize,
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    path: PathBuf,
    models: BTreeMap<ModelId, Model>,
}

impl ModelRegistry {
    /// Read and validate the registry file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading model registry {}", path.display()))?;
        let document =
            parse_document(&text).with_context(|| format!("parsing {}", path.display()))?;
        let Value::Object(entries) = document else {
            bail!("{} must contain a JSON object", path.display());
        };

        let mut models = BTreeMap::new();
        for (id, record) in entries {
            let id = ModelId(id);
            let model = Model::from_value(&id, record)
                .with_context(|| format!("loading {}", path.display()))?;
            models.insert(id, model);
        }
        debug!(models = models.len(), path = %path.display(), "loaded model registry");
        Ok(Self {
            path: path.to_path_buf(),
            models,
        })
    }

    /// An empty registry that will be written to `path`.
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            models: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn get(&self, id: &ModelId) -> Option<&Model> {
        self.models.get(id)
    }

    pub fn get_mut(&mut self, id: &ModelId) -> Option<&mut Model> {
        self.models.get_mut(id)
    }

    pub fn contains(&self, id: &ModelId) -> bool {
        self.models.contains_key(id)
    }

    /// Models in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ModelId, &Model)> {
        self.models.iter()
    }

    /// Insert or replace a model record.
    pub fn insert(&mut self, id: ModelId, model: Model) {
        self.models.insert(id, model);
    }

    /// Ids of every model whose canonical name equals `name` exactly.
    pub fn find_by_name(&self, name: &str) -> Vec<&ModelId> {
        self.models
            .iter()
            .filter(|(_, model)| model.name == name)
            .map(|(id, _)| id)
            .collect()
    }

    /// Canonical names ranked by edit distance to `name`, closest first.
    pub fn fuzzy_find_by_name(&self, name: &str) -> Vec<&str> {
        let mut ranked: Vec<(usize, &str)> = self
            .models
            .values()
            .map(|model| (edit_distance(name, &model.name), model.name.as_str()))
            .collect();
        ranked.sort_by_key(|(distance, _)| *distance);
        ranked.into_iter().map(|(_, name)| name).collect()
    }

    /// Resolve an id or an exact canonical name to a model id.
    pub fn resolve_id(&self, query: &str) -> std::result::Result<ModelId, CatalogError> {
        let as_id = ModelId(query.to_string());
        if self.models.contains_key(&as_id) {
            return Ok(as_id);
        }

        match self.find_by_name(query).as_slice() {
            [] => Err(CatalogError::NotFound {
                query: query.to_string(),
                suggestion: self
                    .fuzzy_find_by_name(query)
                    .first()
                    .map(|name| name.to_string()),
            }),
            [only] => Ok((*only).clone()),
            many => Err(CatalogError::AmbiguousName {
                query: query.to_string(),
                candidates: many.iter().map(|id| (*id).clone()).collect(),
            }),
        }
    }

    /// Rank models by their closest name-like field to `query`.
    ///
    /// Considers the alternate spelling, display name, aliases, and the
    /// canonical name unless it is a placeholder. Models with no usable field
    /// are left out. Ties keep id order.
    pub fn extensive_search(&self, query: &str) -> Vec<ScoredModel<'_>> {
        let mut hits: Vec<ScoredModel<'_>> = self
            .models
            .iter()
            .filter_map(|(id, model)| {
                let canonical = (!model.name.starts_with(PLACEHOLDER_SENTINEL))
                    .then_some(model.name.as_str());
                let score = model
                    .alt_spelling
                    .as_deref()
                    .into_iter()
                    .chain(model.display_name.as_deref())
                    .chain(model.aliases().iter().map(String::as_str))
                    .chain(canonical)
                    .map(|field| min_substring_distance(field, query))
                    .min()?;
                Some(ScoredModel { id, model, score })
            })
            .collect();
        hits.sort_by_key(|hit| hit.score);
        hits.truncate(SEARCH_LIMIT);
        hits
    }

    /// Mint a model with a fresh id; the name defaults to a placeholder.
    pub fn create_model(&mut self, name: Option<&str>) -> ModelId {
        let id = self.mint_id();
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("{PLACEHOLDER_SENTINEL}{id}"),
        };
        self.models.insert(id.clone(), Model::new(name));
        id
    }

    fn mint_id(&self) -> ModelId {
        let mut rng = rand::rng();
        loop {
            let candidate: String = ID_CHARS
                .choose_multiple(&mut rng, ID_LENGTH)
                .map(|&byte| char::from(byte))
                .collect();
            let candidate = ModelId(candidate);
            if !self.models.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Write the whole registry back to its file.
    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.models)
            .with_context(|| format!("saving model registry {}", self.path.display()))
    }

    /// Open a session, run `edit`, and persist only if it succeeds.
    pub fn edit<T, F>(path: &Path, edit: F) -> Result<T>
    where
        F: FnOnce(&mut ModelRegistry) -> Result<T>,
    {
        let mut session = RegistrySession::open(path)?;
        let out = edit(&mut session.registry)?;
        session.commit()?;
        Ok(out)
    }
}

/// Scoped load -> mutate -> persist over the registry file.
///
/// Dropping a session without `commit` discards its changes and logs which
/// file was left untouched.
#[derive(Debug)]
pub struct RegistrySession {
    registry: ModelRegistry,
    committed: bool,
}

impl RegistrySession {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            registry: ModelRegistry::load(path)?,
            committed: false,
        })
    }

    /// Persist the in-memory registry, replacing the file atomically.
    pub fn commit(mut self) -> Result<()> {
        self.registry.save()?;
        self.committed = true;
        Ok(())
    }
}

impl Deref for RegistrySession {
    type Target = ModelRegistry;

    fn deref(&self) -> &ModelRegistry {
        &self.registry
    }
}

impl DerefMut for RegistrySession {
    fn deref_mut(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }
}

impl Drop for RegistrySession {
    fn drop(&mut self) {
        if !self.committed {
            warn!(
                "model registry session ended without saving; {} was not written",
                self.registry.path.display()
            );
        }
    }
}
