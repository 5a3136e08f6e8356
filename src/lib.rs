//! Metadata resolution for a personal site/model archive.
//!
//! The crate loads an archive described by `canon.json`: per-site item info
//! layered from several JSON files, a global model registry, per-site model
//! credits, and relation groups linking items across sites. Everything is
//! resolved in memory into read-only indices; the registry, credit files and
//! privacy markers are the only files written back, always in full.
//!
//! Entry points for the `canon` binary are `find_archive_root`,
//! `ArchiveConfig::load` and `Archive::load`.

use anyhow::{Result, bail};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub mod archive;
pub mod association;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod merge;
pub mod pattern;
pub mod persist;
pub mod privacy;
pub mod registry;
pub mod relation;
mod schema_loader;
pub mod sorting;
pub mod views;

pub use archive::Archive;
pub use association::{AssociationIndex, Credit, ItemCredit, SiteModels};
pub use catalog::{
    CatalogRepository, Item, ItemId, Model, ModelId, QualifiedItem, SiteCatalog, SiteId,
};
pub use config::{ArchiveConfig, SiteConfig, SiteEntry};
pub use error::CatalogError;
pub use fuzzy::{edit_distance, min_substring_distance};
pub use pattern::{Pattern, pattern_filter, pattern_match, preprocess};
pub use privacy::{PrivateModels, public_links};
pub use registry::{ModelRegistry, RegistrySession};
pub use relation::RelationIndex;
pub use sorting::{natural_cmp, natural_sort};
pub use views::{JsonRenderer, Publisher, Renderer, SearchHit};

/// Environment variable naming the archive root explicitly.
pub const ROOT_ENV: &str = "CANON_ROOT";

fn is_archive_root(candidate: &Path) -> bool {
    candidate.join(config::CONFIG_FILE).is_file()
}

fn archive_root_from_hint(hint: &str) -> Option<PathBuf> {
    if hint.is_empty() {
        return None;
    }
    let hint_path = PathBuf::from(hint);
    if !is_archive_root(&hint_path) {
        return None;
    }
    fs::canonicalize(hint_path).ok()
}

fn search_upwards(start: &Path) -> Option<PathBuf> {
    let mut dir = fs::canonicalize(start).ok()?;
    loop {
        if is_archive_root(&dir) {
            return Some(dir);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Locate the archive root.
///
/// Honors `CANON_ROOT` when it points at a directory holding `canon.json`,
/// then climbs up from the current directory, then tries the build-time
/// `CANON_ROOT_HINT`.
pub fn find_archive_root() -> Result<PathBuf> {
    if let Ok(env_root) = env::var(ROOT_ENV) {
        if let Some(root) = archive_root_from_hint(&env_root) {
            return Ok(root);
        }
    }

    if let Ok(cwd) = env::current_dir() {
        if let Some(root) = search_upwards(&cwd) {
            return Ok(root);
        }
    }

    if let Some(hint) = option_env!("CANON_ROOT_HINT") {
        if let Some(root) = archive_root_from_hint(hint) {
            return Ok(root);
        }
    }

    bail!(
        "Unable to locate the archive root. Set {ROOT_ENV} to a directory containing {}.",
        config::CONFIG_FILE
    );
}
