//! Archive configuration.
//!
//! `ArchiveConfig::load` reads `canon.json` at the archive root, validates it
//! and every per-site config against the bundled schemas, and resolves all
//! relative paths against the root. The result is built once per process and
//! handed to whatever needs it.

use crate::catalog::SiteId;
use crate::merge::parse_document;
use crate::schema_loader::{GLOBAL_CONFIG_SCHEMA, SITE_CONFIG_SCHEMA, load_json_schema};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Global config file name at the archive root.
pub const CONFIG_FILE: &str = "canon.json";
/// Family that collects everything not placed elsewhere on index pages.
pub const OTHER_FAMILY: &str = "Other";
/// Tag that keeps a site out of publication checks.
pub const WIP_TAG: &str = "wip";
/// Tag that appends the date range to a site's display name.
pub const SHOW_DATES_TAG: &str = "show_dates";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGlobalConfig {
    #[serde(default = "default_model_registry")]
    model_registry: PathBuf,
    #[serde(default = "default_relations_dir")]
    relations_dir: PathBuf,
    #[serde(default = "default_private_models")]
    private_models: PathBuf,
    #[serde(default = "default_output_dir")]
    output_dir: PathBuf,
    #[serde(default)]
    family_order: Vec<String>,
    families: BTreeMap<String, BTreeMap<String, SiteSource>>,
}

fn default_model_registry() -> PathBuf {
    PathBuf::from("model-info.json")
}
fn default_relations_dir() -> PathBuf {
    PathBuf::from("relations")
}
fn default_private_models() -> PathBuf {
    PathBuf::from(".private-models")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("html")
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SiteSource {
    File(PathBuf),
    Inline(Value),
}

/// Per-site configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    pub name: String,
    #[serde(default)]
    pub dates: Option<(Option<String>, Option<String>)>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub primary_info_file: PathBuf,
    #[serde(default)]
    pub extra_info_files: Vec<PathBuf>,
    #[serde(default)]
    pub models_file: Option<PathBuf>,
    #[serde(default)]
    pub notes_file: Option<PathBuf>,
}

impl SiteConfig {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_wip(&self) -> bool {
        self.has_tag(WIP_TAG)
    }

    /// Name shown on pages, with the date range when tagged `show_dates`.
    pub fn display_name(&self) -> String {
        match (&self.dates, self.has_tag(SHOW_DATES_TAG)) {
            (Some((from, to)), true) => format!(
                "{} ({}–{})",
                self.name,
                from.as_deref().unwrap_or(""),
                to.as_deref().unwrap_or("")
            ),
            _ => self.name.clone(),
        }
    }

    /// Info layers in merge order: primary first, then extras.
    pub fn info_layers(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.primary_info_file.as_path())
            .chain(self.extra_info_files.iter().map(PathBuf::as_path))
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.primary_info_file = root.join(&self.primary_info_file);
        for extra in &mut self.extra_info_files {
            *extra = root.join(&*extra);
        }
        if let Some(models) = self.models_file.as_mut() {
            *models = root.join(&*models);
        }
        if let Some(notes) = self.notes_file.as_mut() {
            *notes = root.join(&*notes);
        }
    }
}

/// A configured site and the family it is listed under.
#[derive(Clone, Debug)]
pub struct SiteEntry {
    pub id: SiteId,
    pub family: String,
    pub config: SiteConfig,
}

/// Everything the pipeline needs to know about one archive.
#[derive(Clone, Debug)]
pub struct ArchiveConfig {
    pub root: PathBuf,
    pub model_registry: PathBuf,
    pub relations_dir: PathBuf,
    pub private_models: PathBuf,
    pub output_dir: PathBuf,
    pub family_order: Vec<String>,
    pub sites: BTreeMap<SiteId, SiteEntry>,
}

impl ArchiveConfig {
    /// Load `<root>/canon.json` and every site config it references.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        let document = read_json(&config_path)?;
        load_json_schema(GLOBAL_CONFIG_SCHEMA)?.validate(&document, &config_path)?;
        let raw: RawGlobalConfig = serde_json::from_value(document)
            .with_context(|| format!("decoding {}", config_path.display()))?;

        let site_schema = load_json_schema(SITE_CONFIG_SCHEMA)?;
        let mut sites = BTreeMap::new();
        for (family, members) in raw.families {
            for (site_id, source) in members {
                let (document, origin) = match source {
                    SiteSource::File(path) => {
                        let path = root.join(path);
                        (read_json(&path)?, path)
                    }
                    SiteSource::Inline(value) => (value, config_path.clone()),
                };
                site_schema.validate(&document, &origin)?;
                let mut config: SiteConfig = serde_json::from_value(document)
                    .with_context(|| format!("decoding site config for {site_id}"))?;
                config.resolve_paths(root);

                let id = SiteId(site_id);
                if sites.contains_key(&id) {
                    bail!("site {id} is listed under more than one family");
                }
                debug!(site = %id, family = %family, "registered site");
                sites.insert(
                    id.clone(),
                    SiteEntry {
                        id,
                        family: family.clone(),
                        config,
                    },
                );
            }
        }

        let mut family_order = raw.family_order;
        family_order.retain(|family| family != OTHER_FAMILY);
        family_order.push(OTHER_FAMILY.to_string());

        Ok(Self {
            root: root.to_path_buf(),
            model_registry: root.join(raw.model_registry),
            relations_dir: root.join(raw.relations_dir),
            private_models: root.join(raw.private_models),
            output_dir: root.join(raw.output_dir),
            family_order,
            sites,
        })
    }

    pub fn site(&self, id: &SiteId) -> Option<&SiteEntry> {
        self.sites.get(id)
    }

    /// Position of a family on index pages; unknown families sort with `Other`.
    pub fn family_rank(&self, family: &str) -> usize {
        self.family_order
            .iter()
            .position(|f| f == family)
            .unwrap_or(self.family_order.len() - 1)
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_document(&text).with_context(|| format!("parsing {}", path.display()))
}
