//! Read-only page views and the publisher that renders them.
//!
//! Views are plain `Serialize` structs built from a loaded `Archive`. Turning
//! them into HTML is the job of a `Renderer`, which receives the template name
//! and the view as JSON. `JsonRenderer` is the built-in one: it writes the
//! context itself, which is what the CLI uses when no templating engine is
//! wired in.

use crate::archive::Archive;
use crate::association::ItemCredit;
use crate::catalog::{Item, ModelId, QualifiedItem, SiteId};
use crate::config::ArchiveConfig;
use crate::persist::write_atomic;
use crate::privacy::public_links;
use crate::registry::ModelRegistry;
use crate::sorting::natural_cmp;
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SITE_TEMPLATE: &str = "site.html";
pub const MODEL_TEMPLATE: &str = "model.html";
pub const MODEL_INDEX_TEMPLATE: &str = "models.html";
pub const GLOBAL_INDEX_TEMPLATE: &str = "index.html";

/// Cards per row on the model index.
pub const MODEL_INDEX_ROW: usize = 4;
pub const DEFAULT_MODEL_IMAGE: &str = "static/default-model-img.jpg";
const IMAGE_EXTENSIONS: &[&str] = &[".gif", ".jpg", ".jpeg", ".JPG"];

/// Turns a template name plus a JSON context into page text.
pub trait Renderer {
    fn render(&self, template: &str, context: &Value) -> Result<String>;
}

/// Renders the context itself as pretty JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<String> {
        serde_json::to_string_pretty(context)
            .with_context(|| format!("rendering {template} context"))
    }
}

/// Primary and alternate portrait paths, relative to the archive root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelImages {
    pub image: String,
    pub alt_image: String,
}

impl ModelImages {
    pub fn locate(root: &Path, id: &ModelId) -> Self {
        let pick = |dir: &str| {
            let relative = format!("static/{dir}/{id}.jpg");
            if root.join(&relative).is_file() {
                relative
            } else {
                DEFAULT_MODEL_IMAGE.to_string()
            }
        };
        Self {
            image: pick("model-images"),
            alt_image: pick("alt-model-images"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreviewView<'a> {
    pub url: &'a str,
    pub is_image: bool,
}

#[derive(Debug, Serialize)]
pub struct RelatedView {
    pub site_id: SiteId,
    pub item_id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct SiteItemView<'a> {
    #[serde(flatten)]
    pub item: &'a Item,
    pub preview_links: Vec<PreviewView<'a>>,
    pub credits: &'a [ItemCredit],
    pub related_items: Vec<RelatedView>,
}

#[derive(Debug, Serialize)]
pub struct SiteView<'a> {
    pub site_id: &'a SiteId,
    pub name: &'a str,
    pub family: &'a str,
    pub generated: String,
    pub notes: Vec<Value>,
    pub items: Vec<SiteItemView<'a>>,
}

impl<'a> SiteView<'a> {
    pub fn build(archive: &'a Archive, site: &SiteId) -> Result<Self> {
        let catalog = archive
            .catalog(site)
            .ok_or_else(|| anyhow!("site {site} is not loaded"))?;
        let associations = archive.associations(site);
        let notes = match archive
            .config
            .site(site)
            .and_then(|entry| entry.config.notes_file.as_deref())
        {
            Some(path) if path.exists() => read_notes(path)?,
            _ => Vec::new(),
        };

        let items = catalog
            .items()
            .map(|item| SiteItemView {
                item,
                preview_links: item
                    .record
                    .previews
                    .iter()
                    .map(|url| PreviewView {
                        url,
                        is_image: is_image(url),
                    })
                    .collect(),
                credits: associations
                    .map_or(&[][..], |index| index.credits_for_item(&item.id)),
                related_items: item
                    .related
                    .iter()
                    .map(|related| related_view(archive, related))
                    .collect(),
            })
            .collect();

        Ok(Self {
            site_id: catalog.site_id(),
            name: catalog.display_name(),
            family: catalog.family(),
            generated: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            notes,
            items,
        })
    }
}

fn read_notes(path: &Path) -> Result<Vec<Value>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing notes {}", path.display()))
}

fn is_image(url: &str) -> bool {
    let path = url::Url::parse(url)
        .map(|parsed| parsed.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

// Related items may live in sites that failed to load or were never
// configured; fall back to the raw id for the label.
fn related_view(archive: &Archive, related: &QualifiedItem) -> RelatedView {
    let site_name = archive
        .catalog(&related.site)
        .map(|catalog| catalog.display_name().to_string())
        .or_else(|| {
            archive
                .config
                .site(&related.site)
                .map(|entry| entry.config.display_name())
        })
        .unwrap_or_else(|| related.site.to_string());
    RelatedView {
        site_id: related.site.clone(),
        item_id: related.item.to_string(),
        name: format!("{site_name} {}", related.item),
        url: format!("{}/index.html#{}", related.site, related.item),
    }
}

#[derive(Debug, Serialize)]
pub struct AppearanceItem<'a> {
    pub item_id: &'a str,
    pub name: &'a str,
    pub internal_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Appearance<'a> {
    pub site_id: &'a SiteId,
    pub site_name: &'a str,
    pub items: Vec<AppearanceItem<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ModelPageView<'a> {
    pub model_id: &'a ModelId,
    pub name: &'a str,
    pub display_name: &'a str,
    pub alt_spelling: Option<&'a str>,
    pub aliases: &'a [String],
    pub biography: &'a str,
    pub links: Vec<String>,
    pub private: bool,
    #[serde(flatten)]
    pub images: ModelImages,
    pub appearances: Vec<Appearance<'a>>,
}

impl<'a> ModelPageView<'a> {
    /// Public pages drop private-host links and the biography.
    pub fn build(archive: &'a Archive, id: &'a ModelId) -> Result<Self> {
        let model = archive
            .registry
            .get(id)
            .ok_or_else(|| anyhow!("model {id} is not in the registry"))?;
        let private = archive.private.is_private(id);

        let mut appearances = Vec::new();
        for index in archive.sites_crediting(id) {
            let Some(catalog) = archive.catalog(index.site()) else {
                continue;
            };
            let mut ids = index.items_for_model(id).to_vec();
            catalog.sort_item_ids(&mut ids);
            let items = ids
                .iter()
                .filter_map(|item_id| catalog.get(item_id))
                .map(|item| AppearanceItem {
                    item_id: item.id.as_str(),
                    name: &item.record.name,
                    internal_url: &item.internal_url,
                })
                .collect();
            appearances.push(Appearance {
                site_id: catalog.site_id(),
                site_name: catalog.display_name(),
                items,
            });
        }
        appearances.sort_by(|a, b| natural_cmp(a.site_id.as_str(), b.site_id.as_str()));

        let (biography, links) = if private {
            (model.biography.as_str(), model.links.clone())
        } else {
            ("", public_links(&model.links))
        };
        Ok(Self {
            model_id: id,
            name: &model.name,
            display_name: model.display_name(),
            alt_spelling: model.alt_spelling.as_deref(),
            aliases: model.aliases(),
            biography,
            links,
            private,
            images: ModelImages::locate(&archive.config.root, id),
            appearances,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelCard<'a> {
    pub model_id: &'a ModelId,
    pub name: &'a str,
    #[serde(flatten)]
    pub images: ModelImages,
    pub is_private: bool,
}

#[derive(Debug, Serialize)]
pub struct FamilyModels<'a> {
    pub family: &'a str,
    pub rows: Vec<Vec<ModelCard<'a>>>,
}

#[derive(Debug, Serialize)]
pub struct ModelIndexView<'a> {
    pub families: Vec<FamilyModels<'a>>,
}

impl<'a> ModelIndexView<'a> {
    /// Models grouped by the families of the sites crediting them; models no
    /// site credits land in `Other`.
    pub fn build(archive: &'a Archive) -> Self {
        let order = &archive.config.family_order;
        let mut groups: Vec<Vec<ModelCard<'a>>> = vec![Vec::new(); order.len()];

        for (id, model) in archive.registry.iter() {
            let card = ModelCard {
                model_id: id,
                name: model.display_name(),
                images: ModelImages::locate(&archive.config.root, id),
                is_private: archive.private.is_private(id),
            };
            let mut ranks: Vec<usize> = archive
                .sites_crediting(id)
                .filter_map(|index| archive.catalog(index.site()))
                .map(|catalog| archive.config.family_rank(catalog.family()))
                .collect();
            ranks.sort_unstable();
            ranks.dedup();
            if ranks.is_empty() {
                ranks.push(order.len() - 1);
            }
            for rank in ranks {
                groups[rank].push(card.clone());
            }
        }

        let families = order
            .iter()
            .zip(groups)
            .map(|(family, mut cards)| {
                cards.sort_by(|a, b| {
                    natural_cmp(a.name, b.name).then_with(|| a.model_id.cmp(b.model_id))
                });
                FamilyModels {
                    family,
                    rows: cards
                        .chunks(MODEL_INDEX_ROW)
                        .map(<[ModelCard<'a>]>::to_vec)
                        .collect(),
                }
            })
            .collect();
        Self { families }
    }
}

#[derive(Debug, Serialize)]
pub struct SiteLink<'a> {
    pub site_id: &'a SiteId,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct FamilySites<'a> {
    pub family: &'a str,
    pub sites: Vec<SiteLink<'a>>,
}

#[derive(Debug, Serialize)]
pub struct GlobalIndexView<'a> {
    pub families: Vec<FamilySites<'a>>,
}

impl<'a> GlobalIndexView<'a> {
    /// Published (non-`wip`) sites grouped in family order.
    pub fn build(config: &'a ArchiveConfig) -> Self {
        let mut families: Vec<FamilySites<'a>> = config
            .family_order
            .iter()
            .map(|family| FamilySites {
                family,
                sites: Vec::new(),
            })
            .collect();

        let mut entries: Vec<_> = config
            .sites
            .values()
            .filter(|entry| !entry.config.is_wip())
            .collect();
        entries.sort_by(|a, b| natural_cmp(a.id.as_str(), b.id.as_str()));
        for entry in entries {
            families[config.family_rank(&entry.family)]
                .sites
                .push(SiteLink {
                    site_id: &entry.id,
                    name: entry.config.display_name(),
                    url: site_page(&entry.id),
                });
        }
        families.retain(|family| !family.sites.is_empty());
        Self { families }
    }
}

/// One autocomplete result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub name: String,
    pub model_id: ModelId,
    pub image: String,
}

/// Ranked hits for the search endpoint; an empty query yields nothing.
pub fn search(registry: &ModelRegistry, root: &Path, query: &str) -> Vec<SearchHit> {
    if query.is_empty() {
        return Vec::new();
    }
    registry
        .extensive_search(query)
        .into_iter()
        .map(|hit| SearchHit {
            name: hit.model.display_name().to_string(),
            model_id: hit.id.clone(),
            image: ModelImages::locate(root, hit.id).image,
        })
        .collect()
}

fn site_page(site: &SiteId) -> String {
    format!("sites/{site}/index.html")
}

/// Renders views and writes them under the configured output directory.
pub struct Publisher<'a> {
    archive: &'a Archive,
    renderer: &'a dyn Renderer,
}

impl<'a> Publisher<'a> {
    pub fn new(archive: &'a Archive, renderer: &'a dyn Renderer) -> Self {
        Self { archive, renderer }
    }

    fn output_dir(&self) -> &Path {
        &self.archive.config.output_dir
    }

    fn write<V: Serialize>(&self, template: &str, view: &V, relative: &str) -> Result<PathBuf> {
        let context = serde_json::to_value(view).context("serializing page view")?;
        let page = self.renderer.render(template, &context)?;
        let path = self.output_dir().join(relative);
        write_atomic(&path, page.as_bytes())?;
        info!(page = %path.display(), "wrote page");
        Ok(path)
    }

    pub fn publish_site(&self, site: &SiteId) -> Result<PathBuf> {
        let view = SiteView::build(self.archive, site)?;
        self.write(SITE_TEMPLATE, &view, &site_page(site))
    }

    pub fn publish_model(&self, id: &ModelId) -> Result<PathBuf> {
        let view = ModelPageView::build(self.archive, id)?;
        self.write(MODEL_TEMPLATE, &view, &format!("models/{id}.html"))
    }

    pub fn publish_model_index(&self) -> Result<PathBuf> {
        let view = ModelIndexView::build(self.archive);
        self.write(MODEL_INDEX_TEMPLATE, &view, "models/index.html")
    }

    /// Write the global index, warning about published sites whose own
    /// index page is missing.
    pub fn publish_index(&self) -> Result<PathBuf> {
        for missing in self.missing_site_pages() {
            warn!(site = %missing, "index for site seems to have moved; its page does not exist");
        }
        let view = GlobalIndexView::build(&self.archive.config);
        self.write(GLOBAL_INDEX_TEMPLATE, &view, "index.html")
    }

    /// Non-`wip` sites without a rendered index page.
    pub fn missing_site_pages(&self) -> Vec<&'a SiteId> {
        let config = &self.archive.config;
        config
            .sites
            .values()
            .filter(|entry| !entry.config.is_wip())
            .filter(|entry| !config.output_dir.join(site_page(&entry.id)).is_file())
            .map(|entry| &entry.id)
            .collect()
    }
}
