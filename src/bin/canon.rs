//! Operator CLI for the archive.
//!
//! Inspects and edits the model registry, registers model credits for site
//! items, and renders pages through the built-in JSON renderer. Every model
//! argument is resolved by id or exact name; ambiguous or unknown names are
//! reported with candidates or the closest match.
//!
//! Logs go to stderr (`CANON_LOG`, default `info`); command output goes to
//! stdout.

use anyhow::{Context, Result, anyhow, bail};
use canon_index::association::resolve_pattern;
use canon_index::{
    Archive, ArchiveConfig, ItemId, JsonRenderer, ModelId, ModelRegistry, PrivateModels,
    Publisher, SiteCatalog, SiteId, SiteModels, find_archive_root, views,
};
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CANON_LOG";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse()?;
    init_logging(cli.verbose);
    let root = match cli.root {
        Some(root) => root,
        None => find_archive_root()?,
    };

    match cli.command {
        Command::ModelsList => models_list(&root),
        Command::ModelsSearch { query } => models_search(&root, &query),
        Command::ModelsNew { name } => models_new(&root, name.as_deref()),
        Command::ModelsPrivate { models, public } => models_private(&root, &models, !public),
        Command::Credit { site, items, model } => credit(&root, &site, &items, &model),
        Command::RenderSites { sites } => render_sites(&root, &sites),
        Command::RenderModels { models } => render_models(&root, &models),
        Command::RenderIndex => render_index(&root),
        Command::Search { query } => search(&root, &query),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_registry(root: &Path) -> Result<(ArchiveConfig, ModelRegistry)> {
    let config = ArchiveConfig::load(root)?;
    let registry = ModelRegistry::load(&config.model_registry)?;
    Ok((config, registry))
}

fn models_list(root: &Path) -> Result<()> {
    let (config, registry) = load_registry(root)?;
    let private = PrivateModels::load(&config.private_models)?;
    for (id, model) in registry.iter() {
        let marker = if private.is_private(id) { " (private)" } else { "" };
        println!("{id}\t{}{marker}", model.display_name());
    }
    Ok(())
}

fn models_search(root: &Path, query: &str) -> Result<()> {
    let (_, registry) = load_registry(root)?;
    for hit in registry.extensive_search(query) {
        println!("{}\t{}\t{}", hit.score, hit.id, hit.model.display_name());
    }
    Ok(())
}

fn models_new(root: &Path, name: Option<&str>) -> Result<()> {
    let config = ArchiveConfig::load(root)?;
    let id = ModelRegistry::edit(&config.model_registry, |registry| {
        Ok(registry.create_model(name))
    })?;
    info!(model = %id, "created model");
    println!("{id}");
    Ok(())
}

fn models_private(root: &Path, queries: &[String], private: bool) -> Result<()> {
    let (config, registry) = load_registry(root)?;
    let ids = resolve_models(&registry, queries)?;

    let mut markers = PrivateModels::load(&config.private_models)?;
    markers.mark(&ids, private);
    markers.save()?;

    let archive = Archive::load(config)?;
    let publisher = Publisher::new(&archive, &JsonRenderer);
    publisher.publish_model_index()?;
    for id in &ids {
        publisher.publish_model(id)?;
        println!("{id}\t{}", if private { "private" } else { "public" });
    }
    Ok(())
}

fn credit(root: &Path, site: &str, items: &str, query: &str) -> Result<()> {
    let (config, registry) = load_registry(root)?;
    let site_id = SiteId::from(site);
    let entry = config
        .site(&site_id)
        .ok_or_else(|| anyhow!("site {site_id} is not registered in the archive config"))?;
    let models_file = entry
        .config
        .models_file
        .as_deref()
        .ok_or_else(|| anyhow!("site {site_id} has no models_file configured"))?;

    let model = registry.resolve_id(query)?;
    let catalog = SiteCatalog::load(entry)?;
    let item_ids: Vec<ItemId> = items
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ItemId::from)
        .collect();
    if item_ids.is_empty() {
        bail!("no item ids given");
    }
    for item in &item_ids {
        let matched = resolve_pattern(&catalog, &model, item.as_str())?;
        debug!(site = %site_id, pattern = %item, matched = matched.len(), "resolved credit");
    }

    let mut credits = if models_file.exists() {
        SiteModels::load(models_file)?
    } else {
        SiteModels::default()
    };
    let added = credits.add_credit(&model, &item_ids);
    credits.save(models_file)?;
    info!(site = %site_id, model = %model, added, "registered credits");
    Ok(())
}

fn render_sites(root: &Path, sites: &[String]) -> Result<()> {
    let archive = Archive::load(ArchiveConfig::load(root)?)?;
    let publisher = Publisher::new(&archive, &JsonRenderer);
    for site in sites {
        let path = publisher.publish_site(&SiteId::from(site.as_str()))?;
        println!("{}", path.display());
    }
    Ok(())
}

fn render_models(root: &Path, queries: &[String]) -> Result<()> {
    let archive = Archive::load(ArchiveConfig::load(root)?)?;
    let publisher = Publisher::new(&archive, &JsonRenderer);
    let ids: Vec<ModelId> = if queries.is_empty() {
        println!("{}", publisher.publish_model_index()?.display());
        archive.registry.iter().map(|(id, _)| id.clone()).collect()
    } else {
        resolve_models(&archive.registry, queries)?
    };
    for id in &ids {
        println!("{}", publisher.publish_model(id)?.display());
    }
    Ok(())
}

fn render_index(root: &Path) -> Result<()> {
    let archive = Archive::load(ArchiveConfig::load(root)?)?;
    let path = Publisher::new(&archive, &JsonRenderer).publish_index()?;
    println!("{}", path.display());
    Ok(())
}

fn search(root: &Path, query: &str) -> Result<()> {
    let (config, registry) = load_registry(root)?;
    let hits = views::search(&registry, &config.root, query);
    println!("{}", serde_json::to_string(&hits)?);
    Ok(())
}

fn resolve_models(registry: &ModelRegistry, queries: &[String]) -> Result<Vec<ModelId>> {
    queries
        .iter()
        .map(|query| {
            registry
                .resolve_id(query)
                .with_context(|| format!("resolving model {query:?}"))
        })
        .collect()
}

enum Command {
    ModelsList,
    ModelsSearch { query: String },
    ModelsNew { name: Option<String> },
    ModelsPrivate { models: Vec<String>, public: bool },
    Credit { site: String, items: String, model: String },
    RenderSites { sites: Vec<String> },
    RenderModels { models: Vec<String> },
    RenderIndex,
    Search { query: String },
}

struct Cli {
    root: Option<PathBuf>,
    verbose: bool,
    command: Command,
}

impl Cli {
    fn parse() -> Result<Self> {
        let mut args = env::args_os();
        let _program = args.next();

        let mut root = None;
        let mut verbose = false;
        let mut public = false;
        let mut positional: Vec<String> = Vec::new();
        while let Some(arg) = args.next() {
            let arg = arg
                .into_string()
                .map_err(|_| anyhow!("invalid UTF-8 in argument"))?;
            match arg.as_str() {
                "--root" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--root requires a value"))?;
                    let value = value
                        .into_string()
                        .map_err(|_| anyhow!("--root must be valid UTF-8"))?;
                    if value.is_empty() {
                        bail!("--root must not be empty");
                    }
                    root = Some(PathBuf::from(value));
                }
                "--verbose" | "-v" => verbose = true,
                "--public" => public = true,
                "--help" | "-h" => usage(0),
                other if other.starts_with('-') => bail!("unknown argument: {other}"),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let group = positional.next().unwrap_or_else(|| usage(1));
        let rest: Vec<String> = positional.collect();
        let command = match (group.as_str(), rest.as_slice()) {
            ("models", [sub, tail @ ..]) => match (sub.as_str(), tail) {
                ("list", []) => Command::ModelsList,
                ("search", [query]) => Command::ModelsSearch {
                    query: query.clone(),
                },
                ("new", []) => Command::ModelsNew { name: None },
                ("new", [name]) => Command::ModelsNew {
                    name: Some(name.clone()),
                },
                ("private", models) if !models.is_empty() => Command::ModelsPrivate {
                    models: models.to_vec(),
                    public,
                },
                _ => usage(1),
            },
            ("credit", [site, items, model]) => Command::Credit {
                site: site.clone(),
                items: items.clone(),
                model: model.clone(),
            },
            ("render", [sub, tail @ ..]) => match (sub.as_str(), tail) {
                ("site", sites) if !sites.is_empty() => Command::RenderSites {
                    sites: sites.to_vec(),
                },
                ("models", models) => Command::RenderModels {
                    models: models.to_vec(),
                },
                ("index", []) => Command::RenderIndex,
                _ => usage(1),
            },
            ("search", [query]) => Command::Search {
                query: query.clone(),
            },
            _ => usage(1),
        };

        Ok(Self {
            root,
            verbose,
            command,
        })
    }
}

fn usage(code: i32) -> ! {
    eprintln!(
        "Usage: canon [--root PATH] [--verbose] <command>\n\nCommands:\n  models list                         List every model id and name.\n  models search QUERY                 Rank models by closest name, alias or spelling.\n  models new [NAME]                   Mint a model; prints its id.\n  models private MODEL... [--public]  Mark models private (or public) and re-render them.\n  credit SITE ITEM[,ITEM...] MODEL    Credit items of a site to a model.\n  render site SITE...                 Render site pages.\n  render models [MODEL...]            Render model pages (all plus the index when none given).\n  render index                        Render the global index.\n  search QUERY                        Print autocomplete hits as JSON.\n\nOptions:\n  --root PATH     Archive root (or set CANON_ROOT).\n  --verbose       Debug logging (otherwise CANON_LOG, default info).\n  --help          Show this help text."
    );
    std::process::exit(code);
}
