//! Private-model handling.
//!
//! The marker file lists one private model id per line. Pages for every other
//! model are public: they drop links to personal social profiles and carry no
//! biography.

use crate::catalog::ModelId;
use crate::persist::write_atomic;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use url::Url;

/// Hosts whose profile links never appear on public pages.
pub const PRIVATE_HOSTS: &[&str] = &["facebook.com", "www.facebook.com", "vk.com", "www.vk.com"];

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("href regex must compile")
});

#[derive(Debug, Clone, Default)]
pub struct PrivateModels {
    path: PathBuf,
    ids: BTreeSet<ModelId>,
}

impl PrivateModels {
    /// Read the marker file; a missing file means nobody is private.
    pub fn load(path: &Path) -> Result<Self> {
        let ids = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ModelId::from)
                .collect()
        } else {
            BTreeSet::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            ids,
        })
    }

    pub fn is_private(&self, id: &ModelId) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ModelId> {
        self.ids.iter()
    }

    /// Add or remove `ids` from the private set.
    pub fn mark<'a, I>(&mut self, ids: I, private: bool)
    where
        I: IntoIterator<Item = &'a ModelId>,
    {
        for id in ids {
            if private {
                self.ids.insert(id.clone());
            } else {
                self.ids.remove(id);
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let body = self
            .ids
            .iter()
            .map(ModelId::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        write_atomic(&self.path, body.as_bytes())
    }
}

/// Links without an anchor pointing at a private host.
pub fn public_links(links: &[String]) -> Vec<String> {
    links
        .iter()
        .filter(|link| !links_to_private_host(link))
        .cloned()
        .collect()
}

fn links_to_private_host(html: &str) -> bool {
    HREF.captures_iter(html).any(|caps| {
        let href = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        Url::parse(href)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|host| PRIVATE_HOSTS.contains(&host.as_str()))
    })
}
