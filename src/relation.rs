//! Symmetric "related items" index.
//!
//! Relation files live anywhere under the relations directory. Each maps a
//! prefix (a family dir, or a full `family/site`) to a list of groups; each
//! group lists paths relative to that prefix. Prefix and path are joined and
//! split so the first two components name the site and the rest the item.
//! Groups are sets: every member relates to every other member of every group
//! it appears in.

use crate::catalog::QualifiedItem;
use crate::error::CatalogError;
use crate::merge::parse_document;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct RelationIndex {
    related: BTreeMap<QualifiedItem, Vec<QualifiedItem>>,
}

impl RelationIndex {
    /// Load every `.json` file below `root`. A missing root is an empty index.
    pub fn load(root: &Path) -> Result<Self> {
        let mut groups = Vec::new();
        for path in collect_relation_files(root)? {
            let text =
                fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
            let file_groups = parse_relation_file(&text).map_err(|reason| CatalogError::RelationFile {
                path: path.display().to_string(),
                reason,
            })?;
            debug!(file = %path.display(), groups = file_groups.len(), "loaded relation file");
            groups.extend(file_groups);
        }
        Ok(Self::from_groups(groups))
    }

    /// Build the index from already-expanded groups.
    pub fn from_groups<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = BTreeSet<QualifiedItem>>,
    {
        let mut siblings: BTreeMap<QualifiedItem, BTreeSet<QualifiedItem>> = BTreeMap::new();
        for group in groups {
            for member in &group {
                let entry = siblings.entry(member.clone()).or_default();
                entry.extend(group.iter().filter(|other| *other != member).cloned());
            }
        }
        // BTreeSet<QualifiedItem> already iterates in natural order.
        let related = siblings
            .into_iter()
            .map(|(item, others)| (item, others.into_iter().collect()))
            .collect();
        Self { related }
    }

    /// Other members of every group containing `item`; empty when unrelated.
    pub fn related(&self, item: &QualifiedItem) -> &[QualifiedItem] {
        self.related.get(item).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, item: &QualifiedItem) -> bool {
        self.related.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.related.len()
    }

    pub fn is_empty(&self) -> bool {
        self.related.is_empty()
    }
}

fn parse_relation_file(text: &str) -> std::result::Result<Vec<BTreeSet<QualifiedItem>>, String> {
    let value = parse_document(text).map_err(|err| format!("{err:#}"))?;
    let Value::Object(prefixes) = value else {
        return Err("top level must be an object of prefix -> groups".to_string());
    };

    let mut groups = Vec::new();
    for (prefix, lists) in prefixes {
        let Value::Array(lists) = lists else {
            return Err(format!("prefix {prefix:?} must map to a list of groups"));
        };
        for group in lists {
            let Value::Array(members) = group else {
                return Err(format!("groups under {prefix:?} must be lists"));
            };
            let mut expanded = BTreeSet::new();
            for member in members {
                let Value::String(path) = member else {
                    return Err(format!("group members under {prefix:?} must be strings"));
                };
                expanded.insert(qualify(&prefix, &path)?);
            }
            groups.push(expanded);
        }
    }
    Ok(groups)
}

fn qualify(prefix: &str, path: &str) -> std::result::Result<QualifiedItem, String> {
    let parts: Vec<&str> = prefix
        .split('/')
        .chain(path.split('/'))
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() < 3 {
        return Err(format!(
            "{prefix}/{path} does not name a family, site and item"
        ));
    }
    Ok(QualifiedItem::new(parts[..2].join("/"), parts[2..].join("/")))
}

fn collect_relation_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if root.is_dir() {
        collect_json(root, &mut files)?;
    } else if root.exists() {
        bail!("relations path {} is not a directory", root.display());
    }
    files.sort();
    Ok(files)
}

fn collect_json(dir: &Path, acc: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json(&path, acc)?;
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            acc.push(path);
        }
    }
    Ok(())
}
