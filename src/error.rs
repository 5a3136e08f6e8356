//! Error taxonomy for archive resolution.
//!
//! Every variant is fatal for the operation that raised it; nothing here is
//! swallowed or guessed around. Plumbing code wraps these in `anyhow` with path
//! context, so callers that need to branch on the kind use
//! `err.downcast_ref::<CatalogError>()`.

use crate::catalog::{ModelId, SiteId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A single JSON document repeats a key inside one object.
    #[error("duplicate key {key:?} in one JSON document")]
    DuplicateKey { key: String },

    /// Two records resolve to the same item id after `item_id` re-keying.
    #[error("multiple records resolve to item id {item_id:?}")]
    DuplicateItem { item_id: String },

    /// A record carries keys outside its schema.
    #[error("{record} {id:?} has unknown fields {fields:?}")]
    UnknownField {
        record: &'static str,
        id: String,
        fields: Vec<String>,
    },

    /// A credit pattern matched nothing in its site.
    #[error("pattern {pattern:?} for model {model} matched no items in {site}")]
    UnresolvedPattern {
        site: SiteId,
        model: ModelId,
        pattern: String,
    },

    /// No model carries the queried name.
    #[error("{}", not_found_message(.query, .suggestion.as_deref()))]
    NotFound {
        query: String,
        suggestion: Option<String>,
    },

    /// More than one model carries the queried name.
    #[error("too many matches for {query:?}: {}", join_ids(.candidates))]
    AmbiguousName {
        query: String,
        candidates: Vec<ModelId>,
    },

    /// A relation file does not have the expected shape.
    #[error("malformed relation file {path}: {reason}")]
    RelationFile { path: String, reason: String },

    /// A structured credit tried to override the model's display name.
    #[error("credit for model {model} in {site} sets display_name; display names belong to the model record")]
    CreditDisplayName { site: SiteId, model: ModelId },

    /// An association references a model id missing from the registry.
    #[error("{site} credits unknown model id {model}")]
    UnknownModel { site: SiteId, model: ModelId },
}

fn not_found_message(query: &str, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(closest) => format!("no matches for {query:?}. Did you mean {closest:?}?"),
        None => format!("no matches for {query:?}"),
    }
}

fn join_ids(ids: &[ModelId]) -> String {
    ids.iter().map(|id| id.0.as_str()).collect::<Vec<_>>().join(", ")
}
