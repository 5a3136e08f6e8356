use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::sorting::natural_cmp;

/// Site identifier, `<family dir>/<site>` (e.g. `zlata.de/iamflexigirl.com`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub String);

/// Item identifier, unique within one site.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

/// Opaque model identifier; freshly minted ids are 8 alphanumerics.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub String);

/// An item addressed across the whole archive.
///
/// Ordering is natural on the site then the item so relation lists read the
/// way a person would number them.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct QualifiedItem {
    pub site: SiteId,
    pub item: ItemId,
}

impl QualifiedItem {
    pub fn new(site: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            site: SiteId(site.into()),
            item: ItemId(item.into()),
        }
    }
}

impl Ord for QualifiedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.site.0, &other.site.0).then_with(|| natural_cmp(&self.item.0, &other.item.0))
    }
}

impl PartialOrd for QualifiedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

macro_rules! display_inner {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl $ty {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        })*
    };
}

display_inner!(SiteId, ItemId, ModelId);

impl fmt::Display for QualifiedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.site, self.item)
    }
}
