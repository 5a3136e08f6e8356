//! Item catalog wiring.
//!
//! Identity newtypes, the validated item/model records, a per-site catalog
//! built from layered info files, and the repository that holds every site.

pub mod identity;
pub mod index;
pub mod model;
pub mod repository;

pub use identity::{ItemId, ModelId, QualifiedItem, SiteId};
pub use index::{ReleaseCadence, SiteCatalog};
pub use model::{Item, ItemRecord, Magnitude, Model, Size};
pub use repository::CatalogRepository;
