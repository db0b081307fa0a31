//! YGO Collection - Yu-Gi-Oh! card collection manager
//!
//! Flattens the card catalog into one row per printing, merges the user's
//! saved owned quantities into it, and persists edits back to a CSV file.

pub mod catalog;
pub mod collection;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod session;
pub mod view;
pub mod web;

pub use catalog::{load_catalog, load_catalog_or_empty, normalize, parse_catalog};
pub use collection::{load_and_merge, merge, read_collection, write_collection, MergeReport, SavedCollection};
pub use config::{SavePolicy, Settings};
pub use error::{CollectionError, Result};
pub use export::{export_owned, export_owned_to_bytes};
pub use models::{CardKey, CardVariant, Catalog, UNSPECIFIED_SET};
pub use session::{EditEvent, EditOutcome, Session, UserId};
pub use view::{PageView, SortKey, ViewFilter};
