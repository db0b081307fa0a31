//! Card catalog loading and normalization
//!
//! The catalog source nests printings under each card:
//! `{"data": [{name, race, card_images: [{image_url}], card_sets: [{set_name, set_code, set_rarity}]}]}`.
//! Normalization flattens it to one [`CardVariant`] per (card, printing).
//! A printing listed more than once keeps only its first row, so every row
//! has a distinct [`CardKey`].

use crate::error::{CollectionError, Result};
use crate::models::{CardKey, CardVariant, Catalog, UNSPECIFIED_SET};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Full catalog file structure
#[derive(Debug, Deserialize, Default)]
pub struct CatalogDocument {
    #[serde(default)]
    pub data: Option<Vec<CatalogCard>>,
}

/// One card with all of its printings
#[derive(Debug, Deserialize, Default)]
pub struct CatalogCard {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub card_images: Option<Vec<CardImage>>,
    #[serde(default)]
    pub card_sets: Option<Vec<CardSet>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CardImage {
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One printing of a card
#[derive(Debug, Deserialize, Default)]
pub struct CardSet {
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub set_code: Option<String>,
    #[serde(default)]
    pub set_rarity: Option<String>,
}

impl CatalogCard {
    /// URL of the first image, empty if there is none
    pub fn image_url(&self) -> &str {
        self.card_images
            .as_deref()
            .and_then(|images| images.first())
            .and_then(|image| image.image_url.as_deref())
            .unwrap_or_default()
    }
}

/// Flatten a catalog document into rows, all with an owned quantity of 0
pub fn normalize(document: CatalogDocument) -> Catalog {
    let cards = document.data.unwrap_or_default();
    let mut rows = Vec::with_capacity(cards.len());
    let mut seen: HashSet<CardKey> = HashSet::with_capacity(cards.len());
    let mut duplicates = 0usize;
    let mut push = |row: CardVariant| {
        if seen.insert(row.key()) {
            rows.push(row);
        } else {
            duplicates += 1;
        }
    };

    for card in cards {
        let name = card.name.clone().unwrap_or_default();
        let category = card.race.clone().unwrap_or_default();
        let image_url = card.image_url().to_string();

        match card.card_sets.as_deref() {
            Some(sets) if !sets.is_empty() => {
                for set in sets {
                    push(CardVariant {
                        name: name.clone(),
                        set_name: set.set_name.clone().unwrap_or_default(),
                        set_code: set.set_code.clone().unwrap_or_default(),
                        rarity: set.set_rarity.clone().unwrap_or_default(),
                        category: category.clone(),
                        image_url: image_url.clone(),
                        owned_quantity: 0,
                    });
                }
            }
            _ => push(CardVariant {
                name,
                set_name: UNSPECIFIED_SET.to_string(),
                set_code: String::new(),
                rarity: String::new(),
                category,
                image_url,
                owned_quantity: 0,
            }),
        }
    }

    if duplicates > 0 {
        log::debug!("Collapsed {} duplicate printings", duplicates);
    }
    Catalog::new(rows)
}

/// Parse and normalize a catalog from a JSON string
pub fn parse_catalog(json: &str) -> Result<Catalog> {
    let document: CatalogDocument = serde_json::from_str(json)?;
    Ok(normalize(document))
}

/// Load and normalize the catalog file
///
/// A missing, unreadable or malformed file is reported as
/// [`CollectionError::CatalogUnavailable`].
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    let path = path.as_ref();
    log::debug!("Loading catalog from {}", path.display());

    let unavailable = |reason: String| CollectionError::CatalogUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
    let catalog = parse_catalog(&content).map_err(|e| unavailable(e.to_string()))?;

    log::info!(
        "Loaded catalog from {}: {} printings",
        path.display(),
        catalog.len()
    );
    Ok(catalog)
}

/// Load the catalog, treating an unavailable catalog as empty
pub fn load_catalog_or_empty<P: AsRef<Path>>(path: P) -> Catalog {
    match load_catalog(path) {
        Ok(catalog) => catalog,
        Err(e) => {
            log::warn!("{}; continuing with an empty catalog", e);
            Catalog::default()
        }
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
