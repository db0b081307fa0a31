//! Saved collection persistence and merging
//!
//! The collection file is a CSV with one row per printing:
//! `Name,Set,Rarity,Code,OwnedQuantity`. Two-column files carrying only name
//! and set are also read, including workbooks saved as CSV with the French
//! headers `Nom,Extension,Quantité possédée`. Their rows become legacy keys
//! matched on name and set alone.

use crate::error::{CollectionError, Result};
use crate::models::{CardKey, Catalog};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tempfile::NamedTempFile;

/// Row of the collection file as read from disk
#[derive(Debug, Deserialize)]
struct SavedRecord {
    #[serde(rename = "Name", alias = "Nom")]
    name: String,
    #[serde(rename = "Set", alias = "Extension")]
    set_name: String,
    #[serde(rename = "Rarity", default)]
    rarity: String,
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "OwnedQuantity", alias = "Quantité possédée")]
    owned_quantity: String,
}

/// Row of the collection file as written
#[derive(Debug, Serialize)]
struct CollectionRecord<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Set")]
    set_name: &'a str,
    #[serde(rename = "Rarity")]
    rarity: &'a str,
    #[serde(rename = "Code")]
    code: &'a str,
    #[serde(rename = "OwnedQuantity")]
    owned_quantity: u32,
}

/// Owned quantities keyed by printing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedCollection {
    entries: HashMap<CardKey, u32>,
}

impl SavedCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row of a catalog
    pub fn from_catalog(catalog: &Catalog) -> Self {
        catalog
            .iter()
            .map(|row| (row.key(), row.owned_quantity))
            .collect()
    }

    pub fn get(&self, key: &CardKey) -> Option<u32> {
        self.entries.get(key).copied()
    }

    /// Insert a quantity, returning the previous one for this key
    pub fn insert(&mut self, key: CardKey, quantity: u32) -> Option<u32> {
        self.entries.insert(key, quantity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CardKey, u32)> {
        self.entries.iter().map(|(key, quantity)| (key, *quantity))
    }
}

impl FromIterator<(CardKey, u32)> for SavedCollection {
    fn from_iter<I: IntoIterator<Item = (CardKey, u32)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Result of merging saved quantities into a fresh catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Catalog rows that took their quantity from the saved collection
    pub matched: usize,
    /// Catalog rows with no saved entry, set to 0
    pub defaulted: usize,
    /// Saved entries with no catalog row, sorted
    pub dropped: Vec<CardKey>,
}

/// Parse an owned quantity cell
///
/// Empty cells count as 0. Integral floats (`3.0`) are accepted since
/// spreadsheet tools tend to write them; negative, fractional and
/// non-numeric values are rejected.
pub fn parse_quantity(raw: &str) -> std::result::Result<u32, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    if let Ok(quantity) = raw.parse::<u32>() {
        return Ok(quantity);
    }
    match raw.parse::<f64>() {
        Ok(value)
            if value.is_finite()
                && value >= 0.0
                && value.fract() == 0.0
                && value <= f64::from(u32::MAX) =>
        {
            Ok(value as u32)
        }
        _ => Err(format!("invalid owned quantity {:?}", raw)),
    }
}

/// Read a saved collection
///
/// Returns `Ok(None)` if the file does not exist. Any read or schema problem
/// is reported as [`CollectionError::SavedCollectionCorrupt`].
pub fn read_collection<P: AsRef<Path>>(path: P) -> Result<Option<SavedCollection>> {
    let path = path.as_ref();
    if !path.exists() {
        log::info!("No saved collection at {}", path.display());
        return Ok(None);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| CollectionError::corrupt(path, e.to_string()))?;

    let mut saved = SavedCollection::new();
    for (index, result) in rdr.deserialize::<SavedRecord>().enumerate() {
        // Line 1 is the header
        let line = index + 2;
        let record =
            result.map_err(|e| CollectionError::corrupt(path, format!("line {}: {}", line, e)))?;
        let quantity = parse_quantity(&record.owned_quantity)
            .map_err(|e| CollectionError::corrupt(path, format!("line {}: {}", line, e)))?;

        let key = CardKey::new(record.name, record.set_name, record.code, record.rarity);
        if let Some(previous) = saved.insert(key.clone(), quantity) {
            log::debug!(
                "Duplicate saved entry for {} ({} replaced by {})",
                key,
                previous,
                quantity
            );
        }
    }

    log::info!(
        "Read saved collection from {}: {} entries",
        path.display(),
        saved.len()
    );
    Ok(Some(saved))
}

/// Overwrite the collection file with every row of the catalog
///
/// Rows go to a temporary file next to `path` that then replaces it, so a
/// failed write leaves the previous file as it was.
pub fn write_collection<P: AsRef<Path>>(path: P, catalog: &Catalog) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(dir).map_err(|e| CollectionError::write_failure(path, e))?;
    let staging = NamedTempFile::new_in(dir).map_err(|e| CollectionError::write_failure(path, e))?;

    let mut wtr = csv::Writer::from_writer(staging);
    for row in catalog.iter() {
        wtr.serialize(CollectionRecord {
            name: &row.name,
            set_name: &row.set_name,
            rarity: &row.rarity,
            code: &row.set_code,
            owned_quantity: row.owned_quantity,
        })
        .map_err(|e| CollectionError::write_failure(path, e))?;
    }
    let staging = wtr
        .into_inner()
        .map_err(|e| CollectionError::write_failure(path, e.into_error()))?;
    staging
        .persist(path)
        .map_err(|e| CollectionError::write_failure(path, e.error))?;

    log::debug!(
        "Saved collection to {} ({} rows, {} owned)",
        path.display(),
        catalog.len(),
        catalog.owned_count()
    );
    Ok(())
}

/// Apply saved quantities to a freshly normalized catalog
///
/// Every catalog row is kept. Rows are matched on the full key first; legacy
/// entries (no code, no rarity) then go to the first row with the same name
/// and set that no exact entry claimed. Rows without a saved entry are set
/// to 0, saved entries without a row are dropped and listed in the report.
pub fn merge(mut catalog: Catalog, saved: Option<&SavedCollection>) -> (Catalog, MergeReport) {
    let Some(saved) = saved else {
        for row in catalog.rows_mut() {
            row.owned_quantity = 0;
        }
        let report = MergeReport {
            matched: 0,
            defaulted: catalog.len(),
            dropped: Vec::new(),
        };
        return (catalog, report);
    };

    let mut assigned = vec![false; catalog.len()];
    let mut claimed: HashSet<&CardKey> = HashSet::new();

    for (index, row) in catalog.rows_mut().iter_mut().enumerate() {
        match saved.entries.get_key_value(&row.key()) {
            Some((key, quantity)) => {
                row.owned_quantity = *quantity;
                assigned[index] = true;
                claimed.insert(key);
            }
            None => row.owned_quantity = 0,
        }
    }

    let mut legacy: Vec<(&CardKey, u32)> = saved
        .iter()
        .filter(|(key, _)| key.is_legacy() && !claimed.contains(key))
        .collect();
    legacy.sort();

    for (key, quantity) in legacy {
        let target = catalog
            .rows()
            .iter()
            .enumerate()
            .position(|(index, row)| !assigned[index] && row.matches_name_and_set(key));
        if let Some(index) = target {
            catalog.rows_mut()[index].owned_quantity = quantity;
            assigned[index] = true;
            claimed.insert(key);
        }
    }

    let mut dropped: Vec<CardKey> = saved
        .entries
        .keys()
        .filter(|key| !claimed.contains(key))
        .cloned()
        .collect();
    dropped.sort();

    let matched = assigned.iter().filter(|a| **a).count();
    let report = MergeReport {
        matched,
        defaulted: catalog.len() - matched,
        dropped,
    };

    if !report.dropped.is_empty() {
        let lost: u64 = report
            .dropped
            .iter()
            .filter_map(|key| saved.get(key))
            .map(u64::from)
            .sum();
        log::warn!(
            "{} saved entries are no longer in the catalog and were dropped ({} cards)",
            report.dropped.len(),
            lost
        );
        for key in &report.dropped {
            log::debug!("Dropped saved entry: {}", key);
        }
    }

    (catalog, report)
}

/// Outcome of reading and merging a saved collection
#[derive(Debug)]
pub struct LoadOutcome {
    pub catalog: Catalog,
    pub report: MergeReport,
    /// Set when the saved collection was unusable and quantities were zeroed
    pub warning: Option<CollectionError>,
}

/// Read the collection at `path` and merge it into the catalog
///
/// A corrupt file does not fail the load: it is returned as a warning and the
/// merge proceeds as if nothing had been saved.
pub fn load_and_merge<P: AsRef<Path>>(catalog: Catalog, path: P) -> LoadOutcome {
    let (saved, warning) = match read_collection(path) {
        Ok(saved) => (saved, None),
        Err(e) => {
            log::warn!("{}; starting with an empty collection", e);
            (None, Some(e))
        }
    };

    let (catalog, report) = merge(catalog, saved.as_ref());
    log::info!(
        "Merged collection: {} rows matched, {} defaulted, {} dropped",
        report.matched,
        report.defaulted,
        report.dropped.len()
    );

    LoadOutcome {
        catalog,
        report,
        warning,
    }
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
