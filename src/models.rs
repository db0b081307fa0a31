use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Set name used for cards that list no printings
pub const UNSPECIFIED_SET: &str = "unspecified";

/// Canonical identity of one printing: name, set name, set code and rarity.
///
/// A key whose code and rarity are both empty can also come from a legacy
/// collection file that only stored name and set (see [`CardKey::is_legacy`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardKey {
    pub name: String,
    pub set_name: String,
    #[serde(default)]
    pub set_code: String,
    #[serde(default)]
    pub rarity: String,
}

impl CardKey {
    pub fn new(
        name: impl Into<String>,
        set_name: impl Into<String>,
        set_code: impl Into<String>,
        rarity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            set_name: set_name.into(),
            set_code: set_code.into(),
            rarity: rarity.into(),
        }
    }

    /// Key carrying only name and set, as written by older collection files
    pub fn legacy(name: impl Into<String>, set_name: impl Into<String>) -> Self {
        Self::new(name, set_name, "", "")
    }

    /// True if code and rarity are both empty
    pub fn is_legacy(&self) -> bool {
        self.set_code.is_empty() && self.rarity.is_empty()
    }
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.name, self.set_name)?;
        if !self.set_code.is_empty() {
            write!(f, " / {}", self.set_code)?;
        }
        if !self.rarity.is_empty() {
            write!(f, " / {}", self.rarity)?;
        }
        write!(f, ")")
    }
}

/// One catalog row: a card in one of its printings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardVariant {
    pub name: String,
    pub set_name: String,
    pub set_code: String,
    pub rarity: String,
    /// Monster race or spell/trap category
    pub category: String,
    pub image_url: String,
    pub owned_quantity: u32,
}

impl CardVariant {
    pub fn key(&self) -> CardKey {
        CardKey::new(&self.name, &self.set_name, &self.set_code, &self.rarity)
    }

    /// Returns true if name and set name equal those of the given key
    pub fn matches_name_and_set(&self, key: &CardKey) -> bool {
        self.name == key.name && self.set_name == key.set_name
    }

    pub fn is_owned(&self) -> bool {
        self.owned_quantity > 0
    }
}

/// Flattened card catalog, one row per (card, printing), in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    rows: Vec<CardVariant>,
}

impl Catalog {
    pub fn new(rows: Vec<CardVariant>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardVariant> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[CardVariant] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&CardVariant> {
        self.rows.get(index)
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [CardVariant] {
        &mut self.rows
    }

    /// Index of the row with exactly this key
    pub fn find(&self, key: &CardKey) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.name == key.name
                && row.set_name == key.set_name
                && row.set_code == key.set_code
                && row.rarity == key.rarity
        })
    }

    /// Like [`Catalog::find`], but a legacy key falls back to the first row
    /// with the same name and set
    pub fn resolve(&self, key: &CardKey) -> Option<usize> {
        self.find(key).or_else(|| {
            if key.is_legacy() {
                self.rows.iter().position(|row| row.matches_name_and_set(key))
            } else {
                None
            }
        })
    }

    /// Sets the owned quantity of one row, returning the previous value
    pub fn set_quantity(&mut self, key: &CardKey, quantity: u32) -> Option<u32> {
        let index = self.find(key)?;
        self.set_quantity_at(index, quantity)
    }

    pub fn set_quantity_at(&mut self, index: usize, quantity: u32) -> Option<u32> {
        let row = self.rows.get_mut(index)?;
        Some(std::mem::replace(&mut row.owned_quantity, quantity))
    }

    /// Sorted, deduplicated set names (options for the set filter)
    pub fn set_names(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.set_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of rows with a non-zero owned quantity
    pub fn owned_count(&self) -> usize {
        self.rows.iter().filter(|row| row.is_owned()).count()
    }

    /// Sum of all owned quantities
    pub fn total_owned(&self) -> u64 {
        self.rows.iter().map(|row| u64::from(row.owned_quantity)).sum()
    }
}

impl FromIterator<CardVariant> for Catalog {
    fn from_iter<I: IntoIterator<Item = CardVariant>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
pub use tests::make_test_variant;
