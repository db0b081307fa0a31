//! Per-user session state
//!
//! A session owns the merged catalog, the current listing filter and the set
//! of edits not yet written to disk. Interactions are expressed as
//! [`EditEvent`]s; [`Session::render`] is a pure function of the state.

use crate::collection::{load_and_merge, write_collection};
use crate::config::{SavePolicy, Settings};
use crate::error::{CollectionError, Result};
use crate::export::export_owned;
use crate::models::{CardKey, Catalog};
use crate::view::{self, PageView, SortKey, ViewFilter};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Normalized user identifier, safe to embed in a file name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    /// Lower-case the name and join whitespace runs with `_`
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();

        let invalid = normalized.is_empty()
            || normalized == "."
            || normalized == ".."
            || normalized.contains(['/', '\\', '\0']);
        if invalid {
            return Err(CollectionError::InvalidUser(raw.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `collection_<user>.csv`
    pub fn collection_file_name(&self) -> String {
        format!("collection_{}.csv", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEvent {
    SetQuantity { key: CardKey, quantity: u32 },
    SetSearch(String),
    SetOwnedOnly(bool),
    SetSets(Vec<String>),
    SetSort(Option<SortKey>),
    GoToPage(usize),
    ResetFilters,
    Save,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    QuantityChanged {
        index: usize,
        previous: u32,
        /// Whether the change was written right away
        saved: bool,
    },
    /// The quantity was already at the requested value
    Unchanged,
    FilterChanged,
    Saved,
}

#[derive(Debug)]
pub struct Session {
    user: UserId,
    catalog: Catalog,
    filter: ViewFilter,
    collection_path: PathBuf,
    save_policy: SavePolicy,
    pending: BTreeSet<CardKey>,
    /// Why the saved collection was discarded on open; cleared by the next save
    load_warning: Option<String>,
}

impl Session {
    /// Open a session on a freshly normalized catalog
    ///
    /// The saved collection is merged in. A corrupt collection file is
    /// returned alongside the session and kept as [`Session::load_warning`];
    /// quantities then start at 0.
    pub fn open(
        user: UserId,
        catalog: Catalog,
        settings: &Settings,
    ) -> (Self, Option<CollectionError>) {
        let collection_path = settings.data_dir.join(user.collection_file_name());
        log::info!(
            "Opening session for {} ({})",
            user,
            collection_path.display()
        );

        let outcome = load_and_merge(catalog, &collection_path);
        let session = Self {
            user,
            catalog: outcome.catalog,
            filter: ViewFilter::with_page_size(settings.page_size),
            collection_path,
            save_policy: settings.save_policy,
            pending: BTreeSet::new(),
            load_warning: outcome.warning.as_ref().map(|e| e.to_string()),
        };
        (session, outcome.warning)
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    pub fn collection_path(&self) -> &Path {
        &self.collection_path
    }

    pub fn save_policy(&self) -> SavePolicy {
        self.save_policy
    }

    /// Printings edited since the last successful save
    pub fn pending_edits(&self) -> impl Iterator<Item = &CardKey> {
        self.pending.iter()
    }

    /// Set while the session runs on zeroed quantities because the saved
    /// collection could not be read
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Apply one event
    ///
    /// With [`SavePolicy::Auto`] a quantity change is written immediately. If
    /// that write fails the error is returned but the change stays applied
    /// and pending.
    pub fn apply(&mut self, event: EditEvent) -> Result<EditOutcome> {
        match event {
            EditEvent::SetQuantity { key, quantity } => self.set_quantity(&key, quantity),
            EditEvent::SetSearch(search) => {
                self.filter.search = search;
                Ok(self.filter_changed())
            }
            EditEvent::SetOwnedOnly(owned_only) => {
                self.filter.owned_only = owned_only;
                Ok(self.filter_changed())
            }
            EditEvent::SetSets(sets) => {
                self.filter.sets = sets;
                Ok(self.filter_changed())
            }
            EditEvent::SetSort(sort) => {
                self.filter.sort = sort;
                Ok(self.filter_changed())
            }
            EditEvent::GoToPage(page) => {
                self.filter.page = page.max(1);
                Ok(EditOutcome::FilterChanged)
            }
            EditEvent::ResetFilters => {
                self.filter.reset();
                Ok(EditOutcome::FilterChanged)
            }
            EditEvent::Save => {
                self.save()?;
                Ok(EditOutcome::Saved)
            }
        }
    }

    /// Apply events in order, stopping at the first error
    pub fn apply_all<I>(&mut self, events: I) -> Result<Vec<EditOutcome>>
    where
        I: IntoIterator<Item = EditEvent>,
    {
        events.into_iter().map(|event| self.apply(event)).collect()
    }

    /// Current page of the listing
    pub fn render(&self) -> PageView {
        view::apply(&self.catalog, &self.filter)
    }

    /// Overwrite the collection file with the current quantities
    pub fn save(&mut self) -> Result<()> {
        write_collection(&self.collection_path, &self.catalog)?;
        log::info!(
            "Saved collection for {}: {} printings owned ({} cards)",
            self.user,
            self.catalog.owned_count(),
            self.catalog.total_owned()
        );
        self.pending.clear();
        self.load_warning = None;
        Ok(())
    }

    /// Write the owned printings to `path`
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        export_owned(path, &self.catalog)
    }

    fn set_quantity(&mut self, key: &CardKey, quantity: u32) -> Result<EditOutcome> {
        let index = self
            .catalog
            .resolve(key)
            .ok_or_else(|| CollectionError::UnknownCard(key.to_string()))?;
        let previous = self
            .catalog
            .set_quantity_at(index, quantity)
            .ok_or_else(|| CollectionError::UnknownCard(key.to_string()))?;

        if previous == quantity {
            return Ok(EditOutcome::Unchanged);
        }

        let resolved = self.catalog.rows()[index].key();
        log::debug!("{}: {} -> {}", resolved, previous, quantity);
        self.pending.insert(resolved);

        let saved = match self.save_policy {
            SavePolicy::Auto => {
                self.save()?;
                true
            }
            SavePolicy::Manual => false,
        };

        Ok(EditOutcome::QuantityChanged {
            index,
            previous,
            saved,
        })
    }

    fn filter_changed(&mut self) -> EditOutcome {
        self.filter.page = 1;
        EditOutcome::FilterChanged
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
