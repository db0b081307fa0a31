//! Runtime settings shared by the CLI and the web server

use crate::error::{CollectionError, Result};
use crate::view::DEFAULT_PAGE_SIZE;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default catalog file name, resolved against the working directory
pub const DEFAULT_CATALOG_FILE: &str = "all_cards.json";

/// When edits are written to the collection file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SavePolicy {
    /// After every quantity change
    #[default]
    Auto,
    /// Only on an explicit save
    Manual,
}

impl FromStr for SavePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(SavePolicy::Auto),
            "manual" => Ok(SavePolicy::Manual),
            other => Err(format!("unknown save policy {:?} (expected auto or manual)", other)),
        }
    }
}

impl fmt::Display for SavePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SavePolicy::Auto => f.write_str("auto"),
            SavePolicy::Manual => f.write_str("manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub catalog_path: PathBuf,
    /// Directory holding the per-user collection files
    pub data_dir: PathBuf,
    pub page_size: usize,
    pub save_policy: SavePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_FILE),
            data_dir: default_data_dir(),
            page_size: DEFAULT_PAGE_SIZE,
            save_policy: SavePolicy::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(CollectionError::Config(
                "page size must be at least 1".to_string(),
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(CollectionError::Config(
                "data directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default data directory: ~/.local/share/ygo_collection
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ygo_collection")
}
