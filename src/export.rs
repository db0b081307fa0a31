//! Export of owned cards
//!
//! The export only lists printings with a non-zero quantity and carries more
//! columns than the collection file, so it is not meant to be read back.

use crate::error::{CollectionError, Result};
use crate::models::{CardVariant, Catalog};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Set")]
    set_name: &'a str,
    #[serde(rename = "Code")]
    code: &'a str,
    #[serde(rename = "Rarity")]
    rarity: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "OwnedQuantity")]
    owned_quantity: u32,
}

impl<'a> From<&'a CardVariant> for ExportRecord<'a> {
    fn from(row: &'a CardVariant) -> Self {
        Self {
            name: &row.name,
            set_name: &row.set_name,
            code: &row.set_code,
            rarity: &row.rarity,
            category: &row.category,
            owned_quantity: row.owned_quantity,
        }
    }
}

fn write_owned<W: std::io::Write>(wtr: &mut csv::Writer<W>, catalog: &Catalog) -> csv::Result<usize> {
    let mut count = 0;
    for row in catalog.iter().filter(|row| row.is_owned()) {
        wtr.serialize(ExportRecord::from(row))?;
        count += 1;
    }
    // Header is only emitted with the first record
    if count == 0 {
        wtr.write_record([
            "Name",
            "Set",
            "Code",
            "Rarity",
            "Category",
            "OwnedQuantity",
        ])?;
    }
    Ok(count)
}

/// Render the owned rows as CSV bytes
pub fn export_owned_to_bytes(catalog: &Catalog) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    write_owned(&mut wtr, catalog)?;
    wtr.into_inner()
        .map_err(|e| CollectionError::Io(e.into_error()))
}

/// Write the owned rows to `path`, returning the number of rows written
pub fn export_owned<P: AsRef<Path>>(path: P, catalog: &Catalog) -> Result<usize> {
    let path = path.as_ref();

    let mut wtr = csv::Writer::from_path(path).map_err(|e| CollectionError::write_failure(path, e))?;
    let count = write_owned(&mut wtr, catalog).map_err(|e| CollectionError::write_failure(path, e))?;
    wtr.flush()
        .map_err(|e| CollectionError::write_failure(path, e))?;

    log::info!("Exported {} owned printings to {}", count, path.display());
    Ok(count)
}
