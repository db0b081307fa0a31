//! Filtering, sorting and pagination of catalog rows

use crate::models::{CardVariant, Catalog};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rows per page in the card listing
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Column to sort the listing by; card name breaks ties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    SetName,
    CardName,
    Rarity,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::SetName => "set",
            SortKey::CardName => "name",
            SortKey::Rarity => "rarity",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "set" | "set_name" | "extension" => Ok(SortKey::SetName),
            "name" | "card_name" => Ok(SortKey::CardName),
            "rarity" => Ok(SortKey::Rarity),
            other => Err(format!(
                "unknown sort key {:?} (expected set, name or rarity)",
                other
            )),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFilter {
    /// Case-insensitive substring of the card name
    pub search: String,
    pub owned_only: bool,
    /// Set names to keep; empty keeps all
    pub sets: Vec<String>,
    pub sort: Option<SortKey>,
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
}

impl Default for ViewFilter {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl ViewFilter {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            search: String::new(),
            owned_only: false,
            sets: Vec::new(),
            sort: None,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Clear search, owned filter, set filter and sort; keeps the page size
    pub fn reset(&mut self) {
        *self = Self::with_page_size(self.page_size);
    }

    fn matches(&self, row: &CardVariant, search: &str) -> bool {
        if !search.is_empty() && !row.name.to_lowercase().contains(search) {
            return false;
        }
        if self.owned_only && !row.is_owned() {
            return false;
        }
        self.sets.is_empty() || self.sets.iter().any(|set| *set == row.set_name)
    }
}

/// One listed row with its position in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewRow {
    pub index: usize,
    #[serde(flatten)]
    pub card: CardVariant,
}

/// One page of the filtered listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub rows: Vec<ViewRow>,
    pub page: usize,
    pub total_pages: usize,
    /// Rows matching the filter across all pages
    pub total_rows: usize,
}

/// Filter, sort and slice the catalog
pub fn apply(catalog: &Catalog, filter: &ViewFilter) -> PageView {
    let search = filter.search.trim().to_lowercase();

    let mut matched: Vec<(usize, &CardVariant)> = catalog
        .iter()
        .enumerate()
        .filter(|(_, row)| filter.matches(row, &search))
        .collect();

    if let Some(sort) = filter.sort {
        // Stable, so equal rows keep catalog order
        matched.sort_by(|(_, a), (_, b)| {
            let primary = match sort {
                SortKey::SetName => a.set_name.cmp(&b.set_name),
                SortKey::CardName => std::cmp::Ordering::Equal,
                SortKey::Rarity => a.rarity.cmp(&b.rarity),
            };
            primary.then_with(|| a.name.cmp(&b.name))
        });
    }

    let page_size = filter.page_size.max(1);
    let total_rows = matched.len();
    let total_pages = total_rows.div_ceil(page_size).max(1);
    let page = filter.page.clamp(1, total_pages);

    let rows = matched
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(|(index, card)| ViewRow {
            index,
            card: card.clone(),
        })
        .collect();

    PageView {
        rows,
        page,
        total_pages,
        total_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::make_test_variant;

    fn sample_catalog() -> Catalog {
        Catalog::new(vec![
            make_test_variant("Dark Magician", "Starter Deck", "SDY-006", "Ultra Rare", 2),
            make_test_variant(
                "Blue-Eyes White Dragon",
                "Legend of Blue Eyes White Dragon",
                "LOB-001",
                "Ultra Rare",
                0,
            ),
            make_test_variant("Kuriboh", "Metal Raiders", "MRD-071", "Common", 1),
            make_test_variant(
                "Red-Eyes B. Dragon",
                "Legend of Blue Eyes White Dragon",
                "LOB-070",
                "Ultra Rare",
                0,
            ),
        ])
    }

    fn names(view: &PageView) -> Vec<&str> {
        view.rows.iter().map(|r| r.card.name.as_str()).collect()
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let catalog = Catalog::new(vec![
            make_test_variant("Dark Magician", "Starter Deck", "", "", 0),
            make_test_variant("Blue-Eyes White Dragon", "Starter Deck", "", "", 0),
        ]);
        let filter = ViewFilter {
            search: "dragon".to_string(),
            ..ViewFilter::default()
        };

        let view = apply(&catalog, &filter);
        assert_eq!(names(&view), vec!["Blue-Eyes White Dragon"]);
        assert_eq!(view.rows[0].index, 1);
    }

    #[test]
    fn owned_only_keeps_positive_quantities() {
        let filter = ViewFilter {
            owned_only: true,
            ..ViewFilter::default()
        };
        let view = apply(&sample_catalog(), &filter);
        assert_eq!(names(&view), vec!["Dark Magician", "Kuriboh"]);
    }

    #[test]
    fn set_filter_keeps_selected_sets() {
        let filter = ViewFilter {
            sets: vec![
                "Metal Raiders".to_string(),
                "Starter Deck".to_string(),
            ],
            ..ViewFilter::default()
        };
        let view = apply(&sample_catalog(), &filter);
        assert_eq!(names(&view), vec!["Dark Magician", "Kuriboh"]);
    }

    #[test]
    fn sort_by_set_uses_name_as_tiebreak() {
        let filter = ViewFilter {
            sort: Some(SortKey::SetName),
            ..ViewFilter::default()
        };
        let view = apply(&sample_catalog(), &filter);
        assert_eq!(
            names(&view),
            vec![
                "Blue-Eyes White Dragon",
                "Red-Eyes B. Dragon",
                "Kuriboh",
                "Dark Magician"
            ]
        );
    }

    #[test]
    fn sort_by_rarity_then_name() {
        let filter = ViewFilter {
            sort: Some(SortKey::Rarity),
            ..ViewFilter::default()
        };
        let view = apply(&sample_catalog(), &filter);
        assert_eq!(
            names(&view),
            vec![
                "Kuriboh",
                "Blue-Eyes White Dragon",
                "Dark Magician",
                "Red-Eyes B. Dragon"
            ]
        );
    }

    #[test]
    fn sort_by_card_name() {
        let filter = ViewFilter {
            sort: Some(SortKey::CardName),
            ..ViewFilter::default()
        };
        let view = apply(&sample_catalog(), &filter);
        assert_eq!(view.rows[0].card.name, "Blue-Eyes White Dragon");
        assert_eq!(view.rows[3].card.name, "Red-Eyes B. Dragon");
    }

    #[test]
    fn pagination_windows_and_clamping() {
        let rows = (0..30)
            .map(|i| make_test_variant(&format!("Card {:02}", i), "Set", "", "", 0))
            .collect();
        let catalog = Catalog::new(rows);

        let mut filter = ViewFilter::default();
        let view = apply(&catalog, &filter);
        assert_eq!(view.total_rows, 30);
        assert_eq!(view.total_pages, 3);
        assert_eq!(view.rows.len(), 12);
        assert_eq!(view.rows[0].card.name, "Card 00");

        filter.page = 3;
        let view = apply(&catalog, &filter);
        assert_eq!(view.rows.len(), 6);
        assert_eq!(view.rows[0].card.name, "Card 24");

        filter.page = 99;
        let view = apply(&catalog, &filter);
        assert_eq!(view.page, 3);

        filter.page = 0;
        let view = apply(&catalog, &filter);
        assert_eq!(view.page, 1);
    }

    #[test]
    fn empty_result_still_has_one_page() {
        let filter = ViewFilter {
            search: "exodia".to_string(),
            ..ViewFilter::default()
        };
        let view = apply(&sample_catalog(), &filter);
        assert!(view.rows.is_empty());
        assert_eq!(view.total_pages, 1);
        assert_eq!(view.page, 1);
    }

    #[test]
    fn reset_keeps_page_size() {
        let mut filter = ViewFilter {
            search: "dragon".to_string(),
            owned_only: true,
            sets: vec!["Starter Deck".to_string()],
            sort: Some(SortKey::Rarity),
            page: 4,
            page_size: 24,
        };
        filter.reset();
        assert_eq!(filter, ViewFilter::with_page_size(24));
    }

    #[test]
    fn sort_key_parses_aliases() {
        assert_eq!("set".parse::<SortKey>(), Ok(SortKey::SetName));
        assert_eq!("Name".parse::<SortKey>(), Ok(SortKey::CardName));
        assert_eq!("rarity".parse::<SortKey>(), Ok(SortKey::Rarity));
        assert!("price".parse::<SortKey>().is_err());
    }
}
