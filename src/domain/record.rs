//! Harvested catalog entry

use serde::{Deserialize, Serialize};

/// Column order used by every record export
pub const RECORD_COLUMNS: [&str; 6] = [
    "name",
    "raw_score_text",
    "location",
    "category",
    "info_link",
    "cover_link",
];

/// One catalog entry. `location` and `category` come from the filter that
/// produced the page, never from the entry markup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    /// Score exactly as the catalog printed it (may be empty for unrated entries)
    pub raw_score_text: String,
    pub location: String,
    pub category: String,
    pub info_link: String,
    pub cover_link: String,
}

impl Record {
    /// Fields in export order
    pub fn to_row(&self) -> [&str; 6] {
        [
            &self.name,
            &self.raw_score_text,
            &self.location,
            &self.category,
            &self.info_link,
            &self.cover_link,
        ]
    }
}
