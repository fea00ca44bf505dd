//! Selector configuration for catalog markup
//!
//! The reference catalog renders each entry as
//! `<a class="item" href=INFO><span class="pic"><img src=COVER></span>
//! <span class="title">NAME</span><span class="rate">SCORE</span></a>`
//! inside a `div.list-wp`. Named selectors are tried first; the positional
//! label indexes are the fallback for markup without those classes.

use serde::{Deserialize, Serialize};

use super::error::ExtractionError;

/// CSS selectors and positional fallbacks used by the extractors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSelectors {
    /// Wrapper around the entry list
    pub list_container: String,

    /// One catalog entry inside the wrapper
    pub entry: String,

    /// Cover image inside an entry (first match wins)
    pub cover_image: String,

    /// Label-like descendants used for positional fallback
    pub label: String,

    /// Named selector for the entry name
    pub name_label: String,

    /// Named selector for the entry score
    pub score_label: String,

    /// Position of the name among `label` descendants
    pub name_label_index: usize,

    /// Position of the score among `label` descendants
    pub score_label_index: usize,

    /// Required shape of the score text (empty allowed for unrated entries)
    pub score_pattern: String,

    /// One tag group in the filter control region
    pub tag_group: String,

    /// One tag inside a tag group
    pub tag_item: String,

    /// Which tag group lists the locations
    pub location_group_index: usize,

    /// Field names of a JSON search entry
    pub json_fields: JsonFields,
}

/// Named fields of one entry in a JSON search response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonFields {
    pub name: String,
    pub score: String,
    pub info_link: String,
    pub cover_link: String,
}

impl Default for ExtractionSelectors {
    fn default() -> Self {
        Self {
            list_container: "div.list-wp".to_string(),
            entry: "a.item".to_string(),
            cover_image: "img".to_string(),
            label: "span".to_string(),
            name_label: "span.title".to_string(),
            score_label: "span.rate".to_string(),
            name_label_index: 1,
            score_label_index: 2,
            score_pattern: r"^(\d+(\.\d+)?)?$".to_string(),
            tag_group: "ul.category".to_string(),
            tag_item: "span.tag".to_string(),
            location_group_index: 2,
            json_fields: JsonFields::default(),
        }
    }
}

impl Default for JsonFields {
    fn default() -> Self {
        Self {
            name: "title".to_string(),
            score: "rate".to_string(),
            info_link: "url".to_string(),
            cover_link: "cover".to_string(),
        }
    }
}

impl ExtractionSelectors {
    /// Check that every selector and the score pattern compile
    pub fn validate(&self) -> Result<(), ExtractionError> {
        for selector in [
            &self.list_container,
            &self.entry,
            &self.cover_image,
            &self.label,
            &self.name_label,
            &self.score_label,
            &self.tag_group,
            &self.tag_item,
        ] {
            compile_selector(selector)?;
        }
        compile_pattern(&self.score_pattern)?;
        Ok(())
    }
}

pub(crate) fn compile_selector(selector: &str) -> Result<scraper::Selector, ExtractionError> {
    scraper::Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn compile_pattern(pattern: &str) -> Result<regex::Regex, ExtractionError> {
    regex::Regex::new(pattern).map_err(|e| ExtractionError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
