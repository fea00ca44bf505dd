//! Filter vocabulary extraction
//!
//! The catalog's tag page renders one `ul.category` group per tag slot
//! (form, category, location, feature). Each group starts with the
//! match-all tag (e.g. `全部地区`), which is not a real value and is skipped.
//! Later items are kept even when they share the sentinel's prefix.

use scraper::{Html, Selector};
use tracing::debug;

use super::config::{compile_selector, ExtractionSelectors};
use super::error::{ExtractionError, ExtractionResult};

/// Reads the valid tag values of one filter slot from the control region
#[derive(Debug, Clone)]
pub struct VocabularyParser {
    group: Selector,
    item: Selector,
    location_group_index: usize,
}

impl VocabularyParser {
    pub fn new(selectors: &ExtractionSelectors) -> ExtractionResult<Self> {
        Ok(Self {
            group: compile_selector(&selectors.tag_group)?,
            item: compile_selector(&selectors.tag_item)?,
            location_group_index: selectors.location_group_index,
        })
    }

    /// Location vocabulary, in page order, without the match-all entry
    pub fn locations(&self, html: &str, match_all_tag: &str) -> ExtractionResult<Vec<String>> {
        self.group_values(html, self.location_group_index, match_all_tag)
    }

    /// Values of the `index`-th tag group
    pub fn group_values(&self, html: &str, index: usize, match_all_tag: &str) -> ExtractionResult<Vec<String>> {
        let document = Html::parse_document(html);
        let groups: Vec<_> = document.select(&self.group).collect();
        let group = groups.get(index).ok_or(ExtractionError::TagGroupMissing {
            index,
            available: groups.len(),
        })?;

        let mut values: Vec<String> = Vec::new();
        for (position, item) in group.select(&self.item).enumerate() {
            let text = item.text().collect::<String>().trim().to_string();
            let sentinel = text == match_all_tag || (position == 0 && text.starts_with(match_all_tag));
            if text.is_empty() || sentinel || values.contains(&text) {
                continue;
            }
            values.push(text);
        }

        debug!("Tag group {} yielded {} values", index, values.len());
        Ok(values)
    }
}
