//! Record extraction from catalog pages
//!
//! Markup pages are read through the entry wrapper; JSON pages through their
//! named fields. Either way the score text must match the configured shape,
//! so a shifted layout surfaces as `FieldShapeMismatch` instead of a record
//! whose name and score have silently swapped.
//!
//! A broken entry is logged and skipped. The page only fails when it has
//! entries and none of them extract.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, error};

use super::config::{compile_pattern, compile_selector, ExtractionSelectors, JsonFields};
use super::error::{ExtractionError, ExtractionResult};
use crate::domain::Record;
use crate::infrastructure::page_fetcher::PageBody;

/// Turns one page body into records for a (category, location) pair
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    container: Selector,
    container_source: String,
    entry: Selector,
    cover_image: Selector,
    label: Selector,
    name_label: Selector,
    score_label: Selector,
    name_label_index: usize,
    score_label_index: usize,
    score_pattern: Regex,
    json_fields: JsonFields,
}

impl RecordExtractor {
    pub fn new(selectors: &ExtractionSelectors) -> ExtractionResult<Self> {
        Ok(Self {
            container: compile_selector(&selectors.list_container)?,
            container_source: selectors.list_container.clone(),
            entry: compile_selector(&selectors.entry)?,
            cover_image: compile_selector(&selectors.cover_image)?,
            label: compile_selector(&selectors.label)?,
            name_label: compile_selector(&selectors.name_label)?,
            score_label: compile_selector(&selectors.score_label)?,
            name_label_index: selectors.name_label_index,
            score_label_index: selectors.score_label_index,
            score_pattern: compile_pattern(&selectors.score_pattern)?,
            json_fields: selectors.json_fields.clone(),
        })
    }

    /// Extract every entry of `body`, tagging records with the originating filter pair
    pub fn extract(&self, body: &PageBody, category: &str, location: &str) -> ExtractionResult<Vec<Record>> {
        match body {
            PageBody::Markup(html) => self.extract_markup(html, category, location),
            PageBody::Json(entries) => self.extract_json(entries, category, location),
        }
    }

    /// Positional/named extraction from entry markup
    pub fn extract_markup(&self, html: &str, category: &str, location: &str) -> ExtractionResult<Vec<Record>> {
        let document = Html::parse_document(html);
        let container = document
            .select(&self.container)
            .next()
            .ok_or_else(|| ExtractionError::ContainerMissing {
                selector: self.container_source.clone(),
            })?;

        let records = keep_valid_entries(
            container
                .select(&self.entry)
                .enumerate()
                .map(|(index, entry)| self.record_from_element(index, entry, category, location)),
            category,
            location,
        )?;

        debug!("Extracted {} records from markup ({}/{})", records.len(), category, location);
        Ok(records)
    }

    /// Named-field extraction from the JSON search endpoint
    pub fn extract_json(&self, entries: &[Value], category: &str, location: &str) -> ExtractionResult<Vec<Record>> {
        let fields = &self.json_fields;
        let results = entries.iter().enumerate().map(|(index, entry)| -> ExtractionResult<Record> {
            let field = |key: &str, name: &'static str| {
                entry
                    .get(key)
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| ExtractionError::missing(index, name))
            };
            let record = Record {
                name: field(&fields.name, "name")?,
                raw_score_text: field(&fields.score, "score")?,
                location: location.to_string(),
                category: category.to_string(),
                info_link: field(&fields.info_link, "info_link")?,
                cover_link: field(&fields.cover_link, "cover_link")?,
            };
            self.check_shape(index, &record)?;
            Ok(record)
        });
        let records = keep_valid_entries(results, category, location)?;

        debug!("Extracted {} records from JSON ({}/{})", records.len(), category, location);
        Ok(records)
    }

    fn record_from_element(
        &self,
        index: usize,
        entry: ElementRef<'_>,
        category: &str,
        location: &str,
    ) -> ExtractionResult<Record> {
        let info_link = entry
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or_else(|| ExtractionError::missing(index, "info_link"))?;

        let cover_link = entry
            .select(&self.cover_image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::trim)
            .ok_or_else(|| ExtractionError::missing(index, "cover_link"))?;

        let labels: Vec<ElementRef<'_>> = entry.select(&self.label).collect();
        let name = self
            .named_or_positional(entry, &self.name_label, &labels, self.name_label_index)
            .ok_or_else(|| ExtractionError::missing(index, "name"))?;
        let raw_score_text = self
            .named_or_positional(entry, &self.score_label, &labels, self.score_label_index)
            .ok_or_else(|| ExtractionError::missing(index, "score"))?;

        let record = Record {
            name,
            raw_score_text,
            location: location.to_string(),
            category: category.to_string(),
            info_link: info_link.to_string(),
            cover_link: cover_link.to_string(),
        };
        self.check_shape(index, &record)?;
        Ok(record)
    }

    fn named_or_positional(
        &self,
        entry: ElementRef<'_>,
        named: &Selector,
        labels: &[ElementRef<'_>],
        position: usize,
    ) -> Option<String> {
        entry
            .select(named)
            .next()
            .or_else(|| labels.get(position).copied())
            .map(element_text)
    }

    fn check_shape(&self, index: usize, record: &Record) -> ExtractionResult<()> {
        if record.name.is_empty() {
            return Err(ExtractionError::shape(index, "name", &record.name));
        }
        if !self.score_pattern.is_match(&record.raw_score_text) {
            return Err(ExtractionError::shape(index, "score", &record.raw_score_text));
        }
        Ok(())
    }
}

/// Valid records in page order; the first error only if nothing on the page extracted
fn keep_valid_entries(
    results: impl Iterator<Item = ExtractionResult<Record>>,
    category: &str,
    location: &str,
) -> ExtractionResult<Vec<Record>> {
    let mut records = Vec::new();
    let mut first_error = None;

    for result in results {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                error!("{}/{}: skipping entry, layout no longer matches selectors: {}", category, location, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if records.is_empty() => Err(e),
        _ => Ok(records),
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
