//! Filter vocabulary lookup
//!
//! Issues one match-all query against the catalog's tag page and reads the
//! valid location values from its control region. The request goes through
//! the crawl driver so it shares pacing and cancellation with the harvest.

use thiserror::Error;
use tracing::{info, warn};

use crate::crawling::{CrawlDriver, StopReason};
use crate::domain::FilterCriteria;
use crate::infrastructure::http_client::TransportError;
use crate::infrastructure::page_fetcher::{PageBody, PageResult, PageSource};
use crate::infrastructure::parsing::{ExtractionError, VocabularyParser};
use crate::infrastructure::query_builder::{QueryBuilder, QueryError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VocabularyError {
    #[error("Vocabulary query could not be built: {0}")]
    Query(#[from] QueryError),

    #[error("Vocabulary page could not be fetched: {0}")]
    Fetch(TransportError),

    #[error("Vocabulary page was empty")]
    EmptyPage,

    #[error("Vocabulary page returned JSON, tag markup expected")]
    UnexpectedJson,

    #[error("Vocabulary page did not match the tag selectors: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Vocabulary page lists no locations")]
    NoValues,

    #[error("Vocabulary lookup interrupted: {0:?}")]
    Interrupted(StopReason),
}

/// Reads the location vocabulary from the tag page
#[derive(Debug, Clone)]
pub struct VocabularySource {
    builder: QueryBuilder,
    parser: VocabularyParser,
    max_attempts: u32,
}

impl VocabularySource {
    pub fn new(builder: QueryBuilder, parser: VocabularyParser, max_retries: u32) -> Self {
        Self {
            builder,
            parser,
            max_attempts: max_retries.saturating_add(1),
        }
    }

    /// Locations offered by the catalog for `base` with every tag slot set to match-all
    pub async fn locations<S: PageSource>(
        &self,
        driver: &CrawlDriver<S>,
        base: &FilterCriteria,
    ) -> Result<Vec<String>, VocabularyError> {
        let criteria = FilterCriteria {
            extra_tag: None,
            ..base.clone()
        }
        .for_any();
        let query = self.builder.build(&criteria)?;
        info!("📚 Reading location vocabulary from {}", query.page_url(0));

        let mut attempt = 1;
        let html = loop {
            match driver.fetch_paced(&query, 0).await.map_err(VocabularyError::Interrupted)? {
                PageResult::Payload(PageBody::Markup(html)) => break html,
                PageResult::Payload(PageBody::Json(_)) => return Err(VocabularyError::UnexpectedJson),
                PageResult::Empty => return Err(VocabularyError::EmptyPage),
                PageResult::Failure(error) if attempt < self.max_attempts => {
                    warn!("Vocabulary fetch attempt {} failed, retrying: {}", attempt, error);
                    attempt += 1;
                }
                PageResult::Failure(error) => return Err(VocabularyError::Fetch(error)),
            }
        };

        let locations = self.parser.locations(&html, self.builder.match_all_tag())?;
        if locations.is_empty() {
            return Err(VocabularyError::NoValues);
        }

        info!("📚 {} locations in vocabulary", locations.len());
        Ok(locations)
    }
}
