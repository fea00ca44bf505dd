//! # Crawl Driver
//!
//! Walks the offsets of one filter pair until the catalog runs dry:
//!
//! ```text
//! Running(offset, attempt) --records--> Running(offset + page_size, 0)
//!                          --failure--> Running(offset, attempt + 1)   while attempt < max_retries
//!                          --otherwise-> Done(reason)
//! ```
//!
//! Offsets within a pair are strictly increasing. Every fetch goes through
//! the shared `Pacer`. A pair never fetches more than `max_pages_per_pair`
//! pages, and a failed offset is retried at most `max_retries_per_offset`
//! times, so termination does not depend on the catalog behaving.

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::politeness::Pacer;
use crate::domain::{FilterCriteria, Record};
use crate::infrastructure::config::CrawlingConfig;
use crate::infrastructure::http_client::TransportError;
use crate::infrastructure::page_fetcher::{PageResult, PageSource};
use crate::infrastructure::parsing::{ExtractionError, RecordExtractor};
use crate::infrastructure::query_builder::{Query, QueryBuilder, QueryError};

/// Pagination limits for one driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    pub page_size: u32,
    pub max_retries_per_offset: u32,
    pub max_pages_per_pair: u32,
}

impl From<&CrawlingConfig> for CrawlSettings {
    fn from(config: &CrawlingConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_retries_per_offset: config.max_retries_per_offset,
            max_pages_per_pair: config.max_pages_per_pair,
        }
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self::from(&CrawlingConfig::default())
    }
}

/// Why a pair stopped
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// A page extracted to zero records
    Exhausted,
    /// The fetcher reported an empty page
    EmptyPage,
    /// Transport kept failing at one offset
    RetriesExhausted { offset: u32, error: TransportError },
    /// Page structure did not match the selectors
    ExtractionFailed { offset: u32, error: ExtractionError },
    /// `max_pages_per_pair` reached
    PageCeiling,
    /// The filter could not be encoded; nothing was fetched
    QueryRejected(QueryError),
    /// Harvest deadline passed
    DeadlineExceeded,
    Cancelled,
}

impl StopReason {
    /// Normal end of data for the pair
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Exhausted | Self::EmptyPage)
    }

    /// Whether the whole harvest should stop, not only this pair
    pub fn halts_harvest(&self) -> bool {
        matches!(self, Self::DeadlineExceeded | Self::Cancelled)
    }
}

/// Driver state
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlState {
    Running { offset: u32, attempt: u32 },
    Done(StopReason),
}

/// Summary of one pair's pass
#[derive(Debug, Clone, PartialEq)]
pub struct PairOutcome {
    pub criteria: FilterCriteria,
    pub records: usize,
    pub fetch_calls: u32,
    pub stop: StopReason,
}

/// Records plus per-pair outcomes of a bulk harvest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestReport {
    pub records: Vec<Record>,
    pub pairs: Vec<PairOutcome>,
}

impl HarvestReport {
    pub fn fetch_calls(&self) -> u32 {
        self.pairs.iter().map(|p| p.fetch_calls).sum()
    }

    pub fn failed_pairs(&self) -> impl Iterator<Item = &PairOutcome> {
        self.pairs.iter().filter(|p| !p.stop.is_clean())
    }

    pub fn halted(&self) -> bool {
        self.pairs.iter().any(|p| p.stop.halts_harvest())
    }
}

/// Sequential, paced pagination over a `PageSource`
pub struct CrawlDriver<S> {
    source: S,
    builder: QueryBuilder,
    extractor: RecordExtractor,
    pacer: Arc<Pacer>,
    settings: CrawlSettings,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl<S: PageSource> CrawlDriver<S> {
    pub fn new(
        source: S,
        builder: QueryBuilder,
        extractor: RecordExtractor,
        pacer: Arc<Pacer>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            source,
            builder,
            extractor,
            pacer,
            settings,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// One paced fetch, or the reason the harvest must stop first
    pub async fn fetch_paced(&self, query: &Query, offset: u32) -> Result<PageResult, StopReason> {
        if self.cancel.is_cancelled() {
            return Err(StopReason::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(StopReason::DeadlineExceeded);
        }

        tokio::select! {
            () = self.pacer.wait() => {},
            () = self.cancel.cancelled() => return Err(StopReason::Cancelled),
        }

        tokio::select! {
            result = self.source.fetch(query, offset) => Ok(result),
            () = self.cancel.cancelled() => Err(StopReason::Cancelled),
        }
    }

    /// Exhaust one filter pair, appending its records to `sink`
    pub async fn harvest_pair_into(&self, criteria: &FilterCriteria, sink: &mut Vec<Record>) -> PairOutcome {
        let match_all = self.builder.match_all_tag();
        let category = criteria.category.label(match_all).to_string();
        let location = criteria.location.label(match_all).to_string();

        let query = match self.builder.build(criteria) {
            Ok(query) => query,
            Err(e) => {
                warn!("Skipping {}: {}", criteria, e);
                return PairOutcome {
                    criteria: criteria.clone(),
                    records: 0,
                    fetch_calls: 0,
                    stop: StopReason::QueryRejected(e),
                };
            }
        };

        let before = sink.len();
        let mut fetch_calls = 0_u32;
        let mut pages = 0_u32;
        let mut state = CrawlState::Running { offset: 0, attempt: 0 };

        let stop = loop {
            let (offset, attempt) = match state {
                CrawlState::Running { offset, attempt } => (offset, attempt),
                CrawlState::Done(reason) => break reason,
            };

            if pages >= self.settings.max_pages_per_pair {
                warn!("{}: page ceiling {} reached", criteria, self.settings.max_pages_per_pair);
                state = CrawlState::Done(StopReason::PageCeiling);
                continue;
            }

            let page = match self.fetch_paced(&query, offset).await {
                Ok(page) => page,
                Err(reason) => {
                    state = CrawlState::Done(reason);
                    continue;
                }
            };
            fetch_calls += 1;

            state = match page {
                PageResult::Payload(body) => match self.extractor.extract(&body, &category, &location) {
                    Ok(records) if records.is_empty() => CrawlState::Done(StopReason::Exhausted),
                    Ok(records) => {
                        debug!("{} offset {}: {} records", criteria, offset, records.len());
                        sink.extend(records);
                        pages += 1;
                        match offset.checked_add(self.settings.page_size) {
                            Some(next) => CrawlState::Running { offset: next, attempt: 0 },
                            None => CrawlState::Done(StopReason::PageCeiling),
                        }
                    }
                    Err(error) => {
                        if error.is_layout_change() {
                            error!("{} offset {}: page layout no longer matches selectors: {}", criteria, offset, error);
                        } else {
                            warn!("{} offset {}: treating page as empty: {}", criteria, offset, error);
                        }
                        CrawlState::Done(StopReason::ExtractionFailed { offset, error })
                    }
                },
                PageResult::Empty => CrawlState::Done(StopReason::EmptyPage),
                PageResult::Failure(error) if attempt < self.settings.max_retries_per_offset => {
                    warn!(
                        "{} offset {}: attempt {} failed, retrying: {}",
                        criteria,
                        offset,
                        attempt + 1,
                        error
                    );
                    CrawlState::Running { offset, attempt: attempt + 1 }
                }
                PageResult::Failure(error) => {
                    warn!("{} offset {}: giving up after {} attempts", criteria, offset, attempt + 1);
                    CrawlState::Done(StopReason::RetriesExhausted { offset, error })
                }
            };
        };

        let records = sink.len() - before;
        info!("{}: {} records in {} requests ({:?})", criteria, records, fetch_calls, stop);

        PairOutcome {
            criteria: criteria.clone(),
            records,
            fetch_calls,
            stop,
        }
    }

    /// Exhaust one filter pair
    pub async fn harvest_pair(&self, criteria: &FilterCriteria) -> (Vec<Record>, PairOutcome) {
        let mut records = Vec::new();
        let outcome = self.harvest_pair_into(criteria, &mut records).await;
        (records, outcome)
    }

    /// Run every pair in order, concatenating records.
    ///
    /// A failing pair contributes no further records but never stops the
    /// others; only cancellation or the deadline ends the harvest early.
    pub async fn harvest_all(&self, pairs: &[FilterCriteria]) -> HarvestReport {
        let mut report = HarvestReport::default();

        for (index, criteria) in pairs.iter().enumerate() {
            let outcome = self.harvest_pair_into(criteria, &mut report.records).await;
            let halt = outcome.stop.halts_harvest();
            report.pairs.push(outcome);

            if halt {
                warn!("Harvest stopped after {} of {} pairs", index + 1, pairs.len());
                break;
            }
        }

        info!(
            "Harvest finished: {} records from {} pairs, {} requests",
            report.records.len(),
            report.pairs.len(),
            report.fetch_calls()
        );
        report
    }
}

/// Every (category, location) combination of `base`, categories outermost
pub fn filter_pairs(base: &FilterCriteria, categories: &[String], locations: &[String]) -> Vec<FilterCriteria> {
    categories
        .iter()
        .flat_map(|category| locations.iter().map(move |location| base.for_pair(category, location)))
        .collect()
}
