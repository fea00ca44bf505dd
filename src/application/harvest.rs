//! Harvest use case
//!
//! Wires the pipeline end to end for one pass:
//! vocabulary (when no locations are configured) → every category × location
//! pair through the crawl driver → ranking aggregation → export.
//!
//! Pair failures and categories with too little data are reported in the
//! summary, never fatal. Records collected before a cancellation or a
//! deadline are still exported.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::vocabulary::{VocabularyError, VocabularySource};
use crate::crawling::{filter_pairs, CrawlDriver, CrawlSettings, HarvestReport, Pacer, StopReason};
use crate::domain::{aggregate, Rankings};
use crate::infrastructure::config::{AppConfig, ConfigError};
use crate::infrastructure::export::{export_records, export_report, ExportError};
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig};
use crate::infrastructure::page_fetcher::{PageFetcher, PageSource};
use crate::infrastructure::parsing::{ExtractionError, RecordExtractor, VocabularyParser};
use crate::infrastructure::query_builder::QueryBuilder;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid extraction selectors: {0}")]
    Selectors(#[from] ExtractionError),

    #[error("Location vocabulary unavailable: {0}")]
    Vocabulary(#[from] VocabularyError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}

/// Records and rankings of one harvest pass, before export
#[derive(Debug, Clone)]
pub struct HarvestOutput {
    pub locations: Vec<String>,
    pub report: HarvestReport,
    pub rankings: Rankings,
}

/// What a finished run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSummary {
    pub pairs_attempted: usize,
    pub pairs_failed: usize,
    pub records: usize,
    pub fetch_calls: u32,
    pub categories_ranked: usize,
    pub categories_failed: usize,
    pub deadline_hit: bool,
    pub cancelled: bool,
    pub records_path: PathBuf,
    pub report_path: PathBuf,
}

/// One harvest pass over the configured categories
pub struct HarvestService<S> {
    config: AppConfig,
    source: S,
    pacer: Arc<Pacer>,
    cancel: CancellationToken,
}

impl HarvestService<PageFetcher<HttpClient>> {
    /// Production wiring: reqwest transport and a User-Agent from the configured pool
    pub fn from_config(config: AppConfig, cancel: CancellationToken) -> anyhow::Result<Self> {
        let client = HttpClient::new(HttpClientConfig {
            timeout: config.crawling.request_timeout(),
            follow_redirects: true,
        })?;
        let fetcher = PageFetcher::new(client, &config.catalog.user_agents);
        info!("🌐 Using User-Agent: {}", fetcher.user_agent());

        Ok(Self::with_source(config, fetcher, cancel))
    }
}

impl<S: PageSource> HarvestService<S> {
    pub fn with_source(config: AppConfig, source: S, cancel: CancellationToken) -> Self {
        let pacer = Arc::new(Pacer::new(config.crawling.politeness_delay()));
        Self {
            config,
            source,
            pacer,
            cancel,
        }
    }

    /// Replace the pacer (tests run unpaced)
    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = Arc::new(pacer);
        self
    }

    /// Crawl and aggregate without writing anything
    pub async fn harvest(self) -> Result<HarvestOutput, HarvestError> {
        let catalog = &self.config.catalog;
        let crawling = &self.config.crawling;
        let harvest = &self.config.harvest;

        let base = harvest.base_criteria()?;
        let extractor = RecordExtractor::new(&catalog.selectors)?;
        let vocabulary = VocabularySource::new(
            QueryBuilder::new(&catalog.vocabulary_base_url, &catalog.match_all_tag),
            VocabularyParser::new(&catalog.selectors)?,
            crawling.max_retries_per_offset,
        );

        let deadline = crawling.harvest_deadline().map(|budget| Instant::now() + budget);
        let driver = CrawlDriver::new(
            self.source,
            QueryBuilder::new(&catalog.base_url, &catalog.match_all_tag),
            extractor,
            Arc::clone(&self.pacer),
            CrawlSettings::from(crawling),
        )
        .with_cancellation(self.cancel.clone())
        .with_deadline(deadline);

        let locations = match &harvest.locations {
            Some(locations) if !locations.is_empty() => locations.clone(),
            _ => vocabulary.locations(&driver, &base).await?,
        };

        let pairs = filter_pairs(&base, &harvest.categories, &locations);
        info!(
            "🚀 Harvesting {} pairs ({} categories × {} locations)",
            pairs.len(),
            harvest.categories.len(),
            locations.len()
        );

        let report = driver.harvest_all(&pairs).await;
        let rankings = aggregate(&report.records, &harvest.categories, harvest.top_n);

        for failure in rankings.failures() {
            warn!("⚠️ {}", failure);
        }

        Ok(HarvestOutput {
            locations,
            report,
            rankings,
        })
    }

    /// Full pass: harvest, aggregate, export
    pub async fn run(self) -> Result<HarvestSummary, HarvestError> {
        let output_config = self.config.output.clone();
        let output = self.harvest().await?;

        export_records(&output_config.records_path, &output.report.records, output_config.include_headers)?;
        export_report(&output_config.report_path, &output.rankings)?;

        let summary = HarvestSummary::new(&output, output_config.records_path, output_config.report_path);
        info!(
            "✅ Harvest complete: {} records, {} requests, {}/{} pairs failed, {} categories ranked",
            summary.records, summary.fetch_calls, summary.pairs_failed, summary.pairs_attempted, summary.categories_ranked
        );
        Ok(summary)
    }
}

impl HarvestSummary {
    fn new(output: &HarvestOutput, records_path: PathBuf, report_path: PathBuf) -> Self {
        let stopped_by = |reason: &StopReason| output.report.pairs.iter().any(|pair| &pair.stop == reason);
        let categories_failed = output.rankings.failures().count();

        Self {
            pairs_attempted: output.report.pairs.len(),
            pairs_failed: output.report.failed_pairs().count(),
            records: output.report.records.len(),
            fetch_calls: output.report.fetch_calls(),
            categories_ranked: output.rankings.len() - categories_failed,
            categories_failed,
            deadline_hit: stopped_by(&StopReason::DeadlineExceeded),
            cancelled: stopped_by(&StopReason::Cancelled),
            records_path,
            report_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::page_fetcher::{PageBody, PageResult};
    use crate::infrastructure::query_builder::Query;
    use crate::test_utils::{entry_markup, list_page, tag_page, FnSource};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.catalog.base_url = "https://catalog.test/search?".to_string();
        config.catalog.vocabulary_base_url = "https://catalog.test/tag/#/?".to_string();
        config.harvest.categories = vec!["喜剧".to_string()];
        config.harvest.top_n = 2;
        config.output.records_path = dir.path().join("records.csv");
        config.output.report_path = dir.path().join("ranking.txt");
        config
    }

    fn page(location: &str, count: usize) -> PageResult {
        let entries: Vec<String> = (0..count)
            .map(|i| entry_markup(&format!("/s/{location}{i}"), "/c.jpg", &format!("{location}{i}"), "8.0"))
            .collect();
        PageResult::Payload(PageBody::Markup(list_page(&entries)))
    }

    /// Vocabulary page lists 美国/英国/法国; search pages hold 3, 2 and 0 entries
    fn catalog(query: &Query, offset: u32) -> PageResult {
        let url = query.page_url(offset);
        if url.contains("/tag/") {
            return PageResult::Payload(PageBody::Markup(tag_page(&[
                &["全部形式", "电影"],
                &["全部类型", "喜剧"],
                &["全部地区", "美国", "英国", "法国"],
            ])));
        }
        if offset > 0 {
            return page("", 0);
        }
        // 美国, 英国, 法国 percent-encoded
        if url.contains("%E7%BE%8E%E5%9B%BD") {
            page("us", 3)
        } else if url.contains("%E8%8B%B1%E5%9B%BD") {
            page("uk", 2)
        } else {
            PageResult::Empty
        }
    }

    #[tokio::test]
    async fn test_run_uses_vocabulary_and_exports() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(FnSource::new(catalog));
        let service = HarvestService::with_source(config(&dir), Arc::clone(&source), CancellationToken::new())
            .with_pacer(Pacer::unpaced());

        let summary = service.run().await.unwrap();

        assert_eq!(summary.pairs_attempted, 3);
        assert_eq!(summary.pairs_failed, 0);
        assert_eq!(summary.records, 5);
        // vocabulary + (2 + 2 + 1)
        assert_eq!(source.calls().len(), 6);
        assert_eq!(summary.fetch_calls, 5);
        assert_eq!(summary.categories_ranked, 1);
        assert!(!summary.cancelled && !summary.deadline_hit);

        let report = std::fs::read_to_string(&summary.report_path).unwrap();
        assert_eq!(report, "喜剧 | 美国,英国 | 60.00,40.00\n");
        let csv = std::fs::read_to_string(&summary.records_path).unwrap();
        assert_eq!(csv.lines().count(), 5);
        assert!(csv.lines().all(|line| line.contains(",喜剧,")));
    }

    #[tokio::test]
    async fn test_configured_locations_skip_vocabulary() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.harvest.locations = Some(vec!["英国".to_string()]);
        config.harvest.top_n = 1;
        let source = Arc::new(FnSource::new(catalog));

        let output = HarvestService::with_source(config, Arc::clone(&source), CancellationToken::new())
            .with_pacer(Pacer::unpaced())
            .harvest()
            .await
            .unwrap();

        assert_eq!(output.locations, vec!["英国"]);
        assert!(source.calls().iter().all(|(url, _)| !url.contains("/tag/")));
        assert_eq!(output.report.records.len(), 2);
    }

    #[tokio::test]
    async fn test_categories_ranked_independently() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.harvest.categories = vec!["喜剧".to_string(), "恐怖".to_string()];
        config.harvest.locations = Some(vec!["美国".to_string(), "英国".to_string()]);

        let output = HarvestService::with_source(config, FnSource::new(catalog), CancellationToken::new())
            .with_pacer(Pacer::unpaced())
            .harvest()
            .await
            .unwrap();

        assert_eq!(output.report.pairs.len(), 4);
        for category in ["喜剧", "恐怖"] {
            let stats = output.rankings.get(category).unwrap().as_ref().unwrap();
            assert_eq!(stats.total_count, 5);
            assert_eq!(stats.ranking()[0].location, "美国");
        }
    }

    #[tokio::test]
    async fn test_insufficient_category_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.harvest.locations = Some(vec!["美国".to_string()]);

        let summary = HarvestService::with_source(config, FnSource::new(catalog), CancellationToken::new())
            .with_pacer(Pacer::unpaced())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.records, 3);
        assert_eq!(summary.categories_failed, 1);
        assert_eq!(summary.categories_ranked, 0);
        let report = std::fs::read_to_string(&summary.report_path).unwrap();
        assert_eq!(report, "喜剧 | insufficient data: 1 distinct locations, 2 required\n");
    }

    #[tokio::test]
    async fn test_vocabulary_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let service = HarvestService::with_source(
            config(&dir),
            FnSource::new(|_, _| PageResult::Empty),
            CancellationToken::new(),
        )
        .with_pacer(Pacer::unpaced());

        let result = service.run().await;
        assert!(matches!(result, Err(HarvestError::Vocabulary(VocabularyError::EmptyPage))));
    }

    #[tokio::test]
    async fn test_cancelled_run_still_exports() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.harvest.locations = Some(vec!["美国".to_string(), "英国".to_string()]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = HarvestService::with_source(config, FnSource::new(catalog), cancel)
            .with_pacer(Pacer::unpaced())
            .run()
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.records, 0);
        assert!(summary.records_path.exists());
        assert!(summary.report_path.exists());
    }

    #[tokio::test]
    async fn test_invalid_score_range_is_config_error() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.harvest.score_min = 9;
        config.harvest.score_max = 2;

        let result = HarvestService::with_source(config, FnSource::new(catalog), CancellationToken::new())
            .harvest()
            .await;
        assert!(matches!(result, Err(HarvestError::Config(_))));
    }
}
