//! Configuration infrastructure
//!
//! Contains configuration loading and validation for catalog harvesting.
//!
//! Configuration is organized into sections:
//! 1. `catalog` - target endpoint, user-agent pool and markup selectors
//! 2. `crawling` - pagination, politeness, retry and timeout controls
//! 3. `harvest` - which filter pairs to harvest and how to rank them
//! 4. `output` - export destinations
//! 5. `logging` - log level and sinks
//!
//! Values are layered: built-in defaults, then `config/default.*` if present,
//! then an explicit file, then `CATALOG_HARVEST_*` environment variables
//! (nested keys separated by `__`, e.g. `CATALOG_HARVEST_CRAWLING__PAGE_SIZE`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::domain::{FilterCriteria, ScoreRange, SortMode};
use crate::infrastructure::parsing::ExtractionSelectors;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub crawling: CrawlingConfig,
    pub harvest: HarvestConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Target catalog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Search endpoint, query string is appended directly
    pub base_url: String,

    /// Tag browsing page whose control region lists the filter vocabulary
    pub vocabulary_base_url: String,

    /// Tag the site treats as "no restriction" for a tag slot
    pub match_all_tag: String,

    /// Pool to draw the User-Agent header from (once per fetcher)
    pub user_agents: Vec<String>,

    /// Markup selectors for entry and vocabulary extraction
    pub selectors: ExtractionSelectors,
}

/// Pagination and request pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlingConfig {
    /// Offset increment per page
    pub page_size: u32,

    /// Minimum spacing between two requests to the catalog host
    pub politeness_delay_ms: u64,

    /// Per-request timeout
    pub request_timeout_seconds: u64,

    /// Extra attempts for an offset whose fetch failed
    pub max_retries_per_offset: u32,

    /// Hard ceiling on pages fetched for one filter pair
    pub max_pages_per_pair: u32,

    /// Overall harvest deadline (none = unbounded)
    pub harvest_deadline_seconds: Option<u64>,
}

/// Which filter pairs to harvest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Media type tag (movie, series, ...)
    pub form: Option<String>,

    /// Categories to harvest and rank
    pub categories: Vec<String>,

    /// Locations to harvest; queried from the catalog when absent
    pub locations: Option<Vec<String>>,

    /// Additional tag every result must carry
    pub extra_tag: Option<String>,

    pub score_min: u8,
    pub score_max: u8,
    pub sort: SortMode,
    pub playable: bool,
    pub unwatched: bool,

    /// Locations kept per category in the ranking
    pub top_n: usize,
}

/// Export destinations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub records_path: PathBuf,
    pub report_path: PathBuf,
    pub include_headers: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs (file output only)
    pub json_format: bool,

    /// Enable console output (stderr)
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for the log file
    pub directory: PathBuf,

    /// Log file name inside `directory`
    pub file_name: String,
}

/// Default values
pub mod defaults {
    /// Search endpoint of the reference catalog
    pub const BASE_URL: &str = "https://movie.douban.com/j/new_search_subjects?";

    /// Tag browsing page of the reference catalog
    pub const VOCABULARY_BASE_URL: &str = "https://movie.douban.com/tag/#/?";

    /// Match-all tag of the reference catalog
    pub const MATCH_ALL_TAG: &str = "全部";

    /// Default media type
    pub const FORM: &str = "电影";

    /// Entries per page
    pub const PAGE_SIZE: u32 = 20;

    /// Delay between requests in milliseconds
    pub const POLITENESS_DELAY_MS: u64 = 5000;

    /// Timeout for HTTP requests in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Retry attempts per failed offset
    pub const MAX_RETRIES_PER_OFFSET: u32 = 1;

    /// Page ceiling per filter pair
    pub const MAX_PAGES_PER_PAIR: u32 = 500;

    /// Locations per category in the ranking
    pub const TOP_N: usize = 3;

    /// Base configuration file (extension resolved by the config crate)
    pub const CONFIG_BASE: &str = "config/default";

    /// Environment variable prefix
    pub const ENV_PREFIX: &str = "CATALOG_HARVEST";

    pub const USER_AGENTS: &[&str] = &[
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    ];
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            vocabulary_base_url: defaults::VOCABULARY_BASE_URL.to_string(),
            match_all_tag: defaults::MATCH_ALL_TAG.to_string(),
            user_agents: defaults::USER_AGENTS.iter().map(|ua| (*ua).to_string()).collect(),
            selectors: ExtractionSelectors::default(),
        }
    }
}

impl Default for CrawlingConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::PAGE_SIZE,
            politeness_delay_ms: defaults::POLITENESS_DELAY_MS,
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_retries_per_offset: defaults::MAX_RETRIES_PER_OFFSET,
            max_pages_per_pair: defaults::MAX_PAGES_PER_PAIR,
            harvest_deadline_seconds: None,
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            form: Some(defaults::FORM.to_string()),
            categories: vec!["剧情".to_string(), "喜剧".to_string(), "动作".to_string()],
            locations: None,
            extra_tag: None,
            score_min: ScoreRange::FULL.min,
            score_max: ScoreRange::FULL.max,
            sort: SortMode::Popularity,
            playable: false,
            unwatched: false,
            top_n: defaults::TOP_N,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from("records.csv"),
            report_path: PathBuf::from("ranking.txt"),
            include_headers: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            directory: PathBuf::from("logs"),
            file_name: "catalog-harvest.log".to_string(),
        }
    }
}

impl CrawlingConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn harvest_deadline(&self) -> Option<Duration> {
        self.harvest_deadline_seconds.map(Duration::from_secs)
    }
}

impl HarvestConfig {
    /// Filter shared by every harvested pair; category/location are filled per pair
    pub fn base_criteria(&self) -> Result<FilterCriteria, ConfigError> {
        let range = ScoreRange::new(self.score_min, self.score_max).ok_or_else(|| {
            ConfigError::validation(format!(
                "score range {}..={} must be ordered and within 0..=10",
                self.score_min, self.score_max
            ))
        })?;

        let mut criteria = FilterCriteria::match_all()
            .with_score_range(range)
            .with_sort(self.sort)
            .with_playable(self.playable)
            .with_unwatched(self.unwatched);
        if let Some(form) = &self.form {
            criteria = criteria.with_form(form);
        }
        if let Some(extra) = &self.extra_tag {
            criteria = criteria.with_extra_tag(extra);
        }
        Ok(criteria)
    }
}

impl AppConfig {
    /// Load layered configuration, optionally with an explicit file on top
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(defaults::CONFIG_BASE).required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("harvest.categories")
                    .with_list_parse_key("harvest.locations")
                    .with_list_parse_key("catalog.user_agents"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;

        info!(
            "Configuration loaded: {} categories, page size {}, delay {}ms",
            config.harvest.categories.len(),
            config.crawling.page_size,
            config.crawling.politeness_delay_ms
        );
        Ok(config)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(ConfigError::validation("catalog.user_agents must contain at least one entry"));
        }

        for (key, value) in [
            ("catalog.base_url", &self.catalog.base_url),
            ("catalog.vocabulary_base_url", &self.catalog.vocabulary_base_url),
        ] {
            if url::Url::parse(value).is_err() {
                return Err(ConfigError::validation(format!("{key} is not a valid URL: {value}")));
            }
        }

        if self.catalog.match_all_tag.trim().is_empty() {
            return Err(ConfigError::validation("catalog.match_all_tag must not be empty"));
        }

        self.catalog
            .selectors
            .validate()
            .map_err(|e| ConfigError::validation(e.to_string()))?;

        if self.crawling.page_size == 0 {
            return Err(ConfigError::validation("crawling.page_size must be greater than 0"));
        }

        if self.crawling.max_pages_per_pair == 0 {
            return Err(ConfigError::validation("crawling.max_pages_per_pair must be greater than 0"));
        }

        if self.crawling.request_timeout_seconds == 0 {
            return Err(ConfigError::validation("crawling.request_timeout_seconds must be greater than 0"));
        }

        if self.harvest.top_n == 0 {
            return Err(ConfigError::validation("harvest.top_n must be greater than 0"));
        }

        if self.harvest.categories.is_empty() {
            return Err(ConfigError::validation("harvest.categories must not be empty"));
        }

        self.harvest.base_criteria()?;

        if !self.logging.console_output && !self.logging.file_output {
            return Err(ConfigError::validation("No logging output configured"));
        }

        Ok(())
    }
}
