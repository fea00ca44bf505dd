//! Crawling: request pacing and the paginated crawl driver

pub mod driver;
pub mod politeness;

pub use driver::{filter_pairs, CrawlDriver, CrawlSettings, CrawlState, HarvestReport, PairOutcome, StopReason};
pub use politeness::Pacer;
