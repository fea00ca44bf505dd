//! Infrastructure layer: configuration, logging, HTTP transport, query
//! construction, page parsing and export

pub mod config;
pub mod export;
pub mod http_client;
pub mod logging;
pub mod page_fetcher;
pub mod parsing;
pub mod query_builder;

pub use config::{AppConfig, ConfigError};
pub use export::{export_records, export_report, render_report, ExportError};
pub use http_client::{HttpClient, HttpClientConfig, HttpResponse, Transport, TransportError};
pub use logging::{init_logging, log_system_info};
pub use page_fetcher::{classify_body, PageBody, PageFetcher, PageResult, PageSource};
pub use parsing::{ExtractionError, ExtractionSelectors, RecordExtractor, VocabularyParser};
pub use query_builder::{Query, QueryBuilder, QueryError};
