//! HTML/JSON parsing infrastructure for catalog pages
//!
//! Two extractors share one selector configuration: `RecordExtractor` reads
//! catalog entries, `VocabularyParser` reads the tag values offered by the
//! filter control region.

pub mod config;
pub mod error;
pub mod record_parser;
pub mod vocabulary_parser;

// Re-export public types
pub use config::{ExtractionSelectors, JsonFields};
pub use error::{ExtractionError, ExtractionResult};
pub use record_parser::RecordExtractor;
pub use vocabulary_parser::VocabularyParser;
