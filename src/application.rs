//! Application layer
//!
//! The harvest use case that orchestrates crawling, aggregation and export.

pub mod harvest;
pub mod vocabulary;

pub use harvest::{HarvestError, HarvestOutput, HarvestService, HarvestSummary};
pub use vocabulary::{VocabularyError, VocabularySource};
