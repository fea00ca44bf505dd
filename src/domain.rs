//! Domain module - Core values and pure business logic
//!
//! Filter criteria, harvested records and the category ranking aggregation.
//! Nothing in here performs I/O.

pub mod filter;
pub mod ranking;
pub mod record;

pub use filter::{FilterCriteria, ScoreRange, SortMode, TagValue};
pub use ranking::{
    aggregate, category_stats, format_percentage, AggregationError, CategoryStats, LocationCount,
    Percentage, Rankings,
};
pub use record::{Record, RECORD_COLUMNS};
