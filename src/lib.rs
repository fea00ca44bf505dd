//! Catalog Harvest - tag-filtered catalog crawler with category ranking reports
//!
//! Builds filtered search queries for a media catalog, walks every result
//! page of each (category, location) pair at a polite pace, extracts one
//! record per entry and ranks locations per category by record count.

pub mod application;
pub mod crawling;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_utils;
