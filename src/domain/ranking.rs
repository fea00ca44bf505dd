//! Category ranking aggregation
//!
//! Groups records by (category, location), ranks locations per category by
//! record count and expresses each count as a share of the category total.
//!
//! Ties keep the order in which locations were first encountered in the
//! record stream. Percentages are computed on integers in hundredths of a
//! percent and rounded half-up, so `45 / 200` is always `22.50`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use super::record::Record;

/// Ranking failure for a single category
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationError {
    #[error("Category '{category}' has {available} distinct locations, {required} required")]
    InsufficientData {
        category: String,
        required: usize,
        available: usize,
    },
}

/// Share of a total, stored in hundredths of a percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Percentage(u32);

impl Percentage {
    /// `100 * count / total`, rounded half-up to two decimals
    pub fn of(count: usize, total: usize) -> Self {
        if total == 0 {
            return Self(0);
        }
        let count = count as u128;
        let total = total as u128;
        let hundredths = (count * 20_000 + total) / (2 * total);
        Self(u32::try_from(hundredths).unwrap_or(u32::MAX))
    }

    pub fn hundredths(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Two-decimal fixed rendering used by the text report
pub fn format_percentage(percentage: Percentage) -> String {
    percentage.to_string()
}

/// Record count for one location inside a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCount {
    pub location: String,
    pub count: usize,
    pub percentage: Percentage,
}

/// Ranked location counts for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub total_count: usize,
    /// Every location, count descending
    pub locations: Vec<LocationCount>,
    top_n: usize,
}

impl CategoryStats {
    /// The top-N slice requested at aggregation time
    pub fn ranking(&self) -> &[LocationCount] {
        self.top(self.top_n)
    }

    /// First `min(n, distinct locations)` entries
    pub fn top(&self, n: usize) -> &[LocationCount] {
        &self.locations[..n.min(self.locations.len())]
    }

    pub fn distinct_locations(&self) -> usize {
        self.locations.len()
    }
}

/// Per-category outcomes in the order categories were requested
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rankings {
    entries: Vec<(String, Result<CategoryStats, AggregationError>)>,
}

impl Rankings {
    pub fn get(&self, category: &str) -> Option<&Result<CategoryStats, AggregationError>> {
        self.entries
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Result<CategoryStats, AggregationError>)> {
        self.entries.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AggregationError> {
        self.entries.iter().filter_map(|(_, outcome)| outcome.as_ref().err())
    }
}

/// Count every location of `category`, ranked, without the top-N check
pub fn category_stats(records: &[Record], category: &str, top_n: usize) -> CategoryStats {
    let mut order: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for record in records.iter().filter(|r| r.category == category) {
        match order.get(record.location.as_str()) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                order.insert(&record.location, counts.len());
                counts.push((&record.location, 1));
            }
        }
    }

    // stable: equal counts stay in first-encountered order
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let total_count = counts.iter().map(|(_, count)| count).sum();
    let locations = counts
        .into_iter()
        .map(|(location, count)| LocationCount {
            location: location.to_string(),
            count,
            percentage: Percentage::of(count, total_count),
        })
        .collect();

    CategoryStats {
        category: category.to_string(),
        total_count,
        locations,
        top_n,
    }
}

/// Rank locations for each requested category.
///
/// A category with fewer than `top_n` distinct locations yields
/// `InsufficientData`; the other categories are still ranked.
pub fn aggregate(records: &[Record], categories: &[String], top_n: usize) -> Rankings {
    let mut entries: Vec<(String, Result<CategoryStats, AggregationError>)> = Vec::new();

    for category in categories {
        if entries.iter().any(|(name, _)| name == category) {
            continue;
        }
        let stats = category_stats(records, category, top_n);
        let outcome = if stats.distinct_locations() < top_n {
            Err(AggregationError::InsufficientData {
                category: category.clone(),
                required: top_n,
                available: stats.distinct_locations(),
            })
        } else {
            Ok(stats)
        };
        entries.push((category.clone(), outcome));
    }

    Rankings { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn record(category: &str, location: &str) -> Record {
        Record {
            name: format!("{category}-{location}"),
            raw_score_text: "8.0".into(),
            location: location.into(),
            category: category.into(),
            info_link: String::new(),
            cover_link: String::new(),
        }
    }

    fn records_from(category: &str, counts: &[(&str, usize)]) -> Vec<Record> {
        counts
            .iter()
            .flat_map(|(location, n)| std::iter::repeat_with(|| record(category, location)).take(*n))
            .collect()
    }

    #[test]
    fn test_comedy_reference_ranking() {
        let records = records_from("Comedy", &[("UK", 30), ("US", 50), ("FR", 20)]);
        let rankings = aggregate(&records, &["Comedy".to_string()], 3);

        let stats = rankings.get("Comedy").unwrap().as_ref().unwrap();
        let ranking: Vec<(&str, usize, String)> = stats
            .ranking()
            .iter()
            .map(|l| (l.location.as_str(), l.count, l.percentage.to_string()))
            .collect();

        assert_eq!(
            ranking,
            vec![
                ("US", 50, "50.00".to_string()),
                ("UK", 30, "30.00".to_string()),
                ("FR", 20, "20.00".to_string()),
            ]
        );
        assert_eq!(stats.total_count, 100);
    }

    #[rstest]
    #[case(45, 200, "22.50")]
    #[case(1, 3, "33.33")]
    #[case(2, 3, "66.67")]
    #[case(1, 20_000, "0.01")]
    #[case(1, 40_000, "0.00")]
    #[case(7, 7, "100.00")]
    #[case(0, 0, "0.00")]
    fn test_percentage_rounding(#[case] count: usize, #[case] total: usize, #[case] expected: &str) {
        assert_eq!(format_percentage(Percentage::of(count, total)), expected);
    }

    #[test]
    fn test_ties_keep_first_encountered_location() {
        let mut records = records_from("Drama", &[("KR", 5)]);
        records.extend(records_from("Drama", &[("JP", 5), ("CN", 9), ("AU", 5)]));

        let stats = category_stats(&records, "Drama", 3);
        let order: Vec<&str> = stats.locations.iter().map(|l| l.location.as_str()).collect();
        assert_eq!(order, vec!["CN", "KR", "JP", "AU"]);
        assert_eq!(stats.ranking().len(), 3);
    }

    #[test]
    fn test_insufficient_data_does_not_block_other_categories() {
        let mut records = records_from("Comedy", &[("US", 3), ("UK", 2), ("FR", 1)]);
        records.extend(records_from("Horror", &[("US", 4), ("JP", 1)]));
        let categories = vec!["Horror".to_string(), "Comedy".to_string(), "Western".to_string()];

        let rankings = aggregate(&records, &categories, 3);

        assert_eq!(rankings.len(), 3);
        assert_eq!(
            rankings.get("Horror"),
            Some(&Err(AggregationError::InsufficientData {
                category: "Horror".into(),
                required: 3,
                available: 2,
            }))
        );
        assert!(rankings.get("Comedy").unwrap().is_ok());
        assert!(matches!(
            rankings.get("Western"),
            Some(Err(AggregationError::InsufficientData { available: 0, .. }))
        ));
        assert_eq!(rankings.failures().count(), 2);

        let order: Vec<&str> = rankings.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["Horror", "Comedy", "Western"]);
    }

    #[test]
    fn test_records_of_other_categories_are_ignored() {
        let mut records = records_from("Comedy", &[("US", 2), ("UK", 1), ("FR", 1)]);
        records.extend(records_from("Drama", &[("US", 10)]));
        let stats = category_stats(&records, "Comedy", 3);
        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.locations[0].count, 2);
    }

    #[test]
    fn test_duplicate_category_requests_collapse() {
        let records = records_from("Comedy", &[("US", 1)]);
        let categories = vec!["Comedy".to_string(), "Comedy".to_string()];
        let rankings = aggregate(&records, &categories, 1);
        assert_eq!(rankings.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_counts_sum_to_total_and_rank_descends(
            counts in proptest::collection::vec(1usize..60, 1..12),
            n in 1usize..6,
        ) {
            let names: Vec<String> = (0..counts.len()).map(|i| format!("L{i}")).collect();
            let pairs: Vec<(&str, usize)> = names.iter().map(String::as_str).zip(counts.iter().copied()).collect();
            let records = records_from("Cat", &pairs);

            let stats = category_stats(&records, "Cat", n);
            let sum: usize = stats.locations.iter().map(|l| l.count).sum();
            prop_assert_eq!(sum, stats.total_count);
            prop_assert_eq!(stats.top(n).len(), n.min(counts.len()));
            prop_assert!(stats.top(n).windows(2).all(|w| w[0].count >= w[1].count));

            let pct_sum: u32 = stats.top(n).iter().map(|l| l.percentage.hundredths()).sum();
            // each share rounds by at most half a hundredth
            prop_assert!(u64::from(pct_sum) <= 10_000 + stats.top(n).len() as u64 / 2);
            for l in stats.top(n) {
                let exact = (l.count as f64) * 100.0 / (stats.total_count as f64);
                prop_assert!((f64::from(l.percentage.hundredths()) / 100.0 - exact).abs() <= 0.005 + 1e-9);
            }
        }
    }
}
