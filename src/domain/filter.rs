//! Filter criteria value objects
//!
//! A `FilterCriteria` is built once per (category, location) pair and passed
//! by reference through the whole pipeline. Nothing mutates it after
//! construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result ordering requested from the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Most popular first (`T`)
    #[default]
    Popularity,
    /// Most recent first (`R`)
    Recency,
    /// Highest score first (`S`)
    Score,
}

impl SortMode {
    /// Single-letter code the catalog expects in the `sort` parameter
    pub fn code(self) -> &'static str {
        match self {
            Self::Popularity => "T",
            Self::Recency => "R",
            Self::Score => "S",
        }
    }
}

/// Inclusive score bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: u8,
    pub max: u8,
}

impl ScoreRange {
    pub const FULL: Self = Self { min: 0, max: 10 };

    pub fn new(min: u8, max: u8) -> Option<Self> {
        (min <= max && max <= Self::FULL.max).then_some(Self { min, max })
    }
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// A tag slot that either names a vocabulary value or matches everything
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagValue {
    Named(String),
    /// Rendered as the site's match-all sentinel
    Any,
}

impl TagValue {
    pub fn named(value: impl Into<String>) -> Self {
        Self::Named(value.into())
    }

    /// Label copied onto harvested records
    pub fn label<'a>(&'a self, match_all: &'a str) -> &'a str {
        match self {
            Self::Named(value) => value,
            Self::Any => match_all,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(value) => f.write_str(value),
            Self::Any => f.write_str("*"),
        }
    }
}

/// Typed filter for one catalog query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub form: Option<String>,
    pub category: TagValue,
    pub location: TagValue,
    pub extra_tag: Option<String>,
    pub score_range: ScoreRange,
    pub sort: SortMode,
    pub playable: bool,
    pub unwatched: bool,
}

impl FilterCriteria {
    pub fn new(category: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            form: None,
            category: TagValue::named(category),
            location: TagValue::named(location),
            extra_tag: None,
            score_range: ScoreRange::FULL,
            sort: SortMode::default(),
            playable: false,
            unwatched: false,
        }
    }

    /// Query that matches every category and location, used to read the tag vocabulary
    pub fn match_all() -> Self {
        Self {
            category: TagValue::Any,
            location: TagValue::Any,
            ..Self::new("", "")
        }
    }

    pub fn with_form(mut self, form: impl Into<String>) -> Self {
        self.form = Some(form.into());
        self
    }

    pub fn with_extra_tag(mut self, tag: impl Into<String>) -> Self {
        self.extra_tag = Some(tag.into());
        self
    }

    pub fn with_score_range(mut self, range: ScoreRange) -> Self {
        self.score_range = range;
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_playable(mut self, playable: bool) -> Self {
        self.playable = playable;
        self
    }

    pub fn with_unwatched(mut self, unwatched: bool) -> Self {
        self.unwatched = unwatched;
        self
    }

    /// Same filter with both the category and location slots set to match-all
    pub fn for_any(&self) -> Self {
        Self {
            category: TagValue::Any,
            location: TagValue::Any,
            ..self.clone()
        }
    }

    /// Same filter, different (category, location) pair
    pub fn for_pair(&self, category: &str, location: &str) -> Self {
        Self {
            category: TagValue::named(category),
            location: TagValue::named(location),
            ..self.clone()
        }
    }
}

impl fmt::Display for FilterCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.location)
    }
}
