//! Filtered query construction
//!
//! Builds the catalog search URL for a `FilterCriteria`. The catalog expects
//! printable ASCII unescaped, list and tuple values rendered the way a
//! Python `urlencode` would render them, and then the characters
//! `( ) [ ] + '` removed from the whole query. For example
//! `range=(0, 10)` becomes `range=0,10` and `tags=['a', 'b']` becomes
//! `tags=a,b`.
//!
//! Stripping and list-joining are lossy, so tag values that contain a
//! stripped character, a space, a comma or a query delimiter are rejected
//! with `EncodingAnomaly` instead of silently colliding with another value.
//! Values are never trimmed: `" US"` is rejected rather than sent as `US`.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt;
use thiserror::Error;

use crate::domain::{FilterCriteria, TagValue};

/// Characters removed from the encoded query
pub const STRIPPED_CHARS: [char; 6] = ['(', ')', '[', ']', '+', '\''];

/// Characters that would make two tag values encode identically or break the query
const AMBIGUOUS_CHARS: [char; 6] = [' ', ',', '&', '=', '#', '%'];

/// Pagination parameter appended after the filter parameters
pub const OFFSET_PARAM: &str = "start";

/// Everything outside printable ASCII is percent-encoded
const NON_PRINTABLE: &AsciiSet = CONTROLS;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Tag '{field}' value {value:?} cannot be encoded without colliding with another value")]
    EncodingAnomaly { field: &'static str, value: String },

    #[error("Required tag '{field}' is empty")]
    EmptyTag { field: &'static str },
}

/// A built query, ready for offset substitution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    prefix: String,
}

impl Query {
    /// Full URL for one page
    pub fn page_url(&self, offset: u32) -> String {
        format!("{}{}", self.prefix, offset)
    }

    /// URL with the offset placeholder left in place
    pub fn template(&self) -> String {
        format!("{}{{{}}}", self.prefix, OFFSET_PARAM)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template())
    }
}

/// Pure criteria → URL builder for one catalog endpoint
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_url: String,
    match_all_tag: String,
}

impl QueryBuilder {
    pub fn new(base_url: impl Into<String>, match_all_tag: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            match_all_tag: match_all_tag.into(),
        }
    }

    pub fn match_all_tag(&self) -> &str {
        &self.match_all_tag
    }

    /// Build the paginated query for `criteria`
    pub fn build(&self, criteria: &FilterCriteria) -> Result<Query, QueryError> {
        let tags = self.tag_list(criteria)?;
        let range = criteria.score_range;

        let params: [(&str, String); 5] = [
            ("sort", criteria.sort.code().to_string()),
            ("range", format!("({}, {})", range.min, range.max)),
            ("tags", python_list_repr(&tags)),
            ("playable", flag(criteria.playable)),
            ("unwatched", flag(criteria.unwatched)),
        ];

        let encoded = params
            .iter()
            .map(|(key, value)| format!("{}={}", quote_plus(key), quote_plus(value)))
            .collect::<Vec<_>>()
            .join("&");

        Ok(Query {
            prefix: format!("{}{}&{}=", self.base_url, strip_rejected(&encoded), OFFSET_PARAM),
        })
    }

    /// `[form, category, location, extra]` without empty slots
    fn tag_list<'a>(&'a self, criteria: &'a FilterCriteria) -> Result<Vec<&'a str>, QueryError> {
        let mut tags = Vec::with_capacity(4);

        if let Some(form) = optional_tag("form", criteria.form.as_deref())? {
            tags.push(form);
        }
        tags.push(self.required_tag("category", &criteria.category)?);
        tags.push(self.required_tag("location", &criteria.location)?);
        if let Some(extra) = optional_tag("extra_tag", criteria.extra_tag.as_deref())? {
            tags.push(extra);
        }
        Ok(tags)
    }

    fn required_tag<'a>(&'a self, field: &'static str, tag: &'a TagValue) -> Result<&'a str, QueryError> {
        match tag {
            TagValue::Any => Ok(&self.match_all_tag),
            TagValue::Named(value) if value.trim().is_empty() => Err(QueryError::EmptyTag { field }),
            TagValue::Named(value) => check_unambiguous(field, value).map(|()| value.as_str()),
        }
    }
}

fn optional_tag<'a>(field: &'static str, tag: Option<&'a str>) -> Result<Option<&'a str>, QueryError> {
    match tag.filter(|value| !value.trim().is_empty()) {
        Some(value) => check_unambiguous(field, value).map(|()| Some(value)),
        None => Ok(None),
    }
}

fn check_unambiguous(field: &'static str, value: &str) -> Result<(), QueryError> {
    if value
        .chars()
        .any(|c| STRIPPED_CHARS.contains(&c) || AMBIGUOUS_CHARS.contains(&c) || c.is_control())
    {
        return Err(QueryError::EncodingAnomaly {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn flag(on: bool) -> String {
    if on { "1".to_string() } else { String::new() }
}

/// `['a', 'b']`, the rendering the catalog's query format was derived from
fn python_list_repr(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{item}'")).collect();
    format!("[{}]", quoted.join(", "))
}

/// Space becomes `+`, printable ASCII passes through, everything else is `%XX`
fn quote_plus(value: &str) -> String {
    value
        .split(' ')
        .map(|part| utf8_percent_encode(part, NON_PRINTABLE).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// Remove every occurrence of `STRIPPED_CHARS`
pub fn strip_rejected(encoded: &str) -> String {
    encoded.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect()
}
