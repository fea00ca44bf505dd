//! Extraction error types
//!
//! Every variant describes a mismatch between the expected and the actual
//! page structure. Callers recover from them as "zero records for this page".

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Container '{selector}' not found in page")]
    ContainerMissing { selector: String },

    #[error("Entry {index}: required field '{field}' not found")]
    FieldMissing { index: usize, field: &'static str },

    #[error("Entry {index}: field '{field}' has unexpected shape: {value:?}")]
    FieldShapeMismatch {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("Tag group {index} not found ({available} groups on page)")]
    TagGroupMissing { index: usize, available: usize },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid score pattern: {pattern} - {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

impl ExtractionError {
    pub(crate) fn missing(index: usize, field: &'static str) -> Self {
        Self::FieldMissing { index, field }
    }

    pub(crate) fn shape(index: usize, field: &'static str, value: impl Into<String>) -> Self {
        Self::FieldShapeMismatch {
            index,
            field,
            value: value.into(),
        }
    }

    /// Whether the upstream layout looks different from what the selectors expect
    pub fn is_layout_change(&self) -> bool {
        matches!(
            self,
            Self::FieldMissing { .. } | Self::FieldShapeMismatch { .. } | Self::TagGroupMissing { .. }
        )
    }
}
