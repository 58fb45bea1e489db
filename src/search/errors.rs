//! # Search Errors

use thiserror::Error;

use crate::database::DbError;

/// Result type for filter parsing and evaluation
pub type FilterResult<T> = Result<T, FilterError>;

/// Result type for a namespace search
pub type SearchResult<T> = Result<T, SearchError>;

/// Filter expression failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Expression does not parse
    #[error("invalid filter at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Expression failed while running against a document
    #[error("{0}")]
    Eval(String),
}

impl FilterError {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        FilterError::Parse {
            position,
            message: message.into(),
        }
    }

    pub fn eval(message: impl Into<String>) -> Self {
        FilterError::Eval(message.into())
    }
}

/// Search failures
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// Filter did not parse; nothing was read
    #[error("{0}")]
    InvalidFilter(FilterError),

    /// Storage failure fetching the namespace
    #[error("{0}")]
    Storage(#[from] DbError),

    /// A stored value is not JSON
    #[error("item '{key}' is not valid JSON: {message}")]
    InvalidDocument { key: String, message: String },

    /// Filter failed on one document; the whole search is aborted
    #[error("filter failed on item '{key}': {source}")]
    Evaluation { key: String, source: FilterError },
}
