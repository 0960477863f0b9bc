//! Engine error taxonomy.

use std::path::PathBuf;

use codesearch_core::trigram::TrigramError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the search engine facade.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The query pattern is not a valid regular expression. Not retried.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// The search request failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The repository locator is empty or malformed.
    #[error("invalid repository locator: {0:?}")]
    InvalidLocator(String),

    /// The repository root could not be opened. Fatal to that `add`.
    #[error("repository {locator} unavailable: {source}")]
    SourceUnavailable {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    /// Content store failure.
    #[error("content store error: {0}")]
    Store(#[from] StoreError),

    /// Build, merge or publish failed; the previous segment is untouched.
    #[error("segment merge failed: {0}")]
    MergeFailure(#[source] TrigramError),

    /// A segment file could not be opened or failed validation.
    #[error("segment {path} unreadable: {source}")]
    Index {
        path: PathBuf,
        #[source]
        source: TrigramError,
    },

    /// The search was cancelled or ran past its deadline.
    #[error("search cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Map a pattern compilation failure into `InvalidPattern`.
    pub(crate) fn pattern(err: TrigramError) -> Self {
        match err {
            TrigramError::InvalidPattern(msg) => EngineError::InvalidPattern(msg),
            other => EngineError::InvalidPattern(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
