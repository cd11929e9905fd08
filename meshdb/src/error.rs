//! Error types for meshdb operations.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Refusing to touch path not owned by the index: {0}")]
    InvalidPath(PathBuf),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Fetch error: {0}")]
    Fetch(String),
}

/// Failures raised by the filter and selector tokenizers/parsers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("imbalanced parenthesis detected")]
    ImbalancedParens,

    #[error("expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
    },

    #[error("parser did not run to completion, tokens were not fully consumed (next: {0})")]
    TrailingTokens(String),

    #[error("invalid slice bound: {0}")]
    InvalidBound(String),
}

impl SyntaxError {
    pub(crate) fn unexpected(expected: &'static str, found: impl Into<String>) -> Self {
        Self::Unexpected {
            expected,
            found: found.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
