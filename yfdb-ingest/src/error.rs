//! Error types for yfdb-ingest

use crate::services::jquants_client::JQuantsError;
use crate::services::yahoo_client::YahooError;
use thiserror::Error;

/// Result alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Failure of one ingestion step
#[derive(Debug, Error)]
pub enum IngestError {
    /// Yahoo Finance request failed
    #[error("Yahoo Finance: {0}")]
    Yahoo(#[from] YahooError),

    /// J-Quants request failed
    #[error("J-Quants: {0}")]
    JQuants(#[from] JQuantsError),

    /// Database, configuration or other shared error
    #[error(transparent)]
    Common(#[from] yfdb_common::Error),

    /// Unknown dataset / schedule name or malformed symbol input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error (symbol files, sample output)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error (sample output)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        IngestError::Common(err.into())
    }
}
