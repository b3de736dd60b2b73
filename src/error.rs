//! Error types and result definitions
//!
//! Per-record and per-call failures have their own enums in the extraction modules
//! ([`RecordValidationError`](crate::extraction::validator::RecordValidationError),
//! [`FetchError`](crate::extraction::fetcher::FetchError)); they are absorbed inside the
//! pipeline. Only what escapes a whole operation is expressed as [`Error`].

use std::path::PathBuf;

use thiserror::Error;

use crate::extraction::fetcher::FetchError;

/// Result type alias for Causeway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Causeway
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization failed outside of response decoding
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A node or edge table is missing a column or holds an unusable row
    #[error("Malformed table {}: {message}", path.display())]
    Table { path: PathBuf, message: String },

    /// HTTP client could not be constructed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Checkpoint missing or unreadable
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// The retry budget ran out at the top of the pipeline. The state accumulated up to
    /// `offset` was written to `checkpoint` (when checkpointing is configured).
    #[error("Fatal fetch error at offset {offset} after {attempts} attempts: {source}")]
    FatalFetch {
        offset: u64,
        attempts: u32,
        checkpoint: Option<PathBuf>,
        #[source]
        source: FetchError,
    },

    /// A uniqueness constraint of the graph store was violated
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}
