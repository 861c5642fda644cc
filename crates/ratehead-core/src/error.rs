use thiserror::Error;

/// Failure reported by an embedding service call.
///
/// Only `RateLimited` is transient; every other variant aborts the fetch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("rate limited by embedding service")]
    RateLimited,

    #[error("embedding request failed ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("embedding transport error: {0}")]
    Transport(String),

    #[error("malformed embedding response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV must have column '{column}'. Found: {available:?}")]
    MissingColumn { column: String, available: Vec<String> },

    #[error("Set GEMINI_API_KEY (or GOOGLE_API_KEY) in the environment")]
    MissingCredential,

    #[error("No rows left after loading CSV")]
    EmptyDataset,

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Empty embedding for row {row}")]
    EmptyEmbedding { row: usize },

    #[error("Embedding for row {row} has dimension {actual}, expected {expected}")]
    DimensionMismatch { row: usize, expected: usize, actual: usize },

    #[error("Empty {0} partition")]
    EmptyPartition(&'static str),

    #[error("Invalid head weights: {0}")]
    InvalidHead(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] arrow_schema::ArrowError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
