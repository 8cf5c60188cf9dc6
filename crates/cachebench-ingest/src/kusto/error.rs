//! Error types for the warehouse REST client.

use cachebench_core::IngestionStage;
use thiserror::Error;

/// Result type alias for REST client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for REST client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("warehouse returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Response(String),
    /// An endpoint could not be built.
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl Error {
    /// Converts into a cachebench error attributed to `stage`.
    pub fn into_core(self, stage: IngestionStage) -> cachebench_core::Error {
        match self {
            Self::Endpoint(e) => cachebench_core::Error::configuration(e.to_string()),
            Self::Reqwest(e) if e.is_timeout() => {
                cachebench_core::Error::ingestion(stage, format!("request timed out: {e}"))
            }
            other => cachebench_core::Error::ingestion(stage, other.to_string()),
        }
    }
}
