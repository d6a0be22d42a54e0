//! Typed errors for the weather engine.
//!
//! Expected failures (unreachable provider, malformed data) are values,
//! never panics. The view state carries only the two-way classification
//! in [`ErrorKind`]; the richer enums below preserve context for logging.

use thiserror::Error;

/// Classification of a failure as carried in the view state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote source unreachable or returned a transport-level failure.
    DataProvider,
    /// Payload or stored record failed structural validation.
    DataConsistency,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::DataProvider => f.write_str("data provider unavailable"),
            ErrorKind::DataConsistency => f.write_str("data consistency failure"),
        }
    }
}

/// Transport-level errors from the remote weather API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("undecodable payload: {0}")]
    Decode(String),
}

/// Local storage errors. These are unexpected collaborator failures,
/// not part of the normal refresh outcome taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Repository-level error signalled by refresh and cache observation.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The remote source could not deliver a payload.
    #[error("weather provider failed: {0}")]
    Provider(#[source] ApiError),

    /// A payload or stored record violated the snapshot invariants.
    #[error("weather data failed validation: {0}")]
    Consistency(String),

    /// The storage collaborator misbehaved.
    #[error("weather storage failed: {0}")]
    Storage(#[from] StoreError),
}

impl WeatherError {
    /// Two-way classification for the view state.
    ///
    /// `Storage` reflects the locally persisted state rather than a failed
    /// remote attempt, so it classifies as a consistency problem.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::Provider(_) => ErrorKind::DataProvider,
            WeatherError::Consistency(_) | WeatherError::Storage(_) => ErrorKind::DataConsistency,
        }
    }
}
