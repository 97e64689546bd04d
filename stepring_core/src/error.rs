//! Error types for the stepring_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for stepring_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Target outside the configured picker options
    #[error("{0} steps is not an available daily target")]
    InvalidTarget(u64),

    /// Sample store error
    #[error("Store error: {0}")]
    Store(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Failure of the authorization handshake with a health-data store.
///
/// Never fatal: the controller logs it and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("authorization store unavailable: {0}")]
    Unavailable(String),

    #[error("authorization request failed: {0}")]
    Failed(String),
}

/// Failure of a daily step-sum query.
///
/// The dashboard maps every variant to a step count of zero.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("health store unavailable: {0}")]
    Unavailable(String),

    #[error("not authorized to read step count")]
    NotAuthorized,

    #[error("step query timed out after {0} ms")]
    TimedOut(u64),

    #[error("step query cancelled")]
    Cancelled,

    #[error("step query failed: {0}")]
    Failed(String),
}

impl From<Error> for QueryError {
    fn from(err: Error) -> Self {
        QueryError::Failed(err.to_string())
    }
}

impl From<Error> for AuthorizationError {
    fn from(err: Error) -> Self {
        AuthorizationError::Failed(err.to_string())
    }
}
