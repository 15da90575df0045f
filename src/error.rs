//! Headliner error types

use std::time::Duration;

/// Headliner error types
#[derive(Debug, thiserror::Error)]
pub enum HeadlinerError {
    // Request errors
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    // Streaming errors
    #[error("stream error: {0}")]
    Stream(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HeadlinerError {
    /// Whether this error came from the upstream completion provider.
    ///
    /// Provider errors are terminal for the request that hit them: nothing is
    /// cached and no retry is attempted.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            HeadlinerError::Http(_)
                | HeadlinerError::Api { .. }
                | HeadlinerError::RateLimited { .. }
                | HeadlinerError::AuthenticationFailed
                | HeadlinerError::Stream(_)
                | HeadlinerError::Json(_)
        )
    }

    /// Map a non-success upstream status to an error.
    pub(crate) fn from_status(status: u16, retry_after: Option<Duration>, body: String) -> Self {
        match status {
            401 | 403 => HeadlinerError::AuthenticationFailed,
            429 => HeadlinerError::RateLimited { retry_after },
            _ => HeadlinerError::Api {
                status,
                message: body,
            },
        }
    }
}

impl From<reqwest::Error> for HeadlinerError {
    fn from(err: reqwest::Error) -> Self {
        HeadlinerError::Http(err.to_string())
    }
}

/// Result type alias for Headliner operations
pub type Result<T> = std::result::Result<T, HeadlinerError>;
