//! Error types for quakedash.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur in quakedash operations.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Backend returned an error status
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Backend answered with an application-level `{ "error": ... }` payload
    #[error("{0}")]
    Backend(String),

    /// Input rejected before any request was sent
    #[error("{0}")]
    Validation(String),

    /// Local state file could not be read or written
    #[error("state storage failed: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl DashboardError {
    /// Whether the failure happened below the application layer
    /// (network, status code, undecodable body).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Parse(_) | Self::Api { .. } | Self::InvalidResponse(_)
        )
    }
}
