//! Error types for the CNVS scraper
//!
//! Errors only travel between internal layers. The public scraper operations
//! log them and degrade to empty or "not found" results. CnvsError implements
//! Serialize so the facade can embed it in JSON bodies.

use std::time::Duration;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for CNVS scraper operations
#[derive(Error, Debug)]
pub enum CnvsError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The request was abandoned because its cancellation token fired
    #[error("Request cancelled")]
    Cancelled,

    /// Failed to parse HTML content
    #[error("Failed to parse HTML: {0}")]
    ParseError(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The login exchange returned a non-success status
    #[error("Login rejected with status {0}")]
    AuthFailed(u16),
}

impl CnvsError {
    /// Whether this error came from the request timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            CnvsError::Timeout(_) => true,
            CnvsError::HttpError(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Serialize CnvsError as its display string
impl Serialize for CnvsError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for CNVS scraper operations
pub type Result<T> = std::result::Result<T, CnvsError>;
