//! SDK error types

use crate::operation::Status;
use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, LumeError>;

/// Errors surfaced by the Lume client
#[derive(Debug, Error)]
pub enum LumeError {
    /// The service answered with a non-2xx status
    #[error("Error response {status} for {method} {url}: {body}")]
    Http {
        method: String,
        url: String,
        status: StatusCode,
        body: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset...)
    #[error("Failed to send {method} {url}")]
    Request {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to create HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("Failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A required identifier or argument is missing; raised before any request
    #[error("Validation error: {0}")]
    Validation(String),

    /// A lookup over a fetched collection finished without a match
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    /// Polling did not reach a terminal status before the deadline
    #[error("Operation {id} timed out after {after:?} (last status: {last_status})")]
    Timeout {
        id: String,
        after: Duration,
        last_status: Status,
        /// Set when the deadline interrupted an in-flight status fetch
        #[source]
        source: Option<tokio::time::error::Elapsed>,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("No API key configured. Set LUME_API_KEY or pass --api-key")]
    MissingApiKey,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LumeError {
    /// Shorthand for a missing-id validation failure
    pub(crate) fn missing_id(record: &str, action: &str) -> Self {
        Self::Validation(format!("{} ID is required for {}.", record, action))
    }

    /// HTTP status of the failed response, if this is an HTTP error
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
