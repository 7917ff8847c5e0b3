//! Error types for the Observatory client.

use crate::record::ScanRecord;
use observatory_core::{ConfigError, InvalidSite};
use thiserror::Error;

/// Errors that can occur while talking to the scanning service.
#[derive(Error, Debug)]
pub enum ObservatoryError {
    /// Bad caller input, rejected before any network call
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The request could not be constructed
    #[error("malformed request: {0}")]
    Construction(String),

    /// Network failure (connection refused, timeout, DNS)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any response status other than 200
    #[error("unexpected HTTP status {status}: {body}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The service reported an error inside a 200 response
    #[error("API error: {body}")]
    Api {
        /// Raw response body
        body: String,
    },

    /// The service finished the scan in the FAILED state
    #[error("scan {} for {} failed", record.scan_id, site)]
    ScanFailed {
        /// Site that was scanned
        site: String,
        /// Partial record as reported by the service
        record: Box<ScanRecord>,
    },

    /// The scan was still pending after the whole retry budget
    #[error("retries exceeded after {attempts} polls, last payload: {last_payload}")]
    RetriesExhausted {
        /// Number of polls issued
        attempts: u32,
        /// Raw body of the last poll
        last_payload: String,
    },

    /// Response body is not the JSON shape we expect
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A finished scan came back without a usable scan id
    #[error("no valid scan id for {site}")]
    MissingScanId {
        /// Site that was resolved
        site: String,
    },

    /// Polling was cancelled by the caller
    #[error("scan polling cancelled")]
    Cancelled,

    /// Invalid client configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<InvalidSite> for ObservatoryError {
    fn from(err: InvalidSite) -> Self {
        Self::InvalidInput(err.reason)
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ObservatoryError>;
