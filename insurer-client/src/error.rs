//! Error types for the insurer API client
//!
//! Transport failures, HTTP-layer failures and provider business errors
//! are distinct variants so callers can branch on kind: only transport
//! and 5xx failures are ever retried, business errors never are.

use thiserror::Error;

/// Result type for insurer API operations
pub type Result<T> = std::result::Result<T, Error>;

/// Insurer API client errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller input malformed (missing field, bad date, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// Plate normalization failure
    #[error(transparent)]
    Plate(#[from] brokerage_core::Error),

    /// Network-level failure (timeout, connection) after any retries
    #[error("transport error on {endpoint}: {source}")]
    Transport {
        /// Endpoint path
        endpoint: String,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx HTTP status after retries exhausted
    #[error("HTTP {status} from insurer: {body_preview}")]
    Http {
        /// HTTP status code
        status: u16,
        /// First bytes of the response body
        body_preview: String,
    },

    /// Response body was not valid JSON
    #[error("invalid (non-JSON) insurer response on {endpoint}")]
    InvalidResponse {
        /// Endpoint path
        endpoint: String,
    },

    /// Provider explicitly signaled a business failure; never retried,
    /// provider message preserved verbatim for display
    #[error("insurer business error: {message}")]
    Business {
        /// Provider message
        message: String,
    },

    /// Creation call succeeded at the HTTP layer but the response is
    /// missing the identifiers that prove it worked
    #[error("issuance failed: {message}")]
    IssuanceFailed {
        /// Provider message when present
        message: String,
    },
}

impl Error {
    /// Business errors surface the provider message and must never be
    /// retried.
    pub fn is_business(&self) -> bool {
        matches!(self, Error::Business { .. })
    }
}
