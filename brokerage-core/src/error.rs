//! Error types for the brokerage domain

use crate::contract::ContractStatus;
use thiserror::Error;

/// Result type for domain operations
pub type Result<T> = std::result::Result<T, Error>;

/// Domain errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Plate does not match any known registration format
    #[error("invalid plate format: '{input}'")]
    InvalidFormat {
        /// Raw input as supplied by the caller
        input: String,
    },

    /// Caller input malformed
    #[error("validation error: {0}")]
    Validation(String),

    /// Contract status transition refused by a guard
    #[error("invalid contract transition {from:?} -> {to:?}: {reason}")]
    InvalidTransition {
        /// Current status
        from: ContractStatus,
        /// Requested status
        to: ContractStatus,
        /// Guard that refused the transition
        reason: String,
    },
}
