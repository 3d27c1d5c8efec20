//! Error types for broker settlements

use crate::types::SettlementStatus;
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// State-machine guard refused the transition
    #[error("invalid settlement transition from {from:?}: {reason}")]
    InvalidTransition {
        /// Status the settlement was in
        from: SettlementStatus,
        /// Guard that refused
        reason: String,
    },

    /// Explicit amount disagrees with the contract's net-payable figure
    #[error("amount mismatch: expected {expected}, got {actual}")]
    AmountMismatch {
        /// Amount derived from the contract
        expected: Decimal,
        /// Amount supplied
        actual: Decimal,
    },

    /// Transaction reference failed validation
    #[error("invalid transaction reference: {0}")]
    InvalidReference(String),

    /// Payment method not in the configured set
    #[error("unknown payment method: {0}")]
    UnknownMethod(String),

    /// No settlement under this id
    #[error("settlement {0} not found")]
    NotFound(u64),

    /// Contract cannot carry a settlement
    #[error("contract not eligible for settlement: {0}")]
    NotEligible(String),
}
