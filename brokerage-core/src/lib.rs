//! Brokerage domain core
//!
//! Pure domain types for the auto-insurance brokerage: vehicle-plate
//! normalization, the contract model with its status lifecycle, and
//! commission arithmetic. No I/O lives in this crate; the insurer and
//! checkout integrations build on top of it.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod commission;
pub mod contract;
pub mod error;
pub mod plate;

// Re-exports
pub use commission::{BrokerGrade, BrokerRole, CommissionBreakdown, CommissionSchedule};
pub use contract::{Contract, ContractStatus, DocumentLinks, PremiumBreakdown};
pub use error::{Error, Result};
pub use plate::{CanonicalPlate, PlateFormat};
