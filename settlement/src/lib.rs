//! Broker settlement engine
//!
//! Tracks the amount each apporteur owes the company after a contract is
//! issued, from creation through payment validation or cancellation.
//!
//! # State machine
//!
//! ```text
//! EN_ATTENTE ──mark_paid──▶ PAYE        (terminal)
//!     │
//!     └───────cancel──────▶ ANNULE      (terminal, idempotent)
//! ```
//!
//! Paid settlements can never be cancelled. Every transition appends an
//! immutable audit entry, committed atomically with the state change
//! under the settlement's row lock; the lock is what keeps two
//! concurrent webhook deliveries from crediting the same settlement
//! twice.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod store;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use store::{RowGuard, SettlementStore};
pub use types::{HistoryAction, HistoryEntry, Settlement, SettlementStatus};
