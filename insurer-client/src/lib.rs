//! Insurer API client
//!
//! All network communication with the national insurer's REST-like API:
//! tariff simulation, policyholder creation, contract issuance and
//! renewal, reference data, and invoice documents.
//!
//! # Issuance idempotency
//!
//! Issuing a policy must never be blindly retried. The client instead
//! derives candidate invoice numbers from the capture id supplied at
//! simulation time, probes for an existing contract before issuing, and
//! re-probes after an ambiguous failure, so a policy is issued at most
//! once even when the network drops mid-call.
//!
//! # Example
//!
//! ```no_run
//! use insurer_client::{Config, InsurerClient};
//!
//! #[tokio::main]
//! async fn main() -> insurer_client::Result<()> {
//!     let client = InsurerClient::new(Config::from_env())?;
//!     let makes = client.get_makes().await;
//!     println!("{} makes", makes.len());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod client;
pub mod config;
pub mod documents;
pub mod error;
pub mod issuance;
pub mod policyholder;
pub mod redact;
pub mod referentials;
pub mod simulation;

// Re-exports
pub use client::InsurerClient;
pub use config::Config;
pub use error::{Error, Result};
pub use issuance::{ContractIssued, IssueContractRequest};
pub use policyholder::PolicyholderInfo;
pub use simulation::{GuaranteeFlags, SimulationQuote, VehicleRating};
