//! Checkout gateway
//!
//! Integration with the hosted-checkout payment provider: charge
//! initiation and re-reads over its REST API, and the webhook receiver
//! that drives the settlement state machine when the apporteur's
//! payment lands.
//!
//! Charge-side failures are soft (the apporteur simply retries later);
//! the webhook fails closed: authentication, reference, amount and
//! state-machine guards all have to pass before anything is credited.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod client;
pub mod config;
pub mod webhook;

// Re-exports
pub use client::{CheckoutClient, CustomerInfo};
pub use config::Config;
pub use webhook::{WebhookProcessor, WebhookResponse};
