//! Configuration for the checkout provider integration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Checkout provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider API base URL (no trailing slash)
    pub base_url: String,

    /// Public API key sent as `X-API-Key` on charge calls
    pub api_key: String,

    /// Shared secret the provider echoes in the webhook `X-API-Key`
    /// header
    pub webhook_secret: String,

    /// Prefix of the deterministic payment reference
    /// (`{prefix}_{settlement_id}`)
    pub payment_reference_prefix: String,

    /// ISO 4217 currency code. XOF has no minor unit, amounts are
    /// whole francs.
    pub currency: String,

    /// ISO country code sent with the charge
    pub country: String,

    /// Where the payer lands after a successful checkout
    pub success_redirect_url: String,

    /// Where the payer lands after a failed checkout
    pub error_redirect_url: String,

    /// Dialing prefix applied to local phone numbers
    pub phone_country_prefix: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://api.test.checkout.example".to_string(),
            api_key: String::new(),
            webhook_secret: String::new(),
            payment_reference_prefix: "BWPAY".to_string(),
            currency: "XOF".to_string(),
            country: "SN".to_string(),
            success_redirect_url: String::new(),
            error_redirect_url: String::new(),
            phone_country_prefix: "+221".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Config {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(url) = std::env::var("CHECKOUT_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(v) = std::env::var("CHECKOUT_API_KEY") {
            config.api_key = v;
        }
        if let Ok(v) = std::env::var("CHECKOUT_WEBHOOK_SECRET") {
            config.webhook_secret = v;
        }
        if let Ok(v) = std::env::var("CHECKOUT_SUCCESS_URL") {
            config.success_redirect_url = v;
        }
        if let Ok(v) = std::env::var("CHECKOUT_ERROR_URL") {
            config.error_redirect_url = v;
        }

        config
    }

    /// Deterministic payment reference for a settlement; the provider
    /// echoes it back in the webhook.
    pub fn payment_reference(&self, settlement_id: u64) -> String {
        format!("{}_{settlement_id}", self.payment_reference_prefix)
    }

    /// Settlement id encoded in a payment reference, when it carries
    /// our prefix.
    pub fn parse_payment_reference(&self, reference: &str) -> Option<u64> {
        reference
            .strip_prefix(&format!("{}_", self.payment_reference_prefix))?
            .parse()
            .ok()
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
