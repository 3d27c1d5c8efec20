//! Configuration for the settlement domain

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Settlement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Payment methods accepted for validation (values the checkout
    /// provider reports, plus the manual back-office codes)
    pub allowed_methods: Vec<String>,

    /// Rounding tolerance between a declared amount and the contract's
    /// net-payable figure
    pub amount_tolerance: Decimal,

    /// Minimum transaction-reference length
    pub min_reference_len: usize,

    /// Maximum transaction-reference length
    pub max_reference_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_methods: ["WAVE-SN", "OM-SN", "FREE-SN", "CARD", "OM", "VIREMENT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            amount_tolerance: Decimal::new(1, 2), // 0.01
            min_reference_len: 6,
            max_reference_len: 64,
        }
    }
}

impl Config {
    /// Case-insensitive method membership
    pub fn method_allowed(&self, method: &str) -> bool {
        self.allowed_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
    }
}
