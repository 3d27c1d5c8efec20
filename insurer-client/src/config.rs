//! Configuration for the insurer API client

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Insurer API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API base URL (no trailing slash)
    pub base_url: String,

    /// `appClient` header value identifying this integration
    pub app_client: String,

    /// Point-of-sale code used for client creation
    pub pv_code: String,

    /// Branch code used for referential lookups
    pub br_code: String,

    /// Default request timeout in seconds
    pub timeout_secs: u64,

    /// Issuance/renewal timeout in seconds (long: the provider rates and
    /// issues synchronously)
    pub issuance_timeout_secs: u64,

    /// Light JSON probe timeout in seconds (existence checks)
    pub probe_timeout_secs: u64,

    /// Default retry count for idempotent GETs
    pub max_retries: u32,

    /// Existence-probe attempts after a failed issuance
    pub recovery_attempts: u32,

    /// Pause between recovery probes in seconds
    pub recovery_pause_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://api.insurer.example".to_string(),
            app_client: String::new(),
            pv_code: String::new(),
            br_code: String::new(),
            timeout_secs: 30,
            issuance_timeout_secs: 90,
            probe_timeout_secs: 15,
            max_retries: 2,
            recovery_attempts: 3,
            recovery_pause_secs: 5,
        }
    }
}

impl Config {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::Error::Validation(format!("failed to read config: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| crate::error::Error::Validation(format!("failed to parse config: {e}")))
    }

    /// Load from environment variables
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(url) = std::env::var("INSURER_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(v) = std::env::var("INSURER_APP_CLIENT") {
            config.app_client = v;
        }
        if let Ok(v) = std::env::var("INSURER_PV_CODE") {
            config.pv_code = v;
        }
        if let Ok(v) = std::env::var("INSURER_BR_CODE") {
            config.br_code = v;
        }

        config
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(crate) fn issuance_timeout(&self) -> Duration {
        Duration::from_secs(self.issuance_timeout_secs)
    }

    pub(crate) fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}
