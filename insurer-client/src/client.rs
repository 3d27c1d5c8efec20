//! Request core for the insurer's REST-like API
//!
//! One retrying request path feeds every endpoint wrapper. Transport
//! timeouts and 5xx responses are retried with linear backoff; provider
//! business errors are classified out of the JSON body and never
//! retried.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::redact::mask_sensitive;
use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{error, warn};

/// Statuses the provider uses to flag a failed call
const FAILURE_STATUSES: [&str; 4] = ["KO", "ERROR", "NOK", "FAIL"];

/// Client for the insurer HTTP API.
///
/// Construct once at startup and inject; holds a connection pool and a
/// referential cache.
pub struct InsurerClient {
    pub(crate) config: Config,
    http: reqwest::Client,
    pub(crate) referential_cache: DashMap<String, Vec<(String, String)>>,
}

impl std::fmt::Debug for InsurerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsurerClient")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl InsurerClient {
    /// Build a client from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "appClient",
            HeaderValue::from_str(&config.app_client)
                .map_err(|_| Error::Validation("appClient code is not a valid header value".to_string()))?,
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Validation(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            http,
            referential_cache: DashMap::new(),
        })
    }

    /// Configuration this client was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// One JSON request against the insurer API.
    ///
    /// `params` with null values are stripped before sending; GET params
    /// go on the query string, anything else is sent as a JSON body.
    /// Timeouts retry up to `max_retries` times with linear backoff
    /// (2 s × attempt); 5xx responses retry with a shorter ramp
    /// (0.6 s × attempt). Every retry is logged with the redacted
    /// parameter set. Pass `max_retries = 0` for calls that must not be
    /// re-sent.
    pub async fn request_json(
        &self,
        method: Method,
        endpoint: &str,
        params: Map<String, Value>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Value> {
        let url = self.url_for(endpoint);
        let params = clean_params(params);
        let safe = mask_sensitive(&Value::Object(params.clone()));

        let mut response = None;
        for attempt in 0..=max_retries {
            let mut request = self.http.request(method.clone(), &url).timeout(timeout);
            request = if method == Method::GET {
                request.query(&query_pairs(&params))
            } else {
                request.json(&Value::Object(params.clone()))
            };

            match request.send().await {
                Ok(resp) => {
                    if resp.status().is_server_error() && attempt < max_retries {
                        let wait = Duration::from_secs_f64(0.6 * (attempt + 1) as f64);
                        warn!(
                            endpoint,
                            status = resp.status().as_u16(),
                            attempt = attempt + 1,
                            of = max_retries + 1,
                            params = %safe,
                            "server error from insurer, retrying in {wait:?}"
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    response = Some(resp);
                    break;
                }
                Err(e) if e.is_timeout() => {
                    if attempt < max_retries {
                        let wait = Duration::from_secs(2 * (attempt as u64 + 1));
                        warn!(
                            endpoint,
                            attempt = attempt + 1,
                            of = max_retries + 1,
                            params = %safe,
                            "insurer API timeout, retrying in {wait:?}"
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    error!(endpoint, attempts = max_retries + 1, params = %safe, "insurer API timeout, retries exhausted");
                    return Err(Error::Transport {
                        endpoint: endpoint.to_string(),
                        source: e,
                    });
                }
                Err(e) => {
                    error!(endpoint, params = %safe, "network error reaching insurer: {e}");
                    return Err(Error::Transport {
                        endpoint: endpoint.to_string(),
                        source: e,
                    });
                }
            }
        }

        // Loop always breaks with a response or returns early.
        let response = response.expect("retry loop exited without response");
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let body_preview: String = body.chars().take(400).collect();
            error!(endpoint, status = status.as_u16(), body = %body_preview, params = %safe, "insurer HTTP error");
            return Err(Error::Http {
                status: status.as_u16(),
                body_preview,
            });
        }

        let data: Value = serde_json::from_str(&body).map_err(|_| {
            error!(endpoint, preview = %body.chars().take(400).collect::<String>(), "non-JSON insurer response");
            Error::InvalidResponse {
                endpoint: endpoint.to_string(),
            }
        })?;

        if let Some(message) = business_failure(&data) {
            error!(endpoint, message = %message, data = %mask_sensitive(&data), params = %safe, "insurer business error");
            return Err(Error::Business { message });
        }

        Ok(data)
    }

    /// GET with the default timeout and retry policy
    pub(crate) async fn get_json(&self, endpoint: &str, params: Map<String, Value>) -> Result<Value> {
        self.request_json(
            Method::GET,
            endpoint,
            params,
            self.config.timeout(),
            self.config.max_retries,
        )
        .await
    }
}

/// Drop null-valued params
fn clean_params(params: Map<String, Value>) -> Map<String, Value> {
    params.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

/// Query-string rendering of scalar params
fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect()
}

/// Detect an explicit business failure in a 2xx JSON body.
///
/// Returns the provider message when the body signals failure through
/// any of the shapes the insurer is known to use.
fn business_failure(data: &Value) -> Option<String> {
    let obj = data.as_object()?;

    let message = obj
        .get("message")
        .or_else(|| obj.get("msg"))
        .and_then(Value::as_str)
        .map(str::to_string);

    // "contrat en cours" in the message means the policy already exists
    // server-side, which is a business refusal whatever the flags say.
    if let Some(m) = &message {
        if m.to_lowercase().contains("contrat en cours") {
            return Some(m.clone());
        }
    }

    let status_bad = obj
        .get("status")
        .map(|s| {
            let s = match s {
                Value::String(s) => s.to_uppercase(),
                other => other.to_string().to_uppercase(),
            };
            FAILURE_STATUSES.contains(&s.as_str())
        })
        .unwrap_or(false);

    let error_val = obj.get("error");
    let error_bad = matches!(
        error_val,
        Some(Value::String(_)) | Some(Value::Number(_))
    ) && {
        let s = match error_val.unwrap() {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        !matches!(s.as_str(), "" | "0" | "None")
    };

    let flags_false = obj.get("success") == Some(&Value::Bool(false))
        || obj.get("statut") == Some(&Value::Bool(false))
        || status_bad
        || error_bad;

    let code_bad = obj.get("code").is_some_and(|code| {
        let s = match code {
            Value::String(s) => s.trim().to_string(),
            Value::Null => return false,
            other => other.to_string(),
        };
        !matches!(s.as_str(), "" | "0" | "None" | "OK" | "SUCCESS")
    });

    if flags_false || code_bad {
        let fallback = error_val
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| obj.get("detail").and_then(Value::as_str).map(str::to_string));
        return Some(
            message
                .filter(|m| !m.is_empty())
                .or(fallback)
                .unwrap_or_else(|| "insurer business error".to_string()),
        );
    }

    None
}

/// Lenient decimal parsing: the provider is inconsistent about numbers
/// vs strings, and a malformed figure must not sink the whole response.
pub(crate) fn safe_decimal(value: Option<&Value>) -> Decimal {
    let Some(value) = value else {
        return Decimal::ZERO;
    };
    let parsed = match value {
        Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        Value::String(s) if !s.is_empty() => s.parse::<Decimal>().ok(),
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        warn!(value = %value, "decimal conversion failed, defaulting to 0");
        Decimal::ZERO
    })
}
