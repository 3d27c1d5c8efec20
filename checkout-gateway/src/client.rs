//! Hosted-checkout charge client
//!
//! Charge initiation is a soft path: any failure (unconfigured key,
//! network error, unexpected response shape) is logged and surfaced to
//! the caller as "no payment URL", never as an exception. The caller
//! tells the apporteur to retry later.

use crate::config::Config;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Value};
use settlement::{Settlement, SettlementStore};
use tracing::{error, info};

/// Customer details attached to the hosted checkout page
#[derive(Debug, Clone, Default)]
pub struct CustomerInfo {
    /// Full name
    pub name: String,
    /// Phone, local or international
    pub phone: String,
    /// Email
    pub email: String,
}

/// Client for the checkout provider's charge API.
///
/// Construct once at startup and inject.
pub struct CheckoutClient {
    config: Config,
    http: reqwest::Client,
}

impl std::fmt::Debug for CheckoutClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutClient")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl CheckoutClient {
    /// Build a client from configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Configuration this client was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create a hosted-checkout charge for a pending settlement and
    /// return the payment URL.
    ///
    /// The charge id and op token the provider returns are persisted on
    /// the settlement for later re-reads. Returns `None` on any failure.
    pub async fn initiate_payment(
        &self,
        store: &SettlementStore,
        settlement_id: u64,
        customer: &CustomerInfo,
    ) -> Option<String> {
        if self.config.api_key.is_empty() {
            error!("checkout API key is not configured");
            return None;
        }

        let settlement = match store.get(settlement_id).await {
            Ok(s) => s,
            Err(e) => {
                error!(settlement = settlement_id, "cannot initiate payment: {e}");
                return None;
            }
        };

        // Whole-franc amount: the provider rejects fractional XOF.
        let amount = settlement.amount_due.round().to_i64().unwrap_or(0);
        if amount <= 0 {
            error!(settlement = settlement_id, amount, "refusing non-positive charge amount");
            return None;
        }

        let mut body = json!({
            "amount": amount,
            "currency": self.config.currency,
            "country": self.config.country,
            "paymentReference": self.config.payment_reference(settlement_id),
            "successRedirectUrl": self.config.success_redirect_url,
            "errorRedirectUrl": self.config.error_redirect_url,
        });
        if let Some(customer_obj) = self.customer_object(customer) {
            body["customerObject"] = customer_obj;
        }

        let response = match self
            .http
            .post(format!("{}/pay/v1/charges", self.config.base_url))
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .header("X-API-Key", &self.config.api_key)
            .json(&body)
            .timeout(self.config.timeout())
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(settlement = settlement_id, "checkout charge network error: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            error!(settlement = settlement_id, status, body = %text, "checkout charge refused");
            return None;
        }

        let payload: Value = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                error!(settlement = settlement_id, "checkout charge response unreadable: {e}");
                return None;
            }
        };

        // The provider has shipped several response shapes; accept any
        // of the known URL fields.
        let payment_url = ["link", "redirectUrl", "checkoutUrl", "url"]
            .iter()
            .find_map(|k| payload.get(*k).and_then(Value::as_str))
            .or_else(|| {
                payload
                    .get("checkoutLinkObject")
                    .and_then(|c| c.get("link"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string);
        let Some(payment_url) = payment_url else {
            error!(settlement = settlement_id, payload = %payload, "checkout response carries no payment URL");
            return None;
        };

        let charge_id = payload
            .get("id")
            .or_else(|| payload.get("chargeId"))
            .and_then(Value::as_str);
        let op_token = payload
            .get("opToken")
            .and_then(Value::as_str)
            .or_else(|| {
                payload
                    .get("checkoutLinkObject")
                    .and_then(|c| c.get("opToken"))
                    .and_then(Value::as_str)
            });

        if charge_id.is_some() || op_token.is_some() {
            match store.lock_row(settlement_id).await {
                Ok(mut guard) => guard.set_gateway_refs(charge_id, op_token),
                Err(e) => error!(settlement = settlement_id, "cannot persist gateway refs: {e}"),
            }
        }

        info!(settlement = settlement_id, charge = charge_id.unwrap_or(""), "checkout charge created");
        Some(payment_url)
    }

    /// Re-read a charge (`GET /pay/v1/charges/{id}`); requires the
    /// charge id and op token captured at initiation. Soft failure.
    pub async fn fetch_charge(&self, settlement: &Settlement) -> Option<Value> {
        if self.config.api_key.is_empty() {
            error!("checkout API key is not configured");
            return None;
        }
        if settlement.transaction_reference.is_empty() || settlement.op_token.is_empty() {
            error!(
                settlement = settlement.id,
                "no charge id / op token on settlement, cannot re-read charge"
            );
            return None;
        }

        let response = match self
            .http
            .get(format!(
                "{}/pay/v1/charges/{}",
                self.config.base_url, settlement.transaction_reference
            ))
            .header("accept", "application/json")
            .header("X-API-Key", &self.config.api_key)
            .header("Op-Token", &settlement.op_token)
            .timeout(self.config.timeout())
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(settlement = settlement.id, "charge re-read network error: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            error!(
                settlement = settlement.id,
                status = response.status().as_u16(),
                "charge re-read refused"
            );
            return None;
        }
        response.json().await.ok()
    }

    /// Customer object with the phone normalized to international form;
    /// `None` when no field is filled.
    fn customer_object(&self, customer: &CustomerInfo) -> Option<Value> {
        let mut obj = serde_json::Map::new();
        if !customer.name.trim().is_empty() {
            obj.insert("name".to_string(), json!(customer.name.trim()));
        }
        let phone = customer.phone.trim();
        if !phone.is_empty() {
            let phone = if phone.starts_with('+') {
                phone.to_string()
            } else {
                format!("{}{phone}", self.config.phone_country_prefix)
            };
            obj.insert("phone".to_string(), json!(phone));
        }
        if !customer.email.trim().is_empty() {
            obj.insert("email".to_string(), json!(customer.email.trim()));
        }
        if obj.is_empty() {
            None
        } else {
            Some(Value::Object(obj))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_phone_gets_country_prefix() {
        let client = CheckoutClient::new(Config::default());
        let obj = client
            .customer_object(&CustomerInfo {
                name: "Awa Diop".to_string(),
                phone: "771234567".to_string(),
                email: String::new(),
            })
            .unwrap();
        assert_eq!(obj["phone"], "+221771234567");
        assert_eq!(obj["name"], "Awa Diop");
        assert!(obj.get("email").is_none());
    }

    #[test]
    fn test_international_phone_left_alone() {
        let client = CheckoutClient::new(Config::default());
        let obj = client
            .customer_object(&CustomerInfo {
                name: String::new(),
                phone: "+33612345678".to_string(),
                email: String::new(),
            })
            .unwrap();
        assert_eq!(obj["phone"], "+33612345678");
    }

    #[test]
    fn test_empty_customer_is_omitted() {
        let client = CheckoutClient::new(Config::default());
        assert!(client.customer_object(&CustomerInfo::default()).is_none());
    }
}
