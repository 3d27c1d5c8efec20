//! Checkout webhook processing
//!
//! The webhook is the only writer that moves a settlement to PAYE from
//! the payment flow, so it fails closed at every step: on a bad secret,
//! bad reference, unknown settlement or amount drift, nothing mutates.
//! The settlement row stays locked for the whole decision, which
//! serializes concurrent deliveries of the same event.

use crate::config::Config;
use rust_decimal::Decimal;
use serde_json::Value;
use settlement::SettlementStore;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

/// Payment statuses that mean money actually moved
const PAID_STATUSES: [&str; 3] = ["succeeded", "authorized", "successful"];

/// Amount drift tolerated between the webhook and the settlement, in
/// whole currency units (the provider truncates fractional XOF)
const AMOUNT_TOLERANCE: Decimal = Decimal::ONE;

/// Outcome of a webhook delivery, mapped 1:1 onto the HTTP status the
/// provider sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookResponse {
    /// Processed or deliberately ignored
    Ok,
    /// Malformed payload, foreign reference or amount mismatch
    BadRequest,
    /// Missing or wrong shared secret
    Unauthorized,
    /// Reference parsed but no such settlement
    NotFound,
}

impl WebhookResponse {
    /// HTTP status code for this outcome
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookResponse::Ok => 200,
            WebhookResponse::BadRequest => 400,
            WebhookResponse::Unauthorized => 401,
            WebhookResponse::NotFound => 404,
        }
    }
}

/// Webhook receiver driving the settlement state machine
#[derive(Debug)]
pub struct WebhookProcessor {
    config: Config,
    store: Arc<SettlementStore>,
}

impl WebhookProcessor {
    /// Build a processor over the shared settlement store.
    pub fn new(config: Config, store: Arc<SettlementStore>) -> Self {
        Self { config, store }
    }

    /// Shared settlement store
    pub fn store(&self) -> &Arc<SettlementStore> {
        &self.store
    }

    /// Process one webhook delivery.
    ///
    /// `api_key` is the value of the `X-API-Key` header (header-name
    /// lookup is the HTTP layer's job and is case-insensitive there).
    pub async fn handle(&self, raw_body: &[u8], api_key: Option<&str>) -> WebhookResponse {
        if !self.authenticate(api_key) {
            warn!("webhook rejected: bad or missing API key");
            return WebhookResponse::Unauthorized;
        }

        let payload: Value = match serde_json::from_slice(raw_body) {
            Ok(p) => p,
            Err(e) => {
                warn!("webhook rejected: unreadable JSON: {e}");
                return WebhookResponse::BadRequest;
            }
        };
        // Some provider event shapes wrap the charge in a `data`
        // envelope.
        let event = payload.get("data").unwrap_or(&payload);

        let status = event
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        if !PAID_STATUSES.contains(&status.as_str()) {
            info!(status = %status, "webhook ignored: not a settled payment");
            return WebhookResponse::Ok;
        }

        let reference = event
            .get("paymentReference")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let Some(settlement_id) = self.config.parse_payment_reference(reference) else {
            warn!(reference, "webhook rejected: foreign payment reference");
            return WebhookResponse::BadRequest;
        };

        // Row lock held until return: concurrent deliveries for this
        // settlement queue up behind us.
        let mut row = match self.store.lock_row(settlement_id).await {
            Ok(row) => row,
            Err(e) => {
                warn!(settlement = settlement_id, "webhook for unknown settlement: {e}");
                return WebhookResponse::NotFound;
            }
        };

        if row.settlement().is_paid() {
            info!(settlement = settlement_id, "webhook replay on paid settlement, nothing to do");
            return WebhookResponse::Ok;
        }

        let received = parse_amount(event.get("amount"));
        let expected = row.settlement().amount_due;
        if (received - expected).abs() > AMOUNT_TOLERANCE {
            warn!(
                settlement = settlement_id,
                expected = %expected,
                received = %received,
                "webhook amount mismatch, possible fraud, refusing"
            );
            return WebhookResponse::BadRequest;
        }

        let method = event
            .get("paymentMeans")
            .or_else(|| event.get("pspName"))
            .and_then(Value::as_str)
            .unwrap_or("CARD");
        let charge_id = event
            .get("id")
            .or_else(|| event.get("chargeId"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(reference);
        let payer_account = event
            .get("customerPhone")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());

        match row.mark_paid(method, charge_id, payer_account, Some("checkout-webhook")) {
            Ok(()) => {
                info!(settlement = settlement_id, method, "settlement paid via checkout webhook");
                WebhookResponse::Ok
            }
            Err(e) => {
                warn!(settlement = settlement_id, "webhook payment refused by state machine: {e}");
                WebhookResponse::BadRequest
            }
        }
    }

    /// Constant-time shared-secret check; fails closed when the secret
    /// is unconfigured.
    fn authenticate(&self, api_key: Option<&str>) -> bool {
        let secret = self.config.webhook_secret.as_bytes();
        if secret.is_empty() {
            return false;
        }
        match api_key {
            Some(key) => secret.ct_eq(key.as_bytes()).into(),
            None => false,
        }
    }
}

/// Amounts arrive as numbers or strings depending on the event shape.
fn parse_amount(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::Number(n)) => n.to_string().parse().unwrap_or(Decimal::ZERO),
        Some(Value::String(s)) => s.parse().unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WebhookResponse::Ok.status_code(), 200);
        assert_eq!(WebhookResponse::BadRequest.status_code(), 400);
        assert_eq!(WebhookResponse::Unauthorized.status_code(), 401);
        assert_eq!(WebhookResponse::NotFound.status_code(), 404);
    }

    #[test]
    fn test_parse_amount_shapes() {
        assert_eq!(parse_amount(Some(&serde_json::json!(102000))), Decimal::new(102000, 0));
        assert_eq!(
            parse_amount(Some(&serde_json::json!("102000"))),
            Decimal::new(102000, 0)
        );
        assert_eq!(parse_amount(None), Decimal::ZERO);
        assert_eq!(parse_amount(Some(&serde_json::json!(null))), Decimal::ZERO);
    }
}
