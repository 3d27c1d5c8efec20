//! Invoice documents and existence probes
//!
//! `quittance/getfacture` serves both as the document-link source and as
//! the lightweight existence check backing issuance idempotency.

use crate::client::InsurerClient;
use crate::error::{Error, Result};
use brokerage_core::DocumentLinks;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::debug;

impl InsurerClient {
    /// Fetch attestation / brown-card links for an invoice.
    ///
    /// Tolerant of missing links: absent entries come back as empty
    /// strings, not errors.
    pub async fn get_invoice_documents(&self, invoice_number: &str) -> Result<DocumentLinks> {
        let mut params = Map::new();
        params.insert("numeroFacture".to_string(), json!(invoice_number));
        let data = self.get_json("quittance/getfacture", params).await?;
        let links = data.get("lien").cloned().unwrap_or(Value::Null);
        Ok(DocumentLinks {
            attestation: links
                .get("linkAttestation")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            brown_card: links
                .get("linkCarteBrune")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| links.get("cartegrise").and_then(Value::as_str))
                .unwrap_or_default()
                .to_string(),
        })
    }

    /// Light JSON probe of `quittance/getfacture`; swallows every
    /// failure.
    async fn get_invoice_json(&self, invoice_number: &str) -> Option<Value> {
        let mut params = Map::new();
        params.insert("numeroFacture".to_string(), json!(invoice_number));
        match self
            .request_json(
                Method::GET,
                "quittance/getfacture",
                params,
                self.config.probe_timeout(),
                0,
            )
            .await
        {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(invoice = invoice_number, "invoice probe failed: {e}");
                None
            }
        }
    }

    /// Does a contract exist under this invoice number?
    ///
    /// Returns the invoice payload only when it carries a policy number.
    pub async fn verify_contract_exists(&self, invoice_number: &str) -> Option<Value> {
        let data = self.get_invoice_json(invoice_number).await?;
        let has_policy = data
            .get("numeroPolice")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());
        has_policy.then_some(data)
    }

    /// Cancel the QR-coded attestation of an invoice
    /// (`quittance/annulerqrcode`).
    pub async fn cancel_attestation(&self, invoice_number: &str) -> Result<Value> {
        if invoice_number.is_empty() {
            return Err(Error::Validation(
                "invoice number required for cancellation".to_string(),
            ));
        }
        let mut params = Map::new();
        params.insert("numeroFacture".to_string(), json!(invoice_number));
        self.get_json("quittance/annulerqrcode", params).await
    }
}
