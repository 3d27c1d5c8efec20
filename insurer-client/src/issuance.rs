//! Contract issuance with idempotent recovery
//!
//! Issuance is the one call that must never be blindly retried: a
//! re-send can double-issue a policy. Idempotency instead comes from the
//! capture id: before issuing we probe for an existing contract under
//! the candidate invoice numbers derived from it, and after an ambiguous
//! failure we re-probe a few times before giving up.

use crate::client::{safe_decimal, InsurerClient};
use crate::error::{Error, Result};
use crate::simulation::VehicleRating;
use brokerage_core::plate;
use brokerage_core::DocumentLinks;
use chrono::{Datelike, NaiveDate, Utc};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

/// Issuance request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueContractRequest {
    /// Insurer-side client code
    pub client_code: String,
    /// Vehicle rating parameters
    pub vehicle: VehicleRating,
    /// Registration plate, raw (normalized here)
    pub plate: String,
    /// Make code
    pub make_code: String,
    /// Model label
    pub model: String,
    /// Body-type code (defaults to 07, saloon)
    pub body_type: Option<String>,
    /// First day of cover, `YYYY-MM-DD`
    pub effective_date: String,
    /// Duration in months
    pub duration_months: u32,
    /// Capture id from the simulation, used as the idempotency seed
    pub capture_id: Option<String>,
}

impl IssueContractRequest {
    /// The eight fields issuance cannot proceed without.
    fn validate(&self) -> Result<()> {
        let required = [
            ("client_code", self.client_code.is_empty()),
            ("category", self.vehicle.category.is_empty()),
            ("fuel", self.vehicle.fuel.is_empty()),
            ("effective_date", self.effective_date.is_empty()),
            ("plate", self.plate.is_empty()),
            ("make_code", self.make_code.is_empty()),
            ("model", self.model.is_empty()),
            ("duration_months", self.duration_months == 0),
        ];
        for (name, missing) in required {
            if missing {
                return Err(Error::Validation(format!("missing required field: {name}")));
            }
        }
        Ok(())
    }
}

/// A successfully issued (or retrieved) contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractIssued {
    /// Policy number
    pub policy_number: String,
    /// Invoice number
    pub invoice_number: String,
    /// Insurer-side client number
    pub client_number: Option<String>,
    /// Gross premium as invoiced
    pub gross_premium: Decimal,
    /// Document links (may be empty right after issuance)
    pub documents: DocumentLinks,
    /// The contract pre-existed; nothing was re-issued
    pub was_existing: bool,
    /// The contract was found by the post-failure recovery probes
    pub recovered_after_error: bool,
    /// Full provider response
    pub raw_response: Value,
}

impl ContractIssued {
    fn from_provider(data: Value, policy_number: String, invoice_number: String) -> Self {
        let links = data.get("lien").cloned().unwrap_or(Value::Null);
        Self {
            policy_number,
            invoice_number,
            client_number: data
                .get("numeroClient")
                .and_then(Value::as_str)
                .map(str::to_string),
            gross_premium: safe_decimal(data.get("primettc")),
            documents: DocumentLinks {
                attestation: links
                    .get("linkAttestation")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                brown_card: links
                    .get("linkCarteBrune")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            was_existing: false,
            recovered_after_error: false,
            raw_response: data,
        }
    }
}

impl InsurerClient {
    /// Issue an auto contract (`srwbauto/create`).
    ///
    /// Pre-flight: when a capture id is present, an existing contract
    /// under either candidate invoice number short-circuits issuance and
    /// is returned tagged `was_existing`. The create call itself runs
    /// with a long timeout and zero retries; after any failure the
    /// existence probe runs up to `recovery_attempts` more times before
    /// the error propagates.
    pub async fn create_contract(&self, request: &IssueContractRequest) -> Result<ContractIssued> {
        request.validate()?;

        let plate = plate::normalize(&request.plate)?;

        let effective = NaiveDate::parse_from_str(&request.effective_date, "%Y-%m-%d")
            .map_err(|_| Error::Validation("effective_date must be YYYY-MM-DD".to_string()))?;
        if effective < Utc::now().date_naive() {
            return Err(Error::Validation(format!(
                "effective date in the past: {}",
                effective.format("%d/%m/%Y")
            )));
        }

        if let Some(capture_id) = request.capture_id.as_deref() {
            if let Some(existing) = self.try_recover_contract(capture_id).await {
                info!(capture_id, policy = %existing.policy_number, "contract already issued, skipping create");
                return Ok(ContractIssued {
                    was_existing: true,
                    ..existing
                });
            }
        }

        let mut params = request.vehicle.base_params();
        params.insert("cliCode".to_string(), json!(request.client_code));
        params.insert(
            "carrCode".to_string(),
            json!(request
                .body_type
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "07".to_string())),
        );
        params.insert("dure".to_string(), json!(request.duration_months));
        params.insert(
            "effet".to_string(),
            json!(effective.format("%d/%m/%Y").to_string()),
        );
        params.insert("numImmat".to_string(), json!(plate.as_str()));
        params.insert("mqCode".to_string(), json!(request.make_code));
        params.insert("modele".to_string(), json!(request.model));
        if let Some(capture_id) = &request.capture_id {
            params.insert("idSaisie".to_string(), json!(capture_id));
        }

        let result = match self
            .request_json(
                Method::GET,
                "srwbauto/create",
                params,
                self.config.issuance_timeout(),
                0,
            )
            .await
        {
            Ok(result) => result,
            Err(e) => {
                if let Some(capture_id) = request.capture_id.as_deref() {
                    if let Some(recovered) = self.recover_after_failure(capture_id).await {
                        return Ok(recovered);
                    }
                }
                return Err(e);
            }
        };

        let policy_number = result
            .get("numeroPolice")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let invoice_number = result
            .get("numeroFacture")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if policy_number.is_empty() || invoice_number.is_empty() {
            let message = result
                .get("message")
                .or_else(|| result.get("msg"))
                .and_then(Value::as_str)
                .unwrap_or("issuance returned no policy/invoice number")
                .to_string();
            return Err(Error::IssuanceFailed { message });
        }

        let mut issued = ContractIssued::from_provider(result, policy_number, invoice_number);

        if !issued.documents.any() {
            match self.get_invoice_documents(&issued.invoice_number).await {
                Ok(links) => issued.documents = links,
                // the contract is issued either way; documents can be
                // fetched again later
                Err(e) => warn!(invoice = %issued.invoice_number, "post-issuance document fetch failed: {e}"),
            }
        }

        Ok(issued)
    }

    /// Renew an existing policy (`srwbauto/renouv`); same no-retry rule
    /// as issuance.
    pub async fn renew_contract(
        &self,
        client_code: &str,
        policy_number: &str,
        duration_months: u32,
        effective_date: &str, // dd/mm/YYYY
        vehicle: &VehicleRating,
    ) -> Result<Value> {
        let mut params = Map::new();
        params.insert("cliCode".to_string(), json!(client_code));
        params.insert("numeroPolice".to_string(), json!(policy_number));
        params.insert("dure".to_string(), json!(duration_months));
        params.insert("effet".to_string(), json!(effective_date));
        params.insert("vaf".to_string(), json!(vehicle.new_value.to_string()));
        params.insert("vvn".to_string(), json!(vehicle.market_value.to_string()));
        for (key, on) in [
            ("recour", vehicle.guarantees.recourse),
            ("vol", vehicle.guarantees.theft),
            ("inc", vehicle.guarantees.fire),
            ("pt", vehicle.guarantees.passengers),
            ("gb", vehicle.guarantees.glass_breakage),
        ] {
            params.insert(key.to_string(), json!(if on { 1 } else { 0 }));
        }
        self.request_json(
            Method::GET,
            "srwbauto/renouv",
            params,
            self.config.issuance_timeout(),
            0,
        )
        .await
    }

    /// Probe for an already-issued contract under the invoice numbers a
    /// capture id can map to: the current-year-prefixed form first, then
    /// the raw capture id.
    pub(crate) async fn try_recover_contract(&self, capture_id: &str) -> Option<ContractIssued> {
        let year = Utc::now().year();
        let candidates = [format!("{year}{capture_id}"), capture_id.to_string()];
        for invoice in candidates {
            if let Some(existing) = self.verify_contract_exists(&invoice).await {
                let policy = existing
                    .get("numeroPolice")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let invoice_number = existing
                    .get("numeroFacture")
                    .and_then(Value::as_str)
                    .unwrap_or(&invoice)
                    .to_string();
                return Some(ContractIssued::from_provider(existing, policy, invoice_number));
            }
        }
        None
    }

    /// Recovery loop after a failed or ambiguous issuance call.
    ///
    /// The provider may have issued the contract even though our call
    /// failed; probing is best-effort. The provider's read side is only
    /// eventually consistent, so a miss here does not prove the contract
    /// was never created.
    async fn recover_after_failure(&self, capture_id: &str) -> Option<ContractIssued> {
        for attempt in 1..=self.config.recovery_attempts {
            if let Some(recovered) = self.try_recover_contract(capture_id).await {
                info!(
                    capture_id,
                    attempt,
                    policy = %recovered.policy_number,
                    "contract recovered after failed issuance call"
                );
                return Some(ContractIssued {
                    recovered_after_error: true,
                    ..recovered
                });
            }
            tokio::time::sleep(std::time::Duration::from_secs(self.config.recovery_pause_secs))
                .await;
        }
        None
    }
}
