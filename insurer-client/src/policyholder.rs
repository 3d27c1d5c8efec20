//! Insurer-side client (policyholder) records

use crate::client::InsurerClient;
use crate::error::{Error, Result};
use crate::redact::mask_sensitive;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::error;

/// Country code the insurer expects for Senegal
const COUNTRY_CODE: &str = "P00001";

/// Birth date sent when the caller has none on file
const DEFAULT_BIRTH_DATE: &str = "01/01/1990";

/// Policyholder creation payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyholderInfo {
    /// Last name
    pub last_name: String,
    /// First name
    pub first_name: String,
    /// Phone number
    pub phone: String,
    /// Identity-document number
    pub id_number: String,
    /// Email
    pub email: String,
    /// Postal address
    pub address: String,
    /// Birth date, `dd/mm/YYYY`
    pub birth_date: Option<String>,
}

impl InsurerClient {
    /// Create a policyholder (`srwbclient/createclient`) and return the
    /// insurer-assigned client code.
    pub async fn create_policyholder(&self, info: &PolicyholderInfo) -> Result<String> {
        if info.last_name.is_empty() || info.first_name.is_empty() {
            return Err(Error::Validation("first and last name are required".to_string()));
        }
        if info.phone.is_empty() {
            return Err(Error::Validation("phone number is required".to_string()));
        }

        let mut params = Map::new();
        params.insert("pvCode".to_string(), json!(self.config.pv_code));
        params.insert("nom".to_string(), json!(info.last_name));
        params.insert("pnom".to_string(), json!(info.first_name));
        params.insert("numident".to_string(), json!(info.id_number));
        params.insert("numtel".to_string(), json!(info.phone));
        params.insert("email".to_string(), json!(info.email));
        params.insert("adresse".to_string(), json!(info.address));
        params.insert("paysCode".to_string(), json!(COUNTRY_CODE));
        params.insert(
            "dtNaissance".to_string(),
            json!(info.birth_date.as_deref().unwrap_or(DEFAULT_BIRTH_DATE)),
        );

        let result = self.get_json("srwbclient/createclient", params).await?;
        let code = result
            .get("cliCode")
            .or_else(|| result.get("cliNumero"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        match code {
            Some(code) => Ok(code.to_string()),
            None => {
                error!(response = %mask_sensitive(&result), "policyholder creation returned no client code");
                Err(Error::IssuanceFailed {
                    message: "policyholder creation returned no client code".to_string(),
                })
            }
        }
    }

    /// Fetch a policyholder by code (`srwbclient/getclient`).
    pub async fn get_policyholder(&self, client_code: &str) -> Result<Value> {
        let mut params = Map::new();
        params.insert("cliCode".to_string(), json!(client_code));
        self.get_json("srwbclient/getclient", params).await
    }
}
