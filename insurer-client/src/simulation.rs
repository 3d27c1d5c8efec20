//! Tariff simulation
//!
//! `srwb/automobile` rates a vehicle and returns the premium split plus
//! the capture id later used as the issuance idempotency seed.

use crate::client::{safe_decimal, InsurerClient};
use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Optional guarantee flags, sent to the rating engine as 0/1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuaranteeFlags {
    /// Recourse (recour)
    pub recourse: bool,
    /// Recourse advance (avr)
    pub recourse_advance: bool,
    /// Theft (vol)
    pub theft: bool,
    /// Fire (inc)
    pub fire: bool,
    /// Transported persons (pt)
    pub passengers: bool,
    /// Glass breakage (gb)
    pub glass_breakage: bool,
    /// Renewal discount flag (renv)
    pub renewal: bool,
}

fn flag(b: bool) -> Value {
    json!(if b { 1 } else { 0 })
}

/// Rating parameters of a vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRating {
    /// Insurer category code (e.g. 510 private cars, 520 goods transport)
    pub category: String,
    /// Sub-category code (mandatory for category 520)
    pub sub_category: Option<String>,
    /// Fuel code
    pub fuel: String,
    /// Fiscal power, floored at 1
    pub fiscal_power: u32,
    /// Seat count, floored at 1
    pub seat_count: u32,
    /// Value when new
    pub new_value: Decimal,
    /// Current market value
    pub market_value: Decimal,
    /// Payload in kg (category 520 only, defaults to 3500)
    pub payload_kg: Option<u32>,
    /// Optional guarantees
    pub guarantees: GuaranteeFlags,
}

impl VehicleRating {
    /// Common rating params shared by simulation and issuance
    pub(crate) fn base_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("cat".to_string(), json!(self.category));
        params.insert(
            "scatCode".to_string(),
            json!(self
                .sub_category
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "000".to_string())),
        );
        params.insert("nrg".to_string(), json!(self.fuel));
        params.insert("pfs".to_string(), json!(self.fiscal_power.max(1)));
        params.insert("nbP".to_string(), json!(self.seat_count.max(1)));
        params.insert("vaf".to_string(), json!(self.new_value.to_string()));
        params.insert("vvn".to_string(), json!(self.market_value.to_string()));
        params.insert("recour".to_string(), flag(self.guarantees.recourse));
        params.insert("vol".to_string(), flag(self.guarantees.theft));
        params.insert("inc".to_string(), flag(self.guarantees.fire));
        params.insert("pt".to_string(), flag(self.guarantees.passengers));
        params.insert("gb".to_string(), flag(self.guarantees.glass_breakage));
        if self.category == "520" {
            params.insert("chrgUtil".to_string(), json!(self.payload_kg.unwrap_or(3500)));
        }
        params
    }
}

/// Premium quote returned by the rating engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationQuote {
    /// Net premium
    pub net_premium: Decimal,
    /// Accessory fees
    pub accessories: Decimal,
    /// Guarantee-fund contribution
    pub guarantee_fund: Decimal,
    /// Taxes
    pub taxes: Decimal,
    /// Gross premium
    pub gross_premium: Decimal,
    /// Insurer commission as rated
    pub insurer_commission: Decimal,
    /// Capture id, the idempotency seed for the subsequent issuance
    pub capture_id: String,
    /// Full provider response
    pub raw_response: Value,
}

impl InsurerClient {
    /// Rate a classic auto risk.
    pub async fn get_simulation_auto(
        &self,
        vehicle: &VehicleRating,
        duration_months: u32,
    ) -> Result<SimulationQuote> {
        if vehicle.category.is_empty() {
            return Err(Error::Validation("category is required".to_string()));
        }
        if vehicle.fuel.is_empty() {
            return Err(Error::Validation("fuel is required".to_string()));
        }

        let mut params = vehicle.base_params();
        params.insert("dure".to_string(), json!(duration_months));
        params.insert("avr".to_string(), flag(vehicle.guarantees.recourse_advance));
        params.insert("renv".to_string(), flag(vehicle.guarantees.renewal));

        let result = self.get_json("srwb/automobile", params).await?;
        Ok(SimulationQuote {
            net_premium: safe_decimal(result.get("primenette")),
            accessories: safe_decimal(result.get("accessoire")),
            guarantee_fund: safe_decimal(result.get("fga")),
            taxes: safe_decimal(result.get("taxe")),
            gross_premium: safe_decimal(result.get("primettc")),
            insurer_commission: safe_decimal(result.get("commission")),
            capture_id: result
                .get("idSaisie")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            raw_response: result,
        })
    }
}
