//! Contract model and status lifecycle
//!
//! The status field is an explicit enum with a single transition
//! function; every guard lives here rather than at call sites.

use crate::commission::{self, BrokerGrade, BrokerRole, CommissionBreakdown, CommissionSchedule};
use crate::error::{Error, Result};
use crate::plate::CanonicalPlate;
use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Contract lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractStatus {
    /// Quoted, not yet issued
    Simulation,
    /// Issued but neither document link has landed yet
    PendingDocs,
    /// Issued by the insurer
    Emis,
    /// In force
    Actif,
    /// Past its due date
    Expire,
    /// Cancelled (terminal)
    Annule,
}

impl ContractStatus {
    /// Wire/storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Simulation => "SIMULATION",
            ContractStatus::PendingDocs => "PENDING_DOCS",
            ContractStatus::Emis => "EMIS",
            ContractStatus::Actif => "ACTIF",
            ContractStatus::Expire => "EXPIRE",
            ContractStatus::Annule => "ANNULE",
        }
    }
}

/// Premium split as returned by the insurer's rating engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumBreakdown {
    /// Net premium
    pub net: Decimal,
    /// Accessory fees
    pub accessories: Decimal,
    /// Guarantee-fund contribution
    pub guarantee_fund: Decimal,
    /// Taxes
    pub taxes: Decimal,
    /// Gross premium (all-inclusive)
    pub gross: Decimal,
}

impl PremiumBreakdown {
    /// gross must equal net + accessories + fund + taxes within a cent
    pub fn validate(&self) -> Result<()> {
        let sum = self.net + self.accessories + self.guarantee_fund + self.taxes;
        if (self.gross - sum).abs() > Decimal::new(1, 2) {
            return Err(Error::Validation(format!(
                "gross premium {} does not match component sum {}",
                self.gross, sum
            )));
        }
        Ok(())
    }
}

/// Insurer-assigned identifiers, present once issued
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurerRefs {
    /// Policy number
    pub policy_number: Option<String>,
    /// Invoice number
    pub invoice_number: Option<String>,
    /// Capture id (idempotency seed supplied at issuance)
    pub capture_id: Option<String>,
}

/// Document links delivered by the insurer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLinks {
    /// Insurance attestation URL
    pub attestation: String,
    /// Brown-card URL
    pub brown_card: String,
}

impl DocumentLinks {
    /// At least one document link present
    pub fn any(&self) -> bool {
        !self.attestation.is_empty() || !self.brown_card.is_empty()
    }
}

/// An auto-insurance contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    /// Internal contract id
    pub id: u64,
    /// Insurer-side client code
    pub client_code: String,
    /// Normalized registration plate
    pub plate: CanonicalPlate,
    /// Originating broker id
    pub broker_id: u64,
    /// Originating broker role
    pub broker_role: BrokerRole,
    /// Originating broker grade (apporteurs only)
    pub broker_grade: Option<BrokerGrade>,
    /// Premium split
    pub premium: PremiumBreakdown,
    /// Derived amounts, only ever written by [`Contract::recompute_commissions`]
    pub commissions: CommissionBreakdown,
    /// Lifecycle status
    pub status: ContractStatus,
    /// Insurer identifiers
    pub refs: InsurerRefs,
    /// Document links
    pub documents: DocumentLinks,
    /// First day of cover
    pub effective_date: NaiveDate,
    /// Duration in months
    pub duration_months: u32,
    /// Last day of cover (effective + duration - 1 day)
    pub due_date: NaiveDate,
}

impl Contract {
    /// Build a contract in SIMULATION with derived fields computed.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        client_code: impl Into<String>,
        plate: CanonicalPlate,
        broker_id: u64,
        broker_role: BrokerRole,
        broker_grade: Option<BrokerGrade>,
        premium: PremiumBreakdown,
        effective_date: NaiveDate,
        duration_months: u32,
        schedule: &CommissionSchedule,
    ) -> Result<Self> {
        premium.validate()?;
        if duration_months == 0 {
            return Err(Error::Validation("duration must be at least one month".to_string()));
        }
        let due_date = due_date_for(effective_date, duration_months)?;
        let mut contract = Self {
            id,
            client_code: client_code.into(),
            plate,
            broker_id,
            broker_role,
            broker_grade,
            premium,
            commissions: CommissionBreakdown {
                insurer_commission: Decimal::ZERO,
                broker_commission: Decimal::ZERO,
                company_margin: Decimal::ZERO,
                net_payable: Decimal::ZERO,
            },
            status: ContractStatus::Simulation,
            refs: InsurerRefs::default(),
            documents: DocumentLinks::default(),
            effective_date,
            duration_months,
            due_date,
        };
        contract.recompute_commissions(schedule);
        Ok(contract)
    }

    /// Recompute the four derived amounts from current premium and broker.
    ///
    /// Commission fields have no other writer.
    pub fn recompute_commissions(&mut self, schedule: &CommissionSchedule) {
        self.commissions = commission::compute(
            schedule,
            self.premium.gross,
            self.premium.net,
            self.broker_role,
            self.broker_grade,
        );
    }

    /// Central transition function; all status guards live here.
    pub fn transition(&mut self, to: ContractStatus) -> Result<()> {
        use ContractStatus::*;
        let from = self.status;
        let allowed = match (from, to) {
            // idempotent cancellation
            (Annule, Annule) => true,
            (Annule, _) => false,
            // issuance
            (Simulation, Emis) | (Simulation, PendingDocs) => true,
            // documents landed after the fact
            (PendingDocs, Emis) => true,
            // activation and expiry
            (Emis, Actif) => true,
            (Emis, Expire) | (Actif, Expire) => true,
            // cancellation before expiry only
            (Simulation, Annule) | (PendingDocs, Annule) | (Emis, Annule) | (Actif, Annule) => {
                true
            }
            (Expire, Annule) => false,
            _ => false,
        };
        if !allowed {
            return Err(Error::InvalidTransition {
                from,
                to,
                reason: match (from, to) {
                    (Expire, Annule) => "expired contracts cannot be cancelled".to_string(),
                    (Annule, _) => "contract is cancelled".to_string(),
                    _ => "transition not permitted".to_string(),
                },
            });
        }
        if from != to {
            info!(contract = self.id, from = from.as_str(), to = to.as_str(), "contract status change");
            self.status = to;
        }
        Ok(())
    }

    /// Record a successful issuance.
    ///
    /// Lands in EMIS, or PENDING_DOCS when neither document link came back
    /// with the issuance response.
    pub fn mark_issued(
        &mut self,
        policy_number: impl Into<String>,
        invoice_number: impl Into<String>,
        documents: DocumentLinks,
    ) -> Result<()> {
        let target = if documents.any() {
            ContractStatus::Emis
        } else {
            ContractStatus::PendingDocs
        };
        self.transition(target)?;
        self.refs.policy_number = Some(policy_number.into());
        self.refs.invoice_number = Some(invoice_number.into());
        self.documents = documents;
        Ok(())
    }

    /// Attach document links fetched after issuance; promotes
    /// PENDING_DOCS to EMIS.
    pub fn attach_documents(&mut self, documents: DocumentLinks) -> Result<()> {
        if !documents.any() {
            return Ok(());
        }
        self.documents = documents;
        if self.status == ContractStatus::PendingDocs {
            self.transition(ContractStatus::Emis)?;
        }
        Ok(())
    }

    /// Move to EXPIRE when the due date has passed. Returns whether the
    /// status changed.
    pub fn expire_if_due(&mut self, today: NaiveDate) -> bool {
        if matches!(self.status, ContractStatus::Emis | ContractStatus::Actif)
            && today > self.due_date
        {
            self.status = ContractStatus::Expire;
            return true;
        }
        false
    }

    /// Issued (or since expired) with at least one document; the gate
    /// for settlement declaration.
    pub fn is_valid(&self) -> bool {
        matches!(
            self.status,
            ContractStatus::Emis | ContractStatus::Actif | ContractStatus::Expire
        ) && self.documents.any()
    }

    /// In force today
    pub fn is_active(&self, today: NaiveDate) -> bool {
        matches!(self.status, ContractStatus::Emis | ContractStatus::Actif)
            && self.effective_date <= today
            && today <= self.due_date
    }
}

/// effective date + months − 1 day
fn due_date_for(effective: NaiveDate, months: u32) -> Result<NaiveDate> {
    effective
        .checked_add_months(Months::new(months))
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(|| {
            Error::Validation(format!(
                "due date overflow for {}-{:02} + {months} months",
                effective.year(),
                effective.month()
            ))
        })
}

/// Expiry sweep over a contract collection; returns how many moved.
pub fn expire_due_contracts(contracts: &mut [Contract], today: NaiveDate) -> usize {
    contracts
        .iter_mut()
        .map(|c| c.expire_if_due(today))
        .filter(|&moved| moved)
        .count()
}
