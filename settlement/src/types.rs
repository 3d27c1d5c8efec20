//! Settlement records and their audit trail
//!
//! A settlement is the apporteur's obligation to remit the company's
//! net-payable share after collecting the premium. Its status is an
//! explicit enum mutated only through the guarded transition methods;
//! every mutation appends an immutable history entry.

use crate::config::Config;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Settlement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementStatus {
    /// Awaiting the apporteur's payment
    EnAttente,
    /// Paid and validated (terminal; paid settlements cannot be
    /// cancelled)
    Paye,
    /// Cancelled (terminal)
    Annule,
}

impl SettlementStatus {
    /// Wire/storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::EnAttente => "EN_ATTENTE",
            SettlementStatus::Paye => "PAYE",
            SettlementStatus::Annule => "ANNULE",
        }
    }
}

/// Audit action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryAction {
    /// Settlement row created
    Creation,
    /// Status changed (cancellation)
    StatusChange,
    /// Payment validated
    Validation,
    /// Other field-level modification
    Modification,
}

/// One immutable audit entry; never updated after creation, lifetime
/// tied to its settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Entry id
    pub id: Uuid,
    /// Owning settlement
    pub settlement_id: u64,
    /// Action recorded
    pub action: HistoryAction,
    /// Actor (webhook, staff user, ...) when known
    pub actor: Option<String>,
    /// Free-text detail
    pub detail: String,
    /// Timestamp
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    fn new(settlement_id: u64, action: HistoryAction, actor: Option<String>, detail: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            settlement_id,
            action,
            actor,
            detail,
            at: Utc::now(),
        }
    }
}

/// The apporteur's payable-to-company obligation for one contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    /// Settlement id
    pub id: u64,
    /// Contract this settlement belongs to (one-to-one)
    pub contract_id: u64,
    /// Amount owed, synchronized from the contract's net-payable figure
    pub amount_due: Decimal,
    /// Status
    pub status: SettlementStatus,
    /// Payment method, set on validation
    pub method: String,
    /// External transaction reference (charge id or bank reference)
    pub transaction_reference: String,
    /// Opaque gateway token for charge re-reads
    pub op_token: String,
    /// Payer wallet/account hint reported by the gateway
    pub payer_account: String,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Settlement {
    /// New pending settlement for a contract
    pub fn new(id: u64, contract_id: u64, amount_due: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id,
            contract_id,
            amount_due,
            status: SettlementStatus::EnAttente,
            method: String::new(),
            transaction_reference: String::new(),
            op_token: String::new(),
            payer_account: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Paid?
    pub fn is_paid(&self) -> bool {
        self.status == SettlementStatus::Paye
    }

    /// Still pending?
    pub fn is_pending(&self) -> bool {
        self.status == SettlementStatus::EnAttente
    }

    /// Cancelled?
    pub fn is_cancelled(&self) -> bool {
        self.status == SettlementStatus::Annule
    }

    /// Amount actually collected (0 unless paid)
    pub fn amount_paid(&self) -> Decimal {
        if self.is_paid() {
            self.amount_due
        } else {
            Decimal::ZERO
        }
    }

    /// Re-derive the amount owed when the row is fresh or still unset.
    pub fn sync_amount(&mut self, expected: Decimal) {
        if self.amount_due == Decimal::ZERO {
            self.amount_due = expected;
        }
    }

    /// Reject an explicit amount that strays from the contract's
    /// net-payable figure by more than the configured tolerance.
    pub fn validate_amount(&self, expected: Decimal, config: &Config) -> Result<()> {
        if (self.amount_due - expected).abs() > config.amount_tolerance {
            return Err(Error::AmountMismatch {
                expected,
                actual: self.amount_due,
            });
        }
        Ok(())
    }

    /// EN_ATTENTE → PAYE.
    ///
    /// Guards: not already paid, not cancelled, method configured,
    /// reference well-formed. Mutates only after every guard has
    /// passed and returns the single VALIDATION history entry the
    /// caller must persist with the state change.
    pub fn mark_paid(
        &mut self,
        method: &str,
        reference: &str,
        payer_account: Option<&str>,
        actor: Option<&str>,
        config: &Config,
    ) -> Result<HistoryEntry> {
        match self.status {
            SettlementStatus::Paye => {
                return Err(Error::InvalidTransition {
                    from: self.status,
                    reason: "already paid".to_string(),
                })
            }
            SettlementStatus::Annule => {
                return Err(Error::InvalidTransition {
                    from: self.status,
                    reason: "cancelled settlements cannot be validated".to_string(),
                })
            }
            SettlementStatus::EnAttente => {}
        }

        let reference = reference.trim();
        if reference.len() < config.min_reference_len {
            return Err(Error::InvalidReference(format!(
                "reference too short ({} minimum)",
                config.min_reference_len
            )));
        }
        if reference.len() > config.max_reference_len
            || !reference
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(Error::InvalidReference(
                "reference must be 6-64 alphanumeric characters".to_string(),
            ));
        }

        let method = method.trim();
        if !config.method_allowed(method) {
            return Err(Error::UnknownMethod(method.to_string()));
        }

        self.method = method.to_string();
        self.transaction_reference = reference.to_string();
        if let Some(account) = payer_account.filter(|a| !a.is_empty()) {
            self.payer_account = account.chars().take(32).collect();
        }
        self.status = SettlementStatus::Paye;
        self.updated_at = Utc::now();

        Ok(HistoryEntry::new(
            self.id,
            HistoryAction::Validation,
            actor.map(str::to_string),
            format!("payment {} | ref={}", self.method, reference),
        ))
    }

    /// EN_ATTENTE → ANNULE. Cancelling an already-cancelled settlement
    /// is a no-op; cancelling a paid one is refused.
    pub fn cancel(&mut self, actor: Option<&str>, reason: &str) -> Result<Option<HistoryEntry>> {
        match self.status {
            SettlementStatus::Paye => Err(Error::InvalidTransition {
                from: self.status,
                reason: "cannot cancel a paid settlement".to_string(),
            }),
            SettlementStatus::Annule => Ok(None),
            SettlementStatus::EnAttente => {
                self.status = SettlementStatus::Annule;
                self.updated_at = Utc::now();
                Ok(Some(HistoryEntry::new(
                    self.id,
                    HistoryAction::StatusChange,
                    actor.map(str::to_string),
                    format!("cancelled: {reason}"),
                )))
            }
        }
    }

    /// Creation audit entry for a fresh row
    pub(crate) fn creation_entry(&self, actor: Option<&str>) -> HistoryEntry {
        HistoryEntry::new(
            self.id,
            HistoryAction::Creation,
            actor.map(str::to_string),
            format!("created for contract {} | due={}", self.contract_id, self.amount_due),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn pending() -> Settlement {
        Settlement::new(1, 42, d("102000.00"))
    }

    #[test]
    fn test_short_reference_refused() {
        let mut s = pending();
        let err = s
            .mark_paid("OM", "12345", None, None, &Config::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidReference(_)));
        assert!(s.is_pending());
    }

    #[test]
    fn test_mark_paid_happy_path() {
        let mut s = pending();
        let entry = s
            .mark_paid("WAVE-SN", "TX-123456", Some("771234567"), Some("webhook"), &Config::default())
            .unwrap();
        assert!(s.is_paid());
        assert_eq!(s.method, "WAVE-SN");
        assert_eq!(s.transaction_reference, "TX-123456");
        assert_eq!(s.payer_account, "771234567");
        assert_eq!(entry.action, HistoryAction::Validation);
        assert_eq!(entry.settlement_id, 1);
        assert_eq!(s.amount_paid(), d("102000.00"));
    }

    #[test]
    fn test_unknown_method_refused() {
        let mut s = pending();
        let err = s
            .mark_paid("BARTER", "TX-123456", None, None, &Config::default())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownMethod(_)));
    }

    #[test]
    fn test_paying_twice_is_refused() {
        let mut s = pending();
        s.mark_paid("OM", "TX-123456", None, None, &Config::default()).unwrap();
        let err = s
            .mark_paid("OM", "TX-123456", None, None, &Config::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[test]
    fn test_paid_settlement_cannot_be_cancelled() {
        let mut s = pending();
        s.mark_paid("OM", "TX-123456", None, None, &Config::default()).unwrap();
        let err = s.cancel(None, "test").unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert!(s.is_paid());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut s = pending();
        let first = s.cancel(Some("admin"), "duplicate").unwrap();
        assert!(first.is_some());
        assert!(s.is_cancelled());

        let second = s.cancel(Some("admin"), "again").unwrap();
        assert!(second.is_none());
        assert!(s.is_cancelled());
    }

    #[test]
    fn test_cancelled_settlement_cannot_be_paid() {
        let mut s = pending();
        s.cancel(None, "void").unwrap();
        let err = s
            .mark_paid("OM", "TX-123456", None, None, &Config::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[test]
    fn test_amount_sync_and_validation() {
        let mut s = Settlement::new(1, 42, Decimal::ZERO);
        s.sync_amount(d("102000.00"));
        assert_eq!(s.amount_due, d("102000.00"));

        // within tolerance
        s.amount_due = d("102000.01");
        assert!(s.validate_amount(d("102000.00"), &Config::default()).is_ok());

        // outside tolerance
        s.amount_due = d("102000.02");
        assert!(matches!(
            s.validate_amount(d("102000.00"), &Config::default()),
            Err(Error::AmountMismatch { .. })
        ));

        // sync never overwrites a non-zero amount
        s.sync_amount(d("1"));
        assert_eq!(s.amount_due, d("102000.02"));
    }
}
