//! Concurrent settlement store with per-row locking
//!
//! Webhook deliveries for the same settlement can arrive concurrently;
//! the per-row async mutex serializes them so a settlement can never be
//! credited twice. A state transition and its audit entry are committed
//! under the same lock, both-or-neither: the transition methods mutate
//! nothing until every guard has passed, and the entry they return is
//! appended before the lock is released.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{HistoryEntry, Settlement, SettlementStatus};
use brokerage_core::Contract;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

/// A settlement row together with its audit trail. History entries live
/// and die with the row.
#[derive(Debug)]
struct Row {
    settlement: Settlement,
    history: Vec<HistoryEntry>,
}

/// In-process settlement store.
///
/// Rows are never removed: cancellation is a terminal state, not a
/// deletion.
#[derive(Debug)]
pub struct SettlementStore {
    config: Config,
    rows: DashMap<u64, Arc<Mutex<Row>>>,
    by_contract: DashMap<u64, u64>,
    next_id: AtomicU64,
}

impl SettlementStore {
    /// Empty store
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rows: DashMap::new(),
            by_contract: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Settlement configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create (or fetch) the settlement owed on a contract.
    ///
    /// The contract must be valid (issued with a document) and must owe
    /// the apporteur a positive commission; the amount due is the
    /// contract's net-payable figure. A second call for the same
    /// contract returns the existing settlement, re-synchronizing the
    /// amount while it is still pending.
    pub async fn declare_for_contract(&self, contract: &Contract) -> Result<Settlement> {
        if !contract.is_valid() {
            return Err(Error::NotEligible(
                "contract is not issued or has no document".to_string(),
            ));
        }
        if contract.commissions.broker_commission <= Decimal::ZERO {
            return Err(Error::NotEligible(
                "no apporteur commission on this contract".to_string(),
            ));
        }
        let expected = contract.commissions.net_payable;

        if let Some(id) = self.by_contract.get(&contract.id).map(|e| *e) {
            let row = self.row(id)?;
            let mut guard = row.lock().await;
            if guard.settlement.is_pending() && guard.settlement.amount_due != expected {
                guard.settlement.amount_due = expected;
                guard.settlement.updated_at = chrono::Utc::now();
            }
            return Ok(guard.settlement.clone());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut settlement = Settlement::new(id, contract.id, Decimal::ZERO);
        settlement.sync_amount(expected);
        settlement.validate_amount(expected, &self.config)?;
        let creation = settlement.creation_entry(None);
        info!(settlement = id, contract = contract.id, due = %settlement.amount_due, "settlement created");

        self.rows.insert(
            id,
            Arc::new(Mutex::new(Row {
                settlement: settlement.clone(),
                history: vec![creation],
            })),
        );
        self.by_contract.insert(contract.id, id);
        Ok(settlement)
    }

    fn row(&self, id: u64) -> Result<Arc<Mutex<Row>>> {
        self.rows
            .get(&id)
            .map(|e| e.clone())
            .ok_or(Error::NotFound(id))
    }

    /// Snapshot of a settlement
    pub async fn get(&self, id: u64) -> Result<Settlement> {
        let row = self.row(id)?;
        let guard = row.lock().await;
        Ok(guard.settlement.clone())
    }

    /// Settlement id for a contract, when one exists
    pub fn id_for_contract(&self, contract_id: u64) -> Option<u64> {
        self.by_contract.get(&contract_id).map(|e| *e)
    }

    /// Snapshot of a settlement's audit trail
    pub async fn history(&self, id: u64) -> Result<Vec<HistoryEntry>> {
        let row = self.row(id)?;
        let guard = row.lock().await;
        Ok(guard.history.clone())
    }

    /// Take the row lock, serializing every mutation of this settlement
    /// until the guard is dropped.
    pub async fn lock_row(&self, id: u64) -> Result<RowGuard> {
        let row = self.row(id)?;
        Ok(RowGuard {
            config: self.config.clone(),
            guard: row.lock_owned().await,
        })
    }

    /// Totals per status over the whole store (back-office dashboard)
    pub async fn totals(&self) -> [(SettlementStatus, Decimal); 3] {
        let mut totals = [
            (SettlementStatus::EnAttente, Decimal::ZERO),
            (SettlementStatus::Paye, Decimal::ZERO),
            (SettlementStatus::Annule, Decimal::ZERO),
        ];
        for entry in self.rows.iter() {
            let guard = entry.value().lock().await;
            for (status, total) in totals.iter_mut() {
                if guard.settlement.status == *status {
                    *total += guard.settlement.amount_due;
                }
            }
        }
        totals
    }
}

/// Exclusive handle on one settlement row.
///
/// All mutations go through this guard so the transition and its audit
/// entry land atomically while concurrent deliveries wait.
#[derive(Debug)]
pub struct RowGuard {
    config: Config,
    guard: OwnedMutexGuard<Row>,
}

impl RowGuard {
    /// Current state of the locked settlement
    pub fn settlement(&self) -> &Settlement {
        &self.guard.settlement
    }

    /// Audit trail of the locked settlement
    pub fn history(&self) -> &[HistoryEntry] {
        &self.guard.history
    }

    /// Validate the payment: transition to PAYE and append the
    /// VALIDATION entry.
    pub fn mark_paid(
        &mut self,
        method: &str,
        reference: &str,
        payer_account: Option<&str>,
        actor: Option<&str>,
    ) -> Result<()> {
        let entry =
            self.guard
                .settlement
                .mark_paid(method, reference, payer_account, actor, &self.config)?;
        self.guard.history.push(entry);
        Ok(())
    }

    /// Cancel the settlement; no-op when already cancelled.
    pub fn cancel(&mut self, actor: Option<&str>, reason: &str) -> Result<()> {
        if let Some(entry) = self.guard.settlement.cancel(actor, reason)? {
            self.guard.history.push(entry);
        }
        Ok(())
    }

    /// Record the gateway charge id / op token returned at payment
    /// initiation.
    pub fn set_gateway_refs(&mut self, charge_id: Option<&str>, op_token: Option<&str>) {
        let settlement = &mut self.guard.settlement;
        if let Some(charge_id) = charge_id.filter(|s| !s.is_empty()) {
            settlement.transaction_reference = charge_id.to_string();
        }
        if let Some(op_token) = op_token.filter(|s| !s.is_empty()) {
            settlement.op_token = op_token.to_string();
        }
        settlement.updated_at = chrono::Utc::now();
    }
}
