//! Shared fixtures: a store seeded with one issued contract and its
//! pending settlement.

use brokerage_core::{
    plate, BrokerGrade, BrokerRole, CommissionSchedule, Contract, DocumentLinks, PremiumBreakdown,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use settlement::{Settlement, SettlementStore};
use std::sync::Arc;

pub fn issued_contract(id: u64) -> Contract {
    let mut contract = Contract::new(
        id,
        "C00042",
        plate::normalize("DK-0001-BB").unwrap(),
        7,
        BrokerRole::Apporteur,
        Some(BrokerGrade::Platine),
        PremiumBreakdown {
            net: "100000".parse().unwrap(),
            accessories: "5000".parse().unwrap(),
            guarantee_fund: "2500".parse().unwrap(),
            taxes: "17500".parse().unwrap(),
            gross: "125000".parse().unwrap(),
        },
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        12,
        &CommissionSchedule::default(),
    )
    .unwrap();
    contract
        .mark_issued(
            "POL-1",
            "2026F001",
            DocumentLinks {
                attestation: "https://docs/att.pdf".to_string(),
                brown_card: String::new(),
            },
        )
        .unwrap();
    contract
}

/// Store with one pending settlement owing 102000.00
pub async fn seeded_store() -> (Arc<SettlementStore>, Settlement) {
    let store = Arc::new(SettlementStore::new(settlement::Config::default()));
    let settlement = store
        .declare_for_contract(&issued_contract(42))
        .await
        .unwrap();
    assert_eq!(settlement.amount_due, Decimal::new(10200000, 2));
    (store, settlement)
}
