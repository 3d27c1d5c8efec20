//! Commission computation
//!
//! Pure arithmetic over a configured rate schedule. No I/O. Recomputing
//! from the same inputs always yields the same four amounts.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Role of the user a contract is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrokerRole {
    /// Back-office administrator (earns no commission)
    Admin,
    /// In-house sales (earns no commission)
    Commercial,
    /// External broker, remunerated per grade
    Apporteur,
}

/// Remuneration grade of an apporteur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrokerGrade {
    /// Top grade (default 18% + 2000)
    Platine,
    /// Entry grade (default 10% + 1800)
    Freemium,
}

/// Rate + fixed fee applied to the net premium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLine {
    /// Proportional rate on the net premium (e.g. 0.18)
    pub rate: Decimal,
    /// Fixed fee added on top
    pub fixed_fee: Decimal,
}

impl RateLine {
    fn apply(&self, net_premium: Decimal) -> Decimal {
        self.rate * net_premium + self.fixed_fee
    }
}

/// Configured commission schedule
///
/// The insurer line reflects the insurer's own remuneration formula;
/// grade lines are the company's apporteur compensation plan. Both are
/// configuration, not code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSchedule {
    /// Insurer commission on the net premium
    pub insurer: RateLine,
    /// Platine apporteur line
    pub platine: RateLine,
    /// Freemium apporteur line
    pub freemium: RateLine,
}

impl Default for CommissionSchedule {
    fn default() -> Self {
        Self {
            insurer: RateLine {
                rate: Decimal::new(20, 2),
                fixed_fee: Decimal::new(3000, 0),
            },
            platine: RateLine {
                rate: Decimal::new(18, 2),
                fixed_fee: Decimal::new(2000, 0),
            },
            freemium: RateLine {
                rate: Decimal::new(10, 2),
                fixed_fee: Decimal::new(1800, 0),
            },
        }
    }
}

impl CommissionSchedule {
    fn grade_line(&self, grade: BrokerGrade) -> RateLine {
        match grade {
            BrokerGrade::Platine => self.platine,
            BrokerGrade::Freemium => self.freemium,
        }
    }
}

/// The four derived amounts of a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    /// What the insurer pays the company on this contract
    pub insurer_commission: Decimal,
    /// What the company pays the apporteur
    pub broker_commission: Decimal,
    /// insurer commission minus broker commission
    pub company_margin: Decimal,
    /// gross premium minus insurer commission: the amount the apporteur
    /// must remit to the company after collecting the premium
    pub net_payable: Decimal,
}

fn round2(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute the commission breakdown for one contract.
///
/// `grade` is ignored unless `role` is [`BrokerRole::Apporteur`]; an
/// apporteur without a grade falls back to Freemium (mirrors the account
/// provisioning rule).
pub fn compute(
    schedule: &CommissionSchedule,
    gross_premium: Decimal,
    net_premium: Decimal,
    role: BrokerRole,
    grade: Option<BrokerGrade>,
) -> CommissionBreakdown {
    let insurer_commission = round2(schedule.insurer.apply(net_premium));
    let broker_commission = match role {
        BrokerRole::Apporteur => {
            let line = schedule.grade_line(grade.unwrap_or(BrokerGrade::Freemium));
            round2(line.apply(net_premium))
        }
        BrokerRole::Admin | BrokerRole::Commercial => Decimal::ZERO,
    };
    CommissionBreakdown {
        insurer_commission,
        broker_commission,
        company_margin: round2(insurer_commission - broker_commission),
        net_payable: round2(gross_premium - insurer_commission),
    }
}
