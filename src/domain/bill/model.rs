//! Bill domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::tariff::{ChargeBreakdown, UtilityType};

/// Bill lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    /// Awaiting payment, due date not yet passed
    Due,
    /// Past due date, accruing penalties
    Overdue,
    /// Settled; terminal
    Paid,
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Due => write!(f, "DUE"),
            Self::Overdue => write!(f, "OVERDUE"),
            Self::Paid => write!(f, "PAID"),
        }
    }
}

/// One billing cycle for a meter.
///
/// Created by bill generation, mutated only by the overdue escalator
/// (status/penalty) and by settlement (status to `Paid`); never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,
    pub meter_number: String,
    pub consumer_id: String,
    pub utility_type: UtilityType,
    pub tariff_plan: String,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub units_consumed: Decimal,
    pub energy_charge: Decimal,
    pub fixed_charge: Decimal,
    pub tax_amount: Decimal,
    pub penalty_amount: Decimal,
    pub total_amount: Decimal,
    pub status: BillStatus,
    pub generated_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    /// Bumped by the ledger on every update; concurrent writers with a
    /// stale version are rejected instead of overwriting each other.
    pub version: u64,
}

impl Bill {
    pub fn new(
        meter_number: impl Into<String>,
        consumer_id: impl Into<String>,
        utility_type: UtilityType,
        tariff_plan: impl Into<String>,
        previous_reading: Decimal,
        current_reading: Decimal,
        charges: ChargeBreakdown,
        generated_at: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            meter_number: meter_number.into(),
            consumer_id: consumer_id.into(),
            utility_type,
            tariff_plan: tariff_plan.into(),
            previous_reading,
            current_reading,
            units_consumed: current_reading - previous_reading,
            energy_charge: charges.energy_charge,
            fixed_charge: charges.fixed_charge,
            tax_amount: charges.tax_amount,
            penalty_amount: Decimal::ZERO,
            total_amount: charges.total,
            status: BillStatus::Due,
            generated_at,
            due_date,
            version: 0,
        }
    }

    /// Whether this bill can still be paid (due or overdue).
    pub fn is_payable(&self) -> bool {
        matches!(self.status, BillStatus::Due | BillStatus::Overdue)
    }

    pub fn is_settled(&self) -> bool {
        self.status == BillStatus::Paid
    }

    /// Whole days this bill is past due at `now`; negative before the
    /// due date.
    pub fn days_late(&self, now: DateTime<Utc>) -> i64 {
        (now - self.due_date).num_days()
    }

    /// Charges before any penalty; the base the penalty is computed on.
    pub fn base_amount(&self) -> Decimal {
        self.energy_charge + self.fixed_charge + self.tax_amount
    }

    /// Replace the penalty and rebuild the total from its components.
    /// The penalty is always set from scratch, never accumulated.
    pub fn apply_penalty(&mut self, penalty: Decimal) {
        self.penalty_amount = penalty;
        self.total_amount = self.base_amount() + penalty;
    }

    pub fn mark_overdue(&mut self) {
        self.status = BillStatus::Overdue;
    }

    pub fn mark_paid(&mut self) {
        self.status = BillStatus::Paid;
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_bill() -> Bill {
        let charges = ChargeBreakdown {
            energy_charge: dec!(600),
            fixed_charge: dec!(50),
            tax_amount: dec!(65),
            total: dec!(715),
        };
        let generated_at = Utc::now();
        Bill::new(
            "M1",
            "C1",
            UtilityType::Electricity,
            "DOMESTIC",
            dec!(0),
            dec!(120),
            charges,
            generated_at,
            generated_at + chrono::Duration::days(15),
        )
    }

    #[test]
    fn new_bill_is_due_with_zero_penalty() {
        let b = sample_bill();
        assert_eq!(b.status, BillStatus::Due);
        assert_eq!(b.penalty_amount, Decimal::ZERO);
        assert_eq!(b.units_consumed, dec!(120));
        assert_eq!(b.total_amount, dec!(715));
        assert_eq!(b.version, 0);
        assert!(b.is_payable());
        assert!(!b.is_settled());
    }

    #[test]
    fn total_is_sum_of_components() {
        let b = sample_bill();
        assert_eq!(
            b.total_amount,
            b.energy_charge + b.fixed_charge + b.tax_amount + b.penalty_amount
        );
    }

    #[test]
    fn apply_penalty_rebuilds_total() {
        let mut b = sample_bill();
        b.apply_penalty(dec!(35.75));
        assert_eq!(b.penalty_amount, dec!(35.75));
        assert_eq!(b.total_amount, dec!(750.75));

        // Recompute replaces, never adds on top
        b.apply_penalty(dec!(10));
        assert_eq!(b.total_amount, dec!(725));
        assert_eq!(
            b.total_amount,
            b.energy_charge + b.fixed_charge + b.tax_amount + b.penalty_amount
        );
    }

    #[test]
    fn days_late_counts_whole_days() {
        let b = sample_bill();
        assert_eq!(b.days_late(b.due_date), 0);
        assert_eq!(b.days_late(b.due_date + chrono::Duration::hours(30)), 1);
        assert_eq!(b.days_late(b.due_date + chrono::Duration::days(3)), 3);
        assert!(b.days_late(b.generated_at) < 0);
    }

    #[test]
    fn overdue_bills_remain_payable() {
        let mut b = sample_bill();
        b.mark_overdue();
        assert_eq!(b.status, BillStatus::Overdue);
        assert!(b.is_payable());
    }

    #[test]
    fn paid_bills_are_settled() {
        let mut b = sample_bill();
        b.mark_paid();
        assert_eq!(b.status, BillStatus::Paid);
        assert!(!b.is_payable());
        assert!(b.is_settled());
    }

    #[test]
    fn bill_status_display() {
        assert_eq!(BillStatus::Due.to_string(), "DUE");
        assert_eq!(BillStatus::Overdue.to_string(), "OVERDUE");
        assert_eq!(BillStatus::Paid.to_string(), "PAID");
    }
}
