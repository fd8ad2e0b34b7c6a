//! Day-range overdue penalty lookup

use rust_decimal::Decimal;

use super::model::OverduePenaltySlab;

/// Penalty owed on `amount` for a bill `days_late` past its due date.
///
/// The slab whose `[from_day, to_day]` range contains `days_late` decides
/// the percentage; the result is rounded to two decimal places with
/// banker's rounding. No matching slab means exactly zero, which also
/// covers `days_late <= 0` unless a slab explicitly starts at day 0.
pub fn calculate_penalty(
    amount: Decimal,
    days_late: i64,
    slabs: &[OverduePenaltySlab],
) -> Decimal {
    for slab in slabs {
        if days_late >= i64::from(slab.from_day) && days_late <= i64::from(slab.to_day) {
            return (amount * slab.penalty_percentage / Decimal::ONE_HUNDRED).round_dp(2);
        }
    }

    Decimal::ZERO
}

// ── Tests ──────────────────────────────────────────────────────
