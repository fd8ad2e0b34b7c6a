//! Tariff schedule entity and slab pricing

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Utility category a meter is billed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UtilityType {
    Electricity,
    Water,
    Gas,
}

impl std::fmt::Display for UtilityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Electricity => write!(f, "ELECTRICITY"),
            Self::Water => write!(f, "WATER"),
            Self::Gas => write!(f, "GAS"),
        }
    }
}

/// Consumption range priced at a single rate.
///
/// `from_unit`/`to_unit` are the inclusive unit indexes the tariff authors
/// configure (`0-100`, `101-300`, ...): a slab covers consumption above the
/// previous slab's `to_unit`, up to and including its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffSlab {
    pub from_unit: u32,
    pub to_unit: u32,
    pub rate_per_unit: Decimal,
}

/// Day-range surcharge applied to unpaid bills past their due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverduePenaltySlab {
    pub from_day: u32,
    pub to_day: u32,
    pub penalty_percentage: Decimal,
}

/// Active pricing configuration for a (utility type, plan) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffSchedule {
    pub utility_type: UtilityType,
    pub plan: String,
    pub active: bool,
    pub slabs: Vec<TariffSlab>,
    pub fixed_charge: Decimal,
    pub tax_percentage: Decimal,
    pub overdue_penalty_slabs: Vec<OverduePenaltySlab>,
    pub effective_from: Option<NaiveDate>,
}

impl TariffSchedule {
    /// Price `units` of consumption across the slabs.
    ///
    /// Slabs are walked in `from_unit` order, each billing the portion of
    /// the still-unbilled units it covers. Units beyond the last slab's
    /// `to_unit` are billed at the last slab's rate (open-ended top slab).
    pub fn energy_charge(&self, units: Decimal) -> Decimal {
        if units <= Decimal::ZERO || self.slabs.is_empty() {
            return Decimal::ZERO;
        }

        let mut slabs: Vec<&TariffSlab> = self.slabs.iter().collect();
        slabs.sort_by_key(|s| s.from_unit);

        let mut energy = Decimal::ZERO;
        let mut remaining = units;
        let mut last_rate = Decimal::ZERO;

        for slab in slabs {
            if remaining <= Decimal::ZERO {
                break;
            }
            // A slab starting at N covers units above N-1; the 0-based
            // first slab covers from the very first unit.
            let lower = slab.from_unit.saturating_sub(1);
            if slab.to_unit <= lower {
                continue;
            }
            let span = Decimal::from(slab.to_unit - lower);
            let portion = remaining.min(span);
            energy += portion * slab.rate_per_unit;
            remaining -= portion;
            last_rate = slab.rate_per_unit;
        }

        if remaining > Decimal::ZERO {
            energy += remaining * last_rate;
        }

        energy
    }

    /// Full charge breakdown for `units`: slab energy charge, the plan's
    /// fixed charge, and tax on (energy + fixed).
    pub fn charge_breakdown(&self, units: Decimal) -> ChargeBreakdown {
        let energy_charge = self.energy_charge(units);
        let tax_amount =
            (energy_charge + self.fixed_charge) * self.tax_percentage / Decimal::ONE_HUNDRED;

        ChargeBreakdown {
            energy_charge,
            fixed_charge: self.fixed_charge,
            tax_amount,
            total: energy_charge + self.fixed_charge + tax_amount,
        }
    }
}

/// Charge components of a freshly priced billing cycle (no penalty yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeBreakdown {
    pub energy_charge: Decimal,
    pub fixed_charge: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

// ── Tests ──────────────────────────────────────────────────────
