//! Tariff aggregate
//!
//! Contains the tariff schedule entity, slab pricing, and the overdue
//! penalty lookup. Schedules are configured upstream and fetched through
//! the `TariffProvider` port; nothing here is persisted locally.

pub mod model;
pub mod penalty;

pub use model::{ChargeBreakdown, OverduePenaltySlab, TariffSchedule, TariffSlab, UtilityType};
pub use penalty::calculate_penalty;
