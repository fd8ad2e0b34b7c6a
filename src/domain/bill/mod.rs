//! Bill aggregate
//!
//! Contains the Bill entity, its lifecycle, and the ledger interface.

pub mod model;
pub mod repository;

pub use model::{Bill, BillStatus};
pub use repository::BillLedger;
