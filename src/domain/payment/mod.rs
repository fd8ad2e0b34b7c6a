//! Payment aggregate
//!
//! Contains the Payment entity, its settlement state machine, and the
//! ledger interface.

pub mod model;
pub mod repository;

pub use model::{Payment, PaymentMode, PaymentStatus, SYSTEM_OPERATOR};
pub use repository::PaymentLedger;
