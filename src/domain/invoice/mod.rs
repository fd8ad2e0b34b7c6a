//! Invoice aggregate
//!
//! Contains the immutable invoice snapshot, the renderer input it
//! flattens into, and the ledger interface.

pub mod model;
pub mod repository;

pub use model::{Invoice, InvoicePdfData};
pub use repository::InvoiceLedger;
