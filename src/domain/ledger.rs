//! Ledger aggregation
//!
//! Single access point for every ledger the engine persists through,
//! so a storage backend is swapped in one place.

use crate::domain::bill::BillLedger;
use crate::domain::invoice::InvoiceLedger;
use crate::domain::payment::PaymentLedger;

/// Provides access to all ledgers.
///
/// Consumers request only the ledger they need:
///
/// ```ignore
/// async fn settle(ledgers: &dyn LedgerProvider) {
///     let bill = ledgers.bills().find_by_id("B001").await?;
///     let payment = ledgers.payments().find_by_id("P001").await?;
/// }
/// ```
pub trait LedgerProvider: Send + Sync {
    fn bills(&self) -> &dyn BillLedger;
    fn payments(&self) -> &dyn PaymentLedger;
    fn invoices(&self) -> &dyn InvoiceLedger;
}
