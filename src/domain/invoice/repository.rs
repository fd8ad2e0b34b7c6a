//! Invoice ledger interface

use async_trait::async_trait;

use crate::domain::error::BillingResult;
use crate::domain::invoice::model::Invoice;
use crate::shared::pagination::{PageRequest, Paginated};

/// Append-only store of settlement invoices.
#[async_trait]
pub trait InvoiceLedger: Send + Sync {
    /// Persist a new invoice.
    ///
    /// Returns `Conflict` when an invoice already exists for the same
    /// payment, keeping settlement exactly-once.
    async fn insert(&self, invoice: Invoice) -> BillingResult<()>;

    async fn find_by_payment_id(&self, payment_id: &str) -> BillingResult<Option<Invoice>>;

    async fn find_for_consumer(
        &self,
        consumer_id: &str,
        page: PageRequest,
    ) -> BillingResult<Paginated<Invoice>>;
}
