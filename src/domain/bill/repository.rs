//! Bill ledger interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Bill, BillStatus};
use crate::domain::BillingResult;
use crate::shared::pagination::{PageRequest, Paginated};

#[async_trait]
pub trait BillLedger: Send + Sync {
    /// Persist a new bill. Fails with `Conflict` when the meter already
    /// has a bill that is not yet paid.
    async fn insert(&self, bill: Bill) -> BillingResult<()>;

    /// Persist changes to an existing bill. The stored version must match
    /// `bill.version`; a mismatch fails with `Conflict` (lost update).
    /// Returns the stored bill with its bumped version.
    async fn update(&self, bill: Bill) -> BillingResult<Bill>;

    /// Find bill by ID
    async fn find_by_id(&self, id: &str) -> BillingResult<Option<Bill>>;

    /// Most recent bill for a meter, by generation time.
    async fn find_latest_for_meter(&self, meter_number: &str) -> BillingResult<Option<Bill>>;

    /// Due bills whose due date lies before `cutoff`.
    async fn find_due_before(&self, cutoff: DateTime<Utc>) -> BillingResult<Vec<Bill>>;

    /// Overdue bills that have not been settled yet.
    async fn find_overdue_unresolved(&self) -> BillingResult<Vec<Bill>>;

    /// A consumer's bills, newest first.
    async fn find_for_consumer(
        &self,
        consumer_id: &str,
        page: PageRequest,
    ) -> BillingResult<Paginated<Bill>>;

    /// All bills, optionally filtered by status, newest first.
    async fn find_all(
        &self,
        status: Option<BillStatus>,
        page: PageRequest,
    ) -> BillingResult<Paginated<Bill>>;

    /// A consumer's bills that still carry a balance.
    async fn find_open_for_consumer(&self, consumer_id: &str) -> BillingResult<Vec<Bill>>;
}
