//! Payment ledger interface

use async_trait::async_trait;

use super::model::{Payment, PaymentMode, PaymentStatus};
use crate::domain::tariff::UtilityType;
use crate::domain::BillingResult;
use crate::shared::pagination::{PageRequest, Paginated};

#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Persist a new payment attempt.
    async fn insert(&self, payment: Payment) -> BillingResult<()>;

    /// Find payment by ID
    async fn find_by_id(&self, id: &str) -> BillingResult<Option<Payment>>;

    /// Atomically replace a payment that is still in `expected` status.
    /// Fails with `Conflict` when the stored status differs: the caller
    /// lost the settlement race and must not proceed.
    async fn settle(
        &self,
        id: &str,
        expected: PaymentStatus,
        next: Payment,
    ) -> BillingResult<Payment>;

    /// A consumer's payments, most recent first, optionally narrowed to
    /// one utility type.
    async fn find_for_consumer(
        &self,
        consumer_id: &str,
        utility_type: Option<UtilityType>,
        page: PageRequest,
    ) -> BillingResult<Paginated<Payment>>;

    /// Every payment, most recent first. `search` matches bill and
    /// consumer ids case-insensitively as a fragment; an empty search
    /// and an absent mode narrow nothing.
    async fn find_all(
        &self,
        search: Option<&str>,
        mode: Option<PaymentMode>,
        page: PageRequest,
    ) -> BillingResult<Paginated<Payment>>;
}
