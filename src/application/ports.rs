//! Upstream ports: interfaces to the collaborators the engine composes over
//!
//! The engine owns billing math and settlement state; meter records,
//! consumer records, tariff plans, mail delivery, and PDF rendering live
//! in neighbouring services. Each one sits behind a trait here so the
//! embedding application wires real clients while tests plug in fakes.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::error::BillingResult;
use crate::domain::tariff::{TariffSchedule, UtilityType};

// ── Meter directory ────────────────────────────────────────────

/// Meter record as held by the metering service.
#[derive(Debug, Clone)]
pub struct MeterInfo {
    pub meter_number: String,
    pub active: bool,
    pub consumer_id: String,
    pub utility_type: UtilityType,
    pub tariff_plan: String,
}

/// Port to the metering service.
#[async_trait]
pub trait MeterDirectory: Send + Sync {
    /// Look up a meter by its number. `None` when unregistered.
    async fn get_meter(&self, meter_number: &str) -> BillingResult<Option<MeterInfo>>;

    /// Latest cumulative reading recorded for the meter.
    async fn last_reading(&self, meter_number: &str) -> BillingResult<Decimal>;
}

// ── Tariff provider ────────────────────────────────────────────

/// Port to the tariff service.
///
/// Implementations must surface unreachability as
/// [`BillingError::Unavailable`](crate::domain::BillingError::Unavailable)
/// rather than silently serving stale data.
#[async_trait]
pub trait TariffProvider: Send + Sync {
    /// Active pricing schedule for a (utility type, plan) pair.
    async fn active_schedule(
        &self,
        utility_type: UtilityType,
        plan: &str,
    ) -> BillingResult<TariffSchedule>;
}

// ── Consumer directory ─────────────────────────────────────────

/// Consumer record as held by the consumer service.
#[derive(Debug, Clone)]
pub struct ConsumerInfo {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Port to the consumer service.
#[async_trait]
pub trait ConsumerDirectory: Send + Sync {
    /// Look up a consumer by id. `None` when no record exists.
    async fn get(&self, consumer_id: &str) -> BillingResult<Option<ConsumerInfo>>;
}

// ── Notification sender ────────────────────────────────────────

/// Category tag carried on every outbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    BillGenerated,
    BillOverdue,
    PaymentOtp,
    PaymentFailed,
    InvoicePdf,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::BillGenerated => "BILL_GENERATED",
            Self::BillOverdue => "BILL_OVERDUE",
            Self::PaymentOtp => "PAYMENT_OTP",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::InvoicePdf => "INVOICE_PDF",
        };
        write!(f, "{}", s)
    }
}

/// File attached to a notification.
#[derive(Debug, Clone)]
pub struct NotificationAttachment {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Outbound notification request.
#[derive(Debug, Clone)]
pub struct Notification {
    pub email: String,
    pub kind: NotificationKind,
    pub subject: String,
    pub message: String,
    pub attachment: Option<NotificationAttachment>,
}

/// Port to the notification service.
///
/// Callers treat delivery as fire-and-forget; send errors are logged
/// and discarded by the dispatch helper, never propagated.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: Notification) -> BillingResult<()>;
}

// ── PDF renderer ───────────────────────────────────────────────

/// Port to the invoice PDF renderer.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Render the invoice data into PDF bytes.
    async fn render(
        &self,
        data: &crate::domain::invoice::InvoicePdfData,
    ) -> BillingResult<Vec<u8>>;
}
