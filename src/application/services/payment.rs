//! OTP-gated payment settlement and invoice issuance

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{info, warn};

use crate::application::ports::PdfRenderer;
use crate::application::services::billing::{BillingService, OutstandingBalance};
use crate::application::services::notify::Notifier;
use crate::domain::bill::Bill;
use crate::domain::error::{BillingError, BillingResult};
use crate::domain::invoice::Invoice;
use crate::domain::ledger::LedgerProvider;
use crate::domain::payment::{Payment, PaymentMode, PaymentStatus};
use crate::domain::tariff::UtilityType;
use crate::shared::pagination::{PageRequest, Paginated};

const ALREADY_PROCESSED: &str = "Payment already processed";

/// Service driving the two-phase payment protocol.
///
/// Online payments go `initiate` (OTP issued) then `confirm` (OTP
/// verified, bill settled, invoice composed). Counter payments skip the
/// OTP round-trip through `pay_offline`. Every settlement produces
/// exactly one invoice.
pub struct PaymentService {
    ledgers: Arc<dyn LedgerProvider>,
    billing: Arc<BillingService>,
    notifier: Notifier,
    pdf: Arc<dyn PdfRenderer>,
    otp_validity_minutes: i64,
    operator_id: String,
}

impl PaymentService {
    pub fn new(
        ledgers: Arc<dyn LedgerProvider>,
        billing: Arc<BillingService>,
        notifier: Notifier,
        pdf: Arc<dyn PdfRenderer>,
        otp_validity_minutes: i64,
        operator_id: String,
    ) -> Self {
        Self {
            ledgers,
            billing,
            notifier,
            pdf,
            otp_validity_minutes,
            operator_id,
        }
    }

    /// Start an online payment for a payable bill.
    ///
    /// Issues a 6-digit OTP with a wall-clock expiry and records the
    /// payment as initiated. The OTP mail is best-effort and never
    /// blocks the payment record.
    pub async fn initiate(&self, bill_id: &str) -> BillingResult<Payment> {
        let bill = self.billing.bill(bill_id).await?;
        if !bill.is_payable() {
            return Err(BillingError::BusinessRule(format!(
                "Bill {} is not payable in status {}",
                bill.id, bill.status
            )));
        }

        let now = Utc::now();
        let otp = rand::thread_rng().gen_range(100_000..=999_999).to_string();
        let expires_at = now + Duration::minutes(self.otp_validity_minutes);
        let payment = Payment::new_online(&bill, otp.clone(), expires_at, now);

        self.ledgers.payments().insert(payment.clone()).await?;

        info!(
            payment_id = %payment.id,
            bill_id = %bill.id,
            amount = %payment.amount,
            "💳 Payment initiated"
        );

        self.notifier
            .payment_otp(&payment, &otp, self.otp_validity_minutes)
            .await;

        Ok(payment)
    }

    /// Confirm an initiated payment with its OTP and settle the bill.
    ///
    /// A wrong or expired OTP moves the payment to `Failed` for good; a
    /// payment already in a terminal state conflicts. Marking the bill
    /// paid claims the settlement, so a payment racing an already
    /// settled bill conflicts while still `Initiated`, and the invoice
    /// snapshot is always taken from the settled bill.
    pub async fn confirm(&self, payment_id: &str, otp: &str) -> BillingResult<Invoice> {
        let payment = self
            .ledgers
            .payments()
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Payment", "id", payment_id))?;

        if payment.status != PaymentStatus::Initiated {
            return Err(BillingError::Conflict(ALREADY_PROCESSED.to_string()));
        }

        let now = Utc::now();

        if !payment.otp_matches(otp, now) {
            let mut failed = payment.clone();
            failed.fail();
            let failed = self
                .ledgers
                .payments()
                .settle(payment_id, PaymentStatus::Initiated, failed)
                .await
                .map_err(Self::race_lost)?;

            warn!(payment_id, bill_id = %failed.bill_id, "Payment rejected, invalid or expired OTP");
            self.notifier.payment_failed(&failed).await;

            return Err(BillingError::InvalidOrExpiredOtp);
        }

        // The bill claim decides competing settlements; a payment losing
        // the race conflicts here and never leaves Initiated.
        let bill = self.billing.mark_paid(&payment.bill_id).await?;

        let mut succeeded = payment.clone();
        succeeded.succeed(now);
        let settled = self
            .ledgers
            .payments()
            .settle(payment_id, PaymentStatus::Initiated, succeeded)
            .await
            .map_err(Self::race_lost)?;

        let invoice = self.issue_invoice(&bill, &settled, now).await?;

        info!(
            payment_id,
            bill_id = %bill.id,
            amount = %settled.amount,
            "✅ Payment confirmed"
        );

        Ok(invoice)
    }

    /// Record a counter payment taken by an operator.
    ///
    /// The payment is born settled, the bill is marked paid, and the
    /// invoice is composed and mailed exactly as in the online flow.
    pub async fn pay_offline(&self, bill_id: &str, mode: PaymentMode) -> BillingResult<Invoice> {
        if mode == PaymentMode::Online {
            return Err(BillingError::Validation(
                "Offline settlement requires a non-online payment mode".to_string(),
            ));
        }

        let bill = self.billing.bill(bill_id).await?;
        if !bill.is_payable() {
            return Err(BillingError::BusinessRule(format!(
                "Bill {} is not payable in status {}",
                bill.id, bill.status
            )));
        }

        let now = Utc::now();
        let payment = Payment::new_offline(&bill, mode, self.operator_id.clone(), now);
        self.ledgers.payments().insert(payment.clone()).await?;

        self.billing.mark_paid(&bill.id).await?;
        let bill = self.billing.bill(&bill.id).await?;

        let invoice = self.issue_invoice(&bill, &payment, now).await?;

        info!(
            payment_id = %payment.id,
            bill_id = %bill.id,
            mode = %payment.mode,
            operator = %payment.processed_by,
            "✅ Offline payment recorded"
        );

        Ok(invoice)
    }

    /// A consumer's payment history, most recent first.
    pub async fn history(
        &self,
        consumer_id: &str,
        utility_type: Option<UtilityType>,
        page: PageRequest,
    ) -> BillingResult<Paginated<Payment>> {
        self.ledgers
            .payments()
            .find_for_consumer(consumer_id, utility_type, page)
            .await
    }

    /// Every payment on the ledger, most recent first, optionally
    /// narrowed by an id fragment and a payment mode.
    pub async fn all_payments(
        &self,
        search: Option<&str>,
        mode: Option<PaymentMode>,
        page: PageRequest,
    ) -> BillingResult<Paginated<Payment>> {
        self.ledgers.payments().find_all(search, mode, page).await
    }

    /// A consumer's invoices, newest first.
    pub async fn invoices(
        &self,
        consumer_id: &str,
        page: PageRequest,
    ) -> BillingResult<Paginated<Invoice>> {
        self.ledgers
            .invoices()
            .find_for_consumer(consumer_id, page)
            .await
    }

    /// Re-render the invoice PDF for a settled payment.
    ///
    /// Returns the attachment file name and the bytes. This is the
    /// direct download path; unlike the settlement mail it propagates
    /// render failures.
    pub async fn invoice_pdf(&self, payment_id: &str) -> BillingResult<(String, Vec<u8>)> {
        let invoice = self
            .ledgers
            .invoices()
            .find_by_payment_id(payment_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Invoice", "payment_id", payment_id))?;

        let bytes = self.pdf.render(&invoice.pdf_data()).await?;
        Ok((invoice.pdf_file_name(), bytes))
    }

    /// Outstanding balance across the consumer's open bills.
    pub async fn outstanding(&self, consumer_id: &str) -> BillingResult<OutstandingBalance> {
        self.billing.outstanding_balance(consumer_id).await
    }

    async fn issue_invoice(
        &self,
        bill: &Bill,
        payment: &Payment,
        now: DateTime<Utc>,
    ) -> BillingResult<Invoice> {
        let invoice = Invoice::compose(bill, payment, now);
        self.ledgers.invoices().insert(invoice.clone()).await?;

        info!(
            invoice_id = %invoice.id,
            payment_id = %payment.id,
            bill_id = %bill.id,
            "Invoice issued"
        );

        match self.pdf.render(&invoice.pdf_data()).await {
            Ok(bytes) => self.notifier.invoice_ready(&invoice, bytes).await,
            Err(err) => {
                warn!(invoice_id = %invoice.id, error = %err, "Invoice PDF render failed, skipping mail");
            }
        }

        Ok(invoice)
    }

    fn race_lost(err: BillingError) -> BillingError {
        match err {
            BillingError::Conflict(_) => BillingError::Conflict(ALREADY_PROCESSED.to_string()),
            other => other,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
