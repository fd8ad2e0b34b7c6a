//! Best-effort notification dispatch
//!
//! Every billing and settlement path sends mail through this helper.
//! Delivery failures (and failed consumer lookups on the way) are
//! logged and discarded; no state transition ever waits on or rolls
//! back for a notification.

use std::sync::Arc;

use tracing::warn;

use crate::application::ports::{
    ConsumerDirectory, Notification, NotificationAttachment, NotificationKind, NotificationSender,
};
use crate::domain::bill::Bill;
use crate::domain::invoice::Invoice;
use crate::domain::payment::Payment;

/// Resolves consumer emails and dispatches notifications, swallowing
/// every failure.
#[derive(Clone)]
pub struct Notifier {
    consumers: Arc<dyn ConsumerDirectory>,
    sender: Arc<dyn NotificationSender>,
}

impl Notifier {
    pub fn new(consumers: Arc<dyn ConsumerDirectory>, sender: Arc<dyn NotificationSender>) -> Self {
        Self { consumers, sender }
    }

    /// Notify a consumer that a new bill was generated. The email is
    /// passed in because bill generation has already resolved the
    /// consumer record.
    pub async fn bill_generated(&self, bill: &Bill, email: &str) {
        let notification = Notification {
            email: email.to_string(),
            kind: NotificationKind::BillGenerated,
            subject: format!("New {} bill generated", bill.utility_type),
            message: format!(
                "A new {} bill with id: {} has been generated for meter {}.\n\
                 Units consumed: {}\nTotal amount: {}\nDue date: {}",
                bill.utility_type,
                bill.id,
                bill.meter_number,
                bill.units_consumed,
                bill.total_amount,
                bill.due_date.date_naive(),
            ),
            attachment: None,
        };
        self.deliver(notification).await;
    }

    /// Notify a consumer that a bill has passed its due date.
    pub async fn bill_overdue(&self, bill: &Bill) {
        self.dispatch(&bill.consumer_id, |email| Notification {
            email,
            kind: NotificationKind::BillOverdue,
            subject: format!("{} bill overdue", bill.utility_type),
            message: format!(
                "Your {} bill with id: {} is now overdue.\nAmount due: {}\n\
                 Please pay at the earliest to avoid late payment penalties.",
                bill.utility_type, bill.id, bill.total_amount,
            ),
            attachment: None,
        })
        .await;
    }

    /// Notify a consumer of a freshly recomputed late payment penalty.
    pub async fn penalty_applied(&self, bill: &Bill, days_late: i64) {
        self.dispatch(&bill.consumer_id, |email| Notification {
            email,
            kind: NotificationKind::BillOverdue,
            subject: format!("Late payment penalty on your {} bill", bill.utility_type),
            message: format!(
                "Your {} bill with id: {} is {} days overdue.\n\
                 A late payment penalty of {} has been applied.\n\
                 Total amount now due: {}",
                bill.utility_type, bill.id, days_late, bill.penalty_amount, bill.total_amount,
            ),
            attachment: None,
        })
        .await;
    }

    /// Send the OTP for an initiated online payment.
    pub async fn payment_otp(&self, payment: &Payment, otp: &str, validity_minutes: i64) {
        self.dispatch(&payment.consumer_id, |email| Notification {
            email,
            kind: NotificationKind::PaymentOtp,
            subject: format!("OTP for {} bill payment", payment.utility_type),
            message: format!(
                "Payment initiated with id: {}\n\
                 Your OTP for {} paying bill with id {} is: {}\n\n\
                 This OTP is valid for {} minutes.",
                payment.id, payment.utility_type, payment.bill_id, otp, validity_minutes,
            ),
            attachment: None,
        })
        .await;
    }

    /// Tell a consumer their payment attempt was rejected.
    pub async fn payment_failed(&self, payment: &Payment) {
        self.dispatch(&payment.consumer_id, |email| Notification {
            email,
            kind: NotificationKind::PaymentFailed,
            subject: "Payment failed".to_string(),
            message: format!(
                "Your payment for {} bill with id: {} failed due to invalid or expired OTP.",
                payment.utility_type, payment.bill_id,
            ),
            attachment: None,
        })
        .await;
    }

    /// Mail the settlement invoice with the rendered PDF attached.
    pub async fn invoice_ready(&self, invoice: &Invoice, pdf: Vec<u8>) {
        self.dispatch(&invoice.consumer_id, |email| Notification {
            email,
            kind: NotificationKind::InvoicePdf,
            subject: format!("Invoice for {} Bill", invoice.utility_type),
            message: format!(
                "Please find attached your invoice for payment ID: {}",
                invoice.payment_id,
            ),
            attachment: Some(NotificationAttachment {
                file_name: invoice.pdf_file_name(),
                content: pdf,
            }),
        })
        .await;
    }

    async fn dispatch(&self, consumer_id: &str, build: impl FnOnce(String) -> Notification) {
        match self.consumers.get(consumer_id).await {
            Ok(Some(consumer)) => self.deliver(build(consumer.email)).await,
            Ok(None) => {
                warn!(consumer_id, "Skipping notification, consumer not found");
            }
            Err(err) => {
                warn!(consumer_id, error = %err, "Skipping notification, consumer lookup failed");
            }
        }
    }

    async fn deliver(&self, notification: Notification) {
        let kind = notification.kind;
        let email = notification.email.clone();
        if let Err(err) = self.sender.send(notification).await {
            warn!(kind = %kind, email = %email, error = %err, "Notification dispatch failed");
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ConsumerInfo;
    use crate::domain::error::{BillingError, BillingResult};
    use crate::domain::tariff::{ChargeBreakdown, UtilityType};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct SingleConsumer;

    #[async_trait]
    impl ConsumerDirectory for SingleConsumer {
        async fn get(&self, consumer_id: &str) -> BillingResult<Option<ConsumerInfo>> {
            if consumer_id == "C1" {
                Ok(Some(ConsumerInfo {
                    id: "C1".into(),
                    name: "Asha".into(),
                    email: "asha@example.com".into(),
                }))
            } else {
                Ok(None)
            }
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<Notification>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, notification: Notification) -> BillingResult<()> {
            if self.fail {
                return Err(BillingError::Unavailable {
                    service: "notification",
                });
            }
            self.sent.lock().unwrap().push(notification);
            Ok(())
        }
    }

    fn sample_bill() -> Bill {
        let charges = ChargeBreakdown {
            energy_charge: dec!(600),
            fixed_charge: dec!(50),
            tax_amount: dec!(65),
            total: dec!(715),
        };
        let now = Utc::now();
        Bill::new(
            "M1",
            "C1",
            UtilityType::Electricity,
            "DOMESTIC",
            dec!(0),
            dec!(120),
            charges,
            now,
            now + Duration::days(15),
        )
    }

    #[tokio::test]
    async fn otp_mail_carries_payment_and_bill_ids() {
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(Arc::new(SingleConsumer), sender.clone());

        let bill = sample_bill();
        let now = Utc::now();
        let payment = Payment::new_online(&bill, "123456".into(), now + Duration::minutes(5), now);
        notifier.payment_otp(&payment, "123456", 5).await;

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].email, "asha@example.com");
        assert_eq!(sent[0].kind, NotificationKind::PaymentOtp);
        assert_eq!(sent[0].subject, "OTP for ELECTRICITY bill payment");
        assert!(sent[0].message.contains(&payment.id));
        assert!(sent[0].message.contains(&bill.id));
        assert!(sent[0].message.contains("123456"));
        assert!(sent[0].message.contains("valid for 5 minutes"));
    }

    #[tokio::test]
    async fn unknown_consumer_is_swallowed() {
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(Arc::new(SingleConsumer), sender.clone());

        let mut bill = sample_bill();
        bill.consumer_id = "C404".into();
        notifier.bill_overdue(&bill).await;

        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_failure_is_swallowed() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
            fail: true,
        });
        let notifier = Notifier::new(Arc::new(SingleConsumer), sender.clone());

        let bill = sample_bill();
        notifier.bill_overdue(&bill).await;

        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invoice_mail_attaches_the_pdf() {
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(Arc::new(SingleConsumer), sender.clone());

        let bill = sample_bill();
        let now = Utc::now();
        let mut payment = Payment::new_online(&bill, "123456".into(), now, now);
        payment.succeed(now);
        let invoice = Invoice::compose(&bill, &payment, now);

        notifier.invoice_ready(&invoice, vec![1, 2, 3]).await;

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Invoice for ELECTRICITY Bill");
        let attachment = sent[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.file_name, format!("invoice-{}.pdf", invoice.id));
        assert_eq!(attachment.content, vec![1, 2, 3]);
    }
}
