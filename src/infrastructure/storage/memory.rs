//! In-memory ledger implementation
//!
//! Backs the full [`LedgerProvider`] surface with `DashMap`s. This is the
//! storage used by the test suites and by single-process deployments; the
//! uniqueness and versioning rules enforced here are the same ones a
//! database-backed ledger would enforce with constraints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::bill::{Bill, BillLedger, BillStatus};
use crate::domain::error::{BillingError, BillingResult};
use crate::domain::invoice::{Invoice, InvoiceLedger};
use crate::domain::ledger::LedgerProvider;
use crate::domain::payment::{Payment, PaymentLedger, PaymentMode, PaymentStatus};
use crate::domain::tariff::UtilityType;
use crate::shared::pagination::{PageRequest, Paginated};

fn page_slice<T>(items: Vec<T>, page: PageRequest) -> Paginated<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(page.offset())
        .take(page.limit as usize)
        .collect();
    Paginated::new(items, total, page.page, page.limit)
}

// ── Bills ────────────────────────────────────────────────────────────────────

/// In-memory bill ledger with per-meter open-bill exclusivity.
pub struct MemoryBillLedger {
    bills: DashMap<String, Bill>,
    /// meter_number -> id of that meter's open (DUE or OVERDUE) bill.
    open_bills: DashMap<String, String>,
}

impl MemoryBillLedger {
    pub fn new() -> Self {
        Self {
            bills: DashMap::new(),
            open_bills: DashMap::new(),
        }
    }
}

#[async_trait]
impl BillLedger for MemoryBillLedger {
    async fn insert(&self, bill: Bill) -> BillingResult<()> {
        if self.bills.contains_key(&bill.id) {
            return Err(BillingError::Conflict(format!(
                "Bill {} already exists",
                bill.id
            )));
        }

        if bill.is_payable() {
            // The entry guard makes the claim atomic per meter.
            match self.open_bills.entry(bill.meter_number.clone()) {
                Entry::Occupied(_) => {
                    return Err(BillingError::Conflict(format!(
                        "Meter {} already has an open bill",
                        bill.meter_number
                    )))
                }
                Entry::Vacant(slot) => {
                    slot.insert(bill.id.clone());
                }
            }
        }

        self.bills.insert(bill.id.clone(), bill);
        Ok(())
    }

    async fn update(&self, bill: Bill) -> BillingResult<Bill> {
        let mut stored = self
            .bills
            .get_mut(&bill.id)
            .ok_or_else(|| BillingError::not_found("Bill", "id", &bill.id))?;

        if stored.version != bill.version {
            return Err(BillingError::Conflict(format!(
                "Bill {} was modified concurrently",
                bill.id
            )));
        }

        let mut next = bill;
        next.version += 1;

        if next.is_settled() {
            self.open_bills
                .remove_if(&next.meter_number, |_, open_id| open_id == &next.id);
        }

        *stored = next.clone();
        Ok(next)
    }

    async fn find_by_id(&self, id: &str) -> BillingResult<Option<Bill>> {
        Ok(self.bills.get(id).map(|b| b.clone()))
    }

    async fn find_latest_for_meter(&self, meter_number: &str) -> BillingResult<Option<Bill>> {
        Ok(self
            .bills
            .iter()
            .filter(|b| b.meter_number == meter_number)
            .max_by_key(|b| b.generated_at)
            .map(|b| b.clone()))
    }

    async fn find_due_before(&self, cutoff: DateTime<Utc>) -> BillingResult<Vec<Bill>> {
        Ok(self
            .bills
            .iter()
            .filter(|b| b.status == BillStatus::Due && b.due_date < cutoff)
            .map(|b| b.clone())
            .collect())
    }

    async fn find_overdue_unresolved(&self) -> BillingResult<Vec<Bill>> {
        Ok(self
            .bills
            .iter()
            .filter(|b| b.status == BillStatus::Overdue)
            .map(|b| b.clone())
            .collect())
    }

    async fn find_for_consumer(
        &self,
        consumer_id: &str,
        page: PageRequest,
    ) -> BillingResult<Paginated<Bill>> {
        let mut matching: Vec<Bill> = self
            .bills
            .iter()
            .filter(|b| b.consumer_id == consumer_id)
            .map(|b| b.clone())
            .collect();
        matching.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));

        Ok(page_slice(matching, page))
    }

    async fn find_all(
        &self,
        status: Option<BillStatus>,
        page: PageRequest,
    ) -> BillingResult<Paginated<Bill>> {
        let mut matching: Vec<Bill> = self
            .bills
            .iter()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .map(|b| b.clone())
            .collect();
        matching.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));

        Ok(page_slice(matching, page))
    }

    async fn find_open_for_consumer(&self, consumer_id: &str) -> BillingResult<Vec<Bill>> {
        Ok(self
            .bills
            .iter()
            .filter(|b| b.consumer_id == consumer_id && b.is_payable())
            .map(|b| b.clone())
            .collect())
    }
}

// ── Payments ─────────────────────────────────────────────────────────────────

/// In-memory payment ledger with compare-and-swap settlement.
pub struct MemoryPaymentLedger {
    payments: DashMap<String, Payment>,
}

impl MemoryPaymentLedger {
    pub fn new() -> Self {
        Self {
            payments: DashMap::new(),
        }
    }
}

#[async_trait]
impl PaymentLedger for MemoryPaymentLedger {
    async fn insert(&self, payment: Payment) -> BillingResult<()> {
        if self.payments.contains_key(&payment.id) {
            return Err(BillingError::Conflict(format!(
                "Payment {} already exists",
                payment.id
            )));
        }
        self.payments.insert(payment.id.clone(), payment);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> BillingResult<Option<Payment>> {
        Ok(self.payments.get(id).map(|p| p.clone()))
    }

    async fn settle(
        &self,
        id: &str,
        expected: PaymentStatus,
        next: Payment,
    ) -> BillingResult<Payment> {
        // The shard lock held by get_mut makes the status check and the
        // overwrite a single atomic step.
        let mut stored = self
            .payments
            .get_mut(id)
            .ok_or_else(|| BillingError::not_found("Payment", "id", id))?;

        if stored.status != expected {
            return Err(BillingError::Conflict(format!(
                "Payment {} is already {}",
                id, stored.status
            )));
        }

        *stored = next.clone();
        Ok(next)
    }

    async fn find_for_consumer(
        &self,
        consumer_id: &str,
        utility_type: Option<UtilityType>,
        page: PageRequest,
    ) -> BillingResult<Paginated<Payment>> {
        let mut matching: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| {
                p.consumer_id == consumer_id && utility_type.map_or(true, |u| p.utility_type == u)
            })
            .map(|p| p.clone())
            .collect();
        matching.sort_by_key(|p| std::cmp::Reverse(p.completed_at.unwrap_or(p.created_at)));

        Ok(page_slice(matching, page))
    }

    async fn find_all(
        &self,
        search: Option<&str>,
        mode: Option<PaymentMode>,
        page: PageRequest,
    ) -> BillingResult<Paginated<Payment>> {
        let needle = search
            .map(str::to_lowercase)
            .filter(|fragment| !fragment.is_empty());

        let mut matching: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| {
                needle.as_deref().map_or(true, |fragment| {
                    p.bill_id.to_lowercase().contains(fragment)
                        || p.consumer_id.to_lowercase().contains(fragment)
                }) && mode.map_or(true, |m| p.mode == m)
            })
            .map(|p| p.clone())
            .collect();
        matching.sort_by_key(|p| std::cmp::Reverse(p.completed_at.unwrap_or(p.created_at)));

        Ok(page_slice(matching, page))
    }
}

// ── Invoices ─────────────────────────────────────────────────────────────────

/// In-memory invoice ledger, unique per payment.
pub struct MemoryInvoiceLedger {
    invoices: DashMap<String, Invoice>,
    /// payment_id -> invoice id, enforcing one invoice per settlement.
    by_payment: DashMap<String, String>,
}

impl MemoryInvoiceLedger {
    pub fn new() -> Self {
        Self {
            invoices: DashMap::new(),
            by_payment: DashMap::new(),
        }
    }
}

#[async_trait]
impl InvoiceLedger for MemoryInvoiceLedger {
    async fn insert(&self, invoice: Invoice) -> BillingResult<()> {
        match self.by_payment.entry(invoice.payment_id.clone()) {
            Entry::Occupied(_) => {
                return Err(BillingError::Conflict(format!(
                    "Invoice already issued for payment {}",
                    invoice.payment_id
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(invoice.id.clone());
            }
        }

        self.invoices.insert(invoice.id.clone(), invoice);
        Ok(())
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> BillingResult<Option<Invoice>> {
        match self.by_payment.get(payment_id) {
            Some(invoice_id) => Ok(self.invoices.get(invoice_id.value()).map(|inv| inv.clone())),
            None => Ok(None),
        }
    }

    async fn find_for_consumer(
        &self,
        consumer_id: &str,
        page: PageRequest,
    ) -> BillingResult<Paginated<Invoice>> {
        let mut matching: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|inv| inv.consumer_id == consumer_id)
            .map(|inv| inv.clone())
            .collect();
        matching.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));

        Ok(page_slice(matching, page))
    }
}

// ── Ledger set ───────────────────────────────────────────────────────────────

/// All three in-memory ledgers behind one [`LedgerProvider`].
pub struct MemoryLedgers {
    bills: MemoryBillLedger,
    payments: MemoryPaymentLedger,
    invoices: MemoryInvoiceLedger,
}

impl MemoryLedgers {
    pub fn new() -> Self {
        Self {
            bills: MemoryBillLedger::new(),
            payments: MemoryPaymentLedger::new(),
            invoices: MemoryInvoiceLedger::new(),
        }
    }
}

impl Default for MemoryLedgers {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerProvider for MemoryLedgers {
    fn bills(&self) -> &dyn BillLedger {
        &self.bills
    }

    fn payments(&self) -> &dyn PaymentLedger {
        &self.payments
    }

    fn invoices(&self) -> &dyn InvoiceLedger {
        &self.invoices
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::payment::{PaymentMode, SYSTEM_OPERATOR};
    use crate::domain::tariff::ChargeBreakdown;

    fn sample_bill(meter: &str, minutes_ago: i64) -> Bill {
        let generated_at = Utc::now() - Duration::minutes(minutes_ago);
        let charges = ChargeBreakdown {
            energy_charge: dec!(150.00),
            fixed_charge: dec!(50.00),
            tax_amount: dec!(20.00),
            total: dec!(220.00),
        };
        Bill::new(
            meter,
            "C1",
            UtilityType::Electricity,
            "RESIDENTIAL",
            dec!(100.0),
            dec!(130.0),
            charges,
            generated_at,
            generated_at + Duration::days(15),
        )
    }

    #[tokio::test]
    async fn second_open_bill_for_meter_conflicts() {
        let ledgers = MemoryLedgers::new();
        let first = sample_bill("MTR-1", 10);
        ledgers.bills().insert(first.clone()).await.unwrap();

        let err = ledgers
            .bills()
            .insert(sample_bill("MTR-1", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Conflict(_)));

        // Settling the open bill frees the slot for the next cycle.
        let mut paid = first;
        paid.mark_paid();
        ledgers.bills().update(paid).await.unwrap();
        ledgers
            .bills()
            .insert(sample_bill("MTR-1", 1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_rejects_stale_version() {
        let ledgers = MemoryLedgers::new();
        let bill = sample_bill("MTR-2", 10);
        ledgers.bills().insert(bill.clone()).await.unwrap();

        let mut current = bill.clone();
        current.mark_overdue();
        let bumped = ledgers.bills().update(current).await.unwrap();
        assert_eq!(bumped.version, bill.version + 1);

        // A writer still holding the original snapshot must lose.
        let mut stale = bill;
        stale.mark_paid();
        let err = ledgers.bills().update(stale).await.unwrap_err();
        assert!(matches!(err, BillingError::Conflict(_)));
    }

    #[tokio::test]
    async fn settle_admits_a_single_winner() {
        let ledgers = MemoryLedgers::new();
        let mut bill = sample_bill("MTR-3", 10);
        bill.mark_paid();
        let payment = Payment::new_offline(&bill, PaymentMode::Cash, "PAYMENT_OFFICER", Utc::now());

        let mut initiated = payment.clone();
        initiated.status = PaymentStatus::Initiated;
        initiated.completed_at = None;
        ledgers.payments().insert(initiated).await.unwrap();

        let settled = ledgers
            .payments()
            .settle(&payment.id, PaymentStatus::Initiated, payment.clone())
            .await
            .unwrap();
        assert_eq!(settled.status, PaymentStatus::Success);

        let err = ledgers
            .payments()
            .settle(&payment.id, PaymentStatus::Initiated, payment.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Conflict(_)));
    }

    #[tokio::test]
    async fn one_invoice_per_payment() {
        let ledgers = MemoryLedgers::new();
        let mut bill = sample_bill("MTR-4", 10);
        bill.mark_paid();
        let payment = Payment::new_offline(&bill, PaymentMode::Cash, SYSTEM_OPERATOR, Utc::now());

        let invoice = Invoice::compose(&bill, &payment, Utc::now());
        ledgers.invoices().insert(invoice.clone()).await.unwrap();

        let duplicate = Invoice::compose(&bill, &payment, Utc::now());
        let err = ledgers.invoices().insert(duplicate).await.unwrap_err();
        assert!(matches!(err, BillingError::Conflict(_)));

        let found = ledgers
            .invoices()
            .find_by_payment_id(&payment.id)
            .await
            .unwrap();
        assert_eq!(found.map(|inv| inv.id), Some(invoice.id));
    }

    #[tokio::test]
    async fn consumer_bills_page_newest_first() {
        let ledgers = MemoryLedgers::new();
        for (meter, minutes_ago) in [("MTR-A", 30), ("MTR-B", 20), ("MTR-C", 10)] {
            ledgers
                .bills()
                .insert(sample_bill(meter, minutes_ago))
                .await
                .unwrap();
        }

        let page = ledgers
            .bills()
            .find_for_consumer("C1", PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].meter_number, "MTR-C");
        assert_eq!(page.items[1].meter_number, "MTR-B");

        let rest = ledgers
            .bills()
            .find_for_consumer("C1", PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(rest.items.len(), 1);
        assert_eq!(rest.items[0].meter_number, "MTR-A");
    }

    #[tokio::test]
    async fn payment_search_narrows_by_fragment_and_mode() {
        let ledgers = MemoryLedgers::new();
        let bill_a = sample_bill("MTR-7", 30);
        let mut bill_b = sample_bill("MTR-8", 20);
        bill_b.consumer_id = "C2".into();

        let cash = Payment::new_offline(
            &bill_a,
            PaymentMode::Cash,
            "PAYMENT_OFFICER",
            Utc::now() - Duration::minutes(1),
        );
        let online = Payment::new_online(
            &bill_b,
            "123456".into(),
            Utc::now() + Duration::minutes(5),
            Utc::now(),
        );
        ledgers.payments().insert(cash.clone()).await.unwrap();
        ledgers.payments().insert(online.clone()).await.unwrap();

        let all = ledgers
            .payments()
            .find_all(None, None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].id, online.id);

        // Empty search narrows nothing.
        let blank = ledgers
            .payments()
            .find_all(Some(""), None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(blank.total, 2);

        // Consumer fragment matching ignores case.
        let by_consumer = ledgers
            .payments()
            .find_all(Some("c2"), None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(by_consumer.total, 1);
        assert_eq!(by_consumer.items[0].consumer_id, "C2");

        let by_bill = ledgers
            .payments()
            .find_all(Some(&bill_a.id[..8]), None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(by_bill.total, 1);
        assert_eq!(by_bill.items[0].bill_id, bill_a.id);

        let by_mode = ledgers
            .payments()
            .find_all(None, Some(PaymentMode::Cash), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(by_mode.total, 1);
        assert_eq!(by_mode.items[0].id, cash.id);
    }

    #[tokio::test]
    async fn due_and_overdue_queries_filter_by_status() {
        let ledgers = MemoryLedgers::new();
        let mut past_due = sample_bill("MTR-5", 10);
        past_due.due_date = Utc::now() - Duration::days(2);
        ledgers.bills().insert(past_due.clone()).await.unwrap();
        ledgers.bills().insert(sample_bill("MTR-6", 5)).await.unwrap();

        let due = ledgers.bills().find_due_before(Utc::now()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, past_due.id);

        assert!(ledgers
            .bills()
            .find_overdue_unresolved()
            .await
            .unwrap()
            .is_empty());

        let mut flagged = past_due;
        flagged.mark_overdue();
        ledgers.bills().update(flagged).await.unwrap();
        let overdue = ledgers.bills().find_overdue_unresolved().await.unwrap();
        assert_eq!(overdue.len(), 1);
    }
}
