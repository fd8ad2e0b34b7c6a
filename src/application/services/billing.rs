//! Bill generation, settlement marking, and bill queries

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::ports::{ConsumerDirectory, MeterDirectory, TariffProvider};
use crate::application::services::notify::Notifier;
use crate::domain::bill::{Bill, BillStatus};
use crate::domain::error::{BillingError, BillingResult};
use crate::domain::ledger::LedgerProvider;
use crate::shared::pagination::{PageRequest, Paginated};

/// A consumer's unpaid position across open bills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutstandingBalance {
    pub consumer_id: String,
    pub outstanding_amount: Decimal,
    pub open_bills: usize,
}

/// Service for bill generation and bill lookups
pub struct BillingService {
    ledgers: Arc<dyn LedgerProvider>,
    meters: Arc<dyn MeterDirectory>,
    consumers: Arc<dyn ConsumerDirectory>,
    tariffs: Arc<dyn TariffProvider>,
    notifier: Notifier,
    due_grace_days: i64,
}

impl BillingService {
    pub fn new(
        ledgers: Arc<dyn LedgerProvider>,
        meters: Arc<dyn MeterDirectory>,
        consumers: Arc<dyn ConsumerDirectory>,
        tariffs: Arc<dyn TariffProvider>,
        notifier: Notifier,
        due_grace_days: i64,
    ) -> Self {
        Self {
            ledgers,
            meters,
            consumers,
            tariffs,
            notifier,
            due_grace_days,
        }
    }

    /// Generate the next bill for a meter from its latest reading and the
    /// active tariff.
    ///
    /// The previous reading is taken from the meter's most recent bill
    /// (zero when none exists). Nothing is persisted unless every
    /// precondition passes and the tariff lookup succeeds; the ledger's
    /// one-open-bill-per-meter constraint rejects a duplicate with
    /// `Conflict`.
    pub async fn generate(&self, meter_number: &str) -> BillingResult<Bill> {
        let meter = self
            .meters
            .get_meter(meter_number)
            .await?
            .ok_or_else(|| BillingError::not_found("Meter", "meter_number", meter_number))?;

        if !meter.active {
            return Err(BillingError::BusinessRule(format!(
                "Meter {} is not active",
                meter_number
            )));
        }

        let consumer = self
            .consumers
            .get(&meter.consumer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Consumer", "id", meter.consumer_id.clone()))?;

        let current_reading = self.meters.last_reading(meter_number).await?;

        let previous_reading = self
            .ledgers
            .bills()
            .find_latest_for_meter(meter_number)
            .await?
            .map(|bill| bill.current_reading)
            .unwrap_or(Decimal::ZERO);

        let units = current_reading - previous_reading;
        if units <= Decimal::ZERO {
            return Err(BillingError::BusinessRule(format!(
                "No new consumption for meter {}",
                meter_number
            )));
        }

        let schedule = self
            .tariffs
            .active_schedule(meter.utility_type, &meter.tariff_plan)
            .await?;
        let charges = schedule.charge_breakdown(units);

        let generated_at = Utc::now();
        let due_date = generated_at + Duration::days(self.due_grace_days);
        let bill = Bill::new(
            meter_number,
            meter.consumer_id.clone(),
            meter.utility_type,
            meter.tariff_plan.clone(),
            previous_reading,
            current_reading,
            charges,
            generated_at,
            due_date,
        );

        self.ledgers.bills().insert(bill.clone()).await?;

        info!(
            bill_id = %bill.id,
            meter_number,
            units = %bill.units_consumed,
            total = %bill.total_amount,
            "🧾 Bill generated"
        );

        self.notifier.bill_generated(&bill, &consumer.email).await;

        Ok(bill)
    }

    /// Fetch a bill by id.
    pub async fn bill(&self, bill_id: &str) -> BillingResult<Bill> {
        self.ledgers
            .bills()
            .find_by_id(bill_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Bill", "id", bill_id))
    }

    /// Fetch a bill on behalf of a consumer. Bills belonging to someone
    /// else read as missing.
    pub async fn bill_for_consumer(&self, bill_id: &str, consumer_id: &str) -> BillingResult<Bill> {
        let bill = self.bill(bill_id).await?;
        if bill.consumer_id != consumer_id {
            return Err(BillingError::not_found("Bill", "id", bill_id));
        }
        Ok(bill)
    }

    /// A consumer's bills, newest first.
    pub async fn consumer_bills(
        &self,
        consumer_id: &str,
        page: PageRequest,
    ) -> BillingResult<Paginated<Bill>> {
        self.ledgers
            .bills()
            .find_for_consumer(consumer_id, page)
            .await
    }

    /// All bills, optionally narrowed to one status, newest first.
    pub async fn all_bills(
        &self,
        status: Option<BillStatus>,
        page: PageRequest,
    ) -> BillingResult<Paginated<Bill>> {
        self.ledgers.bills().find_all(status, page).await
    }

    /// Settle a bill. Paid is terminal, so marking twice fails with
    /// `Conflict`.
    pub async fn mark_paid(&self, bill_id: &str) -> BillingResult<Bill> {
        let mut bill = self.bill(bill_id).await?;
        if bill.is_settled() {
            return Err(BillingError::Conflict(format!(
                "Bill {} is already paid",
                bill_id
            )));
        }

        bill.mark_paid();
        let updated = self.ledgers.bills().update(bill).await?;

        info!(bill_id, "Bill marked paid");
        Ok(updated)
    }

    /// Everything a consumer still owes across due and overdue bills.
    pub async fn outstanding_balance(
        &self,
        consumer_id: &str,
    ) -> BillingResult<OutstandingBalance> {
        let open = self
            .ledgers
            .bills()
            .find_open_for_consumer(consumer_id)
            .await?;
        let outstanding_amount: Decimal = open.iter().map(|bill| bill.total_amount).sum();

        Ok(OutstandingBalance {
            consumer_id: consumer_id.to_string(),
            outstanding_amount,
            open_bills: open.len(),
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────
