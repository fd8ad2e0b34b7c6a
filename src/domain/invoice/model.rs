//! Immutable invoice snapshot

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::bill::Bill;
use crate::domain::payment::{Payment, PaymentMode};
use crate::domain::tariff::UtilityType;

/// Settlement record produced exactly once per successful payment.
///
/// Denormalizes the bill's readings, charges, and dates together with the
/// payment's mode and settlement time, so the invoice stays meaningful
/// even as tariffs change later. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub payment_id: String,
    pub bill_id: String,
    pub consumer_id: String,
    pub meter_number: String,
    pub utility_type: UtilityType,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub units_consumed: Decimal,
    pub energy_charge: Decimal,
    pub fixed_charge: Decimal,
    pub tax_amount: Decimal,
    pub penalty_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_mode: PaymentMode,
    pub payment_date: DateTime<Utc>,
    pub bill_generated_at: DateTime<Utc>,
    pub bill_due_date: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
}

impl Invoice {
    /// Snapshot a settled bill and its winning payment.
    ///
    /// Field-for-field deterministic for the same inputs; only the
    /// invoice id is freshly generated.
    pub fn compose(bill: &Bill, payment: &Payment, issued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payment_id: payment.id.clone(),
            bill_id: bill.id.clone(),
            consumer_id: bill.consumer_id.clone(),
            meter_number: bill.meter_number.clone(),
            utility_type: bill.utility_type,
            previous_reading: bill.previous_reading,
            current_reading: bill.current_reading,
            units_consumed: bill.units_consumed,
            energy_charge: bill.energy_charge,
            fixed_charge: bill.fixed_charge,
            tax_amount: bill.tax_amount,
            penalty_amount: bill.penalty_amount,
            total_amount: bill.total_amount,
            payment_mode: payment.mode,
            payment_date: payment.completed_at.unwrap_or(issued_at),
            bill_generated_at: bill.generated_at,
            bill_due_date: bill.due_date,
            issued_at,
        }
    }

    /// File name the rendered PDF is attached under.
    pub fn pdf_file_name(&self) -> String {
        format!("invoice-{}.pdf", self.id)
    }

    /// Flat data handed to the PDF renderer.
    pub fn pdf_data(&self) -> InvoicePdfData {
        InvoicePdfData {
            invoice_id: self.id.clone(),
            consumer_id: self.consumer_id.clone(),
            meter_number: self.meter_number.clone(),
            utility_type: self.utility_type,
            previous_reading: self.previous_reading,
            current_reading: self.current_reading,
            units_consumed: self.units_consumed,
            energy_charge: self.energy_charge,
            fixed_charge: self.fixed_charge,
            tax_amount: self.tax_amount,
            penalty_amount: self.penalty_amount,
            total_amount: self.total_amount,
            bill_generated_at: self.bill_generated_at,
            bill_due_date: self.bill_due_date,
            payment_date: self.payment_date,
        }
    }
}

/// Renderer input assembled from an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePdfData {
    pub invoice_id: String,
    pub consumer_id: String,
    pub meter_number: String,
    pub utility_type: UtilityType,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub units_consumed: Decimal,
    pub energy_charge: Decimal,
    pub fixed_charge: Decimal,
    pub tax_amount: Decimal,
    pub penalty_amount: Decimal,
    pub total_amount: Decimal,
    pub bill_generated_at: DateTime<Utc>,
    pub bill_due_date: DateTime<Utc>,
    pub payment_date: DateTime<Utc>,
}

// ── Tests ──────────────────────────────────────────────────────
