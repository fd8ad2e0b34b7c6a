pub mod bill;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod payment;
pub mod tariff;

// Re-export commonly used types
pub use bill::{Bill, BillLedger, BillStatus};
pub use error::{BillingError, BillingResult};
pub use invoice::{Invoice, InvoiceLedger, InvoicePdfData};
pub use ledger::LedgerProvider;
pub use payment::{Payment, PaymentLedger, PaymentMode, PaymentStatus, SYSTEM_OPERATOR};
pub use tariff::{
    calculate_penalty, ChargeBreakdown, OverduePenaltySlab, TariffSchedule, TariffSlab, UtilityType,
};
