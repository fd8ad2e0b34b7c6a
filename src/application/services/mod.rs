//! Application services

mod billing;
mod escalation;
mod notify;
mod payment;

pub use billing::{BillingService, OutstandingBalance};
pub use escalation::{start_escalation_task, EscalationReport, EscalationService};
pub use notify::Notifier;
pub use payment::PaymentService;
