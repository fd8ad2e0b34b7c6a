pub mod ports;
pub mod services;

// Re-export key types for convenience
pub use ports::{
    ConsumerDirectory, ConsumerInfo, MeterDirectory, MeterInfo, Notification,
    NotificationAttachment, NotificationKind, NotificationSender, PdfRenderer, TariffProvider,
};
pub use services::{
    start_escalation_task, BillingService, EscalationReport, EscalationService, Notifier,
    OutstandingBalance, PaymentService,
};
