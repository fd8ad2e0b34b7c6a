//! Engine facade
//!
//! Assembles ledgers, upstream collaborators and configuration into the
//! billing, payment and escalation services, and owns the background
//! escalation sweep. Embedding hosts construct one engine per process and
//! expose its services however they like.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::application::ports::{
    ConsumerDirectory, MeterDirectory, NotificationSender, PdfRenderer, TariffProvider,
};
use crate::application::services::{
    start_escalation_task, BillingService, EscalationService, Notifier, PaymentService,
};
use crate::config::BillingConfig;
use crate::domain::ledger::LedgerProvider;
use crate::infrastructure::upstream::{TariffGateway, TariffGatewayConfig};
use crate::shared::shutdown::ShutdownSignal;

/// Everything the engine needs to assemble its services.
pub struct EngineOptions {
    pub config: BillingConfig,
    pub ledgers: Arc<dyn LedgerProvider>,
    pub meters: Arc<dyn MeterDirectory>,
    pub consumers: Arc<dyn ConsumerDirectory>,
    pub tariffs: Arc<dyn TariffProvider>,
    pub notifications: Arc<dyn NotificationSender>,
    pub pdf: Arc<dyn PdfRenderer>,
}

/// Assembled billing engine.
///
/// The raw tariff provider is wrapped in the resilient [`TariffGateway`]
/// before any service sees it, so every tariff lookup in the process goes
/// through the same retry and breaker policy.
pub struct BillingEngine {
    config: BillingConfig,
    billing: Arc<BillingService>,
    payments: Arc<PaymentService>,
    escalation: Arc<EscalationService>,
    shutdown: ShutdownSignal,
}

impl BillingEngine {
    pub fn new(options: EngineOptions) -> Self {
        let EngineOptions {
            config,
            ledgers,
            meters,
            consumers,
            tariffs,
            notifications,
            pdf,
        } = options;

        let notifier = Notifier::new(consumers.clone(), notifications);

        let gateway_config = TariffGatewayConfig {
            retry: config.tariff_gateway.retry_config(),
            failure_threshold: config.tariff_gateway.breaker_failure_threshold,
            open_interval: Duration::from_secs(config.tariff_gateway.breaker_open_secs),
        };
        let tariffs: Arc<dyn TariffProvider> = Arc::new(TariffGateway::new(tariffs, gateway_config));

        let billing = Arc::new(BillingService::new(
            ledgers.clone(),
            meters,
            consumers,
            tariffs.clone(),
            notifier.clone(),
            config.billing.due_grace_days,
        ));

        let escalation = Arc::new(EscalationService::new(
            ledgers.clone(),
            tariffs,
            notifier.clone(),
        ));

        let payments = Arc::new(PaymentService::new(
            ledgers,
            billing.clone(),
            notifier,
            pdf,
            config.payment.otp_validity_minutes,
            config.payment.operator_id.clone(),
        ));

        Self {
            config,
            billing,
            payments,
            escalation,
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn billing(&self) -> Arc<BillingService> {
        self.billing.clone()
    }

    pub fn payments(&self) -> Arc<PaymentService> {
        self.payments.clone()
    }

    pub fn escalation(&self) -> Arc<EscalationService> {
        self.escalation.clone()
    }

    /// Spawn the periodic escalation sweep. Runs until [`shutdown`] is
    /// called.
    ///
    /// [`shutdown`]: BillingEngine::shutdown
    pub fn start_escalation(&self) {
        start_escalation_task(
            self.escalation.clone(),
            self.shutdown.clone(),
            self.config.billing.escalation_interval_secs,
        );
    }

    /// Stop all background tasks spawned by this engine.
    pub fn shutdown(&self) {
        info!("Billing engine shutting down");
        self.shutdown.trigger();
    }
}

/// Initialize tracing (logging) from the engine config.
///
/// Call this once at process startup.
pub fn init_tracing(config: &BillingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::application::ports::{ConsumerInfo, MeterInfo, Notification};
    use crate::domain::error::BillingResult;
    use crate::domain::invoice::InvoicePdfData;
    use crate::domain::payment::PaymentMode;
    use crate::domain::tariff::{TariffSchedule, TariffSlab, UtilityType};
    use crate::infrastructure::storage::MemoryLedgers;
    use crate::shared::pagination::PageRequest;

    struct StaticMeters;

    #[async_trait]
    impl MeterDirectory for StaticMeters {
        async fn get_meter(&self, meter_number: &str) -> BillingResult<Option<MeterInfo>> {
            Ok(Some(MeterInfo {
                meter_number: meter_number.to_string(),
                active: true,
                consumer_id: "C1".to_string(),
                utility_type: UtilityType::Electricity,
                tariff_plan: "DOMESTIC".to_string(),
            }))
        }

        async fn last_reading(&self, _meter_number: &str) -> BillingResult<Decimal> {
            Ok(dec!(120.0))
        }
    }

    struct StaticConsumers;

    #[async_trait]
    impl ConsumerDirectory for StaticConsumers {
        async fn get(&self, consumer_id: &str) -> BillingResult<Option<ConsumerInfo>> {
            Ok(Some(ConsumerInfo {
                id: consumer_id.to_string(),
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
            }))
        }
    }

    struct StaticTariffs;

    #[async_trait]
    impl TariffProvider for StaticTariffs {
        async fn active_schedule(
            &self,
            utility_type: UtilityType,
            plan: &str,
        ) -> BillingResult<TariffSchedule> {
            Ok(TariffSchedule {
                utility_type,
                plan: plan.to_string(),
                active: true,
                slabs: vec![TariffSlab {
                    from_unit: 0,
                    to_unit: 100,
                    rate_per_unit: dec!(5),
                }],
                fixed_charge: dec!(50),
                tax_percentage: dec!(10),
                overdue_penalty_slabs: vec![],
                effective_from: None,
            })
        }
    }

    struct SilentSender;

    #[async_trait]
    impl crate::application::ports::NotificationSender for SilentSender {
        async fn send(&self, _notification: Notification) -> BillingResult<()> {
            Ok(())
        }
    }

    struct StubPdf;

    #[async_trait]
    impl PdfRenderer for StubPdf {
        async fn render(&self, data: &InvoicePdfData) -> BillingResult<Vec<u8>> {
            Ok(format!("PDF {}", data.invoice_id).into_bytes())
        }
    }

    fn engine() -> BillingEngine {
        BillingEngine::new(EngineOptions {
            config: BillingConfig::default(),
            ledgers: Arc::new(MemoryLedgers::new()),
            meters: Arc::new(StaticMeters),
            consumers: Arc::new(StaticConsumers),
            tariffs: Arc::new(StaticTariffs),
            notifications: Arc::new(SilentSender),
            pdf: Arc::new(StubPdf),
        })
    }

    #[tokio::test]
    async fn wires_generation_through_settlement() {
        let engine = engine();

        let bill = engine.billing().generate("MTR-100").await.unwrap();
        assert_eq!(bill.consumer_id, "C1");
        assert_eq!(
            bill.due_date - bill.generated_at,
            ChronoDuration::days(15),
            "default grace period flows from the config"
        );

        let invoice = engine
            .payments()
            .pay_offline(&bill.id, PaymentMode::Cash)
            .await
            .unwrap();
        assert_eq!(invoice.bill_id, bill.id);

        let page = engine
            .payments()
            .invoices("C1", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn escalation_task_stops_on_shutdown() {
        let engine = engine();
        engine.start_escalation();
        engine.shutdown();
        // Nothing to assert beyond not hanging; the task observes the
        // signal on its next select.
        tokio::task::yield_now().await;
    }
}
