//! Resilient tariff client
//!
//! Decorates the raw tariff provider with retry and a circuit breaker so a
//! flapping tariff service degrades into fast, typed `Unavailable` failures
//! instead of stalling every billing call behind timeouts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::application::ports::TariffProvider;
use crate::domain::error::{BillingError, BillingResult};
use crate::domain::tariff::{TariffSchedule, UtilityType};
use crate::shared::retry::{retry_with_backoff, RetryConfig};

/// Tuning knobs for [`TariffGateway`].
#[derive(Debug, Clone)]
pub struct TariffGatewayConfig {
    pub retry: RetryConfig,
    /// Consecutive transient failures that open the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before the next call may probe.
    pub open_interval: Duration,
}

impl Default for TariffGatewayConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            failure_threshold: 5,
            open_interval: Duration::from_secs(30),
        }
    }
}

enum BreakerState {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen,
}

/// Retry and circuit-breaker decorator around a [`TariffProvider`].
///
/// Only transient errors count against the breaker; caller errors such as
/// an unknown plan pass straight through without touching its state.
pub struct TariffGateway {
    inner: Arc<dyn TariffProvider>,
    config: TariffGatewayConfig,
    state: Mutex<BreakerState>,
}

impl TariffGateway {
    pub fn new(inner: Arc<dyn TariffProvider>, config: TariffGatewayConfig) -> Self {
        Self {
            inner,
            config,
            state: Mutex::new(BreakerState::Closed { failures: 0 }),
        }
    }

    /// Checks whether a call may proceed. Moves `Open` to `HalfOpen` once
    /// the open interval has elapsed, letting a single round of calls probe
    /// the upstream.
    async fn acquire(&self) -> BillingResult<()> {
        let mut state = self.state.lock().await;
        match *state {
            BreakerState::Closed { .. } | BreakerState::HalfOpen => Ok(()),
            BreakerState::Open { since } => {
                if since.elapsed() >= self.config.open_interval {
                    info!("Tariff breaker half-open, probing upstream");
                    *state = BreakerState::HalfOpen;
                    Ok(())
                } else {
                    Err(BillingError::Unavailable { service: "tariff" })
                }
            }
        }
    }

    async fn record_success(&self) {
        let mut state = self.state.lock().await;
        match *state {
            BreakerState::Closed { failures: 0 } => {}
            BreakerState::Closed { .. } => *state = BreakerState::Closed { failures: 0 },
            BreakerState::Open { .. } | BreakerState::HalfOpen => {
                info!("Tariff breaker closed");
                *state = BreakerState::Closed { failures: 0 };
            }
        }
    }

    async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        *state = match *state {
            BreakerState::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.config.failure_threshold {
                    warn!(failures, "Tariff breaker opened, failing fast");
                    BreakerState::Open {
                        since: Instant::now(),
                    }
                } else {
                    BreakerState::Closed { failures }
                }
            }
            BreakerState::HalfOpen => {
                warn!("Tariff probe failed, breaker re-opened");
                BreakerState::Open {
                    since: Instant::now(),
                }
            }
            BreakerState::Open { since } => BreakerState::Open { since },
        };
    }
}

#[async_trait]
impl TariffProvider for TariffGateway {
    async fn active_schedule(
        &self,
        utility_type: UtilityType,
        plan: &str,
    ) -> BillingResult<TariffSchedule> {
        self.acquire().await?;

        let result = retry_with_backoff(
            self.config.retry.clone(),
            || self.inner.active_schedule(utility_type, plan),
            |err| err.is_transient(),
            "fetch_tariff",
        )
        .await;

        match &result {
            Ok(_) => self.record_success().await,
            Err(err) if err.is_transient() => self.record_failure().await,
            Err(_) => {}
        }

        result
    }
}

// ── Tests ──────────────────────────────────────────────────────
