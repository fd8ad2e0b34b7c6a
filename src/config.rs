//! Configuration module
//!
//! TOML-loadable engine configuration. Every field has a serde default so
//! a partial file (or no file at all) yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::retry::RetryConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub billing: BillingSection,
    pub payment: PaymentSection,
    pub tariff_gateway: TariffGatewaySection,
    pub logging: LoggingSection,
}

/// Bill generation and escalation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingSection {
    /// Days between generation and the due date.
    pub due_grace_days: i64,
    /// Seconds between escalation sweeps.
    pub escalation_interval_secs: u64,
}

impl Default for BillingSection {
    fn default() -> Self {
        Self {
            due_grace_days: 15,
            escalation_interval_secs: 86_400,
        }
    }
}

/// Payment settlement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentSection {
    /// Minutes an OTP stays valid after initiation.
    pub otp_validity_minutes: i64,
    /// Operator recorded on offline settlements.
    pub operator_id: String,
}

impl Default for PaymentSection {
    fn default() -> Self {
        Self {
            otp_validity_minutes: 5,
            operator_id: "PAYMENT_OFFICER".to_string(),
        }
    }
}

/// Retry and circuit-breaker tuning for the tariff gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TariffGatewaySection {
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub breaker_failure_threshold: u32,
    pub breaker_open_secs: u64,
}

impl Default for TariffGatewaySection {
    fn default() -> Self {
        Self {
            retry_max_attempts: 3,
            retry_initial_delay_ms: 200,
            breaker_failure_threshold: 5,
            breaker_open_secs: 30,
        }
    }
}

impl TariffGatewaySection {
    /// Retry configuration derived from the tuning fields.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_max_attempts,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            ..RetryConfig::default()
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default tracing filter, overridable via `RUST_LOG`.
    pub level: String,
    /// Output format: `plain` or `json`.
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "plain".to_string(),
        }
    }
}

impl BillingConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Default config location (~/.config/utility-billing/config.toml).
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("utility-billing")
        .join("config.toml")
}

// ── Tests ──────────────────────────────────────────────────────
