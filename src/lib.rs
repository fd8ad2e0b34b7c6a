//! # Utility Billing Engine
//!
//! Slab-priced utility billing with OTP-gated payment settlement and
//! overdue escalation, embeddable as a library.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, calculations and ledger traits
//! - **application**: Services and ports to collaborating systems
//! - **infrastructure**: In-memory ledgers and resilient upstream clients
//! - **shared**: Pagination, retry and shutdown plumbing
//! - **engine**: Composition root wiring config and collaborators into services

pub mod application;
pub mod config;
pub mod domain;
pub mod engine;
pub mod infrastructure;
pub mod shared;

pub use config::{default_config_path, BillingConfig, ConfigError};
pub use engine::{init_tracing, BillingEngine, EngineOptions};

// Re-export storage types for easy access
pub use infrastructure::{MemoryLedgers, TariffGateway, TariffGatewayConfig};
