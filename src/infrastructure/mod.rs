//! Infrastructure layer - external concerns

pub mod storage;
pub mod upstream;

pub use storage::MemoryLedgers;
pub use upstream::{TariffGateway, TariffGatewayConfig};
