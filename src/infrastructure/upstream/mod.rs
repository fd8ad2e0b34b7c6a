//! Clients for upstream services

mod tariff_gateway;

pub use tariff_gateway::{TariffGateway, TariffGatewayConfig};
