//! HTTP adapter for the TaxFix agent backend.

mod client;
mod dto;
mod sse;

pub use client::{HttpBackendGateway, HttpGatewayConfig};
