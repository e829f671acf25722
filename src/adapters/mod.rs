//! Adapters - implementations of port interfaces.
//!
//! - `http` - `reqwest` gateway speaking the backend's JSON + SSE protocol
//! - `mock` - configurable in-memory gateways for tests

pub mod http;
pub mod mock;

pub use http::{HttpBackendGateway, HttpGatewayConfig};
pub use mock::{MockAuthGateway, MockChatGateway, MockDispatch, MockFrame, RecordedSend};
