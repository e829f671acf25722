//! Ports - interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between the
//! client's application layer and the backend service. Adapters implement
//! these ports; tests inject fakes.
//!
//! - `AuthGateway` - backend credential operations (login/refresh/logout)
//! - `ChatGateway` - message dispatch returning an ordered chunk stream

mod auth_gateway;
mod chat_gateway;

pub use auth_gateway::AuthGateway;
pub use chat_gateway::{
    ChatGateway, ChunkStream, DispatchError, ProtocolError, StreamError, TransportError,
};
