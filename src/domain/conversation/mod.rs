//! Conversation domain: sessions, messages, and stream fragments.

mod chunk;
mod errors;
mod message;
mod session;

pub use chunk::StreamChunk;
pub use errors::StateError;
pub use message::{Message, MessageRole};
pub use session::Session;
