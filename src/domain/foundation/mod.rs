//! Foundation value objects shared across the domain.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, Credential, UserProfile};
pub use errors::ValidationError;
pub use ids::{MessageId, SessionId, UserId};
pub use timestamp::Timestamp;
