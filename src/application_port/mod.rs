mod auth_service;
mod moderation_service;
mod request_authenticator;
mod session_issuer;
mod token_codec;
mod token_registry;

pub use auth_service::*;
pub use moderation_service::*;
pub use request_authenticator::*;
pub use session_issuer::*;
pub use token_codec::*;
pub use token_registry::*;
