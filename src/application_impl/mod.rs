mod auth_service_impl;
mod moderation_service_impl;
mod request_authenticator_impl;
mod session_issuer_impl;
mod token_codec_jwt;
mod token_registry_kv;

pub use auth_service_impl::*;
pub use moderation_service_impl::*;
pub use request_authenticator_impl::*;
pub use session_issuer_impl::*;
pub use token_codec_jwt::*;
pub use token_registry_kv::*;
