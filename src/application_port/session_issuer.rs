use super::{CodecError, RegistryError};
use crate::domain_model::*;
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("token revoked")]
    TokenRevoked,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("user directory unavailable: {0}")]
    Directory(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("codec error: {0}")]
    Codec(CodecError),
}

#[async_trait::async_trait]
pub trait SessionIssuer: Send + Sync {
    /// Issues and registers an access/refresh pair; nothing stays registered on failure.
    async fn mint(
        &self,
        user_id: UserId,
        authorities: BTreeSet<String>,
    ) -> Result<AuthTokens, SessionError>;
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<AuthTokens, SessionError>;
    async fn logout(&self, access_token: &AccessToken) -> Result<(), SessionError>;
    async fn logout_all(&self, user_id: UserId) -> Result<(), SessionError>;
}
