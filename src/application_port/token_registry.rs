use crate::domain_model::*;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry store error: {0}")]
    Store(String),
    #[error("registry store timed out")]
    Timeout,
    #[error("token expires in {0:?}, too soon to track")]
    LifetimeTooShort(Duration),
}

/// Server-side record of which issued tokens are still live.
///
/// The registry only ever shortens a token's life: entries expire no later than
/// the expiry embedded in the token itself.
#[async_trait::async_trait]
pub trait TokenRegistry: Send + Sync {
    /// Fails hard: a token that was not recorded cannot be revoked later.
    async fn register(&self, token: &str, user_id: UserId, ttl: Duration)
    -> Result<(), RegistryError>;
    /// Fails closed: any store error reads as "not valid".
    async fn is_valid(&self, token: &str) -> bool;
    async fn user_id_for(&self, token: &str) -> Option<UserId>;
    async fn revoke(&self, token: &str) -> Result<(), RegistryError>;
    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<(), RegistryError>;
    async fn remaining_ttl(&self, token: &str) -> Option<Duration>;
    /// Ties a token to its session so the whole session can be revoked at once.
    async fn link_session(
        &self,
        session_id: &SessionId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), RegistryError>;
    async fn revoke_session(&self, session_id: &SessionId) -> Result<(), RegistryError>;
}
