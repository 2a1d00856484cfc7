use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// [`TokenRegistry`] over any [`KvStore`].
///
/// Layout:
/// - `{prefix}:token:{digest}` -> user id, expiring with the token
/// - `{prefix}:user:{user_id}` -> set of digests, expiring with the longest-lived member
/// - `{prefix}:session:{sid}` -> set of digests, same rule
///
/// `digest` is the hex SHA-256 of the token so bearer strings never become key names.
pub struct KvTokenRegistry {
    store: Arc<dyn KvStore>,
    prefix: String,
    op_timeout: Duration,
}

impl KvTokenRegistry {
    pub fn new(store: Arc<dyn KvStore>, prefix: impl Into<String>, op_timeout: Duration) -> Self {
        KvTokenRegistry {
            store,
            prefix: prefix.into(),
            op_timeout,
        }
    }

    fn digest(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    fn token_key(&self, digest: &str) -> String {
        format!("{}:token:{}", self.prefix, digest)
    }

    fn user_key(&self, user_id: UserId) -> String {
        format!("{}:user:{}", self.prefix, user_id)
    }

    fn session_key(&self, session_id: &SessionId) -> String {
        format!("{}:session:{}", self.prefix, session_id)
    }

    /// Whole seconds, rounded down so an entry never outlives its token.
    /// Anything shorter than a second is refused rather than stretched.
    fn store_ttl(ttl: Duration) -> Result<Duration, RegistryError> {
        match ttl.as_secs() {
            0 => Err(RegistryError::LifetimeTooShort(ttl)),
            secs => Ok(Duration::from_secs(secs)),
        }
    }

    async fn call<T>(
        &self,
        op: impl Future<Output = Result<T, KvStoreError>>,
    ) -> Result<T, RegistryError> {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RegistryError::Store(e.to_string())),
            Err(_) => Err(RegistryError::Timeout),
        }
    }

    /// Adds `digest` to an index set and keeps the set alive at least `ttl`.
    async fn index(&self, index_key: &str, digest: &str, ttl: Duration) -> Result<(), RegistryError> {
        self.call(self.store.sadd(index_key, digest)).await?;
        match self.call(self.store.ttl(index_key)).await? {
            KeyTtl::Expires(current) if current >= ttl => Ok(()),
            _ => self.call(self.store.expire(index_key, ttl)).await,
        }
    }

    /// Deletes every token in an index set together with the set.
    async fn revoke_index(&self, index_key: &str) -> Result<usize, RegistryError> {
        let digests = self.call(self.store.smembers(index_key)).await?;
        let count = digests.len();
        let mut keys: Vec<String> = digests.iter().map(|d| self.token_key(d)).collect();
        keys.push(index_key.to_owned());
        self.call(self.store.del(&keys)).await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl TokenRegistry for KvTokenRegistry {
    async fn register(
        &self,
        token: &str,
        user_id: UserId,
        ttl: Duration,
    ) -> Result<(), RegistryError> {
        let digest = Self::digest(token);
        let ttl = Self::store_ttl(ttl)?;

        self.call(
            self.store
                .set_ex(&self.token_key(&digest), &user_id.to_string(), ttl),
        )
        .await?;
        self.index(&self.user_key(user_id), &digest, ttl).await?;

        debug!(%user_id, token = &digest[..12], ttl_secs = ttl.as_secs(), "token registered");
        Ok(())
    }

    async fn is_valid(&self, token: &str) -> bool {
        let key = self.token_key(&Self::digest(token));
        match self.call(self.store.exists(&key)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "registry lookup failed, treating token as not valid");
                false
            }
        }
    }

    async fn user_id_for(&self, token: &str) -> Option<UserId> {
        let key = self.token_key(&Self::digest(token));
        match self.call(self.store.get(&key)).await {
            Ok(value) => value.and_then(|v| v.parse::<UserId>().ok()),
            Err(e) => {
                warn!(error = %e, "registry lookup failed");
                None
            }
        }
    }

    async fn revoke(&self, token: &str) -> Result<(), RegistryError> {
        let digest = Self::digest(token);
        self.call(self.store.del(&[self.token_key(&digest)])).await?;
        debug!(token = &digest[..12], "token revoked");
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<(), RegistryError> {
        let count = self.revoke_index(&self.user_key(user_id)).await?;
        debug!(%user_id, count, "all tokens revoked for user");
        Ok(())
    }

    async fn remaining_ttl(&self, token: &str) -> Option<Duration> {
        let key = self.token_key(&Self::digest(token));
        match self.call(self.store.ttl(&key)).await {
            Ok(KeyTtl::Expires(remaining)) => Some(remaining),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "registry ttl lookup failed");
                None
            }
        }
    }

    async fn link_session(
        &self,
        session_id: &SessionId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), RegistryError> {
        let ttl = Self::store_ttl(ttl)?;
        let digest = Self::digest(token);
        self.index(&self.session_key(session_id), &digest, ttl).await
    }

    async fn revoke_session(&self, session_id: &SessionId) -> Result<(), RegistryError> {
        let count = self.revoke_index(&self.session_key(session_id)).await?;
        debug!(%session_id, count, "session revoked");
        Ok(())
    }
}
