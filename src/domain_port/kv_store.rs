use std::time::Duration;

/// Remaining lifetime of a key as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    Missing,
    Persistent,
    Expires(Duration),
}

/// Key-value store with per-key TTL and set membership.
///
/// Every single call must be atomic on the store side. TTLs have whole-second
/// resolution.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvStoreError>;
    async fn get(&self, key: &str) -> Result<Option<String>, KvStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, KvStoreError>;
    /// Deleting a missing key is not an error.
    async fn del(&self, keys: &[String]) -> Result<(), KvStoreError>;
    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvStoreError>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvStoreError>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvStoreError>;
    async fn ttl(&self, key: &str) -> Result<KeyTtl, KvStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum KvStoreError {
    #[error("store error: {0}")]
    Store(String),
    #[error("unexpected value at {key}: {detail}")]
    Corrupt { key: String, detail: String },
}
