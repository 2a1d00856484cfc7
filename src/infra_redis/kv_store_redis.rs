use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// [`KvStore`] on a Redis connection manager. Each call maps to one Redis command.
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    pub fn new(conn: ConnectionManager) -> Self {
        RedisKvStore { conn }
    }

    pub async fn connect(url: &str) -> Result<Self, KvStoreError> {
        let client = redis::Client::open(url).map_err(|e| KvStoreError::Store(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| KvStoreError::Store(e.to_string()))?;
        Ok(Self::new(conn))
    }

    #[inline]
    fn secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

fn store_err(e: redis::RedisError) -> KvStoreError {
    KvStoreError::Store(e.to_string())
}

#[async_trait::async_trait]
impl KvStore for RedisKvStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvStoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, value, Self::secs(ttl))
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvStoreError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(store_err)
    }

    async fn exists(&self, key: &str) -> Result<bool, KvStoreError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(store_err)
    }

    async fn del(&self, keys: &[String]) -> Result<(), KvStoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: usize = conn.del(keys).await.map_err(store_err)?;
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvStoreError> {
        let mut conn = self.conn.clone();
        let _: usize = conn.sadd(key, member).await.map_err(store_err)?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvStoreError> {
        let mut conn = self.conn.clone();
        conn.smembers(key).await.map_err(store_err)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvStoreError> {
        let mut conn = self.conn.clone();
        let _: bool = conn
            .expire(key, Self::secs(ttl) as i64)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, KvStoreError> {
        let mut conn = self.conn.clone();
        let secs: i64 = conn.ttl(key).await.map_err(store_err)?;
        match secs {
            -2 => Ok(KeyTtl::Missing),
            -1 => Ok(KeyTtl::Persistent),
            s if s >= 0 => Ok(KeyTtl::Expires(Duration::from_secs(s as u64))),
            other => Err(KvStoreError::Corrupt {
                key: key.to_owned(),
                detail: format!("unexpected TTL reply {other}"),
            }),
        }
    }
}
