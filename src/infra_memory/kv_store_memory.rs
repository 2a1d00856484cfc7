use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// [`KvStore`] kept in a concurrent map. Expired keys are evicted lazily on access.
pub struct MemoryKvStore {
    map: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl MemoryKvStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryKvStore {
            map: DashMap::new(),
            clock,
        }
    }

    fn live(&self, key: &str) -> Option<Entry> {
        let now = self.clock.now();
        match self.map.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.clone()),
            Some(_) => {}
            None => return None,
        }
        self.map.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    fn corrupt(key: &str, detail: &str) -> KvStoreError {
        KvStoreError::Corrupt {
            key: key.to_owned(),
            detail: detail.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKvStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvStoreError> {
        let expires_at = self.clock.now() + ttl;
        self.map.insert(
            key.to_owned(),
            Entry {
                value: Value::Str(value.to_owned()),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvStoreError> {
        match self.live(key) {
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s)),
            Some(_) => Err(Self::corrupt(key, "expected a string")),
            None => Ok(None),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, KvStoreError> {
        Ok(self.live(key).is_some())
    }

    async fn del(&self, keys: &[String]) -> Result<(), KvStoreError> {
        for key in keys {
            self.map.remove(key);
        }
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvStoreError> {
        let now = self.clock.now();
        let mut entry = self.map.entry(key.to_owned()).or_insert_with(|| Entry {
            value: Value::Set(BTreeSet::new()),
            expires_at: None,
        });
        if entry.is_expired(now) {
            *entry = Entry {
                value: Value::Set(BTreeSet::new()),
                expires_at: None,
            };
        }
        match &mut entry.value {
            Value::Set(members) => {
                members.insert(member.to_owned());
                Ok(())
            }
            Value::Str(_) => Err(Self::corrupt(key, "expected a set")),
        }
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvStoreError> {
        match self.live(key) {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => Ok(members.into_iter().collect()),
            Some(_) => Err(Self::corrupt(key, "expected a set")),
            None => Ok(Vec::new()),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvStoreError> {
        let now = self.clock.now();
        if let Some(mut entry) = self.map.get_mut(key) {
            if !entry.is_expired(now) {
                entry.expires_at = Some(now + ttl);
            }
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, KvStoreError> {
        let now = self.clock.now();
        Ok(match self.live(key) {
            None => KeyTtl::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => KeyTtl::Expires((at - now).to_std().unwrap_or_default()),
        })
    }
}
