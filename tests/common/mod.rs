#![allow(dead_code)]

use bazaar::application_impl::*;
use bazaar::application_port::*;
use bazaar::domain_model::*;
use bazaar::domain_port::*;
use bazaar::infra_memory::*;
use jsonwebtoken::Algorithm;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
pub const REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 3600);
pub const SIGNING_KEY: &[u8] = b"integration-test-secret";

pub const SELLER: UserId = UserId(42);
pub const STAFF: UserId = UserId(7);
pub const OTHER: UserId = UserId(8);

/// In-memory store that counts every call and can be switched off.
pub struct FailingKvStore {
    inner: MemoryKvStore,
    down: AtomicBool,
    calls: AtomicUsize,
}

impl FailingKvStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: MemoryKvStore::new(clock),
            down: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), KvStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(KvStoreError::Store("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl KvStore for FailingKvStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvStoreError> {
        self.enter()?;
        self.inner.set_ex(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvStoreError> {
        self.enter()?;
        self.inner.get(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, KvStoreError> {
        self.enter()?;
        self.inner.exists(key).await
    }

    async fn del(&self, keys: &[String]) -> Result<(), KvStoreError> {
        self.enter()?;
        self.inner.del(keys).await
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvStoreError> {
        self.enter()?;
        self.inner.sadd(key, member).await
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvStoreError> {
        self.enter()?;
        self.inner.smembers(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvStoreError> {
        self.enter()?;
        self.inner.expire(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, KvStoreError> {
        self.enter()?;
        self.inner.ttl(key).await
    }
}

pub struct Stack {
    pub clock: Arc<ManualClock>,
    pub store: Arc<FailingKvStore>,
    pub codec: Arc<JwtCodec>,
    pub registry: Arc<KvTokenRegistry>,
    pub directory: Arc<MemoryUserDirectory>,
    pub issuer: Arc<RealSessionIssuer>,
    pub authenticator: Arc<RealRequestAuthenticator>,
}

pub fn jwt_config(algorithm: Algorithm) -> JwtConfig {
    JwtConfig {
        issuer: "bazaar.auth".into(),
        audience: "bazaar-client".into(),
        signing_key: SIGNING_KEY.to_vec(),
        allowed_algorithms: vec![algorithm],
    }
}

fn user(directory: &MemoryUserDirectory, user_id: UserId, username: &str, authorities: &[&str]) {
    directory.insert(
        CredentialRecord {
            user_id,
            username: username.into(),
            password_hash: String::new(),
            account_status: AccountStatus::Active,
        },
        authorities.iter().copied(),
    );
}

pub fn stack() -> Stack {
    stack_with(true)
}

pub fn stack_with(logout_revokes_refresh: bool) -> Stack {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(FailingKvStore::new(clock.clone()));
    let codec = Arc::new(JwtCodec::new(jwt_config(Algorithm::HS256), clock.clone()).unwrap());
    let registry = Arc::new(KvTokenRegistry::new(
        store.clone(),
        "auth",
        Duration::from_millis(200),
    ));

    let directory = Arc::new(MemoryUserDirectory::new());
    user(&directory, SELLER, "alice", &[ROLE_USER]);
    user(&directory, STAFF, "bob", &[ROLE_STAFF]);
    user(&directory, OTHER, "carol", &[ROLE_USER]);

    let issuer = Arc::new(RealSessionIssuer::new(
        codec.clone(),
        registry.clone(),
        directory.clone(),
        clock.clone(),
        SessionConfig {
            access_ttl: ACCESS_TTL,
            refresh_ttl: REFRESH_TTL,
            logout_revokes_refresh,
            directory_timeout: Duration::from_millis(200),
        },
    ));
    let authenticator = Arc::new(RealRequestAuthenticator::new(
        codec.clone(),
        registry.clone(),
        directory.clone(),
        Duration::from_millis(200),
    ));

    Stack {
        clock,
        store,
        codec,
        registry,
        directory,
        issuer,
        authenticator,
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

impl Stack {
    pub async fn authenticate(&self, token: &str) -> Result<Identity, AuthRejection> {
        let mut ctx = RequestContext::new();
        self.authenticator
            .authenticate(Some(bearer(token).as_str()), &mut ctx)
            .await
            .and_then(AuthOutcome::require)
    }

    pub async fn login(&self, user_id: UserId) -> AuthTokens {
        let authorities = self
            .directory
            .load_by_id(user_id)
            .await
            .unwrap()
            .map(|u| u.authorities)
            .unwrap_or_default();
        self.issuer.mint(user_id, authorities).await.unwrap()
    }
}
