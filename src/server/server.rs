use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::{Directory, Settings};
use anyhow::anyhow;
use jsonwebtoken::Algorithm;
use nanoid::nanoid;
use sqlx::MySqlPool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const DEV_SIGNING_KEY: &str = "bazaar-dev-signing-key";
const DEFAULT_TOPIC: &str = "bazaar.moderation";

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub session_issuer: Arc<dyn SessionIssuer>,
    pub authenticator: Arc<dyn RequestAuthenticator>,
    pub moderation_service: Arc<dyn ModerationService>,
    pub post_repo: Arc<dyn PostRepo>,
    pub clock: Arc<dyn Clock>,
    pool: Option<MySqlPool>,
}

struct Directories {
    users: Arc<dyn UserDirectory>,
    credentials: Arc<dyn CredentialRepo>,
    posts: Arc<dyn PostRepo>,
    pool: Option<MySqlPool>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let alphabet: [char; 16] = [
            '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
        ];
        let run_id = nanoid!(10, &alphabet);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let kv_store: Arc<dyn KvStore> = match settings.registry.backend.as_str() {
            "redis" => {
                let url = settings
                    .registry
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("registry.redis_url is required for the redis backend"))?;
                Arc::new(RedisKvStore::connect(url).await?)
            }
            "memory" => Arc::new(MemoryKvStore::new(clock.clone())),
            other => return Err(anyhow!("Unknown registry backend: {}", other)),
        };
        let registry: Arc<dyn TokenRegistry> = Arc::new(KvTokenRegistry::new(
            kv_store,
            settings.registry.prefix.clone(),
            Duration::from_millis(settings.registry.op_timeout_ms),
        ));

        let signing_key = match std::env::var("JWT_SIGNING_KEY") {
            Ok(key) if !key.is_empty() => key.into_bytes(),
            _ if settings.registry.backend == "memory" => {
                warn!("JWT_SIGNING_KEY is not set, using the development key");
                DEV_SIGNING_KEY.as_bytes().to_vec()
            }
            _ => return Err(anyhow!("JWT_SIGNING_KEY must be set")),
        };
        let allowed_algorithms = settings
            .jwt
            .allowed_algorithms
            .iter()
            .map(|name| Algorithm::from_str(name).map_err(|e| anyhow!("jwt algorithm {name}: {e}")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtCodec::new(
            JwtConfig {
                issuer: settings.jwt.issuer.clone(),
                audience: settings.jwt.audience.clone(),
                signing_key,
                allowed_algorithms,
            },
            clock.clone(),
        )?);

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let directories = Self::directories(&settings.directory, credential_hasher.as_ref()).await?;
        let directory_timeout = Duration::from_millis(settings.directory.op_timeout_ms);

        let session_issuer: Arc<dyn SessionIssuer> = Arc::new(RealSessionIssuer::new(
            token_codec.clone(),
            registry.clone(),
            directories.users.clone(),
            clock.clone(),
            SessionConfig {
                access_ttl: Duration::from_secs(settings.jwt.access_ttl_secs),
                refresh_ttl: Duration::from_secs(settings.jwt.refresh_ttl_secs),
                logout_revokes_refresh: settings.session.logout_revokes_refresh,
                directory_timeout,
            },
        ));

        let authenticator: Arc<dyn RequestAuthenticator> = Arc::new(RealRequestAuthenticator::new(
            token_codec,
            registry,
            directories.users.clone(),
            directory_timeout,
        ));

        let auth_service = Arc::new(RealAuthService::new(
            directories.credentials,
            directories.users,
            credential_hasher,
            session_issuer.clone(),
        ));
        auth_service.prepare().await?;
        let auth_service: Arc<dyn AuthService> = auth_service;

        let notifier: Arc<dyn ModerationNotifier> = match settings.notify.backend.as_str() {
            "kafka" => {
                let brokers = settings
                    .notify
                    .brokers
                    .as_deref()
                    .ok_or_else(|| anyhow!("notify.brokers is required for the kafka backend"))?;
                let topic = settings.notify.topic.as_deref().unwrap_or(DEFAULT_TOPIC);
                Arc::new(KafkaModerationNotifier::new(
                    brokers,
                    &format!("bazaar-moderation-{}", run_id),
                    topic,
                )?)
            }
            "log" => Arc::new(LogNotifier),
            other => return Err(anyhow!("Unknown notify backend: {}", other)),
        };

        let moderation_service: Arc<dyn ModerationService> = Arc::new(RealModerationService::new(
            directories.posts.clone(),
            notifier,
            clock.clone(),
        ));

        info!(%run_id, "server started");

        Ok(Self {
            auth_service,
            session_issuer,
            authenticator,
            moderation_service,
            post_repo: directories.posts,
            clock,
            pool: directories.pool,
        })
    }

    async fn directories(
        settings: &Directory,
        hasher: &dyn CredentialHasher,
    ) -> anyhow::Result<Directories> {
        match settings.backend.as_str() {
            "mysql" => {
                let url = settings
                    .mysql_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("directory.mysql_url is required for the mysql backend"))?;
                let pool = MySqlPool::connect(url).await?;
                let users = Arc::new(MySqlUserDirectory::new(pool.clone()));
                Ok(Directories {
                    users: users.clone(),
                    credentials: users,
                    posts: Arc::new(MySqlPostRepo::new(pool.clone())),
                    pool: Some(pool),
                })
            }
            "memory" => {
                let users = Arc::new(MemoryUserDirectory::new());
                for seed in &settings.seed {
                    let password_hash = hasher.hash_password(&seed.password).await?;
                    users.insert(
                        CredentialRecord {
                            user_id: UserId(seed.id),
                            username: seed.username.clone(),
                            password_hash,
                            account_status: AccountStatus::Active,
                        },
                        seed.authorities.iter().cloned(),
                    );
                }
                info!(count = settings.seed.len(), "seeded in-memory directory");
                Ok(Directories {
                    users: users.clone(),
                    credentials: users,
                    posts: Arc::new(MemoryPostRepo::new()),
                    pool: None,
                })
            }
            other => Err(anyhow!("Unknown directory backend: {}", other)),
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
