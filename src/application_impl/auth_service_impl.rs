use crate::application_port::*;
use crate::domain_model::UserId;
use crate::domain_port::{CredentialRepo, DirectoryError, UserDirectory};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

const DUMMY_PASSWORD: &str = "bazaar-no-such-user";

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!("verify error: {e}"))),
        }
    }
}

pub struct RealAuthService {
    credential_repo: Arc<dyn CredentialRepo>,
    directory: Arc<dyn UserDirectory>,
    credential_hasher: Arc<dyn CredentialHasher>,
    session_issuer: Arc<dyn SessionIssuer>,
    dummy_hash: OnceCell<String>,
}

impl RealAuthService {
    pub fn new(
        credential_repo: Arc<dyn CredentialRepo>,
        directory: Arc<dyn UserDirectory>,
        credential_hasher: Arc<dyn CredentialHasher>,
        session_issuer: Arc<dyn SessionIssuer>,
    ) -> Self {
        Self {
            credential_repo,
            directory,
            credential_hasher,
            session_issuer,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Computes the hash unknown usernames are checked against.
    pub async fn prepare(&self) -> Result<(), AuthError> {
        self.dummy_hash().await.map(|_| ())
    }

    async fn dummy_hash(&self) -> Result<&str, AuthError> {
        self.dummy_hash
            .get_or_try_init(|| self.credential_hasher.hash_password(DUMMY_PASSWORD))
            .await
            .map(String::as_str)
    }

    async fn sign_in(&self, user_id: UserId) -> Result<LoginResult, AuthError> {
        let user = self
            .directory
            .load_by_id(user_id)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?
            .ok_or_else(|| {
                AuthError::InternalError(format!("user {user_id} has credentials but no profile"))
            })?;

        let tokens = self
            .session_issuer
            .mint(user.user_id, user.authorities.clone())
            .await?;

        Ok(LoginResult {
            user_id: user.user_id,
            username: user.username,
            authorities: user.authorities.into_iter().collect(),
            token_type: "Bearer",
            tokens,
        })
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { username, password } = request;

        let rec = self
            .credential_repo
            .get_by_username(&username)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let Some(rec) = rec else {
            // unknown usernames pay for one verification as well
            let dummy = self.dummy_hash().await?;
            self.credential_hasher
                .verify_password(&password, dummy)
                .await?;
            return Err(AuthError::InvalidCredentials);
        };

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        // status is only revealed to callers who know the password
        if !rec.account_status.is_active() {
            warn!(user_id = %rec.user_id, status = rec.account_status.as_str(), "login refused for disabled account");
            return Err(AuthError::AccountDisabled);
        }

        let result = self.sign_in(rec.user_id).await?;
        info!(user_id = %result.user_id, "user logged in");
        Ok(result)
    }

    async fn register(&self, request: RegisterInput) -> Result<LoginResult, AuthError> {
        request.validate()?;

        let password_hash = self
            .credential_hasher
            .hash_password(&request.password)
            .await?;
        let user_id = self
            .credential_repo
            .create_account(&request.username, &password_hash)
            .await
            .map_err(|e| match e {
                DirectoryError::UsernameTaken => AuthError::UserExists,
                e => AuthError::Store(e.to_string()),
            })?;

        let result = self.sign_in(user_id).await?;
        info!(user_id = %user_id, username = %result.username, "user registered");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{JwtCodec, JwtConfig, KvTokenRegistry, RealSessionIssuer, SessionConfig};
    use crate::domain_model::*;
    use crate::domain_port::CredentialRecord;
    use crate::infra_memory::{ManualClock, MemoryKvStore, MemoryUserDirectory};
    use jsonwebtoken::Algorithm;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingHasher {
        hashes: AtomicUsize,
        verifies: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CredentialHasher for CountingHasher {
        async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
            self.hashes.fetch_add(1, Ordering::SeqCst);
            Argon2PasswordHasher.hash_password(password).await
        }

        async fn verify_password(
            &self,
            password: &str,
            password_hash: &str,
        ) -> Result<bool, AuthError> {
            self.verifies.fetch_add(1, Ordering::SeqCst);
            Argon2PasswordHasher
                .verify_password(password, password_hash)
                .await
        }
    }

    async fn service() -> (Arc<MemoryUserDirectory>, Arc<KvTokenRegistry>, RealAuthService) {
        let (directory, registry, service, _) = counted_service().await;
        (directory, registry, service)
    }

    async fn counted_service() -> (
        Arc<MemoryUserDirectory>,
        Arc<KvTokenRegistry>,
        RealAuthService,
        Arc<CountingHasher>,
    ) {
        let clock = Arc::new(ManualClock::default());
        let codec = Arc::new(
            JwtCodec::new(
                JwtConfig {
                    issuer: "bazaar.auth".into(),
                    audience: "bazaar-client".into(),
                    signing_key: b"unit-test-secret".to_vec(),
                    allowed_algorithms: vec![Algorithm::HS256],
                },
                clock.clone(),
            )
            .unwrap(),
        );
        let registry = Arc::new(KvTokenRegistry::new(
            Arc::new(MemoryKvStore::new(clock.clone())),
            "auth",
            Duration::from_secs(1),
        ));
        let hash = Argon2PasswordHasher.hash_password("hunter22").await.unwrap();
        let directory = Arc::new(MemoryUserDirectory::new());
        let issuer = Arc::new(RealSessionIssuer::new(
            codec,
            registry.clone(),
            directory.clone(),
            clock,
            SessionConfig {
                access_ttl: Duration::from_secs(900),
                refresh_ttl: Duration::from_secs(86400),
                logout_revokes_refresh: true,
                directory_timeout: Duration::from_secs(1),
            },
        ));

        directory.insert(
            CredentialRecord {
                user_id: UserId(42),
                username: "alice".into(),
                password_hash: hash,
                account_status: AccountStatus::Active,
            },
            [ROLE_USER],
        );

        let hasher = Arc::new(CountingHasher::default());
        let service = RealAuthService::new(
            directory.clone(),
            directory.clone(),
            hasher.clone(),
            issuer,
        );
        service.prepare().await.unwrap();
        (directory, registry, service, hasher)
    }

    fn input(username: &str, password: &str) -> LoginInput {
        LoginInput {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash_password("correct horse").await.unwrap();
        assert!(hasher.verify_password("correct horse", &hash).await.unwrap());
        assert!(!hasher.verify_password("wrong horse", &hash).await.unwrap());
        assert!(hasher.verify_password("x", "not-a-phc-string").await.is_err());
    }

    #[tokio::test]
    async fn login_mints_registered_tokens() {
        let (_, registry, service) = service().await;
        let result = service.login(input("alice", "hunter22")).await.unwrap();

        assert_eq!(result.user_id, UserId(42));
        assert_eq!(result.token_type, "Bearer");
        assert_eq!(result.authorities, vec![ROLE_USER.to_string()]);
        assert!(registry.is_valid(&result.tokens.access_token.0).await);
        assert!(registry.is_valid(&result.tokens.refresh_token.0).await);
    }

    #[tokio::test]
    async fn unknown_user_and_bad_password_look_the_same() {
        let (_, _, service) = service().await;
        let unknown = service.login(input("mallory", "hunter22")).await.unwrap_err();
        let wrong = service.login(input("alice", "hunter23")).await.unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn unknown_user_costs_a_verification_like_a_wrong_password() {
        let (_, _, service, hasher) = counted_service().await;

        service.login(input("mallory", "hunter22")).await.unwrap_err();
        assert_eq!(hasher.verifies.load(Ordering::SeqCst), 1);

        service.login(input("alice", "hunter23")).await.unwrap_err();
        assert_eq!(hasher.verifies.load(Ordering::SeqCst), 2);

        // the stand-in hash is computed once, at prepare
        assert_eq!(hasher.hashes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn register_signs_the_new_account_in() {
        let (directory, registry, service) = service().await;
        let result = service
            .register(RegisterInput {
                username: "bob_seller".into(),
                password: "s3cret!".into(),
            })
            .await
            .unwrap();

        assert_eq!(result.username, "bob_seller");
        assert_eq!(result.authorities, vec![ROLE_USER.to_string()]);
        assert!(registry.is_valid(&result.tokens.access_token.0).await);
        assert!(directory.load_by_id(result.user_id).await.unwrap().is_some());

        let again = service.login(input("bob_seller", "s3cret!")).await.unwrap();
        assert_eq!(again.user_id, result.user_id);
    }

    #[tokio::test]
    async fn register_refuses_taken_names_and_bad_input() {
        let (_, _, service, hasher) = counted_service().await;
        let register = |username: &str, password: &str| RegisterInput {
            username: username.into(),
            password: password.into(),
        };

        assert!(matches!(
            service.register(register("alice", "another1")).await,
            Err(AuthError::UserExists)
        ));

        let hashes_before = hasher.hashes.load(Ordering::SeqCst);
        for (username, password) in [
            ("al", "long enough"),
            ("no spaces", "long enough"),
            ("carol", "short"),
            (&"x".repeat(51)[..], "long enough"),
        ] {
            assert!(matches!(
                service.register(register(username, password)).await,
                Err(AuthError::InvalidInput(_))
            ));
        }
        assert_eq!(hasher.hashes.load(Ordering::SeqCst), hashes_before);
    }

    #[tokio::test]
    async fn banned_account_cannot_log_in() {
        let (directory, _, service) = service().await;
        directory.set_status(UserId(42), AccountStatus::Banned);
        assert!(matches!(
            service.login(input("alice", "hunter22")).await,
            Err(AuthError::AccountDisabled)
        ));
    }
}
