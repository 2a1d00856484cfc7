use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::UserDirectory;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct RealRequestAuthenticator {
    codec: Arc<dyn TokenCodec>,
    registry: Arc<dyn TokenRegistry>,
    directory: Arc<dyn UserDirectory>,
    directory_timeout: Duration,
}

impl RealRequestAuthenticator {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        registry: Arc<dyn TokenRegistry>,
        directory: Arc<dyn UserDirectory>,
        directory_timeout: Duration,
    ) -> Self {
        Self {
            codec,
            registry,
            directory,
            directory_timeout,
        }
    }

    fn reject(rejection: AuthRejection, user_id: Option<UserId>) -> AuthRejection {
        match user_id {
            Some(user_id) => warn!(code = rejection.code(), %user_id, "request rejected"),
            None => warn!(code = rejection.code(), "request rejected"),
        }
        rejection
    }

    async fn resolve(&self, claims: &IdentityClaims) -> Result<DirectoryUser, AuthRejection> {
        let user_id = claims.subject;
        let lookup = tokio::time::timeout(self.directory_timeout, self.directory.load_by_id(user_id));
        match lookup.await {
            Ok(Ok(Some(user))) => Ok(user),
            Ok(Ok(None)) => Err(Self::reject(AuthRejection::TokenInvalid, Some(user_id))),
            Ok(Err(e)) => {
                warn!(error = %e, %user_id, "user directory lookup failed");
                Err(Self::reject(AuthRejection::Unavailable, Some(user_id)))
            }
            Err(_) => {
                warn!(%user_id, "user directory lookup timed out");
                Err(Self::reject(AuthRejection::Unavailable, Some(user_id)))
            }
        }
    }
}

#[async_trait::async_trait]
impl RequestAuthenticator for RealRequestAuthenticator {
    async fn authenticate(
        &self,
        authorization: Option<&str>,
        ctx: &mut RequestContext,
    ) -> Result<AuthOutcome, AuthRejection> {
        if let Some(identity) = ctx.identity() {
            return Ok(AuthOutcome::Authenticated(identity.clone()));
        }

        let Some(token) = bearer_token(authorization) else {
            return Ok(AuthOutcome::Anonymous);
        };

        // local checks first, the registry is only consulted for well-signed tokens
        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(CodecError::Expired) => return Err(Self::reject(AuthRejection::TokenExpired, None)),
            Err(e) => {
                debug!(error = %e, "token failed verification");
                return Err(Self::reject(AuthRejection::TokenInvalid, None));
            }
        };

        if !self.registry.is_valid(token).await {
            return Err(Self::reject(AuthRejection::TokenRevoked, Some(claims.subject)));
        }

        let user = self.resolve(&claims).await?;
        if !user.account_status.is_active() {
            return Err(Self::reject(AuthRejection::AccountDisabled, Some(user.user_id)));
        }

        let identity = Identity {
            user_id: user.user_id,
            username: user.username,
            authorities: user.authorities,
            session_id: claims.session_id,
        };
        ctx.attach(identity.clone());
        Ok(AuthOutcome::Authenticated(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{JwtCodec, JwtConfig, KvTokenRegistry};
    use crate::domain_port::{CredentialRecord, DirectoryError};
    use crate::infra_memory::{ManualClock, MemoryKvStore, MemoryUserDirectory};
    use jsonwebtoken::Algorithm;
    use std::collections::BTreeSet;

    struct Fixture {
        clock: Arc<ManualClock>,
        codec: Arc<JwtCodec>,
        registry: Arc<KvTokenRegistry>,
        directory: Arc<MemoryUserDirectory>,
        authenticator: RealRequestAuthenticator,
    }

    struct DownDirectory;

    #[async_trait::async_trait]
    impl UserDirectory for DownDirectory {
        async fn load_by_id(&self, _: UserId) -> Result<Option<DirectoryUser>, DirectoryError> {
            Err(DirectoryError::Store("pool timed out".into()))
        }
    }

    fn fixture() -> Fixture {
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
        let store = Arc::new(MemoryKvStore::new(clock.clone()));
        let registry = Arc::new(KvTokenRegistry::new(store, "auth", Duration::from_secs(1)));
        let directory = Arc::new(MemoryUserDirectory::new());
        directory.insert(
            CredentialRecord {
                user_id: UserId(42),
                username: "alice".into(),
                password_hash: String::new(),
                account_status: AccountStatus::Active,
            },
            [ROLE_USER, ROLE_STAFF],
        );
        let authenticator = RealRequestAuthenticator::new(
            codec.clone(),
            registry.clone(),
            directory.clone(),
            Duration::from_secs(1),
        );
        Fixture {
            clock,
            codec,
            registry,
            directory,
            authenticator,
        }
    }

    impl Fixture {
        async fn token_for(&self, user_id: i64) -> String {
            let input = ClaimsInput {
                subject: UserId(user_id),
                authorities: BTreeSet::from([ROLE_USER.to_string()]),
                session_id: SessionId("s1".into()),
            };
            let (token, _) = self.codec.issue(&input, Duration::from_secs(900)).unwrap();
            self.registry
                .register(&token, UserId(user_id), Duration::from_secs(900))
                .await
                .unwrap();
            token
        }

        async fn run(&self, header: Option<&str>) -> Result<AuthOutcome, AuthRejection> {
            let mut ctx = RequestContext::new();
            self.authenticator.authenticate(header, &mut ctx).await
        }
    }

    #[tokio::test]
    async fn no_header_is_anonymous() {
        let f = fixture();
        assert_eq!(f.run(None).await, Ok(AuthOutcome::Anonymous));
        assert_eq!(f.run(Some("Basic abc")).await, Ok(AuthOutcome::Anonymous));
    }

    #[tokio::test]
    async fn live_token_attaches_directory_identity() {
        let f = fixture();
        let token = f.token_for(42).await;
        let header = format!("Bearer {token}");

        let mut ctx = RequestContext::new();
        let outcome = f
            .authenticator
            .authenticate(Some(header.as_str()), &mut ctx)
            .await
            .unwrap();
        let identity = outcome.require().unwrap();
        assert_eq!(identity.user_id, UserId(42));
        // authorities come from the directory, not from the token
        assert!(identity.has_authority(ROLE_STAFF));
        assert_eq!(ctx.identity(), Some(&identity));
    }

    #[tokio::test]
    async fn attached_identity_short_circuits() {
        let f = fixture();
        let mut ctx = RequestContext::new();
        let identity = Identity {
            user_id: UserId(7),
            username: "bob".into(),
            authorities: BTreeSet::new(),
            session_id: SessionId("pre".into()),
        };
        ctx.attach(identity.clone());

        let outcome = f
            .authenticator
            .authenticate(Some("Bearer garbage"), &mut ctx)
            .await;
        assert_eq!(outcome, Ok(AuthOutcome::Authenticated(identity)));
    }

    #[tokio::test]
    async fn expired_and_invalid_are_distinguished() {
        let f = fixture();
        let token = f.token_for(42).await;
        assert_eq!(
            f.run(Some("Bearer not.a.token")).await,
            Err(AuthRejection::TokenInvalid)
        );

        f.clock.advance(Duration::from_secs(900));
        assert_eq!(
            f.run(Some(format!("Bearer {token}").as_str())).await,
            Err(AuthRejection::TokenExpired)
        );
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let f = fixture();
        let token = f.token_for(42).await;
        f.registry.revoke(&token).await.unwrap();
        assert_eq!(
            f.run(Some(format!("Bearer {token}").as_str())).await,
            Err(AuthRejection::TokenRevoked)
        );
    }

    #[tokio::test]
    async fn suspended_account_is_disabled() {
        let f = fixture();
        let token = f.token_for(42).await;
        f.directory.set_status(UserId(42), AccountStatus::Suspended);
        assert_eq!(
            f.run(Some(format!("Bearer {token}").as_str())).await,
            Err(AuthRejection::AccountDisabled)
        );
    }

    #[tokio::test]
    async fn unknown_user_is_invalid() {
        let f = fixture();
        let token = f.token_for(99).await;
        assert_eq!(
            f.run(Some(format!("Bearer {token}").as_str())).await,
            Err(AuthRejection::TokenInvalid)
        );
    }

    #[tokio::test]
    async fn directory_outage_is_unavailable() {
        let f = fixture();
        let token = f.token_for(42).await;
        let authenticator = RealRequestAuthenticator::new(
            f.codec.clone(),
            f.registry.clone(),
            Arc::new(DownDirectory),
            Duration::from_secs(1),
        );
        let mut ctx = RequestContext::new();
        assert_eq!(
            authenticator
                .authenticate(Some(format!("Bearer {token}").as_str()), &mut ctx)
                .await,
            Err(AuthRejection::Unavailable)
        );
        assert!(ctx.identity().is_none());
    }
}
