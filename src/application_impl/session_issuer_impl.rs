use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{Clock, UserDirectory};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Logout also revokes every token minted in the same session.
    pub logout_revokes_refresh: bool,
    /// Bound on the account lookup made before a refresh mints.
    pub directory_timeout: Duration,
}

pub struct RealSessionIssuer {
    codec: Arc<dyn TokenCodec>,
    registry: Arc<dyn TokenRegistry>,
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    cfg: SessionConfig,
}

impl RealSessionIssuer {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        registry: Arc<dyn TokenRegistry>,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        cfg: SessionConfig,
    ) -> Self {
        Self {
            codec,
            registry,
            directory,
            clock,
            cfg,
        }
    }

    #[inline]
    fn new_session_id() -> SessionId {
        SessionId(nanoid::nanoid!())
    }

    /// Remaining life of a token as the registry should see it; zero once expired.
    fn registry_ttl(&self, expires_at: DateTime<Utc>) -> Duration {
        (expires_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// The account as it stands now; tokens only carry a snapshot.
    async fn current_account(&self, user_id: UserId) -> Result<DirectoryUser, SessionError> {
        let lookup = tokio::time::timeout(
            self.cfg.directory_timeout,
            self.directory.load_by_id(user_id),
        );
        match lookup.await {
            Ok(Ok(Some(user))) if user.account_status.is_active() => Ok(user),
            Ok(Ok(Some(user))) => {
                warn!(
                    %user_id,
                    status = user.account_status.as_str(),
                    "refresh refused for disabled account"
                );
                Err(SessionError::AccountDisabled)
            }
            Ok(Ok(None)) => {
                warn!(%user_id, "refresh for unknown user");
                Err(SessionError::TokenInvalid)
            }
            Ok(Err(e)) => Err(SessionError::Directory(e.to_string())),
            Err(_) => Err(SessionError::Directory("user lookup timed out".into())),
        }
    }

    async fn track(
        &self,
        token: &str,
        user_id: UserId,
        session_id: &SessionId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let ttl = self.registry_ttl(expires_at);
        self.registry.register(token, user_id, ttl).await?;
        self.registry.link_session(session_id, token, ttl).await
    }

    /// Undoes a half-finished mint. Whatever survives here is unreachable
    /// anyway since the tokens never leave this process.
    async fn discard(&self, session_id: &SessionId, tokens: [&str; 2]) {
        for token in tokens {
            if let Err(e) = self.registry.revoke(token).await {
                warn!(error = %e, %session_id, "failed to roll back token registration");
            }
        }
        if let Err(e) = self.registry.revoke_session(session_id).await {
            warn!(error = %e, %session_id, "failed to roll back session index");
        }
    }
}

#[async_trait::async_trait]
impl SessionIssuer for RealSessionIssuer {
    async fn mint(
        &self,
        user_id: UserId,
        authorities: BTreeSet<String>,
    ) -> Result<AuthTokens, SessionError> {
        let session_id = Self::new_session_id();
        let input = ClaimsInput {
            subject: user_id,
            authorities,
            session_id: session_id.clone(),
        };

        let (access_token, access_exp) = self
            .codec
            .issue(&input, self.cfg.access_ttl)
            .map_err(SessionError::Codec)?;
        let (refresh_token, refresh_exp) = self
            .codec
            .issue(&input, self.cfg.refresh_ttl)
            .map_err(SessionError::Codec)?;

        let registered = futures_util::future::try_join(
            self.track(&access_token, user_id, &session_id, access_exp),
            self.track(&refresh_token, user_id, &session_id, refresh_exp),
        )
        .await;

        if let Err(e) = registered {
            error!(error = %e, %user_id, "token registration failed, session not issued");
            self.discard(&session_id, [&access_token, &refresh_token])
                .await;
            return Err(e.into());
        }

        info!(%user_id, %session_id, "session minted");
        Ok(AuthTokens {
            access_token: AccessToken(access_token),
            refresh_token: RefreshToken(refresh_token),
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    /// Rotates into a brand-new pair carrying the account's current authorities.
    /// Accounts that are no longer active cannot refresh.
    ///
    /// The presented refresh token is left to expire on its own, so for a short
    /// window both the old and the new refresh token are live. Revoking it here
    /// would fail concurrent requests that are still using it.
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<AuthTokens, SessionError> {
        let claims = match self.codec.verify(&refresh_token.0) {
            Ok(claims) => claims,
            Err(CodecError::Expired) => return Err(SessionError::TokenExpired),
            Err(e) => {
                debug!(error = %e, "refresh token failed verification");
                return Err(SessionError::TokenInvalid);
            }
        };

        if !self.registry.is_valid(&refresh_token.0).await {
            warn!(user_id = %claims.subject, "refresh with revoked or unknown token");
            return Err(SessionError::TokenRevoked);
        }

        let user = self.current_account(claims.subject).await?;
        self.mint(user.user_id, user.authorities).await
    }

    async fn logout(&self, access_token: &AccessToken) -> Result<(), SessionError> {
        self.registry.revoke(&access_token.0).await?;

        if self.cfg.logout_revokes_refresh {
            match self.codec.verify_ignoring_expiry(&access_token.0) {
                Ok(claims) => {
                    self.registry.revoke_session(&claims.session_id).await?;
                    info!(user_id = %claims.subject, session_id = %claims.session_id, "session logged out");
                }
                Err(e) => debug!(error = %e, "logout token not decodable, nothing to cascade"),
            }
        }
        Ok(())
    }

    async fn logout_all(&self, user_id: UserId) -> Result<(), SessionError> {
        self.registry.revoke_all_for_user(user_id).await?;
        info!(%user_id, "all sessions logged out");
        Ok(())
    }
}
