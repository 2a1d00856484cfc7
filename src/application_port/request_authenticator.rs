use crate::domain_model::*;
use serde::Serialize;

/// Why a request was turned away. Clients use the code to choose between
/// refreshing and logging in again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthRejection {
    #[error("token has expired")]
    TokenExpired,
    #[error("token is invalid")]
    TokenInvalid,
    #[error("token was revoked or is not recognized")]
    TokenRevoked,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("credentials are required")]
    MissingCredential,
    #[error("authentication is temporarily unavailable")]
    Unavailable,
}

impl AuthRejection {
    pub fn code(&self) -> &'static str {
        match self {
            AuthRejection::TokenExpired => "TokenExpired",
            AuthRejection::TokenInvalid => "TokenInvalid",
            AuthRejection::TokenRevoked => "TokenRevoked",
            AuthRejection::AccountDisabled => "AccountDisabled",
            AuthRejection::MissingCredential => "MissingCredential",
            AuthRejection::Unavailable => "Unavailable",
        }
    }
}

/// Body emitted for every rejected request.
#[derive(Debug, Clone, Serialize)]
pub struct UnauthorizedBody {
    pub code: &'static str,
    pub message: String,
}

impl From<AuthRejection> for UnauthorizedBody {
    fn from(rejection: AuthRejection) -> Self {
        UnauthorizedBody {
            code: rejection.code(),
            message: rejection.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("missing one of the authorities: {required:?}")]
    InsufficientAuthority { required: Vec<String> },
}

/// Per-request slot holding the identity once it has been resolved.
#[derive(Debug, Default)]
pub struct RequestContext {
    identity: Option<Identity>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn attach(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Anonymous,
    Authenticated(Identity),
}

impl AuthOutcome {
    /// For endpoints that are not public.
    pub fn require(self) -> Result<Identity, AuthRejection> {
        match self {
            AuthOutcome::Authenticated(identity) => Ok(identity),
            AuthOutcome::Anonymous => Err(AuthRejection::MissingCredential),
        }
    }
}

/// Takes the token out of an `Authorization` header value. Anything that is not
/// a non-empty bearer credential counts as no credential at all.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?.trim_start();
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Audit-logs the denial with the acting identity.
pub fn require_any_authority(identity: &Identity, required: &[&str]) -> Result<(), AuthzError> {
    if identity.has_any_authority(required) {
        Ok(())
    } else {
        tracing::warn!(user_id = %identity.user_id, ?required, "authorization denied");
        Err(AuthzError::InsufficientAuthority {
            required: required.iter().map(|s| s.to_string()).collect(),
        })
    }
}

#[async_trait::async_trait]
pub trait RequestAuthenticator: Send + Sync {
    async fn authenticate(
        &self,
        authorization: Option<&str>,
        ctx: &mut RequestContext,
    ) -> Result<AuthOutcome, AuthRejection>;
}
