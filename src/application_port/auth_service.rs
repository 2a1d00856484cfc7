use super::SessionError;
use crate::domain_model::*;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("username is already taken")]
    UserExists,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// A new account; it starts active with the plain user role.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<(), AuthError> {
        let name_len = self.username.chars().count();
        if !(3..=50).contains(&name_len) {
            return Err(AuthError::InvalidInput(
                "username must be 3 to 50 characters".into(),
            ));
        }
        if !self
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AuthError::InvalidInput(
                "username may only contain letters, digits and underscores".into(),
            ));
        }
        if !(6..=100).contains(&self.password.chars().count()) {
            return Err(AuthError::InvalidInput(
                "password must be 6 to 100 characters".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user_id: UserId,
    pub username: String,
    pub authorities: Vec<String>,
    pub token_type: &'static str,
    pub tokens: AuthTokens,
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    /// Creates the account and signs it straight in.
    async fn register(&self, request: RegisterInput) -> Result<LoginResult, AuthError>;
}
