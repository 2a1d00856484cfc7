use super::DirectoryError;
use crate::domain_model::*;

#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub account_status: AccountStatus,
}

#[async_trait::async_trait]
pub trait CredentialRepo: Send + Sync {
    /// Fetch credentials by username (for login).
    async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, DirectoryError>;

    /// Stores an active account holding `ROLE_USER`.
    /// A username that already exists yields [`DirectoryError::UsernameTaken`].
    async fn create_account(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserId, DirectoryError>;
}
