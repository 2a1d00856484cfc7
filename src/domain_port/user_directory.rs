use crate::domain_model::*;

#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn load_by_id(&self, user_id: UserId) -> Result<Option<DirectoryUser>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error("directory store error: {0}")]
    Store(String),
}
