use crate::domain_model::*;
use crate::domain_port::PostRepoError;

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("post not found")]
    PostNotFound,
    #[error("invalid state transition from {from}")]
    InvalidStateTransition { from: PostStatus },
    #[error("rejection reason is required")]
    MissingRejectionReason,
    #[error("store error: {0}")]
    Store(String),
}

impl From<PostError> for ModerationError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::InvalidStateTransition { from } => {
                ModerationError::InvalidStateTransition { from }
            }
            PostError::MissingRejectionReason => ModerationError::MissingRejectionReason,
            other => ModerationError::Store(other.to_string()),
        }
    }
}

impl From<PostRepoError> for ModerationError {
    fn from(err: PostRepoError) -> Self {
        match err {
            PostRepoError::NotFound => ModerationError::PostNotFound,
            PostRepoError::Invalid(e) => e.into(),
            PostRepoError::Store(e) => ModerationError::Store(e),
        }
    }
}

/// Moves listings out of `Pending`. Callers must already have checked that the
/// moderator carries an administrative or staff authority.
#[async_trait::async_trait]
pub trait ModerationService: Send + Sync {
    async fn approve(&self, post_id: PostId, moderator: UserId) -> Result<Post, ModerationError>;
    async fn reject(
        &self,
        post_id: PostId,
        moderator: UserId,
        reason: &str,
    ) -> Result<Post, ModerationError>;
}
