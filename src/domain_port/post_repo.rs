use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait PostRepo: Send + Sync {
    /// Stores a new listing; the returned post is always `Pending`.
    async fn create(&self, draft: NewPost, now: DateTime<Utc>) -> Result<Post, PostRepoError>;
    async fn load(&self, post_id: PostId) -> Result<Option<Post>, PostRepoError>;
    /// Writes `post` only while the stored status is still `expected`.
    ///
    /// A post that moved in the meantime yields
    /// `Invalid(PostError::InvalidStateTransition { from })` with its current status.
    async fn save(&self, post: &Post, expected: PostStatus) -> Result<(), PostRepoError>;
    async fn list_by_status(
        &self,
        status: PostStatus,
        page: PageRequest,
    ) -> Result<PostPage, PostRepoError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PostRepoError {
    #[error("post not found")]
    NotFound,
    #[error("invalid post: {0}")]
    Invalid(#[from] PostError),
    #[error("post store error: {0}")]
    Store(String),
}
