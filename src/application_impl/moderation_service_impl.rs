use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{Clock, ModerationNotifier, PostRepo};
use std::sync::Arc;
use tracing::{info, warn};

pub struct RealModerationService {
    post_repo: Arc<dyn PostRepo>,
    notifier: Arc<dyn ModerationNotifier>,
    clock: Arc<dyn Clock>,
}

impl RealModerationService {
    pub fn new(
        post_repo: Arc<dyn PostRepo>,
        notifier: Arc<dyn ModerationNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            post_repo,
            notifier,
            clock,
        }
    }

    async fn load(&self, post_id: PostId) -> Result<Post, ModerationError> {
        self.post_repo
            .load(post_id)
            .await?
            .ok_or(ModerationError::PostNotFound)
    }

    /// Persists the decision, then tells the author. A lost notification does
    /// not undo the decision.
    ///
    /// The write only lands while the stored post is still `Pending`, so of two
    /// moderators deciding at once exactly one wins and only the winner notifies.
    async fn commit(&self, post: Post, moderator: UserId) -> Result<Post, ModerationError> {
        if let Err(e) = self.post_repo.save(&post, PostStatus::Pending).await {
            warn!(post_id = %post.id, %moderator, error = %e, "moderation decision not recorded");
            return Err(e.into());
        }
        info!(
            post_id = %post.id,
            %moderator,
            status = post.status.as_str(),
            "moderation decision recorded"
        );

        if let Some(event) = ModerationEvent::for_post(&post) {
            if let Err(e) = self.notifier.notify(&event).await {
                warn!(post_id = %post.id, error = %e, "moderation notification not delivered");
            }
        }
        Ok(post)
    }
}

#[async_trait::async_trait]
impl ModerationService for RealModerationService {
    async fn approve(&self, post_id: PostId, moderator: UserId) -> Result<Post, ModerationError> {
        let mut post = self.load(post_id).await?;
        post.approve(self.clock.now())?;
        self.commit(post, moderator).await
    }

    async fn reject(
        &self,
        post_id: PostId,
        moderator: UserId,
        reason: &str,
    ) -> Result<Post, ModerationError> {
        if reason.trim().is_empty() {
            return Err(ModerationError::MissingRejectionReason);
        }
        let mut post = self.load(post_id).await?;
        post.reject(reason, self.clock.now())?;
        self.commit(post, moderator).await
    }
}
