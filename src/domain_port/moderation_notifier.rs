use crate::domain_model::ModerationEvent;

/// Delivers moderation outcomes to listing authors. Best-effort.
#[async_trait::async_trait]
pub trait ModerationNotifier: Send + Sync {
    async fn notify(&self, event: &ModerationEvent) -> anyhow::Result<()>;
}
