use crate::domain_model::ModerationEvent;
use crate::domain_port::ModerationNotifier;
use std::sync::Mutex;

fn log_event(event: &ModerationEvent) {
    tracing::info!(
        post_id = %event.post_id,
        recipient = %event.recipient.user_id,
        outcome = ?event.outcome,
        "{}",
        event.message
    );
}

/// Writes moderation events to the log and nowhere else.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl ModerationNotifier for LogNotifier {
    async fn notify(&self, event: &ModerationEvent) -> anyhow::Result<()> {
        log_event(event);
        Ok(())
    }
}

/// Logs every event and keeps a copy.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ModerationEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails after recording.
    pub fn failing() -> Self {
        Self {
            events: Mutex::default(),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<ModerationEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ModerationNotifier for RecordingNotifier {
    async fn notify(&self, event: &ModerationEvent) -> anyhow::Result<()> {
        log_event(event);
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        if self.fail {
            return Err(anyhow::anyhow!("notification channel unavailable"));
        }
        Ok(())
    }
}
