use crate::domain_model::ModerationEvent;
use crate::domain_port::ModerationNotifier;
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;

/// Publishes moderation events as JSON, keyed by the recipient's user id so
/// every author's notifications stay ordered within one partition.
pub struct KafkaModerationNotifier {
    inner: FutureProducer,
    topic: String,
}

impl KafkaModerationNotifier {
    pub fn new(bootstrap_server: &str, client_id: &str, topic: &str) -> anyhow::Result<Self> {
        let inner = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_server)
            .set("client.id", client_id)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("compression.type", "lz4")
            .create()?;
        Ok(Self {
            inner,
            topic: topic.to_owned(),
        })
    }
}

#[async_trait::async_trait]
impl ModerationNotifier for KafkaModerationNotifier {
    async fn notify(&self, event: &ModerationEvent) -> anyhow::Result<()> {
        let key = event.recipient.user_id.to_string();
        let payload = serde_json::to_vec(event)?;
        let rec = FutureRecord::to(&self.topic).key(&key).payload(&payload);
        self.inner
            .send(rec, Duration::from_secs(5))
            .await
            .map(|_delivery_report| ())
            .map_err(|(e, _msg)| anyhow::anyhow!(e))
    }
}
