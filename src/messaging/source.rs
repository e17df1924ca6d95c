use std::time::Duration;

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer, StreamConsumer},
    error::KafkaError,
    Message,
};

// ============================================================================
// Message Sources
// ============================================================================
//
// A `MessageSource` yields raw payloads from the broker one at a time. The
// consumer loop only ever talks to this trait, which keeps the loop testable
// without a running broker.
//
// ============================================================================

/// A message detached from the broker client.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("broker error: {0}")]
    Broker(#[from] KafkaError),

    #[error("message source closed")]
    Closed,
}

#[async_trait]
pub trait MessageSource: Send {
    /// Wait up to `timeout` for the next message. `Ok(None)` means the wait
    /// elapsed without a message, which is not an error.
    async fn recv(&mut self, timeout: Duration) -> Result<Option<InboundMessage>, SourceError>;

    /// Release the broker connection.
    async fn close(&mut self) {}
}

// ============================================================================
// Kafka / Redpanda source
// ============================================================================

pub struct KafkaSource {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaSource {
    /// Join `group_id` and subscribe to `topic`. Offsets are committed
    /// automatically as messages are handed out (at-least-once delivery).
    pub fn new(brokers: &str, topic: &str, group_id: &str) -> Result<Self, SourceError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()?;

        consumer.subscribe(&[topic])?;

        tracing::info!(
            brokers = %brokers,
            topic = %topic,
            group_id = %group_id,
            "Subscribed to order topic"
        );

        Ok(Self {
            consumer,
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn recv(&mut self, timeout: Duration) -> Result<Option<InboundMessage>, SourceError> {
        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(message)) => Ok(Some(InboundMessage {
                topic: message.topic().to_string(),
                partition: message.partition(),
                offset: message.offset(),
                payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            })),
        }
    }

    async fn close(&mut self) {
        self.consumer.unsubscribe();
        tracing::info!(topic = %self.topic, "Unsubscribed from order topic");
    }
}

// ============================================================================
// Channel source (tests)
// ============================================================================

#[cfg(test)]
pub(crate) type ChannelSender = tokio::sync::mpsc::UnboundedSender<Result<Vec<u8>, KafkaError>>;

/// Yields whatever is pushed through the paired sender: payloads as messages,
/// `Err` as a broker error. Dropping the sender closes the source.
#[cfg(test)]
pub(crate) struct ChannelSource {
    receiver: tokio::sync::mpsc::UnboundedReceiver<Result<Vec<u8>, KafkaError>>,
    next_offset: i64,
}

#[cfg(test)]
impl ChannelSource {
    pub(crate) fn new() -> (ChannelSender, Self) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (sender, Self { receiver, next_offset: 0 })
    }
}

#[cfg(test)]
#[async_trait]
impl MessageSource for ChannelSource {
    async fn recv(&mut self, timeout: Duration) -> Result<Option<InboundMessage>, SourceError> {
        match tokio::time::timeout(timeout, self.receiver.recv()).await {
            Err(_) => Ok(None),
            Ok(None) => Err(SourceError::Closed),
            Ok(Some(Err(e))) => Err(e.into()),
            Ok(Some(Ok(payload))) => {
                let offset = self.next_offset;
                self.next_offset += 1;
                Ok(Some(InboundMessage {
                    topic: "order".to_string(),
                    partition: 0,
                    offset,
                    payload,
                }))
            }
        }
    }
}
