// Private module declarations
mod consumer;
mod ingest;
mod source;

// Re-exports for public API
pub use consumer::{ConsumerHandle, ConsumerSettings, OrderConsumer};
pub use ingest::{IngestOutcome, OrderIngestor, SkipReason};
pub use source::{InboundMessage, KafkaSource, MessageSource, SourceError};
