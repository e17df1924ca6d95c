use std::sync::Arc;
use std::time::Instant;

use crate::cache::{cache_order, OrderCache};
use crate::db::{OrderRepository, PersistOutcome, StoreError};
use crate::domain::order::Order;
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, RetryConfig, RetryResult};
use super::source::InboundMessage;

// ============================================================================
// Order Ingestion Pipeline
// ============================================================================
//
// decode → validate → persist (bounded retry) → populate cache
//
// Every step that fails turns into an `IngestOutcome`; nothing here returns an
// error to the consumer loop. Offsets are committed by the broker client as
// messages are received, so a dropped order is lost for good and is logged at
// error level.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyPayload,
    Malformed,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Order committed to the store and cached.
    Persisted,
    /// Order already stored; redelivery ignored.
    Duplicate,
    /// Message rejected before reaching the store.
    Skipped(SkipReason),
    /// Persistence failed on every attempt; the message is gone.
    Dropped,
}

impl IngestOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            IngestOutcome::Persisted => "persisted",
            IngestOutcome::Duplicate => "duplicate",
            IngestOutcome::Skipped(SkipReason::EmptyPayload) => "empty",
            IngestOutcome::Skipped(SkipReason::Malformed) => "malformed",
            IngestOutcome::Skipped(SkipReason::Invalid) => "invalid",
            IngestOutcome::Dropped => "dropped",
        }
    }
}

pub struct OrderIngestor {
    repository: Arc<dyn OrderRepository>,
    cache: Arc<OrderCache>,
    metrics: Arc<Metrics>,
    retry: RetryConfig,
}

impl OrderIngestor {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        cache: Arc<OrderCache>,
        metrics: Arc<Metrics>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            repository,
            cache,
            metrics,
            retry,
        }
    }

    /// Run one message through the pipeline and record its outcome.
    pub async fn process(&self, message: &InboundMessage) -> IngestOutcome {
        let started = Instant::now();
        let outcome = self.ingest(message).await;
        self.metrics
            .record_ingest(outcome.as_label(), started.elapsed().as_secs_f64());
        outcome
    }

    async fn ingest(&self, message: &InboundMessage) -> IngestOutcome {
        if message.payload.is_empty() {
            tracing::debug!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                "Received empty message, skipping"
            );
            return IngestOutcome::Skipped(SkipReason::EmptyPayload);
        }

        let order = match Order::from_json(&message.payload) {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    "Malformed order message, skipping"
                );
                return IngestOutcome::Skipped(SkipReason::Malformed);
            }
        };

        if let Err(e) = order.validate() {
            tracing::warn!(
                error = %e,
                order_uid = %order.order_uid,
                offset = message.offset,
                "Invalid order, skipping"
            );
            return IngestOutcome::Skipped(SkipReason::Invalid);
        }

        self.persist(order, message).await
    }

    async fn persist(&self, order: Order, message: &InboundMessage) -> IngestOutcome {
        let repository = &self.repository;
        let metrics = &self.metrics;
        let order_ref = &order;

        let result = retry_on_transient(&self.retry, move |attempt| {
            metrics.record_persist_attempt(attempt);
            tracing::debug!(
                attempt = attempt,
                order_uid = %order_ref.order_uid,
                "Persisting order"
            );
            repository.persist_order(order_ref)
        })
        .await;

        match result {
            RetryResult::Success { value: PersistOutcome::Inserted, attempts } => {
                self.metrics.record_retry_outcome("success");
                tracing::info!(
                    order_uid = %order.order_uid,
                    item_count = order.items.len(),
                    attempts = attempts,
                    partition = message.partition,
                    offset = message.offset,
                    "✅ Saved order with all related data"
                );
                cache_order(&self.cache, &self.metrics, order);
                IngestOutcome::Persisted
            }
            RetryResult::Success { value: PersistOutcome::Duplicate, .. } => {
                self.metrics.record_retry_outcome("success");
                tracing::warn!(
                    order_uid = %order.order_uid,
                    partition = message.partition,
                    offset = message.offset,
                    "Order already stored, ignoring redelivery"
                );
                IngestOutcome::Duplicate
            }
            RetryResult::Failed { error, attempts } => {
                self.metrics.record_retry_outcome("exhausted");
                self.drop_order(&order, message, &error, attempts)
            }
            RetryResult::PermanentFailure { error, attempts } => {
                self.metrics.record_retry_outcome("permanent");
                self.drop_order(&order, message, &error, attempts)
            }
        }
    }

    fn drop_order(
        &self,
        order: &Order,
        message: &InboundMessage,
        error: &StoreError,
        attempts: u32,
    ) -> IngestOutcome {
        tracing::error!(
            error = %error,
            attempts = attempts,
            order_uid = %order.order_uid,
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            "❌ Dropping order: persistence failed and the offset is already committed"
        );
        IngestOutcome::Dropped
    }
}
