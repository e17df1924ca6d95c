use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinError;

use crate::metrics::Metrics;
use super::ingest::{IngestOutcome, OrderIngestor};
use super::source::{InboundMessage, MessageSource, SourceError};

// ============================================================================
// Order Consumer - receive loop on a dedicated thread
// ============================================================================
//
// Lifecycle:
//   start()  → spawns the "order-consumer" thread with its own runtime
//   loop     → poll (bounded wait) → process one message → repeat
//   stop()   → signal, let an in-flight message finish within the grace
//              period, close the source, join the thread
//
// Messages are processed strictly one at a time. Each one runs in its own
// task so that a panic while handling it is caught at the task boundary and
// the loop moves on.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct ConsumerSettings {
    /// Upper bound for a single broker poll
    pub poll_timeout: Duration,
    /// How long an in-flight message may keep running after stop()
    pub shutdown_grace: Duration,
    /// Pause after a broker error before polling again
    pub error_backoff: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(5),
            error_backoff: Duration::from_millis(500),
        }
    }
}

pub struct OrderConsumer<S> {
    source: S,
    ingestor: Arc<OrderIngestor>,
    metrics: Arc<Metrics>,
    settings: ConsumerSettings,
}

impl<S: MessageSource + 'static> OrderConsumer<S> {
    pub fn new(
        source: S,
        ingestor: Arc<OrderIngestor>,
        metrics: Arc<Metrics>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            source,
            ingestor,
            metrics,
            settings,
        }
    }

    /// Spawn the receive loop on its own thread.
    pub fn start(self) -> std::io::Result<ConsumerHandle> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let thread = std::thread::Builder::new()
            .name("order-consumer".to_string())
            .spawn(move || runtime.block_on(self.run(shutdown_rx)))?;

        Ok(ConsumerHandle {
            shutdown: shutdown_tx,
            thread: Some(thread),
        })
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            poll_timeout_ms = self.settings.poll_timeout.as_millis() as u64,
            "🔄 Starting order consumer"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                _ = shutdown.changed() => break,
                received = self.source.recv(self.settings.poll_timeout) => received,
            };

            match received {
                Ok(None) => continue,
                Ok(Some(message)) => {
                    if !self.dispatch(message, &mut shutdown).await {
                        break;
                    }
                }
                Err(SourceError::Closed) => {
                    tracing::info!("Message source closed");
                    break;
                }
                Err(e) => {
                    self.metrics.broker_errors.inc();
                    tracing::error!(error = %e, "Consumer error");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(self.settings.error_backoff) => {}
                    }
                }
            }
        }

        self.source.close().await;
        tracing::info!("🛑 Order consumer stopped");
    }

    /// Process one message. Returns false when a stop was requested meanwhile.
    async fn dispatch(
        &self,
        message: InboundMessage,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let partition = message.partition;
        let offset = message.offset;

        let ingestor = self.ingestor.clone();
        let mut task = tokio::spawn(async move { ingestor.process(&message).await });

        tokio::select! {
            joined = &mut task => {
                self.finish(joined, partition, offset);
                return true;
            }
            _ = shutdown.changed() => {}
        }

        tracing::info!(
            partition = partition,
            offset = offset,
            grace_ms = self.settings.shutdown_grace.as_millis() as u64,
            "Stop requested while processing a message, waiting for it to finish"
        );

        match tokio::time::timeout(self.settings.shutdown_grace, &mut task).await {
            Ok(joined) => self.finish(joined, partition, offset),
            Err(_) => {
                task.abort();
                tracing::warn!(
                    partition = partition,
                    offset = offset,
                    "Grace period elapsed, abandoning in-flight message"
                );
            }
        }

        false
    }

    fn finish(&self, joined: Result<IngestOutcome, JoinError>, partition: i32, offset: i64) {
        match joined {
            Ok(outcome) => {
                tracing::debug!(
                    partition = partition,
                    offset = offset,
                    outcome = outcome.as_label(),
                    "Message processed"
                );
            }
            Err(e) if e.is_panic() => {
                self.metrics.record_ingest("panicked", 0.0);
                tracing::error!(
                    partition = partition,
                    offset = offset,
                    "Message processing panicked, skipping"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    partition = partition,
                    offset = offset,
                    "Message processing cancelled"
                );
            }
        }
    }
}

/// Owner of a running consumer thread. Dropping it signals the loop to stop
/// without waiting for the thread.
pub struct ConsumerHandle {
    shutdown: watch::Sender<bool>,
    thread: Option<JoinHandle<()>>,
}

impl ConsumerHandle {
    /// Stop the loop and block until the consumer thread has exited.
    pub fn stop(mut self) {
        self.shutdown.send_replace(true);

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Consumer thread panicked");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for ConsumerHandle {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
