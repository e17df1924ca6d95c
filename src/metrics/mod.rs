use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order ingestion (outcomes, processing latency)
// - Persistence attempts and retry outcomes
// - Bounded cache (hits, misses, evictions, size)
// - Read path lookups by source and status
//
// All metrics are registered with one Registry and scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Ingestion
    pub orders_ingested: IntCounterVec,
    pub ingest_duration: HistogramVec,
    pub broker_errors: IntCounter,

    // Persistence / Retry
    pub persist_attempts: IntCounterVec,
    pub retry_outcomes: IntCounterVec,

    // Cache
    pub cache_lookups: IntCounterVec,
    pub cache_evictions: IntCounter,
    pub cache_write_failures: IntCounter,
    pub cache_size: IntGauge,

    // Read path
    pub order_lookups: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let orders_ingested = IntCounterVec::new(
            Opts::new("orders_ingested_total", "Orders consumed from the broker by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(orders_ingested.clone()))?;

        let ingest_duration = HistogramVec::new(
            HistogramOpts::new("order_ingest_duration_seconds", "Time spent processing one message")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(ingest_duration.clone()))?;

        let broker_errors = IntCounter::new(
            "broker_receive_errors_total",
            "Errors returned by the broker while polling",
        )?;
        registry.register(Box::new(broker_errors.clone()))?;

        let persist_attempts = IntCounterVec::new(
            Opts::new("order_persist_attempts_total", "Persistence attempts by attempt number"),
            &["attempt"],
        )?;
        registry.register(Box::new(persist_attempts.clone()))?;

        let retry_outcomes = IntCounterVec::new(
            Opts::new(
                "order_persist_retry_outcomes_total",
                "Final result of the persistence retry loop",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(retry_outcomes.clone()))?;

        let cache_lookups = IntCounterVec::new(
            Opts::new("order_cache_lookups_total", "Cache lookups by result"),
            &["result"],
        )?;
        registry.register(Box::new(cache_lookups.clone()))?;

        let cache_evictions = IntCounter::new(
            "order_cache_evictions_total",
            "Entries evicted to make room for new ones",
        )?;
        registry.register(Box::new(cache_evictions.clone()))?;

        let cache_write_failures = IntCounter::new(
            "order_cache_write_failures_total",
            "Rejected cache writes",
        )?;
        registry.register(Box::new(cache_write_failures.clone()))?;

        let cache_size = IntGauge::new("order_cache_size", "Entries currently cached")?;
        registry.register(Box::new(cache_size.clone()))?;

        let order_lookups = IntCounterVec::new(
            Opts::new("order_lookups_total", "Order lookups served over HTTP"),
            &["source", "status"],
        )?;
        registry.register(Box::new(order_lookups.clone()))?;

        Ok(Self {
            registry,
            orders_ingested,
            ingest_duration,
            broker_errors,
            persist_attempts,
            retry_outcomes,
            cache_lookups,
            cache_evictions,
            cache_write_failures,
            cache_size,
            order_lookups,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }

    pub fn record_ingest(&self, outcome: &str, duration_secs: f64) {
        self.orders_ingested.with_label_values(&[outcome]).inc();
        self.ingest_duration.with_label_values(&[outcome]).observe(duration_secs);
    }

    pub fn record_persist_attempt(&self, attempt: u32) {
        self.persist_attempts.with_label_values(&[attempt.to_string().as_str()]).inc();
    }

    pub fn record_retry_outcome(&self, outcome: &str) {
        self.retry_outcomes.with_label_values(&[outcome]).inc();
    }

    pub fn record_cache_lookup(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_lookups.with_label_values(&[result]).inc();
    }

    /// Record a cache write and the resulting size.
    pub fn record_cache_write(&self, evicted: bool, size: usize) {
        if evicted {
            self.cache_evictions.inc();
        }
        self.cache_size.set(size as i64);
    }

    pub fn record_order_lookup(&self, source: &str, status: u16) {
        self.order_lookups
            .with_label_values(&[source, status.to_string().as_str()])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_ingest("persisted", 0.01);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_ingest_outcomes() {
        let metrics = Metrics::new().unwrap();
        metrics.record_ingest("persisted", 0.05);
        metrics.record_ingest("persisted", 0.02);
        metrics.record_ingest("malformed", 0.001);

        assert_eq!(metrics.orders_ingested.with_label_values(&["persisted"]).get(), 2);
        assert_eq!(metrics.orders_ingested.with_label_values(&["malformed"]).get(), 1);
    }

    #[test]
    fn test_record_persist_attempts() {
        let metrics = Metrics::new().unwrap();
        metrics.record_persist_attempt(1);
        metrics.record_persist_attempt(2);
        metrics.record_retry_outcome("success");

        assert_eq!(metrics.persist_attempts.with_label_values(&["1"]).get(), 1);
        assert_eq!(metrics.persist_attempts.with_label_values(&["2"]).get(), 1);
        assert_eq!(metrics.retry_outcomes.with_label_values(&["success"]).get(), 1);
    }

    #[test]
    fn test_cache_write_updates_size_and_evictions() {
        let metrics = Metrics::new().unwrap();
        metrics.record_cache_write(false, 1);
        metrics.record_cache_write(true, 1);

        assert_eq!(metrics.cache_size.get(), 1);
        assert_eq!(metrics.cache_evictions.get(), 1);
    }

    #[test]
    fn test_encode_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_order_lookup("cache", 200);

        let body = String::from_utf8(metrics.encode().unwrap()).unwrap();
        assert!(body.contains("order_lookups_total"));
        assert!(body.contains("source=\"cache\""));
    }
}
