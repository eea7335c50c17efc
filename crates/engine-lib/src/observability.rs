//! Observability infrastructure for the quotation engine
//!
//! Provides:
//! - Prometheus metrics (strategy attempts, pricing outcomes, ledger statuses, port latency)
//! - Structured JSON logging with tracing

use crate::models::{LedgerSummary, QuotationResult, QuoteStatus};
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for external call latency (in seconds)
const CALL_LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    recommendation_attempts: IntCounterVec,
    pricing_requests: IntCounterVec,
    quotes: IntCounterVec,
    external_call_seconds: HistogramVec,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            recommendation_attempts: register_int_counter_vec!(
                "skuq_recommendation_attempts_total",
                "Recommendation strategy attempts by outcome",
                &["strategy", "outcome"]
            )
            .expect("Failed to register recommendation_attempts_total"),

            pricing_requests: register_int_counter_vec!(
                "skuq_pricing_requests_total",
                "Pricing lookups by outcome",
                &["outcome"]
            )
            .expect("Failed to register pricing_requests_total"),

            quotes: register_int_counter_vec!(
                "skuq_quotes_total",
                "Ledger entries recorded by status",
                &["status"]
            )
            .expect("Failed to register quotes_total"),

            external_call_seconds: register_histogram_vec!(
                "skuq_external_call_seconds",
                "Latency of calls to the external recommendation and pricing services",
                &["port"],
                CALL_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register external_call_seconds"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share
/// the same collectors.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a metrics handle, registering the collectors on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn record_recommendation_attempt(&self, strategy: &str, outcome: &str) {
        self.inner()
            .recommendation_attempts
            .with_label_values(&[strategy, outcome])
            .inc();
    }

    /// `outcome` is one of `priced`, `not_found`, `transport`
    pub fn record_pricing(&self, outcome: &str) {
        self.inner()
            .pricing_requests
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn record_quote(&self, status: QuoteStatus) {
        self.inner()
            .quotes
            .with_label_values(&[status.as_str()])
            .inc();
    }

    pub fn observe_external_call(&self, port: &str, duration_secs: f64) {
        self.inner()
            .external_call_seconds
            .with_label_values(&[port])
            .observe(duration_secs);
    }

    /// Text exposition of every collector in the default registry
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for batch events
///
/// Every event carries the run label so interleaved runs stay separable.
#[derive(Clone)]
pub struct StructuredLogger {
    run_label: String,
}

impl StructuredLogger {
    pub fn new(run_label: impl Into<String>) -> Self {
        Self {
            run_label: run_label.into(),
        }
    }

    pub fn run_label(&self) -> &str {
        &self.run_label
    }

    pub fn log_batch_started(&self, records: usize, region: &str, term: &str, concurrency: usize) {
        info!(
            event = "batch_started",
            run = %self.run_label,
            records = records,
            region = %region,
            term = %term,
            concurrency = concurrency,
            "Quotation batch started"
        );
    }

    /// Log which source produced the SKU for a record
    pub fn log_sku_resolved(&self, source_ref: &str, source: &str, sku: &str, detail: &str) {
        info!(
            event = "sku_resolved",
            run = %self.run_label,
            source_ref = %source_ref,
            source = %source,
            sku = %sku,
            detail = %detail,
            "Resolved instance type"
        );
    }

    pub fn log_quote_recorded(&self, index: usize, result: &QuotationResult) {
        match result.status {
            QuoteStatus::Failed => {
                warn!(
                    event = "quote_recorded",
                    run = %self.run_label,
                    index = index,
                    source_ref = %result.source_ref,
                    status = result.status.as_str(),
                    sku = ?result.sku,
                    error_kind = ?result.error_kind.map(|k| k.as_str()),
                    error = ?result.error,
                    "Quotation failed"
                );
            }
            _ => {
                info!(
                    event = "quote_recorded",
                    run = %self.run_label,
                    index = index,
                    source_ref = %result.source_ref,
                    status = result.status.as_str(),
                    sku = ?result.sku,
                    monthly_price = ?result.monthly_price.map(|p| p.to_string()),
                    "Quotation recorded"
                );
            }
        }
    }

    pub fn log_batch_finished(&self, summary: &LedgerSummary) {
        info!(
            event = "batch_finished",
            run = %self.run_label,
            total = summary.total,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            total_monthly = %summary.total_monthly,
            "Quotation batch finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_engine_metrics_render() {
        let metrics = EngineMetrics::new();

        metrics.record_recommendation_attempt("gen8-price", "recommended");
        metrics.record_pricing("not_found");
        metrics.record_quote(QuoteStatus::Skipped);
        metrics.observe_external_call("price", 0.02);

        let text = metrics.render();
        assert!(text.contains("skuq_recommendation_attempts_total"));
        assert!(text.contains("skuq_pricing_requests_total{outcome=\"not_found\"}"));
        assert!(text.contains("skuq_quotes_total{status=\"skipped\"}"));
        assert!(text.contains("skuq_external_call_seconds_bucket"));
    }

    #[test]
    fn test_handles_share_collectors() {
        let first = EngineMetrics::new();
        let second = first.clone();
        first.record_pricing("priced");
        second.record_pricing("priced");
        assert!(second.render().contains("skuq_pricing_requests_total{outcome=\"priced\"}"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("batch-1");
        assert_eq!(logger.run_label(), "batch-1");
    }

    /// In-memory sink for captured log lines
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sku_resolved_event() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || sink.clone())
            .finish();

        let logger = StructuredLogger::new("batch-2");
        tracing::subscriber::with_default(subscriber, || {
            logger.log_sku_resolved("row-7", "remote", "ecs.g8y.4xlarge", "gen8-price");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let line: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(line["fields"]["event"], "sku_resolved");
        assert_eq!(line["fields"]["sku"], "ecs.g8y.4xlarge");
        assert_eq!(line["fields"]["detail"], "gen8-price");
    }
}
