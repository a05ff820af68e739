//! Prometheus metrics for ingestion observability.

use metrics::{counter, histogram};

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a processed batch.
pub fn batch_processed(outcome: &str) {
    counter!("log_batches_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record batch processing time.
pub fn batch_duration(duration_ms: u64) {
    histogram!("log_batch_duration_ms").record(duration_ms as f64);
}

pub fn entries_created(count: usize) {
    counter!("log_entries_created_total").increment(count as u64);
}

pub fn tags_created(count: usize) {
    counter!("log_tags_created_total").increment(count as u64);
}

pub fn tag_links_created(count: usize) {
    counter!("log_tag_links_created_total").increment(count as u64);
}

/// Record an enrichment decision or task result.
pub fn enrichment_outcome(outcome: &str) {
    counter!("log_enrichment_total", "outcome" => outcome.to_string()).increment(1);
}
