//! Metrics collection and Prometheus export module.
//!
//! This module provides:
//! - Prometheus recorder setup
//! - Recording functions for sheet, anomaly and error metrics

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::observability_config::ObservabilityConfig;

/// Initialize metrics collection with Prometheus recorder and configuration
pub fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    tracing::info!(
        metrics_enabled = %config.enable_metrics_export,
        "Metrics collection initialized"
    );
    Ok(handle)
}

/// Record one finished sheet
pub fn record_sheet_metrics(completed: bool, duration: std::time::Duration) {
    metrics::counter!(
        "sheets_processed_total",
        "result" => if completed { "completed" } else { "failed" }
    )
    .increment(1);
    metrics::histogram!("sheet_duration_seconds").record(duration.as_secs_f64());
}

/// Record the anomaly counts of a scored sheet
pub fn record_anomaly_metrics(no_answer: usize, two_answers: usize) {
    if no_answer > 0 {
        metrics::counter!("sheet_anomalies_total", "kind" => "no_answer")
            .increment(no_answer as u64);
    }
    if two_answers > 0 {
        metrics::counter!("sheet_anomalies_total", "kind" => "two_answers")
            .increment(two_answers as u64);
    }
}

/// Record error rate metrics
pub fn record_error_metrics(error_type: &str, component: &str) {
    let error_type = error_type.to_string();
    let component = component.to_string();
    metrics::counter!("errors_total", "type" => error_type, "component" => component).increment(1);
}

/// Record a completed batch
pub fn record_batch_metrics(sheets: usize, duration: std::time::Duration) {
    metrics::counter!("batches_total").increment(1);
    metrics::histogram!("batch_size_sheets").record(sheets as f64);
    metrics::histogram!("batch_duration_seconds").record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        record_sheet_metrics(true, std::time::Duration::from_millis(12));
        record_anomaly_metrics(2, 0);
        record_error_metrics("box_not_found", "reader");
        record_batch_metrics(4, std::time::Duration::from_secs(1));
    }
}
