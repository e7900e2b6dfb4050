//! Observability module for centralized metrics and logging setup.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Metrics collection with an optional Prometheus recorder
//! - Span helpers for sheets and batches

pub mod metrics;
pub mod tracing_mod;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::observability_config::ObservabilityConfig;

pub use self::metrics::{
    init_metrics_with_config, record_anomaly_metrics, record_batch_metrics, record_error_metrics,
    record_sheet_metrics,
};
pub use self::tracing_mod::{batch_span, init_tracing_with_config, sheet_span};

/// Initialize logging, and metrics when export is enabled.
///
/// Returns the Prometheus handle so the caller can render a snapshot.
pub fn init_observability(config: &ObservabilityConfig) -> Result<Option<PrometheusHandle>> {
    init_tracing_with_config(config)?;

    let handle = if config.enable_metrics_export {
        Some(init_metrics_with_config(config)?)
    } else {
        tracing::debug!("Metrics export disabled");
        None
    };

    tracing::info!(
        environment = %config.environment,
        production = config.is_production(),
        metrics = handle.is_some(),
        "Observability stack initialized"
    );
    Ok(handle)
}
