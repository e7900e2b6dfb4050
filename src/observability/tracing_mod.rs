//! Tracing and logging setup module.
//!
//! This module provides:
//! - Structured logging configuration
//! - Tracing span creation utilities

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::observability_config::ObservabilityConfig;

/// Initialize structured logging with tracing and configuration
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("omr_scorer={}", config.log_level).parse()?)
        .add_directive(format!("omr_preprocessing={}", config.log_level).parse()?);

    // stdout carries the JSON results
    let log_format = std::env::var("LOG_FORMAT").ok();
    if use_pretty_format(config, log_format.as_deref()) {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        tags = ?config.tags,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// JSON unless the environment is `development` or `LOG_FORMAT` asks for `pretty`.
fn use_pretty_format(config: &ObservabilityConfig, log_format: Option<&str>) -> bool {
    config.is_development() || log_format == Some("pretty")
}

/// Create a span for reading one sheet
pub fn sheet_span(source: &str, paper: &str) -> tracing::Span {
    tracing::info_span!(
        "sheet_operation",
        source = source,
        paper = paper,
        component = "reader"
    )
}

/// Create a span for a batch run
pub fn batch_span(sheets: usize, workers: usize) -> tracing::Span {
    tracing::info_span!(
        "batch_operation",
        sheets = sheets,
        workers = workers,
        component = "batch"
    )
}
