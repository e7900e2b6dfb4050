//! # Unified Application Configuration
//!
//! This module consolidates scanner, batch and observability settings into a single
//! configuration object. Values come from `OMR_*` environment variables layered on
//! top of the defaults, and every section is validated before use.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::scanner_config::{BatchConfig, MarkThreshold, ScannerConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Image pipeline configuration
    pub scanner: ScannerConfig,
    /// Batch processing configuration
    pub batch: BatchConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

/// Parse `key` with `lookup`, keeping `current` when the variable is unset.
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    current: T,
) -> AppResult<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a valid number", key))),
        None => Ok(current),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, current: bool) -> bool {
    match lookup(key) {
        Some(raw) => matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        None => current,
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::from_lookup(|key| env::var(key).ok())?;
        config.observability = ObservabilityConfig::from_env();
        Ok(config)
    }

    /// Load scanner and batch settings through `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut config = Self::default();
        let scanner = &mut config.scanner;

        scanner.canvas_size = (
            parse_var(&lookup, "OMR_CANVAS_WIDTH", scanner.canvas_size.0)?,
            parse_var(&lookup, "OMR_CANVAS_HEIGHT", scanner.canvas_size.1)?,
        );
        scanner.warp_reference = (
            parse_var(&lookup, "OMR_WARP_WIDTH", scanner.warp_reference.0)?,
            parse_var(&lookup, "OMR_WARP_HEIGHT", scanner.warp_reference.1)?,
        );
        scanner.blur_sigma = parse_var(&lookup, "OMR_BLUR_SIGMA", scanner.blur_sigma)?;
        scanner.canny_low = parse_var(&lookup, "OMR_CANNY_LOW", scanner.canny_low)?;
        scanner.canny_high = parse_var(&lookup, "OMR_CANNY_HIGH", scanner.canny_high)?;
        scanner.min_box_area = parse_var(&lookup, "OMR_MIN_BOX_AREA", scanner.min_box_area)?;
        scanner.polygon_epsilon_ratio =
            parse_var(&lookup, "OMR_POLYGON_EPSILON", scanner.polygon_epsilon_ratio)?;
        scanner.threshold_offset =
            parse_var(&lookup, "OMR_THRESHOLD_OFFSET", scanner.threshold_offset)?;
        scanner.max_candidate_contours =
            parse_var(&lookup, "OMR_MAX_CONTOURS", scanner.max_candidate_contours)?;
        scanner.max_file_size = parse_var(&lookup, "OMR_MAX_FILE_SIZE", scanner.max_file_size)?;

        // An absolute pixel count wins over a density
        if lookup("OMR_MARK_PIXELS").is_some() {
            scanner.mark_threshold =
                MarkThreshold::Pixels(parse_var(&lookup, "OMR_MARK_PIXELS", 0u32)?);
        } else if lookup("OMR_MARK_DENSITY").is_some() {
            scanner.mark_threshold =
                MarkThreshold::Density(parse_var(&lookup, "OMR_MARK_DENSITY", 0f32)?);
        }

        if let Some(dir) = lookup("OMR_DEBUG_DIR").filter(|d| !d.trim().is_empty()) {
            scanner.debug = true;
            scanner.debug_dir = Some(PathBuf::from(dir));
        }

        config.batch.workers = parse_var(&lookup, "OMR_WORKERS", config.batch.workers)?;
        config.batch.sheet_timeout_secs = parse_var(
            &lookup,
            "OMR_SHEET_TIMEOUT_SECS",
            config.batch.sheet_timeout_secs,
        )?;
        config.batch.recursive = parse_flag(&lookup, "OMR_RECURSIVE", config.batch.recursive);

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.scanner.validate()?;
        self.batch.validate()?;
        self.observability.validate().map_err(AppError::Config)?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: canvas={}x{}, warp_reference={}x{}, mark_threshold={:?}, workers={}, sheet_timeout={}s, debug_dir={}, metrics_enabled={}",
            self.scanner.canvas_size.0,
            self.scanner.canvas_size.1,
            self.scanner.warp_reference.0,
            self.scanner.warp_reference.1,
            self.scanner.mark_threshold,
            self.batch.workers,
            self.batch.sheet_timeout_secs,
            self.scanner
                .debug_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.observability.enable_metrics_export
        )
    }
}
