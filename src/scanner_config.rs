//! # Scanner Configuration Module
//!
//! This module defines configuration structures for sheet scanning,
//! including canvas geometry, edge detection, mark thresholds and batch settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};

// A4 paper in millimetres; the canvas and warp sizes are fixed multiples of it.
pub const PAPER_WIDTH_MM: u32 = 210;
pub const PAPER_HEIGHT_MM: u32 = 297;
pub const CANVAS_SCALE: u32 = 5;
pub const WARP_SCALE: u32 = 3;

pub const DEFAULT_BLUR_SIGMA: f32 = 1.0;
pub const DEFAULT_BLUR_KERNEL: u32 = 5;
pub const DEFAULT_CANNY_LOW: f32 = 10.0;
pub const DEFAULT_CANNY_HIGH: f32 = 50.0;
pub const DEFAULT_MIN_BOX_AREA: f64 = 500.0;
pub const DEFAULT_POLYGON_EPSILON_RATIO: f64 = 0.02;
pub const DEFAULT_THRESHOLD_OFFSET: f32 = 10.0;
pub const DEFAULT_MARK_PIXELS: u32 = 300;
/// 300 ink pixels out of a 27x27 cell, the cell size of the 32x23 sheet grid.
pub const DEFAULT_MARK_DENSITY: f32 = 300.0 / 729.0;
pub const DEFAULT_MAX_CANDIDATE_CONTOURS: usize = 4096;
pub const MAX_FILE_SIZE: u64 = 25 * 1024 * 1024; // 25MB limit for sheet images
pub const DEFAULT_SHEET_TIMEOUT_SECS: u64 = 30;

/// How many ink pixels make a cell count as marked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum MarkThreshold {
    /// Absolute foreground pixel count, tied to one cell resolution
    Pixels(u32),
    /// Fraction of the cell area, independent of grid resolution
    Density(f32),
}

impl Default for MarkThreshold {
    fn default() -> Self {
        MarkThreshold::Density(DEFAULT_MARK_DENSITY)
    }
}

impl MarkThreshold {
    /// Resolve the threshold to a pixel count for cells of `cell_area` pixels.
    pub fn pixels_for(&self, cell_area: u32) -> u32 {
        match *self {
            MarkThreshold::Pixels(pixels) => pixels,
            MarkThreshold::Density(density) => (density * cell_area as f32).round() as u32,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        match *self {
            MarkThreshold::Pixels(0) => Err(AppError::Config(
                "mark threshold pixel count must be greater than 0".to_string(),
            )),
            MarkThreshold::Density(d) if !(d > 0.0 && d <= 1.0) => Err(AppError::Config(format!(
                "mark threshold density ({}) must be in (0, 1]",
                d
            ))),
            _ => Ok(()),
        }
    }
}

/// Configuration structure for the sheet image pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Size every input image is resized to (width, height)
    pub canvas_size: (u32, u32),
    /// Upper bound for the rectified grid size (width, height)
    pub warp_reference: (u32, u32),
    /// Gaussian blur standard deviation
    pub blur_sigma: f32,
    /// Gaussian blur kernel side length (odd)
    pub blur_kernel: u32,
    /// Canny hysteresis low threshold
    pub canny_low: f32,
    /// Canny hysteresis high threshold
    pub canny_high: f32,
    /// Smallest enclosed area for an answer-box candidate
    pub min_box_area: f64,
    /// Polygon approximation tolerance as a fraction of the perimeter
    pub polygon_epsilon_ratio: f64,
    /// Subtracted from the mean grey level to get the binarization threshold
    pub threshold_offset: f32,
    /// Marked-cell decision threshold
    pub mark_threshold: MarkThreshold,
    /// Contours examined per sheet before giving up on the rest
    pub max_candidate_contours: usize,
    /// Maximum allowed file size in bytes
    pub max_file_size: u64,
    /// Write intermediate stage images
    pub debug: bool,
    /// Where stage images go when `debug` is set
    pub debug_dir: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            canvas_size: (
                PAPER_WIDTH_MM * CANVAS_SCALE,
                PAPER_HEIGHT_MM * CANVAS_SCALE,
            ),
            warp_reference: (PAPER_WIDTH_MM * WARP_SCALE, PAPER_HEIGHT_MM * WARP_SCALE),
            blur_sigma: DEFAULT_BLUR_SIGMA,
            blur_kernel: DEFAULT_BLUR_KERNEL,
            canny_low: DEFAULT_CANNY_LOW,
            canny_high: DEFAULT_CANNY_HIGH,
            min_box_area: DEFAULT_MIN_BOX_AREA,
            polygon_epsilon_ratio: DEFAULT_POLYGON_EPSILON_RATIO,
            threshold_offset: DEFAULT_THRESHOLD_OFFSET,
            mark_threshold: MarkThreshold::default(),
            max_candidate_contours: DEFAULT_MAX_CANDIDATE_CONTOURS,
            max_file_size: MAX_FILE_SIZE,
            debug: false,
            debug_dir: None,
        }
    }
}

impl ScannerConfig {
    /// Largest (width, height) not above the warp reference whose sides divide evenly
    /// into `cols` and `rows`.
    pub fn warp_size(&self, rows: u32, cols: u32) -> (u32, u32) {
        let (ref_w, ref_h) = self.warp_reference;
        (ref_w - ref_w % cols.max(1), ref_h - ref_h % rows.max(1))
    }

    /// Validate scanner configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.canvas_size.0 == 0 || self.canvas_size.1 == 0 {
            return Err(AppError::Config(
                "canvas_size dimensions must be greater than 0".to_string(),
            ));
        }
        if self.warp_reference.0 == 0 || self.warp_reference.1 == 0 {
            return Err(AppError::Config(
                "warp_reference dimensions must be greater than 0".to_string(),
            ));
        }
        if self.blur_sigma <= 0.0 || self.blur_sigma > 5.0 {
            return Err(AppError::Config(format!(
                "blur_sigma ({}) must be between 0 and 5.0",
                self.blur_sigma
            )));
        }
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err(AppError::Config(format!(
                "blur_kernel ({}) must be a positive odd number",
                self.blur_kernel
            )));
        }
        if self.canny_low <= 0.0 || self.canny_high < self.canny_low {
            return Err(AppError::Config(format!(
                "canny thresholds must satisfy 0 < low ({}) <= high ({})",
                self.canny_low, self.canny_high
            )));
        }
        if self.min_box_area < 0.0 {
            return Err(AppError::Config(
                "min_box_area cannot be negative".to_string(),
            ));
        }
        if self.polygon_epsilon_ratio <= 0.0 || self.polygon_epsilon_ratio >= 0.5 {
            return Err(AppError::Config(format!(
                "polygon_epsilon_ratio ({}) must be in (0, 0.5)",
                self.polygon_epsilon_ratio
            )));
        }
        if self.max_candidate_contours == 0 {
            return Err(AppError::Config(
                "max_candidate_contours must be greater than 0".to_string(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(AppError::Config(
                "max_file_size must be greater than 0".to_string(),
            ));
        }
        if self.debug && self.debug_dir.is_none() {
            return Err(AppError::Config(
                "debug output requires a debug_dir".to_string(),
            ));
        }
        self.mark_threshold.validate()?;

        Ok(())
    }
}

/// Settings for processing a directory of sheets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Sheets processed at the same time
    pub workers: usize,
    /// Time budget for one sheet in seconds
    pub sheet_timeout_secs: u64,
    /// Descend into sub-directories when collecting sheets
    pub recursive: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            sheet_timeout_secs: DEFAULT_SHEET_TIMEOUT_SECS,
            recursive: false,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.workers == 0 {
            return Err(AppError::Config(
                "workers must be greater than 0".to_string(),
            ));
        }
        if self.sheet_timeout_secs == 0 {
            return Err(AppError::Config(
                "sheet_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.sheet_timeout_secs > 600 {
            return Err(AppError::Config(
                "sheet_timeout_secs cannot be greater than 600 seconds".to_string(),
            ));
        }
        Ok(())
    }
}
