//! # Image Preprocessing Module
//!
//! This module provides the image stages of the sheet pipeline: loading and scaling
//! onto the working canvas, blurring, edge detection, perspective correction and
//! binarization.
//!
//! The module is organized into focused sub-modules:
//! - `scaling`: Image loading and canvas resizing
//! - `filtering`: Gaussian blur and Canny edge detection
//! - `warping`: Perspective correction of the answer box
//! - `thresholding`: Mean-offset inverted binarization
//! - `types`: Shared types and error definitions

pub mod filtering;
pub mod scaling;
pub mod thresholding;
pub mod types;
pub mod warping;

// Re-export commonly used types and functions for convenience
pub use types::{
    DenoisedImageResult, EdgeMapResult, PreprocessingError, ScaledImageResult,
    ThresholdedImageResult, WarpedImageResult,
};

pub use filtering::{apply_gaussian_blur, detect_edges, gaussian_kernel};
pub use scaling::{decode_sheet_image, load_sheet_image, resize_to_canvas};
pub use thresholding::apply_mean_offset_threshold;
pub use warping::warp_to_rectangle;
