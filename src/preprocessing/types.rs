//! # Shared Types for Image Preprocessing
//!
//! This module contains the shared result structs and the error type used across
//! the preprocessing sub-modules.

use image::GrayImage;

use crate::geometry::QuadCorners;

/// Errors that can occur during image preprocessing operations.
#[derive(Debug, Clone)]
pub enum PreprocessingError {
    /// A stage was called with parameters it cannot work with
    InvalidParameter { message: String },
    /// Image processing operation failed
    ProcessingFailed { message: String },
    /// Failed to load or decode image
    ImageLoad { message: String },
}

impl std::fmt::Display for PreprocessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessingError::InvalidParameter { message } => {
                write!(f, "Invalid preprocessing parameter: {}", message)
            }
            PreprocessingError::ProcessingFailed { message } => {
                write!(f, "Image processing failed: {}", message)
            }
            PreprocessingError::ImageLoad { message } => {
                write!(f, "Failed to load image: {}", message)
            }
        }
    }
}

impl std::error::Error for PreprocessingError {}

/// Result of resizing a sheet onto the working canvas.
#[derive(Debug, Clone)]
pub struct ScaledImageResult {
    /// Grayscale canvas image
    pub image: GrayImage,
    /// Original image dimensions (width, height)
    pub original_dimensions: (u32, u32),
    /// New image dimensions (width, height)
    pub new_dimensions: (u32, u32),
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of image noise reduction operation.
#[derive(Debug, Clone)]
pub struct DenoisedImageResult {
    /// The denoised image
    pub image: GrayImage,
    /// Sigma value used for Gaussian blur
    pub sigma: f32,
    /// Kernel side length
    pub kernel_size: u32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of edge detection.
#[derive(Debug, Clone)]
pub struct EdgeMapResult {
    /// Binary edge map, edges are 255
    pub image: GrayImage,
    /// Number of edge pixels
    pub edge_pixels: u64,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of perspective correction.
#[derive(Debug, Clone)]
pub struct WarpedImageResult {
    /// The rectified image
    pub image: GrayImage,
    /// Source corners that were mapped onto the output rectangle
    pub corners: QuadCorners,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of image thresholding operation.
#[derive(Debug, Clone)]
pub struct ThresholdedImageResult {
    /// The thresholded binary image, ink is 255
    pub image: GrayImage,
    /// Mean grey level of the input
    pub mean: f32,
    /// Threshold that was applied
    pub threshold: f32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}
