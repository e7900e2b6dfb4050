//! # Image Thresholding Module
//!
//! Binarizes the rectified answer box so that pencil marks become foreground.

use image::{GrayImage, Luma};
use tracing;

use super::types::{PreprocessingError, ThresholdedImageResult};

/// Inverted binary threshold at `mean - offset`.
///
/// Pixels strictly brighter than the threshold become 0, everything else 255, so ink
/// ends up as the nonzero foreground.
///
/// # Arguments
///
/// * `image` - Rectified grayscale answer box
/// * `offset` - How far below the mean grey level the cut sits
///
/// # Returns
///
/// Returns a `Result` containing the binary image with its mean and threshold, or a
/// `PreprocessingError` for an empty image
///
/// # Examples
///
/// ```no_run
/// use omr_scorer::preprocessing::apply_mean_offset_threshold;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let warped = image::open("sheet7_warped.png")?.to_luma8();
/// let binary = apply_mean_offset_threshold(&warped, 10.0)?;
/// // marks are 255 in binary.image
/// # Ok(())
/// # }
/// ```
pub fn apply_mean_offset_threshold(
    image: &GrayImage,
    offset: f32,
) -> Result<ThresholdedImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    let (width, height) = image.dimensions();
    let total_pixels = width as u64 * height as u64;
    if total_pixels == 0 {
        return Err(PreprocessingError::ProcessingFailed {
            message: "cannot threshold an empty image".to_string(),
        });
    }

    let sum: u64 = image.pixels().map(|p| p[0] as u64).sum();
    let mean = (sum as f64 / total_pixels as f64) as f32;
    let threshold = mean - offset;

    let mut binary_img = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let binary_value = if pixel[0] as f32 > threshold {
            0u8
        } else {
            255u8
        };
        binary_img.put_pixel(x, y, Luma([binary_value]));
    }

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "omr_preprocessing",
        "Mean-offset thresholding completed in {}ms: mean={:.2}, threshold={:.2}, dimensions={}x{}",
        processing_time.as_millis(),
        mean,
        threshold,
        width,
        height
    );

    Ok(ThresholdedImageResult {
        image: binary_img,
        mean,
        threshold,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}
