//! # Image Filtering Module
//!
//! This module provides noise reduction and edge detection for locating the answer box.
//! The blur uses a fixed-size separable Gaussian kernel, so its footprint does not grow
//! with sigma the way `image`'s own blur does.

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::separable_filter_equal;
use tracing;

use super::types::{DenoisedImageResult, EdgeMapResult, PreprocessingError};

/// Normalized 1-D Gaussian weights of odd length `size`.
pub fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let half = (size / 2) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Applies a square Gaussian blur to reduce scanner noise before edge detection.
///
/// # Arguments
///
/// * `image` - Grayscale input
/// * `kernel_size` - Odd kernel side length, 5 for sheets
/// * `sigma` - Standard deviation of the kernel
///
/// # Returns
///
/// Returns a `Result` containing the blurred image and metadata, or a `PreprocessingError`
///
/// # Examples
///
/// ```no_run
/// use omr_scorer::preprocessing::apply_gaussian_blur;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gray = image::open("sheet.jpg")?.to_luma8();
/// let blurred = apply_gaussian_blur(&gray, 5, 1.0)?;
/// // blurred.image is ready for edge detection
/// # Ok(())
/// # }
/// ```
pub fn apply_gaussian_blur(
    image: &GrayImage,
    kernel_size: u32,
    sigma: f32,
) -> Result<DenoisedImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(PreprocessingError::InvalidParameter {
            message: format!("Gaussian kernel size must be odd, got {}", kernel_size),
        });
    }
    if sigma <= 0.0 || sigma > 5.0 {
        return Err(PreprocessingError::InvalidParameter {
            message: format!(
                "Invalid sigma value: {}. Must be between 0.1 and 5.0",
                sigma
            ),
        });
    }

    // Borders are padded by repeating the edge pixel
    let kernel = gaussian_kernel(kernel_size, sigma);
    let blurred: GrayImage = separable_filter_equal(image, &kernel);
    let (width, height) = blurred.dimensions();

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "omr_preprocessing",
        "Gaussian blur completed in {}ms: kernel={}x{}, sigma={:.2}, dimensions={}x{}",
        processing_time.as_millis(),
        kernel_size,
        kernel_size,
        sigma,
        width,
        height
    );

    Ok(DenoisedImageResult {
        image: blurred,
        sigma,
        kernel_size,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

/// Runs Canny edge detection with hysteresis thresholds `low` and `high`.
///
/// imageproc's Canny smooths its input again (sigma 1.4) before computing gradients.
pub fn detect_edges(
    image: &GrayImage,
    low: f32,
    high: f32,
) -> Result<EdgeMapResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    if low < 0.0 || high < low {
        return Err(PreprocessingError::InvalidParameter {
            message: format!(
                "Canny thresholds must satisfy 0 <= low <= high, got low={} high={}",
                low, high
            ),
        });
    }

    let edges = canny(image, low, high);
    let edge_pixels = edges.pixels().filter(|p| p[0] > 0).count() as u64;

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "omr_preprocessing",
        "Edge detection completed in {}ms: low={:.1}, high={:.1}, edge_pixels={}",
        processing_time.as_millis(),
        low,
        high,
        edge_pixels
    );

    Ok(EdgeMapResult {
        image: edges,
        edge_pixels,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_gaussian_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(5, 1.0);
        assert_eq!(kernel.len(), 5);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((kernel[0] - kernel[4]).abs() < 1e-6);
        assert!((kernel[1] - kernel[3]).abs() < 1e-6);
        assert!(kernel[2] > kernel[1] && kernel[1] > kernel[0]);
    }

    #[test]
    fn test_blur_keeps_flat_image_flat() {
        let img = GrayImage::from_pixel(12, 9, Luma([200]));
        let result = apply_gaussian_blur(&img, 5, 1.0).unwrap();
        // each pass truncates to u8, so allow one grey level of drift
        assert!(result.image.pixels().all(|p| (199..=200).contains(&p[0])));
        assert_eq!(result.kernel_size, 5);
    }

    #[test]
    fn test_blur_softens_a_step() {
        let mut img = GrayImage::from_pixel(20, 20, Luma([255]));
        draw_filled_rect_mut(&mut img, Rect::at(0, 0).of_size(10, 20), Luma([0]));

        let result = apply_gaussian_blur(&img, 5, 1.0).unwrap();

        let left = result.image.get_pixel(9, 10)[0];
        let right = result.image.get_pixel(10, 10)[0];
        assert!(left > 0 && left < 128);
        assert!(right > 128 && right < 255);
        assert_eq!(result.image.get_pixel(0, 10)[0], 0);
        assert!(result.image.get_pixel(19, 10)[0] >= 254);
    }

    #[test]
    fn test_blur_footprint_is_the_kernel_size() {
        let mut img = GrayImage::new(9, 9);
        img.put_pixel(4, 4, Luma([255]));

        let result = apply_gaussian_blur(&img, 5, 1.0).unwrap();

        // centre weight of the 5-tap sigma 1 kernel is about 0.4026, squared 0.162
        let centre = result.image.get_pixel(4, 4)[0];
        assert!((40..=42).contains(&centre), "centre {}", centre);
        assert!(result.image.get_pixel(6, 4)[0] > 0);
        assert_eq!(result.image.get_pixel(7, 4)[0], 0);
        assert_eq!(result.image.get_pixel(4, 1)[0], 0);
    }

    #[test]
    fn test_blur_rejects_bad_parameters() {
        let img = GrayImage::new(4, 4);
        assert!(apply_gaussian_blur(&img, 4, 1.0).is_err());
        assert!(apply_gaussian_blur(&img, 5, 0.0).is_err());
    }

    #[test]
    fn test_detect_edges_finds_rectangle_outline() {
        let mut img = GrayImage::from_pixel(80, 80, Luma([255]));
        draw_filled_rect_mut(&mut img, Rect::at(20, 20).of_size(40, 40), Luma([0]));

        let result = detect_edges(&img, 10.0, 50.0).unwrap();

        assert!(result.edge_pixels > 100);
        assert_eq!(result.image.get_pixel(40, 40)[0], 0);
        assert_eq!(result.image.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn test_detect_edges_rejects_inverted_thresholds() {
        let img = GrayImage::new(8, 8);
        assert!(detect_edges(&img, 50.0, 10.0).is_err());
    }
}
