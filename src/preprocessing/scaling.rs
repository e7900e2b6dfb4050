//! # Image Scaling Module
//!
//! Loads sheet images and resizes them onto the fixed working canvas. The canvas has
//! the proportions of the printed page, so aspect ratio is deliberately not kept.

use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
use tracing;

use super::types::{PreprocessingError, ScaledImageResult};

/// Decode an image file from disk.
pub fn load_sheet_image(path: &Path) -> Result<DynamicImage, PreprocessingError> {
    image::open(path).map_err(|e| PreprocessingError::ImageLoad {
        message: format!("Failed to load image '{}': {}", path.display(), e),
    })
}

/// Decode an image held in memory.
pub fn decode_sheet_image(bytes: &[u8]) -> Result<DynamicImage, PreprocessingError> {
    image::load_from_memory(bytes).map_err(|e| PreprocessingError::ImageLoad {
        message: format!("Failed to decode image bytes: {}", e),
    })
}

/// Resizes `image` to exactly `canvas` and converts it to grayscale.
///
/// # Arguments
///
/// * `image` - Decoded sheet image, colour or grayscale
/// * `canvas` - Target (width, height)
pub fn resize_to_canvas(
    image: &DynamicImage,
    canvas: (u32, u32),
) -> Result<ScaledImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    let (width, height) = canvas;
    if width == 0 || height == 0 {
        return Err(PreprocessingError::InvalidParameter {
            message: format!("canvas size {}x{} must be non-zero", width, height),
        });
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(PreprocessingError::ImageLoad {
            message: "image has no pixels".to_string(),
        });
    }

    let original_dimensions = (image.width(), image.height());
    let gray = if original_dimensions == canvas {
        image.to_luma8()
    } else {
        image
            .resize_exact(width, height, FilterType::Triangle)
            .to_luma8()
    };

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "omr_preprocessing",
        "Canvas resize completed in {}ms: {}x{} -> {}x{}",
        processing_time.as_millis(),
        original_dimensions.0,
        original_dimensions.1,
        width,
        height
    );

    Ok(ScaledImageResult {
        image: gray,
        original_dimensions,
        new_dimensions: canvas,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_resize_to_canvas_changes_size_and_channels() {
        let mut img = RgbImage::new(40, 30);
        for pixel in img.pixels_mut() {
            *pixel = Rgb([255, 255, 255]);
        }

        let result = resize_to_canvas(&DynamicImage::ImageRgb8(img), (105, 148))
            .expect("resize should succeed");

        assert_eq!(result.image.dimensions(), (105, 148));
        assert_eq!(result.original_dimensions, (40, 30));
        assert!(result.image.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_resize_to_canvas_same_size_is_lossless() {
        let mut img = image::GrayImage::new(20, 10);
        img.put_pixel(3, 4, image::Luma([17]));

        let result = resize_to_canvas(&DynamicImage::ImageLuma8(img.clone()), (20, 10))
            .expect("resize should succeed");

        assert_eq!(result.image, img);
    }

    #[test]
    fn test_resize_to_canvas_rejects_zero_canvas() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::new(4, 4));
        assert!(matches!(
            resize_to_canvas(&img, (0, 10)),
            Err(PreprocessingError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_load_sheet_image_missing_file() {
        let result = load_sheet_image(Path::new("definitely/missing/sheet.png"));
        assert!(matches!(result, Err(PreprocessingError::ImageLoad { .. })));
    }

    #[test]
    fn test_decode_sheet_image_rejects_garbage() {
        let result = decode_sheet_image(b"not an image at all");
        assert!(matches!(result, Err(PreprocessingError::ImageLoad { .. })));
    }
}
