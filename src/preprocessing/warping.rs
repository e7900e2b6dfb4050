//! # Perspective Warping Module
//!
//! Maps the four corners of the detected answer box onto an axis-aligned rectangle.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use tracing;

use super::types::{PreprocessingError, WarpedImageResult};
use crate::geometry::QuadCorners;

/// Warps the quadrilateral `corners` of `image` onto a `size.0` x `size.1` image.
///
/// Corners map to (0,0), (W,0), (0,H) and (W,H). Samples falling outside the source are
/// filled white so they never read as ink.
pub fn warp_to_rectangle(
    image: &GrayImage,
    corners: &QuadCorners,
    size: (u32, u32),
) -> Result<WarpedImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    let (width, height) = size;
    if width == 0 || height == 0 {
        return Err(PreprocessingError::InvalidParameter {
            message: format!("warp target {}x{} must be non-zero", width, height),
        });
    }

    let (w, h) = (width as f32, height as f32);
    let destination = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];
    let projection = Projection::from_control_points(corners.as_f32(), destination)
        .ok_or_else(|| PreprocessingError::ProcessingFailed {
            message: format!("corners {:?} do not define a perspective transform", corners),
        })?;

    let mut warped = GrayImage::new(width, height);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Luma([255]),
        &mut warped,
    );

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "omr_preprocessing",
        "Perspective warp completed in {}ms: {}x{} -> {}x{}",
        processing_time.as_millis(),
        image.width(),
        image.height(),
        width,
        height
    );

    Ok(WarpedImageResult {
        image: warped,
        corners: *corners,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::point::Point;
    use imageproc::rect::Rect;

    fn corners(tl: (i32, i32), tr: (i32, i32), bl: (i32, i32), br: (i32, i32)) -> QuadCorners {
        QuadCorners {
            top_left: Point::new(tl.0, tl.1),
            top_right: Point::new(tr.0, tr.1),
            bottom_left: Point::new(bl.0, bl.1),
            bottom_right: Point::new(br.0, br.1),
        }
    }

    #[test]
    fn test_crop_of_axis_aligned_box() {
        let mut img = GrayImage::from_pixel(200, 200, Luma([255]));
        // dark block in the top-left quarter of the box at (50,50)-(150,150)
        draw_filled_rect_mut(&mut img, Rect::at(50, 50).of_size(50, 50), Luma([0]));

        let quad = corners((50, 50), (150, 50), (50, 150), (150, 150));
        let result = warp_to_rectangle(&img, &quad, (100, 100)).unwrap();

        assert_eq!(result.image.dimensions(), (100, 100));
        assert!(result.image.get_pixel(20, 20)[0] < 10);
        assert!(result.image.get_pixel(80, 80)[0] > 245);
        assert!(result.image.get_pixel(80, 20)[0] > 245);
        assert!(result.image.get_pixel(20, 80)[0] > 245);
    }

    #[test]
    fn test_scaling_warp_keeps_relative_layout() {
        let mut img = GrayImage::from_pixel(120, 120, Luma([255]));
        // dark block in the bottom-right quarter of the box at (10,10)-(110,110)
        draw_filled_rect_mut(&mut img, Rect::at(60, 60).of_size(50, 50), Luma([0]));

        let quad = corners((10, 10), (110, 10), (10, 110), (110, 110));
        let result = warp_to_rectangle(&img, &quad, (50, 200)).unwrap();

        assert!(result.image.get_pixel(40, 160)[0] < 10);
        assert!(result.image.get_pixel(10, 40)[0] > 245);
    }

    #[test]
    fn test_zero_target_is_rejected() {
        let img = GrayImage::from_pixel(20, 20, Luma([255]));
        let quad = corners((0, 0), (10, 0), (0, 10), (10, 10));
        assert!(matches!(
            warp_to_rectangle(&img, &quad, (0, 10)),
            Err(PreprocessingError::InvalidParameter { .. })
        ));
    }
}
