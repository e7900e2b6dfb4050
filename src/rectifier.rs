//! # Sheet Rectifier
//!
//! Finds the answer box in a photographed or scanned sheet, straightens it with a
//! perspective warp and binarizes it so marks become foreground pixels.
//!
//! Pipeline: canvas resize -> grayscale -> Gaussian blur -> Canny -> external
//! contours -> largest quadrilateral -> corner ordering -> warp of the grayscale
//! canvas -> mean-offset inverted threshold.

use image::{DynamicImage, GrayImage, Rgb};
use imageproc::drawing::draw_line_segment_mut;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::errors::error_logging;
use crate::geometry::{
    external_contours, find_rectangular_contours, order_corners, QuadCorners, RectangularContour,
};
use crate::preprocessing::{
    apply_gaussian_blur, apply_mean_offset_threshold, detect_edges, load_sheet_image,
    resize_to_canvas, warp_to_rectangle,
};
use crate::scanner_config::ScannerConfig;
use crate::sheet_errors::SheetError;
use crate::sheet_source::missing_file_message;

/// A straightened, binarized answer box.
#[derive(Debug, Clone)]
pub struct RectifiedGrid {
    /// Thresholded box, ink is 255
    pub image: GrayImage,
    /// Box corners on the working canvas
    pub corners: QuadCorners,
    /// Enclosed area of the selected box contour
    pub box_area: f64,
    /// Grey level used to binarize
    pub threshold: f32,
}

pub struct SheetRectifier {
    rows: u32,
    cols: u32,
    warp_size: (u32, u32),
    config: ScannerConfig,
    sink: Arc<dyn DiagnosticsSink>,
}

impl SheetRectifier {
    /// Rectifier for a grid of `rows` x `cols` cells.
    ///
    /// The warp size is the largest size within the configured reference that both
    /// counts divide, so every cell gets the same integer dimensions.
    pub fn new(rows: u32, cols: u32, config: ScannerConfig, sink: Arc<dyn DiagnosticsSink>) -> Self {
        let warp_size = config.warp_size(rows, cols);
        Self {
            rows,
            cols,
            warp_size,
            config,
            sink,
        }
    }

    pub fn grid_shape(&self) -> (u32, u32) {
        (self.rows, self.cols)
    }

    pub fn warp_size(&self) -> (u32, u32) {
        self.warp_size
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Load `path` and rectify it.
    pub fn rectify(&self, path: &Path) -> Result<RectifiedGrid, SheetError> {
        if !path.exists() {
            return Err(SheetError::FileNotFound(missing_file_message(path)));
        }
        let image = load_sheet_image(path)?;
        self.rectify_image(&image, &path.display().to_string())
    }

    /// Rectify an already decoded sheet. `source` names the sheet in diagnostics and
    /// debug image file names.
    pub fn rectify_image(
        &self,
        image: &DynamicImage,
        source: &str,
    ) -> Result<RectifiedGrid, SheetError> {
        let cfg = &self.config;

        let scaled = resize_to_canvas(image, cfg.canvas_size)?;
        self.stage(source, "resize", scaled.processing_time_ms);
        let gray = scaled.image;
        self.save_debug(source, "gray", || DynamicImage::ImageLuma8(gray.clone()));

        let blurred = apply_gaussian_blur(&gray, cfg.blur_kernel, cfg.blur_sigma)?;
        self.stage(source, "blur", blurred.processing_time_ms);
        self.save_debug(source, "blur", || {
            DynamicImage::ImageLuma8(blurred.image.clone())
        });

        let edges = detect_edges(&blurred.image, cfg.canny_low, cfg.canny_high)?;
        self.stage(source, "edges", edges.processing_time_ms);
        self.save_debug(source, "edges", || DynamicImage::ImageLuma8(edges.image.clone()));

        let contour_start = Instant::now();
        let contours = external_contours(&edges.image, cfg.max_candidate_contours);
        let candidates =
            find_rectangular_contours(&contours, cfg.min_box_area, cfg.polygon_epsilon_ratio);
        self.stage(
            source,
            "contours",
            contour_start.elapsed().as_millis() as u32,
        );
        self.save_debug(source, "contour", || draw_candidates(&gray, &candidates));

        debug!(
            target: "omr_preprocessing",
            source,
            contours = contours.len(),
            candidates = candidates.len(),
            "Answer box search finished"
        );

        let Some(answer_box) = candidates.first() else {
            self.sink.record(Diagnostic::BoxNotFound {
                source: source.to_string(),
            });
            return Err(SheetError::BoxNotFound(source.to_string()));
        };
        let corners = order_corners(&answer_box.approx)?;

        let warped = warp_to_rectangle(&gray, &corners, self.warp_size)?;
        self.stage(source, "warp", warped.processing_time_ms);
        self.save_debug(source, "warped", || {
            DynamicImage::ImageLuma8(warped.image.clone())
        });

        let thresholded = apply_mean_offset_threshold(&warped.image, cfg.threshold_offset)?;
        self.stage(source, "threshold", thresholded.processing_time_ms);
        self.save_debug(source, "thresh", || {
            DynamicImage::ImageLuma8(thresholded.image.clone())
        });

        Ok(RectifiedGrid {
            image: thresholded.image,
            corners,
            box_area: answer_box.area,
            threshold: thresholded.threshold,
        })
    }

    fn stage(&self, source: &str, name: &'static str, elapsed_ms: u32) {
        self.sink.record(Diagnostic::Stage {
            source: source.to_string(),
            name,
            elapsed_ms: elapsed_ms as u64,
        });
    }

    /// Write a stage image when debug output is on. Write failures are only logged.
    fn save_debug(&self, source: &str, stage: &str, render: impl FnOnce() -> DynamicImage) {
        if !self.config.debug {
            return;
        }
        let Some(dir) = self.config.debug_dir.as_deref() else {
            return;
        };

        let stem = Path::new(source)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sheet");
        let path = dir.join(format!("{}_{}.png", stem, stage));

        if let Err(e) = std::fs::create_dir_all(dir) {
            error_logging::log_filesystem_error(
                &e,
                "create_debug_dir",
                Some(&dir.display().to_string()),
                None,
            );
            return;
        }
        match render().save(&path) {
            Ok(()) => debug!(path = %path.display(), "Debug image written"),
            Err(e) => error_logging::log_filesystem_error(
                &e,
                "write_debug_image",
                Some(&path.display().to_string()),
                None,
            ),
        }
    }
}

/// Canvas with every quadrilateral candidate outlined in green.
fn draw_candidates(gray: &GrayImage, candidates: &[RectangularContour]) -> DynamicImage {
    let mut canvas = DynamicImage::ImageLuma8(gray.clone()).to_rgb8();
    let green = Rgb([0u8, 255, 0]);
    for candidate in candidates {
        let corners = &candidate.approx;
        for (i, start) in corners.iter().enumerate() {
            let end = corners[(i + 1) % corners.len()];
            for offset in -1..=1 {
                let o = offset as f32;
                draw_line_segment_mut(
                    &mut canvas,
                    (start.x as f32 + o, start.y as f32 + o),
                    (end.x as f32 + o, end.y as f32 + o),
                    green,
                );
            }
        }
    }
    DynamicImage::ImageRgb8(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::point::Point;
    use imageproc::rect::Rect;
    use tempfile::TempDir;

    fn rectifier(config: ScannerConfig) -> (SheetRectifier, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (SheetRectifier::new(32, 23, config, sink.clone()), sink)
    }

    /// White canvas with a 3px black frame around (x0,y0)-(x1,y1).
    fn framed_canvas(x0: i32, y0: i32, x1: i32, y1: i32) -> GrayImage {
        let mut img = GrayImage::from_pixel(1050, 1485, Luma([255]));
        draw_filled_rect_mut(
            &mut img,
            Rect::at(x0, y0).of_size((x1 - x0) as u32, (y1 - y0) as u32),
            Luma([0]),
        );
        draw_filled_rect_mut(
            &mut img,
            Rect::at(x0 + 3, y0 + 3).of_size((x1 - x0 - 6) as u32, (y1 - y0 - 6) as u32),
            Luma([255]),
        );
        img
    }

    #[test]
    fn test_warp_size_for_imk_grid() {
        let (rectifier, _) = rectifier(ScannerConfig::default());
        assert_eq!(rectifier.warp_size(), (621, 864));
        assert_eq!(rectifier.grid_shape(), (32, 23));
    }

    #[test]
    fn test_blank_canvas_has_no_box() {
        let (rectifier, sink) = rectifier(ScannerConfig::default());
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(1050, 1485, Luma([255])));

        let err = rectifier.rectify_image(&blank, "blank.png").unwrap_err();

        assert_eq!(err, SheetError::BoxNotFound("blank.png".to_string()));
        assert_eq!(
            sink.anomalies(),
            vec![Diagnostic::BoxNotFound {
                source: "blank.png".to_string()
            }]
        );
    }

    #[test]
    fn test_framed_box_is_found_and_warped() {
        let (rectifier, sink) = rectifier(ScannerConfig::default());
        let canvas = DynamicImage::ImageLuma8(framed_canvas(100, 150, 900, 1350));

        let grid = rectifier.rectify_image(&canvas, "frame.png").unwrap();

        assert_eq!(grid.image.dimensions(), (621, 864));
        let near = |p: Point<i32>, x: i32, y: i32| (p.x - x).abs() <= 3 && (p.y - y).abs() <= 3;
        assert!(near(grid.corners.top_left, 100, 150), "{:?}", grid.corners);
        assert!(near(grid.corners.bottom_right, 899, 1349), "{:?}", grid.corners);
        assert!(grid.box_area > 800.0 * 1100.0);
        // The inside of the frame is blank paper
        assert_eq!(grid.image.get_pixel(310, 430)[0], 0);

        let stages: Vec<&str> = sink
            .events()
            .iter()
            .filter_map(|d| match d {
                Diagnostic::Stage { name, .. } => Some(*name),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages,
            vec!["resize", "blur", "edges", "contours", "warp", "threshold"]
        );
    }

    #[test]
    fn test_missing_file() {
        let (rectifier, _) = rectifier(ScannerConfig::default());
        let err = rectifier.rectify(Path::new("no/such/sheet.png")).unwrap_err();
        assert!(matches!(err, SheetError::FileNotFound(_)));
    }

    #[test]
    fn test_debug_images_are_written() {
        let dir = TempDir::new().unwrap();
        let config = ScannerConfig {
            debug: true,
            debug_dir: Some(dir.path().to_path_buf()),
            ..ScannerConfig::default()
        };
        let (rectifier, _) = rectifier(config);
        let canvas = DynamicImage::ImageLuma8(framed_canvas(100, 150, 900, 1350));

        rectifier.rectify_image(&canvas, "scans/frame.png").unwrap();

        for stage in ["gray", "blur", "edges", "contour", "warped", "thresh"] {
            assert!(
                dir.path().join(format!("frame_{}.png", stage)).exists(),
                "missing {} image",
                stage
            );
        }
    }

    #[test]
    fn test_unusable_debug_dir_does_not_stop_rectification() {
        let dir = TempDir::new().unwrap();
        // a regular file where the debug directory should go
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();
        let config = ScannerConfig {
            debug: true,
            debug_dir: Some(blocker.join("debug")),
            ..ScannerConfig::default()
        };
        let (rectifier, _) = rectifier(config);
        let canvas = DynamicImage::ImageLuma8(framed_canvas(100, 150, 900, 1350));

        let grid = rectifier.rectify_image(&canvas, "frame.png").unwrap();

        assert_eq!(grid.image.dimensions(), (621, 864));
        assert!(!blocker.join("debug").exists());
    }
}
