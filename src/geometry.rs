//! # Sheet Geometry
//!
//! Pure helpers for finding the answer box and cutting the rectified grid:
//! contour discovery on an edge map, polygon approximation, canonical corner
//! ordering and equal-size grid partitioning. Nothing here keeps state.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;

use crate::sheet_errors::SheetError;

/// The four corners of a quadrilateral in canonical slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadCorners {
    pub top_left: Point<i32>,
    pub top_right: Point<i32>,
    pub bottom_left: Point<i32>,
    pub bottom_right: Point<i32>,
}

impl QuadCorners {
    /// Corners as float pairs in the order top-left, top-right, bottom-left, bottom-right.
    pub fn as_f32(&self) -> [(f32, f32); 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
        .map(|p| (p.x as f32, p.y as f32))
    }
}

/// A closed contour that approximates to a quadrilateral.
#[derive(Debug, Clone)]
pub struct RectangularContour {
    /// Traced boundary points
    pub points: Vec<Point<i32>>,
    /// Polygon approximation, always 4 vertices
    pub approx: Vec<Point<i32>>,
    /// Enclosed area of the traced boundary
    pub area: f64,
}

/// Put four points into canonical slots.
///
/// Top-left has the smallest `x + y`, bottom-right the largest. Top-right has the
/// smallest `y - x`, bottom-left the largest. When two points tie, the one that
/// comes first in `points` wins.
pub fn order_corners(points: &[Point<i32>]) -> Result<QuadCorners, SheetError> {
    if points.len() != 4 {
        return Err(SheetError::Processing(format!(
            "expected 4 corner points, got {}",
            points.len()
        )));
    }

    let sum = |p: &Point<i32>| p.x + p.y;
    let diff = |p: &Point<i32>| p.y - p.x;

    Ok(QuadCorners {
        top_left: points[first_extreme(points, sum, false)],
        top_right: points[first_extreme(points, diff, false)],
        bottom_left: points[first_extreme(points, diff, true)],
        bottom_right: points[first_extreme(points, sum, true)],
    })
}

fn first_extreme(points: &[Point<i32>], key: impl Fn(&Point<i32>) -> i32, max: bool) -> usize {
    let mut best = 0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let (candidate, current) = (key(p), key(&points[best]));
        if (max && candidate > current) || (!max && candidate < current) {
            best = i;
        }
    }
    best
}

/// Outer boundaries of the top-level connected components of a binary edge map.
///
/// At most `limit` contours are returned; a degenerate image can produce a very
/// large number of tiny components.
pub fn external_contours(edges: &GrayImage, limit: usize) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .take(limit)
        .map(|c| c.points)
        .collect()
}

/// Douglas-Peucker approximation of a closed contour.
///
/// The tolerance is `epsilon_ratio` times the contour perimeter. The contour is first
/// split at its two mutually farthest points so the result does not depend on where
/// tracing started.
pub fn approximate_polygon(points: &[Point<i32>], epsilon_ratio: f64) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let epsilon = epsilon_ratio * arc_length(points, true);
    if epsilon <= 0.0 {
        return points.to_vec();
    }

    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    let (lo, hi) = (a.min(b), a.max(b));
    if lo == hi {
        return vec![points[lo]];
    }

    let first = &points[lo..=hi];
    let second: Vec<Point<i32>> = points[hi..]
        .iter()
        .chain(points[..=lo].iter())
        .copied()
        .collect();

    let mut polygon = approximate_polygon_dp(first, epsilon, false);
    polygon.pop();
    polygon.extend(approximate_polygon_dp(&second, epsilon, false));
    polygon.pop();
    polygon
}

fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
    let mut best = 0;
    let mut best_dist = -1i64;
    for (i, p) in points.iter().enumerate() {
        let dx = (p.x - origin.x) as i64;
        let dy = (p.y - origin.y) as i64;
        let dist = dx * dx + dy * dy;
        if dist > best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// Enclosed area of a closed polygon (shoelace formula).
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Keep contours that approximate to exactly 4 vertices and enclose at least
/// `min_area`, largest first.
pub fn find_rectangular_contours(
    contours: &[Vec<Point<i32>>],
    min_area: f64,
    epsilon_ratio: f64,
) -> Vec<RectangularContour> {
    let mut rects: Vec<RectangularContour> = contours
        .iter()
        .filter_map(|points| {
            let approx = approximate_polygon(points, epsilon_ratio);
            if approx.len() != 4 {
                return None;
            }
            let area = polygon_area(points);
            (area >= min_area).then(|| RectangularContour {
                points: points.clone(),
                approx,
                area,
            })
        })
        .collect();

    rects.sort_by(|a, b| b.area.total_cmp(&a.area));
    rects
}

/// Split an image into `rows` equal bands, each into `cols` equal cells.
///
/// Fails when the image does not divide evenly; a partial grid would shift every
/// cell boundary.
pub fn split_grid(image: &GrayImage, rows: u32, cols: u32) -> Result<Vec<Vec<GrayImage>>, SheetError> {
    let (width, height) = image.dimensions();
    if rows == 0 || cols == 0 || width % cols != 0 || height % rows != 0 {
        return Err(SheetError::GridPartition {
            width,
            height,
            rows,
            cols,
        });
    }

    let cell_w = width / cols;
    let cell_h = height / rows;
    Ok((0..rows)
        .map(|r| {
            (0..cols)
                .map(|c| {
                    image::imageops::crop_imm(image, c * cell_w, r * cell_h, cell_w, cell_h)
                        .to_image()
                })
                .collect()
        })
        .collect())
}
