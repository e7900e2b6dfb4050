//! # Grid Decoder
//!
//! Cuts a rectified, binarized answer box into equal cells and decides per cell
//! whether it carries a mark by counting foreground pixels.

use image::GrayImage;
use tracing::debug;

use crate::geometry::split_grid;
use crate::scanner_config::MarkThreshold;
use crate::sheet_errors::SheetError;

/// Per-cell ink counts and the marks derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellMatrix {
    pub rows: u32,
    pub cols: u32,
    /// Foreground pixels per cell, row-major
    pub counts: Vec<Vec<u32>>,
    /// 1 where the count reached the threshold
    pub marks: Vec<Vec<u8>>,
    /// Pixel count a cell needed to be marked
    pub threshold_pixels: u32,
}

impl CellMatrix {
    /// Builds a matrix from explicit marks, with counts of 0 or `threshold_pixels`.
    pub fn from_marks(marks: Vec<Vec<u8>>, threshold_pixels: u32) -> Self {
        let rows = marks.len() as u32;
        let cols = marks.first().map(|r| r.len() as u32).unwrap_or(0);
        let counts = marks
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&m| if m > 0 { threshold_pixels } else { 0 })
                    .collect()
            })
            .collect();
        Self {
            rows,
            cols,
            counts,
            marks,
            threshold_pixels,
        }
    }

    pub fn mark(&self, row: u32, col: u32) -> u8 {
        self.marks[row as usize][col as usize]
    }

    pub fn count(&self, row: u32, col: u32) -> u32 {
        self.counts[row as usize][col as usize]
    }

    /// Total number of marked cells.
    pub fn marked_cells(&self) -> usize {
        self.marks.iter().flatten().filter(|&&m| m > 0).count()
    }

    /// Sub-matrix made of the listed rows and columns, in the order given.
    pub fn select(&self, rows: &[u32], cols: &[u32]) -> Result<CellMatrix, SheetError> {
        if let Some(r) = rows.iter().find(|&&r| r >= self.rows) {
            return Err(SheetError::Processing(format!(
                "row {} outside a {}-row cell matrix",
                r, self.rows
            )));
        }
        if let Some(c) = cols.iter().find(|&&c| c >= self.cols) {
            return Err(SheetError::Processing(format!(
                "column {} outside a {}-column cell matrix",
                c, self.cols
            )));
        }

        Ok(CellMatrix {
            rows: rows.len() as u32,
            cols: cols.len() as u32,
            counts: pick(&self.counts, rows, cols),
            marks: pick(&self.marks, rows, cols),
            threshold_pixels: self.threshold_pixels,
        })
    }
}

fn pick<T: Copy>(source: &[Vec<T>], rows: &[u32], cols: &[u32]) -> Vec<Vec<T>> {
    rows.iter()
        .map(|&r| cols.iter().map(|&c| source[r as usize][c as usize]).collect())
        .collect()
}

/// Turns a rectified grid into a [`CellMatrix`].
#[derive(Debug, Clone, Copy)]
pub struct GridDecoder {
    threshold: MarkThreshold,
}

impl GridDecoder {
    pub fn new(threshold: MarkThreshold) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> MarkThreshold {
        self.threshold
    }

    /// Split `grid` into `rows` x `cols` cells and threshold each cell's ink count.
    ///
    /// # Errors
    ///
    /// `SheetError::GridPartition` when the grid does not divide evenly.
    pub fn decode(&self, grid: &GrayImage, rows: u32, cols: u32) -> Result<CellMatrix, SheetError> {
        let cells = split_grid(grid, rows, cols)?;
        let cell_area = (grid.width() / cols) * (grid.height() / rows);
        let threshold_pixels = self.threshold.pixels_for(cell_area).max(1);

        let counts: Vec<Vec<u32>> = cells
            .iter()
            .map(|row| row.iter().map(count_foreground).collect())
            .collect();
        let marks: Vec<Vec<u8>> = counts
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&count| u8::from(count >= threshold_pixels))
                    .collect()
            })
            .collect();

        debug!(
            rows,
            cols,
            cell_area,
            threshold_pixels,
            "Cell pixel counts:\n{}",
            format_matrix(&counts)
        );

        Ok(CellMatrix {
            rows,
            cols,
            counts,
            marks,
            threshold_pixels,
        })
    }
}

/// Nonzero pixels in a cell.
pub fn count_foreground(cell: &GrayImage) -> u32 {
    cell.pixels().filter(|p| p[0] > 0).count() as u32
}

fn format_matrix(counts: &[Vec<u32>]) -> String {
    counts
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| format!("{:>4}", c))
                .collect::<Vec<_>>()
                .join("")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
