//! # Test Helper Library
//!
//! Synthetic IMK answer sheets for integration tests. Sheets are drawn on the
//! working canvas with a black-framed answer box whose cells line up with the
//! 32x23 physical grid, so a filled cell ends up well above the mark threshold
//! after rectification.

#![allow(dead_code)]

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use omr_scorer::template::SheetTemplate;
use std::path::{Path, PathBuf};

pub const CANVAS: (u32, u32) = (1050, 1485);
/// Top-left corner of the answer box on the canvas
pub const BOX_ORIGIN: (i32, i32) = (114, 101);
/// Canvas pixels per raw cell; 23 x 36 = 828 and 32 x 40 = 1280
pub const CELL_W: u32 = 36;
pub const CELL_H: u32 = 40;
pub const FRAME: u32 = 3;
/// Unpainted border inside a marked cell
pub const MARK_MARGIN: u32 = 5;

/// Rectified grid size of the IMK sheet under the default configuration.
pub const WARP_SIZE: (u32, u32) = (621, 864);

pub fn raw_shape() -> (u32, u32) {
    let t = SheetTemplate::imk();
    (t.raw_rows, t.raw_cols)
}

pub fn empty_marks() -> Vec<Vec<u8>> {
    let (rows, cols) = raw_shape();
    vec![vec![0; cols as usize]; rows as usize]
}

/// Physical mark matrix for logical answers given as (0-indexed row, pair, option).
pub fn marks_for(answers: &[(u32, u32, u32)]) -> Vec<Vec<u8>> {
    let t = SheetTemplate::imk();
    let mut marks = empty_marks();
    for &(row, pair, option) in answers {
        let (r, c) = t
            .physical_cell(row, pair * t.options_per_question + option)
            .expect("answer inside the logical grid");
        marks[r as usize][c as usize] = 1;
    }
    marks
}

/// Every question answered once; each category totals 5.
pub fn five_per_category_answers() -> Vec<(u32, u32, u32)> {
    let mut answers = Vec::new();
    for pair in 0..6 {
        for row in 0..30 {
            answers.push((row, pair, if row < 5 { 0 } else { 1 }));
        }
    }
    answers
}

/// Photograph-free rendering of a filled sheet on the working canvas.
pub fn render_sheet(marks: &[Vec<u8>]) -> GrayImage {
    let (rows, cols) = raw_shape();
    let box_w = cols * CELL_W;
    let box_h = rows * CELL_H;
    let (x0, y0) = BOX_ORIGIN;

    let mut img = GrayImage::from_pixel(CANVAS.0, CANVAS.1, Luma([255]));
    draw_filled_rect_mut(&mut img, Rect::at(x0, y0).of_size(box_w, box_h), Luma([0]));
    draw_filled_rect_mut(
        &mut img,
        Rect::at(x0 + FRAME as i32, y0 + FRAME as i32)
            .of_size(box_w - 2 * FRAME, box_h - 2 * FRAME),
        Luma([255]),
    );

    for (r, row) in marks.iter().enumerate() {
        for (c, &mark) in row.iter().enumerate() {
            if mark == 0 {
                continue;
            }
            let x = x0 + (c as u32 * CELL_W + MARK_MARGIN) as i32;
            let y = y0 + (r as u32 * CELL_H + MARK_MARGIN) as i32;
            draw_filled_rect_mut(
                &mut img,
                Rect::at(x, y).of_size(CELL_W - 2 * MARK_MARGIN, CELL_H - 2 * MARK_MARGIN),
                Luma([20]),
            );
        }
    }
    img
}

/// Already rectified and binarized grid: ink is 255, marks fill their cell's centre.
pub fn render_rectified_grid(marks: &[Vec<u8>]) -> GrayImage {
    let (rows, cols) = raw_shape();
    let cell_w = WARP_SIZE.0 / cols;
    let cell_h = WARP_SIZE.1 / rows;
    let mut img = GrayImage::new(WARP_SIZE.0, WARP_SIZE.1);
    for (r, row) in marks.iter().enumerate() {
        for (c, &mark) in row.iter().enumerate() {
            if mark == 0 {
                continue;
            }
            draw_filled_rect_mut(
                &mut img,
                Rect::at((c as u32 * cell_w + 3) as i32, (r as u32 * cell_h + 3) as i32)
                    .of_size(cell_w - 6, cell_h - 6),
                Luma([255]),
            );
        }
    }
    img
}

/// Blank paper, no answer box.
pub fn blank_canvas() -> GrayImage {
    GrayImage::from_pixel(CANVAS.0, CANVAS.1, Luma([255]))
}

pub fn save_png(dir: &Path, name: &str, img: &GrayImage) -> PathBuf {
    let path = dir.join(name);
    img.save(&path).expect("write test image");
    path
}
