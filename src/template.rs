//! # Answer Sheet Templates
//!
//! A template describes a printed answer sheet as data: the raw grid the rectifier
//! cuts, which rows and columns are spacers or legend, how kept columns pair up into
//! questions and how a (row, pair) position maps to the printed question number.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{AppError, AppResult};

/// RIASEK interest categories, in the order their column pairs appear on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Realistic,
    Investigative,
    Artistic,
    Social,
    Enterprising,
    Conventional,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Realistic,
        Category::Investigative,
        Category::Artistic,
        Category::Social,
        Category::Enterprising,
        Category::Conventional,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Realistic => "Realistic",
            Category::Investigative => "Investigative",
            Category::Artistic => "Artistic",
            Category::Social => "Social",
            Category::Enterprising => "Enterprising",
            Category::Conventional => "Conventional",
        }
    }

    /// Column heading used by the school's result spreadsheet.
    pub fn sheet_label(&self) -> &'static str {
        match self {
            Category::Realistic => "REALISTIK",
            Category::Investigative => "INVESTIGTIF",
            Category::Artistic => "ARTISTIK",
            Category::Social => "SOSIAL",
            Category::Enterprising => "ENTERPRISING",
            Category::Conventional => "KONVENSIONAL",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Answer sheet variants the school prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Paper {
    Imk,
    Ikk,
    Ikp,
}

impl Paper {
    pub fn code(&self) -> &'static str {
        match self {
            Paper::Imk => "IMK",
            Paper::Ikk => "IKK",
            Paper::Ikp => "IKP",
        }
    }

    /// Layout of this paper, `None` for papers without an image reader.
    pub fn template(&self) -> Option<SheetTemplate> {
        match self {
            Paper::Imk => Some(SheetTemplate::imk()),
            Paper::Ikk | Paper::Ikp => None,
        }
    }
}

impl fmt::Display for Paper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Paper {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IMK" => Ok(Paper::Imk),
            "IKK" => Ok(Paper::Ikk),
            "IKP" => Ok(Paper::Ikp),
            other => Err(AppError::Validation(format!(
                "unknown paper '{}', expected one of IMK, IKK, IKP",
                other
            ))),
        }
    }
}

/// Declarative layout of one answer sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetTemplate {
    pub name: String,
    /// Rows of the physical grid, spacers included
    pub raw_rows: u32,
    /// Columns of the physical grid, legend included
    pub raw_cols: u32,
    /// Physical rows that carry no answers
    pub drop_rows: Vec<u32>,
    /// Physical columns that carry no answers
    pub drop_cols: Vec<u32>,
    /// Adjacent kept columns forming one question
    pub options_per_question: u32,
    /// Category scored by each column group, left to right
    pub categories: Vec<Category>,
    /// Logical rows per printed block
    pub block_rows: u32,
    /// Question number jump between blocks
    pub block_stride: u32,
    /// Question number jump between column groups
    pub column_stride: u32,
}

impl SheetTemplate {
    /// The IMK interest inventory sheet.
    pub fn imk() -> Self {
        Self {
            name: "IMK".to_string(),
            raw_rows: 32,
            raw_cols: 23,
            drop_rows: vec![10, 21],
            drop_cols: vec![0, 3, 4, 7, 8, 11, 12, 15, 16, 19, 20],
            options_per_question: 2,
            categories: Category::ALL.to_vec(),
            block_rows: 10,
            block_stride: 50,
            column_stride: 10,
        }
    }

    pub fn kept_rows(&self) -> Vec<u32> {
        (0..self.raw_rows)
            .filter(|r| !self.drop_rows.contains(r))
            .collect()
    }

    pub fn kept_cols(&self) -> Vec<u32> {
        (0..self.raw_cols)
            .filter(|c| !self.drop_cols.contains(c))
            .collect()
    }

    /// (rows, columns) left after dropping spacers.
    pub fn logical_shape(&self) -> (u32, u32) {
        (
            self.kept_rows().len() as u32,
            self.kept_cols().len() as u32,
        )
    }

    pub fn question_count(&self) -> u32 {
        self.logical_shape().0 * self.categories.len() as u32
    }

    /// Printed question number for 1-indexed logical `row` and 0-indexed column `pair`.
    pub fn question_number(&self, row: u32, pair: u32) -> u32 {
        self.block_stride * ((row - 1) / self.block_rows) + self.column_stride * pair + row
    }

    /// Physical (row, col) of a 0-indexed logical cell.
    pub fn physical_cell(&self, row: u32, col: u32) -> Option<(u32, u32)> {
        let r = *self.kept_rows().get(row as usize)?;
        let c = *self.kept_cols().get(col as usize)?;
        Some((r, c))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.raw_rows == 0 || self.raw_cols == 0 {
            return Err(AppError::Config(format!(
                "template {} has an empty raw grid",
                self.name
            )));
        }
        if let Some(r) = self.drop_rows.iter().find(|&&r| r >= self.raw_rows) {
            return Err(AppError::Config(format!(
                "template {} drops row {} outside a {}-row grid",
                self.name, r, self.raw_rows
            )));
        }
        if let Some(c) = self.drop_cols.iter().find(|&&c| c >= self.raw_cols) {
            return Err(AppError::Config(format!(
                "template {} drops column {} outside a {}-column grid",
                self.name, c, self.raw_cols
            )));
        }
        if self.options_per_question == 0 || self.block_rows == 0 {
            return Err(AppError::Config(format!(
                "template {} needs non-zero options_per_question and block_rows",
                self.name
            )));
        }

        let (rows, cols) = self.logical_shape();
        if rows == 0 {
            return Err(AppError::Config(format!(
                "template {} keeps no rows",
                self.name
            )));
        }
        let expected_cols = self.options_per_question * self.categories.len() as u32;
        if cols != expected_cols {
            return Err(AppError::Config(format!(
                "template {} keeps {} columns but {} categories x {} options need {}",
                self.name,
                cols,
                self.categories.len(),
                self.options_per_question,
                expected_cols
            )));
        }
        Ok(())
    }
}
