//! # Answer Interpreter
//!
//! Maps the raw cell matrix of a sheet onto questions and categories using a
//! [`SheetTemplate`], and classifies questions with no mark or more than one mark.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::grid_decoder::CellMatrix;
use crate::sheet_errors::SheetError;
use crate::template::{Category, SheetTemplate};

/// What one question's option group decoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    NoAnswer,
    TwoAnswers,
    /// Exactly one option marked; the value added to the category total
    Answer(u32),
}

/// Classify the marks of one option group.
///
/// Options are printed in reverse order, so a mark in the first cell decodes to 1
/// and a mark in the second to 0.
pub fn classify_pair(marks: &[u8]) -> PairOutcome {
    let total: u32 = marks.iter().map(|&m| u32::from(m > 0)).sum();
    match total {
        0 => PairOutcome::NoAnswer,
        1 => {
            let marked = marks.iter().position(|&m| m > 0).unwrap_or(0);
            PairOutcome::Answer((marked as u32) ^ 1)
        }
        _ => PairOutcome::TwoAnswers,
    }
}

/// Category totals and anomalies of one sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Interpretation {
    pub scores: BTreeMap<Category, u32>,
    pub no_answer: BTreeSet<u32>,
    pub two_answers: BTreeSet<u32>,
}

impl Interpretation {
    /// Totals in category order.
    pub fn totals(&self) -> Vec<u32> {
        Category::ALL
            .iter()
            .map(|c| self.scores.get(c).copied().unwrap_or(0))
            .collect()
    }

    pub fn has_anomalies(&self) -> bool {
        !self.no_answer.is_empty() || !self.two_answers.is_empty()
    }
}

pub struct AnswerInterpreter {
    template: SheetTemplate,
    sink: Arc<dyn DiagnosticsSink>,
}

impl AnswerInterpreter {
    pub fn new(template: SheetTemplate, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self { template, sink }
    }

    pub fn template(&self) -> &SheetTemplate {
        &self.template
    }

    /// Score a raw cell matrix cut with the template's physical grid shape.
    pub fn interpret(&self, cells: &CellMatrix, source: &str) -> Result<Interpretation, SheetError> {
        let t = &self.template;
        if cells.rows != t.raw_rows || cells.cols != t.raw_cols {
            return Err(SheetError::Processing(format!(
                "{} template expects a {}x{} cell matrix, got {}x{}",
                t.name, t.raw_rows, t.raw_cols, cells.rows, cells.cols
            )));
        }

        let logical = cells.select(&t.kept_rows(), &t.kept_cols())?;
        let options = t.options_per_question as usize;

        let mut result = Interpretation {
            scores: t.categories.iter().map(|&c| (c, 0)).collect(),
            ..Default::default()
        };

        for (index, row_marks) in logical.marks.iter().enumerate() {
            let row = index as u32 + 1;
            for (pair, category) in t.categories.iter().enumerate() {
                let start = pair * options;
                let question = t.question_number(row, pair as u32);

                match classify_pair(&row_marks[start..start + options]) {
                    PairOutcome::NoAnswer => {
                        result.no_answer.insert(question);
                        self.sink.record(Diagnostic::NoAnswer {
                            source: source.to_string(),
                            question,
                        });
                    }
                    PairOutcome::TwoAnswers => {
                        result.two_answers.insert(question);
                        self.sink.record(Diagnostic::TwoAnswers {
                            source: source.to_string(),
                            question,
                        });
                    }
                    PairOutcome::Answer(value) => {
                        *result.scores.entry(*category).or_insert(0) += value;
                    }
                }
            }
        }

        Ok(result)
    }
}
