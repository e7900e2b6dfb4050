//! # Answer Records
//!
//! Assembles the per-sheet result handed to whoever stores the scores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::interpreter::Interpretation;
use crate::template::{Category, Paper};

/// Result of reading one answer sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Path or name the sheet was read from
    pub source: String,
    pub paper: Paper,
    /// Total per category, every category present
    pub scores: BTreeMap<Category, u32>,
    /// Questions with no mark
    pub no_answer: BTreeSet<u32>,
    /// Questions with more than one mark
    pub two_answers: BTreeSet<u32>,
    /// Anomaly sentences, or the failure diagnostic
    pub remarks: String,
    /// False when the sheet could not be scored
    pub completed: bool,
    pub processed_at: DateTime<Utc>,
}

impl AnswerRecord {
    pub fn score(&self, category: Category) -> u32 {
        self.scores.get(&category).copied().unwrap_or(0)
    }

    /// Row layout of the result spreadsheet: one column per category label, then
    /// `REKOD` (1 when scored) and `CATATAN` (remarks).
    pub fn labeled_columns(&self) -> Vec<(String, Value)> {
        let mut columns: Vec<(String, Value)> = Category::ALL
            .iter()
            .map(|c| (c.sheet_label().to_string(), json!(self.score(*c))))
            .collect();
        columns.push(("REKOD".to_string(), json!(u8::from(self.completed))));
        columns.push(("CATATAN".to_string(), json!(self.remarks)));
        columns
    }
}

/// Remarks text for the anomaly sets, one sentence per non-empty set.
pub fn compose_remarks(no_answer: &BTreeSet<u32>, two_answers: &BTreeSet<u32>) -> String {
    let join = |set: &BTreeSet<u32>| {
        set.iter()
            .map(|q| q.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut remarks = String::new();
    if !no_answer.is_empty() {
        remarks.push_str(&format!("Question {} has no answer.\n", join(no_answer)));
    }
    if !two_answers.is_empty() {
        remarks.push_str(&format!("Question {} has two answers.\n", join(two_answers)));
    }
    remarks
}

/// Builds [`AnswerRecord`]s for one sheet.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    source: String,
    paper: Paper,
}

impl ReportBuilder {
    pub fn new(source: impl Into<String>, paper: Paper) -> Self {
        Self {
            source: source.into(),
            paper,
        }
    }

    fn zero_scores() -> BTreeMap<Category, u32> {
        Category::ALL.iter().map(|&c| (c, 0)).collect()
    }

    /// Record for a scored sheet.
    pub fn build(&self, interpretation: Interpretation) -> AnswerRecord {
        let mut scores = Self::zero_scores();
        scores.extend(interpretation.scores);

        AnswerRecord {
            source: self.source.clone(),
            paper: self.paper,
            remarks: compose_remarks(&interpretation.no_answer, &interpretation.two_answers),
            scores,
            no_answer: interpretation.no_answer,
            two_answers: interpretation.two_answers,
            completed: true,
            processed_at: Utc::now(),
        }
    }

    /// Record for a sheet that could not be scored, carrying `diagnostic` as remarks.
    pub fn failure(&self, diagnostic: impl Into<String>) -> AnswerRecord {
        AnswerRecord {
            source: self.source.clone(),
            paper: self.paper,
            scores: Self::zero_scores(),
            no_answer: BTreeSet::new(),
            two_answers: BTreeSet::new(),
            remarks: diagnostic.into(),
            completed: false,
            processed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remarks_sentences() {
        let no_answer = BTreeSet::from([17, 3]);
        let two_answers = BTreeSet::from([5]);

        assert_eq!(
            compose_remarks(&no_answer, &two_answers),
            "Question 3, 17 has no answer.\nQuestion 5 has two answers.\n"
        );
        assert_eq!(
            compose_remarks(&BTreeSet::new(), &two_answers),
            "Question 5 has two answers.\n"
        );
        assert_eq!(compose_remarks(&BTreeSet::new(), &BTreeSet::new()), "");
    }

    #[test]
    fn test_build_fills_missing_categories() {
        let interpretation = Interpretation {
            scores: BTreeMap::from([(Category::Social, 7)]),
            no_answer: BTreeSet::from([2]),
            two_answers: BTreeSet::new(),
        };

        let record = ReportBuilder::new("a.png", Paper::Imk).build(interpretation);

        assert!(record.completed);
        assert_eq!(record.scores.len(), 6);
        assert_eq!(record.score(Category::Social), 7);
        assert_eq!(record.score(Category::Artistic), 0);
        assert_eq!(record.remarks, "Question 2 has no answer.\n");
    }

    #[test]
    fn test_failure_record() {
        let record = ReportBuilder::new("missing.png", Paper::Imk)
            .failure("File \"missing.png\" does not exist.");

        assert!(!record.completed);
        assert!(record.scores.values().all(|&s| s == 0));
        assert_eq!(record.scores.len(), 6);
        assert_eq!(record.remarks, "File \"missing.png\" does not exist.");
    }

    #[test]
    fn test_labeled_columns_layout() {
        let interpretation = Interpretation {
            scores: Category::ALL.iter().map(|&c| (c, 5)).collect(),
            ..Default::default()
        };
        let record = ReportBuilder::new("a.png", Paper::Imk).build(interpretation);

        let columns = record.labeled_columns();
        let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "REALISTIK",
                "INVESTIGTIF",
                "ARTISTIK",
                "SOSIAL",
                "ENTERPRISING",
                "KONVENSIONAL",
                "REKOD",
                "CATATAN"
            ]
        );
        assert_eq!(columns[0].1, json!(5));
        assert_eq!(columns[6].1, json!(1));
        assert_eq!(columns[7].1, json!(""));
    }

    #[test]
    fn test_record_serializes_to_json() {
        let record = ReportBuilder::new("a.png", Paper::Imk).failure("broken");
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["paper"], json!("IMK"));
        assert_eq!(value["completed"], json!(false));
        assert_eq!(value["scores"]["Realistic"], json!(0));
    }
}
