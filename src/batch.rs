//! # Batch Processing
//!
//! Scores many sheets concurrently. Each sheet runs on the blocking pool under a
//! time budget, the number of sheets in flight is bounded by the worker count, and
//! results are keyed by sheet path so completion order does not matter.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn, Instrument};

use crate::errors::error_logging;
use crate::observability::{batch_span, record_batch_metrics};
use crate::reader::SheetReader;
use crate::report::AnswerRecord;
use crate::scanner_config::BatchConfig;
use crate::sheet_errors::SheetError;

/// What happened to one sheet of a batch.
#[derive(Debug, Clone)]
pub enum SheetOutcome {
    /// A record was produced, scored or failed
    Record(AnswerRecord),
    /// The sheet could not be read with this configuration
    Error(SheetError),
}

impl SheetOutcome {
    pub fn record(&self) -> Option<&AnswerRecord> {
        match self {
            SheetOutcome::Record(record) => Some(record),
            SheetOutcome::Error(_) => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.record().map(|r| r.completed).unwrap_or(false)
    }

    fn to_json(&self) -> Value {
        match self {
            SheetOutcome::Record(record) => {
                serde_json::to_value(record).unwrap_or_else(|e| json!({ "error": e.to_string() }))
            }
            SheetOutcome::Error(error) => json!({
                "error": error.to_string(),
                "kind": error.kind(),
            }),
        }
    }
}

/// Outcomes of a batch, keyed by sheet path.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcomes: BTreeMap<PathBuf, SheetOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Sheets that were scored.
    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_completed()).count()
    }

    /// Sheets that produced a failure record or an error.
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Sheets rejected with a configuration error.
    pub fn errors(&self) -> impl Iterator<Item = (&PathBuf, &SheetError)> {
        self.outcomes.iter().filter_map(|(path, outcome)| match outcome {
            SheetOutcome::Error(e) => Some((path, e)),
            SheetOutcome::Record(_) => None,
        })
    }

    pub fn summary(&self) -> String {
        let elapsed = self.finished_at - self.started_at;
        format!(
            "{} sheets: {} scored, {} failed in {}ms",
            self.len(),
            self.succeeded(),
            self.failed(),
            elapsed.num_milliseconds()
        )
    }

    /// JSON object with one entry per sheet, keyed by path.
    pub fn to_json(&self) -> Value {
        let entries: Map<String, Value> = self
            .outcomes
            .iter()
            .map(|(path, outcome)| (path.display().to_string(), outcome.to_json()))
            .collect();
        Value::Object(entries)
    }
}

/// Runs a [`SheetReader`] over many sheets.
pub struct BatchRunner {
    reader: Arc<SheetReader>,
    config: BatchConfig,
    sheet_timeout: Duration,
}

impl BatchRunner {
    pub fn new(reader: Arc<SheetReader>, config: BatchConfig) -> Self {
        let sheet_timeout = Duration::from_secs(config.sheet_timeout_secs);
        Self {
            reader,
            config,
            sheet_timeout,
        }
    }

    /// Override the per-sheet time budget with sub-second precision.
    pub fn with_sheet_timeout(mut self, timeout: Duration) -> Self {
        self.sheet_timeout = timeout;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Score every sheet in `paths`. Never fails; per-sheet problems end up in the report.
    pub async fn run(&self, paths: Vec<PathBuf>) -> BatchReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let workers = self.config.workers.max(1);
        let span = batch_span(paths.len(), workers);

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        for path in paths {
            let semaphore = semaphore.clone();
            let reader = self.reader.clone();
            let timeout = self.sheet_timeout;
            tasks.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await;
                    let outcome = process_sheet(reader, path.clone(), timeout).await;
                    (path, outcome)
                }
                .instrument(span.clone()),
            );
        }

        let mut outcomes = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((path, outcome)) => {
                    outcomes.insert(path, outcome);
                }
                Err(e) => error_logging::log_internal_error(&e, "batch", "join_sheet_task"),
            }
        }

        let report = BatchReport {
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };
        record_batch_metrics(report.len(), start.elapsed());
        span.in_scope(|| info!(summary = %report.summary(), "Batch finished"));
        report
    }
}

async fn process_sheet(reader: Arc<SheetReader>, path: PathBuf, timeout: Duration) -> SheetOutcome {
    let source = path.display().to_string();
    let worker_reader = reader.clone();
    let worker_path = path.clone();
    let handle = tokio::task::spawn_blocking(move || worker_reader.read_sheet(&worker_path));

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(Ok(record))) => SheetOutcome::Record(record),
        Ok(Ok(Err(error))) => SheetOutcome::Error(error),
        Ok(Err(join_error)) => {
            let error = SheetError::Processing(format!("sheet worker failed: {}", join_error));
            error_logging::log_sheet_error(&error, "batch", &source, None);
            SheetOutcome::Record(reader.failure_record(&source, &error))
        }
        Err(_) => {
            let error = SheetError::Timeout(format!("exceeded {}ms", timeout.as_millis()));
            warn!(source = %source, timeout_ms = timeout.as_millis() as u64, "Sheet timed out");
            SheetOutcome::Record(reader.failure_record(&source, &error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Category, Paper};

    fn record(source: &str, completed: bool) -> AnswerRecord {
        let builder = crate::report::ReportBuilder::new(source, Paper::Imk);
        if completed {
            builder.build(crate::interpreter::Interpretation {
                scores: Category::ALL.iter().map(|&c| (c, 5)).collect(),
                ..Default::default()
            })
        } else {
            builder.failure("Error finding question box.")
        }
    }

    #[test]
    fn test_report_counts_and_json() {
        let now = Utc::now();
        let report = BatchReport {
            outcomes: BTreeMap::from([
                (PathBuf::from("a.png"), SheetOutcome::Record(record("a.png", true))),
                (PathBuf::from("b.png"), SheetOutcome::Record(record("b.png", false))),
                (
                    PathBuf::from("c.png"),
                    SheetOutcome::Error(SheetError::UnsupportedTemplate("IKK".to_string())),
                ),
            ]),
            started_at: now,
            finished_at: now,
        };

        assert_eq!(report.len(), 3);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.errors().count(), 1);
        assert!(report.summary().starts_with("3 sheets: 1 scored, 2 failed"));

        let value = report.to_json();
        assert_eq!(value["a.png"]["completed"], json!(true));
        assert_eq!(value["b.png"]["remarks"], json!("Error finding question box."));
        assert_eq!(value["c.png"]["kind"], json!("unsupported_template"));
    }
}
