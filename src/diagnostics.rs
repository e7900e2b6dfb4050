//! # Diagnostics Sink
//!
//! Components report anomalies and stage timings through a [`DiagnosticsSink`]
//! handed to them at construction, so tests can capture what a sheet produced
//! without installing a global subscriber.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Something worth telling the operator about while reading a sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Diagnostic {
    /// Neither option of a question was marked (or the marks were too faint)
    NoAnswer { source: String, question: u32 },
    /// Both options of a question were marked
    TwoAnswers { source: String, question: u32 },
    /// The answer box could not be located
    BoxNotFound { source: String },
    /// An image stage finished
    Stage {
        source: String,
        name: &'static str,
        elapsed_ms: u64,
    },
}

pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

/// Default sink, forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::NoAnswer { source, question } => info!(
                source = %source,
                question,
                "Question {} has no answer or answer is unreadable",
                question
            ),
            Diagnostic::TwoAnswers { source, question } => info!(
                source = %source,
                question,
                "Question {} has two answers or answer is unreadable",
                question
            ),
            Diagnostic::BoxNotFound { source } => {
                warn!(source = %source, "Error finding question box")
            }
            Diagnostic::Stage {
                source,
                name,
                elapsed_ms,
            } => debug!(
                target: "omr_preprocessing",
                source = %source,
                stage = name,
                elapsed_ms,
                "Stage completed"
            ),
        }
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.lock().clone()
    }

    /// Recorded diagnostics without the stage timings
    pub fn anomalies(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .iter()
            .filter(|d| !matches!(d, Diagnostic::Stage { .. }))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&self, diagnostic: Diagnostic) {
        self.events.lock().push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_captures_in_order() {
        let sink = MemorySink::new();
        sink.record(Diagnostic::NoAnswer {
            source: "a.png".to_string(),
            question: 4,
        });
        sink.record(Diagnostic::Stage {
            source: "a.png".to_string(),
            name: "warp",
            elapsed_ms: 3,
        });
        sink.record(Diagnostic::TwoAnswers {
            source: "a.png".to_string(),
            question: 9,
        });

        assert_eq!(sink.events().len(), 3);
        assert_eq!(
            sink.anomalies(),
            vec![
                Diagnostic::NoAnswer {
                    source: "a.png".to_string(),
                    question: 4
                },
                Diagnostic::TwoAnswers {
                    source: "a.png".to_string(),
                    question: 9
                },
            ]
        );

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_tracing_sink_accepts_every_variant() {
        let sink = TracingSink;
        sink.record(Diagnostic::BoxNotFound {
            source: "blank.png".to_string(),
        });
        sink.record(Diagnostic::NoAnswer {
            source: "blank.png".to_string(),
            question: 1,
        });
    }
}
