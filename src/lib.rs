//! # OMR Scorer
//!
//! Scores RIASEK interest inventory answer sheets from scans or photographs. The
//! answer box is located and straightened, its cells are thresholded into marks and
//! the marks are mapped onto questions and category totals.

pub mod batch;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod geometry;
pub mod grid_decoder;
pub mod interpreter;
pub mod observability;
pub mod observability_config;
pub mod preprocessing;
pub mod reader;
pub mod rectifier;
pub mod report;
pub mod scanner_config;
pub mod sheet_errors;
pub mod sheet_source;
pub mod template;

// Re-export types for easier access
pub use batch::{BatchReport, BatchRunner, SheetOutcome};
pub use diagnostics::{Diagnostic, DiagnosticsSink, MemorySink, TracingSink};
pub use reader::SheetReader;
pub use report::AnswerRecord;
pub use scanner_config::{BatchConfig, MarkThreshold, ScannerConfig};
pub use sheet_errors::SheetError;
pub use template::{Category, Paper, SheetTemplate};
