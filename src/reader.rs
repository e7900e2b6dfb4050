//! # Sheet Reader
//!
//! Entry point for scoring one answer sheet of a given paper. The reader validates
//! the input, rectifies the image, decodes the cell grid, interprets it with the
//! paper's template and returns an [`AnswerRecord`].
//!
//! Per-sheet problems (missing file, undecodable image, no answer box) come back as a
//! failed record so a batch can carry on. A wrong grid configuration or a paper
//! without a reader comes back as `Err`.

use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::diagnostics::DiagnosticsSink;
use crate::errors::{error_logging, AppResult};
use crate::grid_decoder::GridDecoder;
use crate::interpreter::{AnswerInterpreter, Interpretation};
use crate::observability::{record_anomaly_metrics, record_error_metrics, record_sheet_metrics, sheet_span};
use crate::preprocessing::{decode_sheet_image, load_sheet_image};
use crate::rectifier::SheetRectifier;
use crate::report::{AnswerRecord, ReportBuilder};
use crate::scanner_config::ScannerConfig;
use crate::sheet_errors::SheetError;
use crate::sheet_source::{validate_sheet_bytes, validate_sheet_path};
use crate::template::{Paper, SheetTemplate};

/// Image stages bound to one template.
struct TemplatePipeline {
    rectifier: SheetRectifier,
    decoder: GridDecoder,
    interpreter: AnswerInterpreter,
}

impl TemplatePipeline {
    fn new(template: SheetTemplate, config: &ScannerConfig, sink: Arc<dyn DiagnosticsSink>) -> Self {
        let rectifier = SheetRectifier::new(
            template.raw_rows,
            template.raw_cols,
            config.clone(),
            sink.clone(),
        );
        Self {
            rectifier,
            decoder: GridDecoder::new(config.mark_threshold),
            interpreter: AnswerInterpreter::new(template, sink),
        }
    }

    fn score(&self, image: &DynamicImage, source: &str) -> Result<Interpretation, SheetError> {
        let grid = self.rectifier.rectify_image(image, source)?;
        let (rows, cols) = self.rectifier.grid_shape();
        let cells = self.decoder.decode(&grid.image, rows, cols)?;
        debug!(
            source,
            marked_cells = cells.marked_cells(),
            threshold_pixels = cells.threshold_pixels,
            "Grid decoded"
        );
        self.interpreter.interpret(&cells, source)
    }
}

/// Reads sheets of one paper.
pub struct SheetReader {
    paper: Paper,
    config: ScannerConfig,
    pipeline: Option<TemplatePipeline>,
}

impl SheetReader {
    /// Reader for `paper`. Papers without an image reader are accepted here and fail
    /// on every read with `SheetError::UnsupportedTemplate`.
    pub fn new(paper: Paper, config: ScannerConfig, sink: Arc<dyn DiagnosticsSink>) -> Self {
        let pipeline = paper
            .template()
            .map(|template| TemplatePipeline::new(template, &config, sink));
        Self {
            paper,
            config,
            pipeline,
        }
    }

    /// Reader that uses a custom layout for `paper`.
    ///
    /// # Errors
    ///
    /// `AppError::Config` when the layout fails [`SheetTemplate::validate`].
    pub fn with_template(
        paper: Paper,
        template: SheetTemplate,
        config: ScannerConfig,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> AppResult<Self> {
        template.validate()?;
        let pipeline = Some(TemplatePipeline::new(template, &config, sink));
        Ok(Self {
            paper,
            config,
            pipeline,
        })
    }

    pub fn paper(&self) -> Paper {
        self.paper
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn is_supported(&self) -> bool {
        self.pipeline.is_some()
    }

    fn pipeline(&self) -> Result<&TemplatePipeline, SheetError> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| SheetError::UnsupportedTemplate(self.paper.to_string()))
    }

    /// Score the sheet stored at `path`.
    pub fn read_sheet(&self, path: &Path) -> Result<AnswerRecord, SheetError> {
        let source = path.display().to_string();
        let span = sheet_span(&source, self.paper.code());
        let _enter = span.enter();

        let pipeline = self.pipeline()?;
        let start = Instant::now();
        let outcome = validate_sheet_path(path, self.config.max_file_size)
            .and_then(|_| load_sheet_image(path).map_err(SheetError::from))
            .and_then(|image| pipeline.score(&image, &source));

        self.finish(&source, outcome, start)
    }

    /// Score a sheet held in memory. `source_name` identifies it in the record.
    pub fn read_sheet_bytes(&self, bytes: &[u8], source_name: &str) -> Result<AnswerRecord, SheetError> {
        let span = sheet_span(source_name, self.paper.code());
        let _enter = span.enter();

        let pipeline = self.pipeline()?;
        let start = Instant::now();
        let outcome = if bytes.len() as u64 > self.config.max_file_size {
            Err(SheetError::Validation(format!(
                "image data too large ({} bytes, maximum allowed: {} bytes)",
                bytes.len(),
                self.config.max_file_size
            )))
        } else {
            validate_sheet_bytes(bytes)
                .and_then(|_| decode_sheet_image(bytes).map_err(SheetError::from))
                .and_then(|image| pipeline.score(&image, source_name))
        };

        self.finish(source_name, outcome, start)
    }

    /// Failure record for a sheet that never produced an outcome of its own.
    pub fn failure_record(&self, source: &str, error: &SheetError) -> AnswerRecord {
        ReportBuilder::new(source, self.paper).failure(error.remarks())
    }

    fn finish(
        &self,
        source: &str,
        outcome: Result<Interpretation, SheetError>,
        start: Instant,
    ) -> Result<AnswerRecord, SheetError> {
        let builder = ReportBuilder::new(source, self.paper);
        let elapsed = start.elapsed();

        match outcome {
            Ok(interpretation) => {
                record_anomaly_metrics(
                    interpretation.no_answer.len(),
                    interpretation.two_answers.len(),
                );
                record_sheet_metrics(true, elapsed);
                let record = builder.build(interpretation);
                info!(
                    source,
                    scores = ?record.scores,
                    no_answer = record.no_answer.len(),
                    two_answers = record.two_answers.len(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Sheet scored"
                );
                Ok(record)
            }
            Err(e) if e.is_recoverable() => {
                error_logging::log_sheet_error(&e, "read_sheet", source, Some(elapsed));
                record_error_metrics(e.kind(), "reader");
                record_sheet_metrics(false, elapsed);
                Ok(builder.failure(e.remarks()))
            }
            Err(e) => {
                error_logging::log_sheet_error(&e, "read_sheet", source, Some(elapsed));
                record_error_metrics(e.kind(), "reader");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use image::{GrayImage, Luma};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn imk_reader() -> SheetReader {
        SheetReader::new(
            Paper::Imk,
            ScannerConfig::default(),
            Arc::new(MemorySink::new()),
        )
    }

    #[test]
    fn test_missing_file_becomes_failure_record() {
        let record = imk_reader()
            .read_sheet(Path::new("missing/sheet.png"))
            .unwrap();

        assert!(!record.completed);
        assert_eq!(record.remarks, "File \"missing/sheet.png\" does not exist.");
        assert!(record.scores.values().all(|&s| s == 0));
    }

    #[test]
    fn test_unsupported_papers_fail_on_read() {
        for paper in [Paper::Ikk, Paper::Ikp] {
            let reader = SheetReader::new(paper, ScannerConfig::default(), Arc::new(MemorySink::new()));
            assert!(!reader.is_supported());
            let err = reader.read_sheet(Path::new("whatever.png")).unwrap_err();
            assert_eq!(err, SheetError::UnsupportedTemplate(paper.to_string()));
        }
    }

    #[test]
    fn test_blank_image_becomes_failure_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blank.png");
        GrayImage::from_pixel(210, 297, Luma([255])).save(&path).unwrap();

        let record = imk_reader().read_sheet(&path).unwrap();

        assert!(!record.completed);
        assert_eq!(record.remarks, "Error finding question box.");
    }

    #[test]
    fn test_garbage_bytes_become_failure_record() {
        let record = imk_reader()
            .read_sheet_bytes(b"definitely not an image", "upload")
            .unwrap();
        assert!(!record.completed);
        assert_eq!(record.source, "upload");
        assert!(!record.remarks.is_empty());
    }

    #[test]
    fn test_blank_bytes_become_failure_record() {
        let mut bytes = Vec::new();
        GrayImage::from_pixel(105, 148, Luma([255]))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let record = imk_reader().read_sheet_bytes(&bytes, "blank-upload").unwrap();

        assert!(!record.completed);
        assert_eq!(record.remarks, "Error finding question box.");
    }

    #[test]
    fn test_with_template_rejects_broken_layouts() {
        let sink: Arc<dyn DiagnosticsSink> = Arc::new(MemorySink::new());
        let no_blocks = SheetTemplate {
            block_rows: 0,
            ..SheetTemplate::imk()
        };
        let too_few_cols = SheetTemplate {
            drop_cols: vec![0, 1, 2, 3, 4, 7, 8, 11, 12, 15, 16, 19, 20],
            ..SheetTemplate::imk()
        };

        for template in [no_blocks, too_few_cols] {
            let result =
                SheetReader::with_template(Paper::Imk, template, ScannerConfig::default(), sink.clone());
            assert!(matches!(result, Err(crate::errors::AppError::Config(_))));
        }
    }

    #[test]
    fn test_with_template_accepts_valid_layout() {
        let template = SheetTemplate {
            name: "IMK-reprint".to_string(),
            ..SheetTemplate::imk()
        };
        let reader = SheetReader::with_template(
            Paper::Imk,
            template,
            ScannerConfig::default(),
            Arc::new(MemorySink::new()),
        )
        .unwrap();

        assert!(reader.is_supported());
        let record = reader.read_sheet(Path::new("missing/reprint.png")).unwrap();
        assert!(!record.completed);
    }

    #[test]
    fn test_failure_record_helper() {
        let reader = imk_reader();
        let record = reader.failure_record("slow.png", &SheetError::Timeout("30s".to_string()));
        assert!(!record.completed);
        assert_eq!(record.remarks, "Sheet processing timed out: 30s");
    }
}
