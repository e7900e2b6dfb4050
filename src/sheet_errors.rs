//! # Sheet Error Types Module
//!
//! This module defines the error types produced while reading a single answer sheet.
//! Errors are split into recoverable per-sheet failures, which end up as diagnostic
//! remarks on a failed record, and configuration errors, which must stop the caller.

/// Custom error types for answer sheet processing
#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    /// Input path does not resolve to a readable file
    FileNotFound(String),
    /// Image could not be decoded
    ImageLoad(String),
    /// Input failed validation (size, format, not a file)
    Validation(String),
    /// No qualifying 4-vertex contour was found in the edge map
    BoxNotFound(String),
    /// Rectified grid dimensions are not divisible by the requested cell counts
    GridPartition {
        width: u32,
        height: u32,
        rows: u32,
        cols: u32,
    },
    /// Paper template has no reader behind it
    UnsupportedTemplate(String),
    /// Sheet processing exceeded its time budget
    Timeout(String),
    /// Any other failure inside the image pipeline
    Processing(String),
}

impl SheetError {
    /// Whether the batch should record this as a failed sheet and carry on.
    ///
    /// Grid partition and template errors mean the configuration is wrong for every
    /// sheet, so they are surfaced to the caller instead.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SheetError::GridPartition { .. } | SheetError::UnsupportedTemplate(_)
        )
    }

    /// Text written into the remarks of a failed record.
    pub fn remarks(&self) -> String {
        match self {
            SheetError::FileNotFound(msg) => msg.clone(),
            SheetError::BoxNotFound(_) => "Error finding question box.".to_string(),
            SheetError::ImageLoad(msg) => format!("Failed to load sheet image: {}", msg),
            SheetError::Validation(msg) => format!("Sheet validation failed: {}", msg),
            SheetError::Timeout(msg) => format!("Sheet processing timed out: {}", msg),
            SheetError::Processing(msg) => format!("Sheet processing failed: {}", msg),
            SheetError::GridPartition { .. } | SheetError::UnsupportedTemplate(_) => {
                let tagged = self.to_string();
                match tagged.split_once("] ") {
                    Some((_, text)) => text.to_string(),
                    None => tagged,
                }
            }
        }
    }

    /// Short machine-friendly label, used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SheetError::FileNotFound(_) => "file_not_found",
            SheetError::ImageLoad(_) => "image_load",
            SheetError::Validation(_) => "validation",
            SheetError::BoxNotFound(_) => "box_not_found",
            SheetError::GridPartition { .. } => "grid_partition",
            SheetError::UnsupportedTemplate(_) => "unsupported_template",
            SheetError::Timeout(_) => "timeout",
            SheetError::Processing(_) => "processing",
        }
    }
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::FileNotFound(msg) => write!(f, "[FILE_NOT_FOUND] {}", msg),
            SheetError::ImageLoad(msg) => write!(f, "[IMAGE_LOAD] Failed to load sheet image: {}", msg),
            SheetError::Validation(msg) => write!(f, "[VALIDATION] Sheet validation failed: {}", msg),
            SheetError::BoxNotFound(msg) => write!(f, "[BOX_NOT_FOUND] Error finding question box: {}", msg),
            SheetError::GridPartition {
                width,
                height,
                rows,
                cols,
            } => write!(
                f,
                "[GRID_PARTITION] {}x{} grid cannot be split evenly into {} rows and {} columns",
                width, height, rows, cols
            ),
            SheetError::UnsupportedTemplate(name) => {
                write!(f, "[UNSUPPORTED] Paper template {} has no reader", name)
            }
            SheetError::Timeout(msg) => write!(f, "[TIMEOUT] Sheet processing timed out: {}", msg),
            SheetError::Processing(msg) => write!(f, "[PROCESSING] Sheet processing failed: {}", msg),
        }
    }
}

impl std::error::Error for SheetError {}

impl From<crate::preprocessing::PreprocessingError> for SheetError {
    fn from(err: crate::preprocessing::PreprocessingError) -> Self {
        match err {
            crate::preprocessing::PreprocessingError::ImageLoad { message } => {
                SheetError::ImageLoad(message)
            }
            other => SheetError::Processing(other.to_string()),
        }
    }
}
