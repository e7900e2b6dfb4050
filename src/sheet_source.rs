//! # Sheet Sources
//!
//! Input checks before a sheet is decoded, and discovery of sheet images in a directory.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::error_logging;
use crate::sheet_errors::SheetError;

/// File extensions picked up when scanning a directory.
pub const SHEET_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// Header bytes read for format detection
const FORMAT_SNIFF_BYTES: usize = 32;

/// Message used for a path that does not exist.
pub fn missing_file_message(path: &Path) -> String {
    format!("File \"{}\" does not exist.", path.display())
}

/// Check that `path` points at a non-empty raster image no larger than `max_file_size`.
///
/// Only the file header is read; decoding happens later.
pub fn validate_sheet_path(path: &Path, max_file_size: u64) -> Result<image::ImageFormat, SheetError> {
    if !path.exists() {
        return Err(SheetError::FileNotFound(missing_file_message(path)));
    }

    if !path.is_file() {
        return Err(SheetError::Validation(format!(
            "path is not a file ({})",
            path.display()
        )));
    }

    let metadata = path.metadata().map_err(|e| {
        error_logging::log_filesystem_error(&e, "read_metadata", Some(&path.display().to_string()), None);
        SheetError::Validation(format!(
            "cannot read file metadata ({}) - {}",
            path.display(),
            e
        ))
    })?;
    let file_size = metadata.len();
    if file_size == 0 {
        return Err(SheetError::Validation(format!(
            "file is empty ({})",
            path.display()
        )));
    }
    if file_size > max_file_size {
        return Err(SheetError::Validation(format!(
            "file too large ({} bytes, maximum allowed: {} bytes)",
            file_size, max_file_size
        )));
    }

    let mut file = File::open(path).map_err(|e| {
        SheetError::ImageLoad(format!("cannot open {}: {}", path.display(), e))
    })?;
    let mut buffer = vec![0u8; FORMAT_SNIFF_BYTES];
    let bytes_read = file.read(&mut buffer).map_err(|e| {
        SheetError::ImageLoad(format!("cannot read {}: {}", path.display(), e))
    })?;
    buffer.truncate(bytes_read);

    let format = validate_sheet_bytes(&buffer)?;
    debug!(
        path = %path.display(),
        format = ?format,
        file_size,
        "Sheet source validated"
    );
    Ok(format)
}

/// Detect the raster format of an in-memory sheet.
pub fn validate_sheet_bytes(bytes: &[u8]) -> Result<image::ImageFormat, SheetError> {
    if bytes.is_empty() {
        return Err(SheetError::Validation("image data is empty".to_string()));
    }
    let format = image::guess_format(bytes).map_err(|e| {
        SheetError::ImageLoad(format!("unrecognized image format: {}", e))
    })?;
    match format {
        image::ImageFormat::Png
        | image::ImageFormat::Jpeg
        | image::ImageFormat::Bmp
        | image::ImageFormat::Tiff
        | image::ImageFormat::WebP => Ok(format),
        other => Err(SheetError::ImageLoad(format!(
            "unsupported image format {:?}",
            other
        ))),
    }
}

fn has_sheet_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SHEET_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sheets to process for `path`: the file itself, or the image files of a directory
/// sorted by path.
pub fn collect_sheet_paths(path: &Path, recurse: bool) -> Result<Vec<PathBuf>, SheetError> {
    if !path.exists() {
        return Err(SheetError::FileNotFound(missing_file_message(path)));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut found = Vec::new();
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            error_logging::log_filesystem_error(
                &e,
                "list_sheet_dir",
                Some(&dir.display().to_string()),
                None,
            );
            SheetError::Validation(format!("cannot list {}: {}", dir.display(), e))
        })?;
        for entry in entries {
            let entry_path = entry
                .map_err(|e| SheetError::Validation(format!("cannot list {}: {}", dir.display(), e)))?
                .path();
            if entry_path.is_dir() {
                if recurse {
                    pending.push(entry_path);
                }
            } else if has_sheet_extension(&entry_path) {
                found.push(entry_path);
            }
        }
    }

    found.sort();
    Ok(found)
}
