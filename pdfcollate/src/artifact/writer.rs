//! Writing artifacts to disk.
//!
//! Writes go to a temporary sibling first and are renamed into place, so a
//! failed write never leaves a truncated PDF at the destination.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{PdfCollateError, Result};
use crate::utils::{format_file_size, run_blocking};

/// Options for writing an artifact.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Write to a temp file, then rename.
    pub atomic: bool,

    /// Replace an existing file at the destination.
    pub overwrite: bool,

    /// Buffer size for writing (in bytes).
    pub buffer_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            atomic: true,
            overwrite: false,
            buffer_size: 8192,
        }
    }
}

impl WriteOptions {
    /// Default options that replace an existing file.
    pub fn overwriting() -> Self {
        Self {
            overwrite: true,
            ..Default::default()
        }
    }
}

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

pub(super) async fn write_bytes(
    bytes: Arc<[u8]>,
    path: &Path,
    options: &WriteOptions,
) -> Result<WriteStatistics> {
    if !options.overwrite && tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(PdfCollateError::output_exists(path.to_path_buf()));
    }

    let path_buf = path.to_path_buf();
    let options = options.clone();

    run_blocking(move || {
        let start = Instant::now();

        let write_path = if options.atomic {
            path_buf.with_extension("tmp")
        } else {
            path_buf.clone()
        };

        let failed = |path: &Path| {
            let path = path.to_path_buf();
            move |source| PdfCollateError::FailedToWrite { path, source }
        };

        let file = std::fs::File::create(&write_path).map_err(failed(&write_path))?;
        let mut writer = std::io::BufWriter::with_capacity(options.buffer_size, file);
        writer.write_all(&bytes).map_err(failed(&write_path))?;
        writer.flush().map_err(failed(&write_path))?;
        drop(writer);

        if options.atomic {
            std::fs::rename(&write_path, &path_buf).map_err(failed(&path_buf))?;
        }

        let file_size = std::fs::metadata(&path_buf)
            .map(|m| m.len())
            .unwrap_or(bytes.len() as u64);

        Ok(WriteStatistics {
            write_time: start.elapsed(),
            file_size,
            output_path: path_buf,
        })
    })
    .await
}

/// Check that `path`'s parent directory exists and is writable.
pub async fn can_write(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    let metadata = tokio::fs::metadata(parent).await.map_err(|_| {
        PdfCollateError::invalid_config(format!(
            "Output directory does not exist: {}",
            parent.display()
        ))
    })?;

    if !metadata.is_dir() || metadata.permissions().readonly() {
        return Err(PdfCollateError::invalid_config(format!(
            "Output directory is not writable: {}",
            parent.display()
        )));
    }

    Ok(())
}
