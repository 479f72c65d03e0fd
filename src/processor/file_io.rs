//! # File I/O Module
//!
//! Asynchronous file access for the pipeline, on top of `tokio::fs`.

use std::path::Path;

use anyhow::{Context, Result};

/// File I/O operations for the processor.
pub struct FileIO;

impl FileIO {
  /// Size of a file in bytes, without reading it.
  pub async fn file_size(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
      .await
      .with_context(|| format!("Failed to stat file: {}", path.display()))?;
    Ok(metadata.len())
  }

  /// Reads a whole file as UTF-8.
  ///
  /// Invalid UTF-8 is an error rather than a lossy conversion, so a rewrite
  /// can never corrupt bytes it did not understand.
  pub async fn read_text(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
      .await
      .with_context(|| format!("Failed to read file: {}", path.display()))?;
    String::from_utf8(bytes).with_context(|| format!("File is not valid UTF-8: {}", path.display()))
  }

  /// Replaces the content of a file.
  pub async fn write_text(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
      .await
      .with_context(|| format!("Failed to write file: {}", path.display()))
  }
}
