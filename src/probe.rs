//! # Probe Module
//!
//! Decides whether a file is text before it is read in full. Binary files are
//! reported as ignored and never rewritten.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;

/// Number of leading bytes inspected by [`SniffProbe`].
const SNIFF_LEN: usize = 8 * 1024;

/// Classifies files as text or binary. Implementations are blocking.
pub trait ContentProbe: Send + Sync {
  fn is_text(&self, path: &Path) -> Result<bool>;
}

/// Inspects the first 8 KiB: text is non-empty, NUL-free UTF-8.
///
/// A multi-byte character cut off by the 8 KiB boundary is tolerated.
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffProbe;

impl ContentProbe for SniffProbe {
  fn is_text(&self, path: &Path) -> Result<bool> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut buffer = Vec::with_capacity(SNIFF_LEN);
    file
      .take(SNIFF_LEN as u64)
      .read_to_end(&mut buffer)
      .with_context(|| format!("Failed to read file: {}", path.display()))?;

    Ok(looks_like_text(&buffer, buffer.len() == SNIFF_LEN))
  }
}

fn looks_like_text(bytes: &[u8], truncated: bool) -> bool {
  if bytes.is_empty() || bytes.contains(&0) {
    return false;
  }
  match std::str::from_utf8(bytes) {
    Ok(_) => true,
    Err(e) => truncated && e.error_len().is_none(),
  }
}

/// Asks `file(1)` for the MIME-less description and looks for "text".
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCommandProbe;

impl ContentProbe for FileCommandProbe {
  fn is_text(&self, path: &Path) -> Result<bool> {
    let output = Command::new("file")
      .arg("-bhnNr")
      .arg(path)
      .output()
      .with_context(|| format!("Failed to run file(1) on {}", path.display()))?;

    if !output.status.success() {
      anyhow::bail!(
        "file(1) failed on {}: {}",
        path.display(),
        String::from_utf8_lossy(&output.stderr).trim()
      );
    }

    Ok(String::from_utf8_lossy(&output.stdout).contains("text"))
  }
}

/// The `--probe` choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProbeKind {
  /// Built-in byte sniffer
  Sniff,
  /// The file(1) command
  File,
}

impl ProbeKind {
  pub fn build(self) -> Arc<dyn ContentProbe> {
    match self {
      ProbeKind::Sniff => Arc::new(SniffProbe),
      ProbeKind::File => Arc::new(FileCommandProbe),
    }
  }
}
