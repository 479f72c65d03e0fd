//! # Ignore Module
//!
//! The per-repository ignore file (`.copyrightignore` by default). Each line
//! is a regular expression matched against paths relative to the repository
//! root; a line that is not a valid regex is matched literally. Blank lines and
//! lines starting with `#` are skipped.
//!
//! Files too big to process are appended to this list at the end of a run so
//! the next run skips them without a size check.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use crate::handlers::path_text;

/// Compiled ignore patterns of one repository.
#[derive(Debug, Clone)]
pub struct RepoIgnore {
  root: PathBuf,
  patterns: Vec<Regex>,
}

impl RepoIgnore {
  /// An ignore list with no entries.
  pub const fn empty(root: PathBuf) -> Self {
    Self {
      root,
      patterns: Vec::new(),
    }
  }

  /// Parses the content of an ignore file belonging to `root`.
  pub fn parse(root: PathBuf, content: &str) -> Self {
    let anchor = format!("^{}/", regex::escape(&path_text(&root)));
    let patterns = entries(content)
      .filter_map(|entry| {
        Regex::new(&format!("{anchor}{entry}"))
          .or_else(|e| {
            warn!("Invalid ignore pattern '{}' in {}: {}", entry, root.display(), e);
            Regex::new(&format!("{anchor}{}", regex::escape(entry)))
          })
          .ok()
      })
      .collect();

    Self { root, patterns }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn len(&self) -> usize {
    self.patterns.len()
  }

  pub fn is_empty(&self) -> bool {
    self.patterns.is_empty()
  }

  /// Returns true if any entry matches the path.
  pub fn is_ignored(&self, path: &Path) -> bool {
    let path = path_text(path);
    self.patterns.iter().any(|pattern| pattern.is_match(&path))
  }
}

fn entries(content: &str) -> impl Iterator<Item = &str> {
  content
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Appends paths to a repository's ignore file.
///
/// Existing entries are kept in order and new paths are added once, relative
/// to `root`.
///
/// # Returns
///
/// The number of entries added.
pub fn append_entries(root: &Path, file_name: &str, paths: &[PathBuf]) -> Result<usize> {
  let ignore_path = root.join(file_name);
  let existing = match std::fs::read_to_string(&ignore_path) {
    Ok(content) => content,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
    Err(e) => return Err(e).with_context(|| format!("Failed to read {}", ignore_path.display())),
  };

  let mut lines: Vec<String> = existing
    .lines()
    .map(str::trim_end)
    .filter(|line| !line.is_empty())
    .map(str::to_string)
    .collect();
  let mut seen: HashSet<String> = lines.iter().cloned().collect();

  let mut added = 0;
  for path in paths {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.clone());
    let entry = path_text(&relative);
    if seen.insert(entry.clone()) {
      lines.push(entry);
      added += 1;
    }
  }

  if added > 0 {
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(&ignore_path, content).with_context(|| format!("Failed to write {}", ignore_path.display()))?;
    debug!("Added {} entries to {}", added, ignore_path.display());
  }

  Ok(added)
}
