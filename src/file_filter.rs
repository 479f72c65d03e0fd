//! # File Filter Module
//!
//! This module contains components for filtering files based on various
//! criteria: excluded file names, `--exclude` globs and the per-repository
//! ignore list. A file rejected by any filter is reported as ignored.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;

use crate::handlers::path_text;
use crate::ignore::RepoIgnore;
use crate::verbose_log;

/// Result of a file filtering operation.
#[derive(Debug)]
pub struct FilterResult {
  /// Whether the file should be processed
  pub should_process: bool,
  /// Reason why the file should not be processed (if any)
  pub reason: Option<String>,
}

impl FilterResult {
  /// Creates a new FilterResult indicating the file should be processed.
  pub const fn process() -> Self {
    Self {
      should_process: true,
      reason: None,
    }
  }

  /// Creates a new FilterResult indicating the file should be skipped.
  pub fn skip(reason: impl Into<String>) -> Self {
    Self {
      should_process: false,
      reason: Some(reason.into()),
    }
  }
}

/// Trait for components that filter files based on certain criteria.
pub trait FileFilter: Send + Sync {
  /// Determines whether a file should be processed.
  ///
  /// # Parameters
  ///
  /// * `path` - The path to the file to check
  ///
  /// # Returns
  ///
  /// A `FilterResult` indicating whether the file should be processed and why
  /// not if applicable.
  fn should_process(&self, path: &Path) -> Result<FilterResult>;
}

/// Rejects files by name: literal path suffixes from the config, and the name
/// patterns of disabled handlers.
pub struct NameFilter {
  suffixes: Vec<String>,
  patterns: Vec<Regex>,
}

impl NameFilter {
  pub const fn new(suffixes: Vec<String>, patterns: Vec<Regex>) -> Self {
    Self { suffixes, patterns }
  }
}

impl FileFilter for NameFilter {
  fn should_process(&self, path: &Path) -> Result<FilterResult> {
    let text = path_text(path);
    if let Some(suffix) = self.suffixes.iter().find(|suffix| text.ends_with(suffix.as_str())) {
      verbose_log!("Skipping: {} (excluded name {})", path.display(), suffix);
      return Ok(FilterResult::skip(format!("Excluded name '{suffix}'")));
    }
    if self.patterns.iter().any(|pattern| pattern.is_match(&text)) {
      verbose_log!("Skipping: {} (disabled handler)", path.display());
      return Ok(FilterResult::skip("Belongs to a disabled handler"));
    }
    Ok(FilterResult::process())
  }
}

/// Rejects files matching `--exclude` globs. Each glob is tried against the
/// path relative to the target root and against the full path.
pub struct GlobFilter {
  root: PathBuf,
  patterns: Vec<glob::Pattern>,
}

impl GlobFilter {
  pub fn new(root: &Path, patterns: &[String]) -> Result<Self> {
    let patterns = patterns
      .iter()
      .map(|pattern| glob::Pattern::new(pattern).with_context(|| format!("Invalid exclude pattern: {}", pattern)))
      .collect::<Result<Vec<_>>>()?;
    Ok(Self {
      root: root.to_path_buf(),
      patterns,
    })
  }
}

impl FileFilter for GlobFilter {
  fn should_process(&self, path: &Path) -> Result<FilterResult> {
    let relative = path.strip_prefix(&self.root).unwrap_or(path);
    if let Some(pattern) = self
      .patterns
      .iter()
      .find(|pattern| pattern.matches_path(relative) || pattern.matches_path(path))
    {
      verbose_log!("Skipping: {} (matches {})", path.display(), pattern);
      return Ok(FilterResult::skip(format!("Matches exclude pattern '{pattern}'")));
    }
    Ok(FilterResult::process())
  }
}

impl FileFilter for RepoIgnore {
  fn should_process(&self, path: &Path) -> Result<FilterResult> {
    if self.is_ignored(path) {
      verbose_log!("Skipping: {} (ignore list of {})", path.display(), self.root().display());
      Ok(FilterResult::skip("Matches repository ignore list"))
    } else {
      Ok(FilterResult::process())
    }
  }
}

/// Filter that combines multiple filters.
pub struct CompositeFilter {
  filters: Vec<Box<dyn FileFilter>>,
}

impl CompositeFilter {
  /// Creates a new CompositeFilter with the given filters.
  pub fn new(filters: Vec<Box<dyn FileFilter>>) -> Self {
    Self { filters }
  }

  /// Adds a filter to this CompositeFilter.
  pub fn add_filter(&mut self, filter: Box<dyn FileFilter>) {
    self.filters.push(filter);
  }
}

impl FileFilter for CompositeFilter {
  fn should_process(&self, path: &Path) -> Result<FilterResult> {
    for filter in &self.filters {
      let result = filter.should_process(path)?;
      if !result.should_process {
        return Ok(result);
      }
    }
    Ok(FilterResult::process())
  }
}

/// Builds the static part of the ignore test: names and `--exclude` globs.
///
/// # Parameters
///
/// * `root` - The target directory, for relative glob matching
/// * `excluded_names` - Literal path suffixes
/// * `name_patterns` - Name patterns of disabled handlers
/// * `exclude_globs` - Globs from the command line
pub fn create_default_filter(
  root: &Path,
  excluded_names: Vec<String>,
  name_patterns: Vec<Regex>,
  exclude_globs: &[String],
) -> Result<CompositeFilter> {
  let mut filter = CompositeFilter::new(vec![Box::new(NameFilter::new(excluded_names, name_patterns))]);
  if !exclude_globs.is_empty() {
    filter.add_filter(Box::new(GlobFilter::new(root, exclude_globs)?));
  }
  Ok(filter)
}
