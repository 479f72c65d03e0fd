//! # Processor Module
//!
//! This module contains the file pipeline: it walks a target tree, routes
//! every file to exactly one outcome bucket, and rewrites or injects headers
//! along the way.
//!
//! The module is organized into several submodules:
//! - [`file_io`] - Asynchronous file reading and writing
//! - [`file_collector`] - Directory traversal and extension exclusion
//! - [`repo_index`] - Single-flight cache of repository roots and ignore lists
//!
//! The [`Processor`] struct is the main entry point. It holds the immutable
//! configuration of a run (handlers, licenses, rules) and drives one future
//! per file through a bounded `buffer_unordered` stream, while the outcome
//! buckets stay owned by the driver.

mod file_collector;
mod file_io;
mod repo_index;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::ValueEnum;
pub use file_collector::{CollectedFiles, FileCollector, extension_of};
pub use file_io::FileIO;
use futures::stream::{self, StreamExt};
pub use repo_index::{RepoIndex, RepoInfo};
use tokio::sync::Semaphore;
use tracing::{debug, error, trace, warn};

use crate::config::Rules;
use crate::diff::DiffManager;
use crate::file_filter::{CompositeFilter, FileFilter, create_default_filter};
use crate::git::{GitRepository, VersionControl};
use crate::handlers::HandlerRegistry;
use crate::ignore::append_entries;
use crate::licenses::{License, LicenseCatalog};
use crate::matcher::HeaderMatcher;
use crate::probe::{ContentProbe, SniffProbe};
use crate::report::{Outcome, RunResults};
use crate::rewriter::{HeaderRewriter, Rewrite, extract_year};
use crate::source_file::SourceFile;
use crate::verbose_log;

/// Which kinds of change a run may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Action {
  /// Only rewrite existing headers
  Modify,
  /// Only add headers to files without one
  Inject,
  /// Both
  #[default]
  All,
}

impl Action {
  pub const fn permits_modify(self) -> bool {
    matches!(self, Action::Modify | Action::All)
  }

  pub const fn permits_inject(self) -> bool {
    matches!(self, Action::Inject | Action::All)
  }
}

/// Configuration for creating a Processor instance.
pub struct ProcessorConfig {
  pub rules: Rules,
  pub registry: HandlerRegistry,
  pub catalog: LicenseCatalog,
  /// Name prefix selecting the target licenses.
  pub target_license: String,

  // Behavior flags
  pub action: Action,
  pub dry_run: bool,

  // Collaborators
  pub probe: Arc<dyn ContentProbe>,
  pub vcs: Arc<dyn VersionControl>,

  // Optional components
  pub exclude_globs: Vec<String>,
  pub diff_manager: Option<DiffManager>,
}

impl ProcessorConfig {
  /// Creates a new ProcessorConfig with required fields and sensible defaults.
  ///
  /// Use struct update syntax to override specific fields:
  /// ```ignore
  /// ProcessorConfig {
  ///     action: Action::Inject,
  ///     ..ProcessorConfig::new(rules, registry, catalog, "bsl")
  /// }
  /// ```
  pub fn new(rules: Rules, registry: HandlerRegistry, catalog: LicenseCatalog, target_license: impl Into<String>) -> Self {
    Self {
      rules,
      registry,
      catalog,
      target_license: target_license.into(),
      action: Action::All,
      dry_run: false,
      probe: Arc::new(SniffProbe),
      vcs: Arc::new(GitRepository),
      exclude_globs: vec![],
      diff_manager: None,
    }
  }
}

/// Termination predicate of the rewrite fold: a match is only rewritten when
/// its span differs from the previous one.
pub fn is_new_span(previous: Option<(usize, usize)>, span: (usize, usize)) -> bool {
  previous != Some(span)
}

/// Accumulator threaded through the rewrite fold.
struct RewriteState {
  file: SourceFile,
  /// First line the next search may start at.
  next_line: usize,
  last_span: Option<(usize, usize)>,
  rewrites: usize,
}

impl RewriteState {
  const fn new(file: SourceFile) -> Self {
    Self {
      file,
      next_line: 0,
      last_span: None,
      rewrites: 0,
    }
  }

  fn apply(self, span: (usize, usize), rewrite: Rewrite, registry: &HandlerRegistry) -> Self {
    Self {
      file: self.file.with_text(rewrite.text, registry),
      next_line: rewrite.header_end + 1,
      last_span: Some(span),
      rewrites: self.rewrites + 1,
    }
  }
}

/// How the rewrite fold ended.
enum Fold {
  /// The file was routed to a bucket while folding.
  Settled(Outcome),
  Finished(RewriteState),
}

/// Processor for normalizing license headers.
///
/// The `Processor` is responsible for:
/// - Walking the target tree and excluding files by extension
/// - Applying name, glob, repository-ignore and text-probe filters
/// - Rewriting every legacy header found in a file
/// - Injecting a new header into handled files that have none
/// - Recording oversize files in their repository's ignore list
pub struct Processor {
  rules: Rules,
  registry: HandlerRegistry,
  source_licenses: Vec<License>,
  matcher: HeaderMatcher,
  rewriter: HeaderRewriter,
  collector: FileCollector,
  action: Action,
  dry_run: bool,
  probe: Arc<dyn ContentProbe>,
  vcs: Arc<dyn VersionControl>,
  exclude_globs: Vec<String>,
  diff_manager: Option<DiffManager>,
  /// Bounds concurrent external calls: git, the probe and file I/O.
  limiter: Arc<Semaphore>,
}

impl Processor {
  /// Creates a new processor with the specified configuration.
  ///
  /// # Errors
  ///
  /// Returns an error if the catalog has no license for the target prefix.
  pub fn new(config: ProcessorConfig) -> Result<Self> {
    let targets = config
      .catalog
      .targets(&config.target_license, config.rules.line_width)?;
    let source_licenses = config.catalog.sources().to_vec();

    let matcher = HeaderMatcher::new(config.rules.legacy.clone(), source_licenses.clone());
    let rewriter = HeaderRewriter::new(config.rules.copyright.clone(), targets);

    let mut excluded_extensions = config.rules.excluded_extensions.clone();
    excluded_extensions.extend(config.registry.excluded_extensions().iter().cloned());
    let collector = FileCollector::new(excluded_extensions);

    let limiter = Arc::new(Semaphore::new(2 * config.rules.queue_depth));

    Ok(Self {
      rules: config.rules,
      registry: config.registry,
      source_licenses,
      matcher,
      rewriter,
      collector,
      action: config.action,
      dry_run: config.dry_run,
      probe: config.probe,
      vcs: config.vcs,
      exclude_globs: config.exclude_globs,
      diff_manager: config.diff_manager,
      limiter,
    })
  }

  /// Processes every file under `target` (or `target` itself when it is a
  /// file).
  ///
  /// # Returns
  ///
  /// The outcome buckets of the run. Files whose processing failed are logged
  /// and tallied separately.
  ///
  /// # Errors
  ///
  /// Returns an error if the target does not exist or an `--exclude` glob is
  /// invalid. Per-file errors never abort the run.
  pub async fn run(&self, target: &Path) -> Result<RunResults> {
    let target = tokio::fs::canonicalize(target)
      .await
      .with_context(|| format!("Failed to resolve target: {}", target.display()))?;
    let is_file = tokio::fs::metadata(&target).await?.is_file();
    let root = if is_file {
      target.parent().map_or_else(|| target.clone(), Path::to_path_buf)
    } else {
      target.clone()
    };

    let filter = create_default_filter(
      &root,
      self.rules.excluded_names.clone(),
      self.registry.excluded_names().to_vec(),
      &self.exclude_globs,
    )?;
    let repos = RepoIndex::new(
      Arc::clone(&self.vcs),
      root,
      self.rules.ignore_file.clone(),
      Arc::clone(&self.limiter),
    );

    let collected = self.collector.collect(&target);
    let mut results = RunResults::new();
    for path in collected.excluded {
      results.record(Outcome::Excluded, path);
    }

    let start_time = Instant::now();
    let candidates = collected.candidates.len();
    let filter = &filter;
    let repos = &repos;
    let mut outcomes = stream::iter(collected.candidates)
      .map(|path| async move {
        let outcome = self.process_file(repos, filter, &path).await;
        (path, outcome)
      })
      .buffer_unordered(self.rules.queue_depth);

    while let Some((path, outcome)) = outcomes.next().await {
      match outcome {
        Ok(outcome) => {
          trace!("{}: {}", path.display(), outcome);
          results.record(outcome, path);
        }
        Err(e) => {
          error!("Failed to process {}: {:#}", path.display(), e);
          results.record_failure(path);
        }
      }
    }
    drop(outcomes);

    debug!(
      "Processed {} files in {}ms",
      candidates,
      start_time.elapsed().as_millis()
    );

    if !self.dry_run {
      self.record_oversize(repos, &results).await;
    }

    Ok(results)
  }

  /// Routes one file to its bucket, rewriting it when needed.
  async fn process_file(&self, repos: &RepoIndex, filter: &CompositeFilter, path: &Path) -> Result<Outcome> {
    if self.is_ignored(repos, filter, path).await? {
      return Ok(Outcome::Ignored);
    }

    let size = {
      let _permit = self.limiter.acquire().await?;
      FileIO::file_size(path).await?
    };
    if size > self.rules.max_file_size {
      verbose_log!("Too big: {} ({} bytes)", path.display(), size);
      return Ok(Outcome::TooBig);
    }

    let text = {
      let _permit = self.limiter.acquire().await?;
      FileIO::read_text(path).await?
    };
    let file = SourceFile::new(path, text, &self.registry);

    if let Some(pattern) = self.rules.excluded.iter().find(|pattern| pattern.matches_any(file.lines())) {
      debug!("{}: excluded by pattern '{}'", path.display(), pattern.as_str());
      return Ok(Outcome::Excluded);
    }

    let original = file.text().to_string();
    match self.fold_headers(repos, file).await? {
      Fold::Settled(outcome) => Ok(outcome),
      Fold::Finished(state) if state.rewrites > 0 => {
        self
          .finish(path, &original, state.file.text(), Outcome::Modified)
          .await
      }
      Fold::Finished(state) => self.classify_unmatched(repos, state.file, &original).await,
    }
  }

  /// The ignore test: names and globs, the repository ignore list, then the
  /// text probe.
  async fn is_ignored(&self, repos: &RepoIndex, filter: &CompositeFilter, path: &Path) -> Result<bool> {
    let result = filter.should_process(path)?;
    if !result.should_process {
      trace!("{}: {}", path.display(), result.reason.unwrap_or_default());
      return Ok(true);
    }

    let repo = repos.repo_for(path).await?;
    let result = repo.ignore.should_process(path)?;
    if !result.should_process {
      trace!("{}: {}", path.display(), result.reason.unwrap_or_default());
      return Ok(true);
    }

    let _permit = self.limiter.acquire().await?;
    let probe = Arc::clone(&self.probe);
    let owned = path.to_path_buf();
    let is_text = tokio::task::spawn_blocking(move || probe.is_text(&owned)).await??;
    if !is_text {
      verbose_log!("Skipping: {} (not text)", path.display());
    }
    Ok(!is_text)
  }

  /// Rewrites every legacy header in turn, each search starting after the
  /// previously rewritten header.
  async fn fold_headers(&self, repos: &RepoIndex, file: SourceFile) -> Result<Fold> {
    let mut state = RewriteState::new(file);

    while let Some(header) = self.matcher.match_license(&state.file, state.next_line) {
      let span = header.span();
      if !is_new_span(state.last_span, span) {
        break;
      }

      if header.copyright_line.chars().count() > self.rules.max_copyright_length {
        debug!(
          "{}: copyright line {} is too long, excluding",
          state.file.path().display(),
          header.copyright_index + 1
        );
        return Ok(Fold::Settled(Outcome::Excluded));
      }

      let year = match extract_year(&header.copyright_line) {
        Some(year) => year,
        None => self.fallback_year(repos, state.file.path()).await?,
      };
      let rewrite = self.rewriter.modify(&state.file, &header, &year);
      // A header that already reads as its rewrite needs no permission.
      if !self.action.permits_modify() && rewrite.text != state.file.text() {
        return Ok(Fold::Settled(Outcome::Skipped));
      }

      trace!(
        "{}: rewriting header at line {} (license {})",
        state.file.path().display(),
        header.copyright_index + 1,
        header.license.as_deref().unwrap_or("none")
      );
      state = state.apply(span, rewrite, &self.registry);
    }

    Ok(Fold::Finished(state))
  }

  /// Decides the fate of a file in which no legacy header was found.
  async fn classify_unmatched(&self, repos: &RepoIndex, file: SourceFile, original: &str) -> Result<Outcome> {
    let Some(handler) = file.style().and_then(|style| self.registry.get(style)) else {
      return Ok(Outcome::Unhandled);
    };

    let target = self.rewriter.target_for(handler);
    if self.rules.canonical.is_match(file.text()) && file.contains_line(target.first_line()) {
      return Ok(Outcome::Ok);
    }
    if self
      .source_licenses
      .iter()
      .any(|license| file.contains_line(license.first_line()))
    {
      return Ok(Outcome::MissingCopyright);
    }
    if !self.action.permits_inject() {
      return Ok(Outcome::Skipped);
    }

    let year = self.fallback_year(repos, file.path()).await?;
    let rewrite = self.rewriter.inject(&file, handler, &year);
    self
      .finish(file.path(), original, &rewrite.text, Outcome::Injected)
      .await
  }

  /// Writes the new text once, unless it equals the original.
  async fn finish(&self, path: &Path, original: &str, updated: &str, changed: Outcome) -> Result<Outcome> {
    if updated == original {
      return Ok(Outcome::Ok);
    }

    if let Some(diff_manager) = &self.diff_manager {
      diff_manager.display_diff(path, original, updated);
    }

    if self.dry_run {
      verbose_log!("Would update: {}", path.display());
    } else {
      let _permit = self.limiter.acquire().await?;
      FileIO::write_text(path, updated).await?;
      verbose_log!("Updated: {}", path.display());
    }

    Ok(changed)
  }

  /// First-commit year of a file, or the current year.
  async fn fallback_year(&self, repos: &RepoIndex, path: &Path) -> Result<String> {
    let year = match repos.first_commit_year(path).await? {
      Some(year) => year,
      None => Local::now().year(),
    };
    Ok(year.to_string())
  }

  /// Appends oversize files to the ignore list of their repository.
  async fn record_oversize(&self, repos: &RepoIndex, results: &RunResults) {
    let mut by_root: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for path in results.files(Outcome::TooBig) {
      match repos.repo_for(path).await {
        Ok(repo) => by_root.entry(repo.root.clone()).or_default().push(path.clone()),
        Err(e) => warn!("No repository for {}: {:#}", path.display(), e),
      }
    }

    for (root, paths) in by_root {
      let file_name = self.rules.ignore_file.clone();
      let display_root = root.clone();
      let appended = tokio::task::spawn_blocking(move || append_entries(&root, &file_name, &paths)).await;
      match appended {
        Ok(Ok(added)) => debug!("Recorded {} oversize files in {}", added, display_root.display()),
        Ok(Err(e)) => warn!("Failed to update ignore list in {}: {:#}", display_root.display(), e),
        Err(e) => warn!("Failed to update ignore list in {}: {}", display_root.display(), e),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_action_permissions() {
    assert!(Action::All.permits_modify() && Action::All.permits_inject());
    assert!(Action::Modify.permits_modify() && !Action::Modify.permits_inject());
    assert!(!Action::Inject.permits_modify() && Action::Inject.permits_inject());
    assert_eq!(Action::default(), Action::All);
  }

  #[test]
  fn test_is_new_span() {
    assert!(is_new_span(None, (0, 0)));
    assert!(is_new_span(Some((3, 13)), (20, 30)));
    assert!(!is_new_span(Some((3, 13)), (3, 13)));
  }

  #[test]
  fn test_fold_rewrites_two_headers_and_stops() {
    let rules = crate::config::Config::default().compile().unwrap();
    let registry = HandlerRegistry::builtin(&[]).unwrap();
    let processor = Processor::new(ProcessorConfig::new(
      rules,
      registry,
      LicenseCatalog::builtin(),
      "bsl",
    ))
    .unwrap();

    let text = [
      "# Copyright 2012 Couchbase, Inc.",
      "import os",
      "",
      "# Copyright 2014 Couchbase, Inc.",
      "print(os.name)",
      "",
    ]
    .join("\n");
    let mut state = RewriteState::new(SourceFile::new("tool.py", text, &processor.registry));

    while let Some(header) = processor.matcher.match_license(&state.file, state.next_line) {
      let span = header.span();
      assert!(is_new_span(state.last_span, span));
      let year = extract_year(&header.copyright_line).unwrap();
      let rewrite = processor.rewriter.modify(&state.file, &header, &year);
      state = state.apply(span, rewrite, &processor.registry);
      assert!(state.rewrites <= 2);
    }

    assert_eq!(state.rewrites, 2);
    let rewritten = state.file.text();
    assert!(rewritten.starts_with("# Copyright 2012-Present Couchbase, Inc.\n#\n"));
    assert!(rewritten.contains("# Copyright 2014-Present Couchbase, Inc.\n"));
    assert!(rewritten.contains("import os\n"));
    assert!(rewritten.ends_with("print(os.name)\n"));
  }
}
