//! # Output Module
//!
//! This module centralizes all user-facing output of the license injector.
//!
//! A run prints the bucket totals, the sorted file list of every non-empty
//! bucket, then the totals again so they are visible at the end of a long
//! listing. Every path is listed unless `--list-limit` caps the lists; `-q`
//! silences everything but errors.

use std::path::Path;

use owo_colors::{OwoColorize, Stream};

use crate::logging::is_quiet;
use crate::report::{Outcome, RunResults};

/// Width of the label column in the totals table.
const LABEL_WIDTH: usize = 34;

/// Path relative to the target directory, for display.
pub fn make_relative_path(path: &Path, root: &Path) -> String {
  pathdiff::diff_paths(path, root)
    .filter(|relative| !relative.as_os_str().is_empty())
    .unwrap_or_else(|| path.to_path_buf())
    .to_string_lossy()
    .into_owned()
}

/// The totals table, one line per bucket in report order.
pub fn format_totals(results: &RunResults) -> Vec<String> {
  let mut lines: Vec<String> = Outcome::ALL
    .iter()
    .map(|outcome| {
      format!(
        "{:<width$}{:>6}",
        format!("{}:", outcome.label()),
        results.count(*outcome),
        width = LABEL_WIDTH
      )
    })
    .collect();

  if !results.failed().is_empty() {
    lines.push(format!(
      "{:<width$}{:>6}",
      "Failed:",
      results.failed().len(),
      width = LABEL_WIDTH
    ));
  }

  lines
}

/// The listing of one bucket: a heading and up to `limit` sorted paths.
///
/// Empty buckets produce no lines.
pub fn format_file_list(results: &RunResults, outcome: Outcome, root: &Path, limit: Option<usize>) -> Vec<String> {
  let files = results.sorted(outcome);
  if files.is_empty() {
    return Vec::new();
  }

  let count = files.len();
  let shown = limit.unwrap_or(count).min(count);
  let mut lines = vec![format!("{} ({}):", outcome.label(), count)];
  lines.extend(
    files
      .iter()
      .take(shown)
      .map(|path| format!("    {}", make_relative_path(path, root))),
  );
  if shown < count {
    lines.push(format!("    ... and {} more", count - shown));
  }

  lines
}

/// Print the initial "Processing <target>" message.
pub fn print_start_message(target: &Path, dry_run: bool) {
  if is_quiet() {
    return;
  }

  println!("Processing {}", target.display());
  if dry_run {
    println!(
      "{}",
      "Dry run: no files will be written".if_supports_color(Stream::Stdout, |s| s.yellow())
    );
  }
}

/// Print the totals table.
pub fn print_totals(results: &RunResults) {
  if is_quiet() {
    return;
  }

  for line in format_totals(results) {
    println!("{}", line);
  }
}

/// Print the file lists of every non-empty bucket, each capped at `limit`
/// paths when given.
pub fn print_file_lists(results: &RunResults, root: &Path, limit: Option<usize>) {
  if is_quiet() {
    return;
  }

  for outcome in Outcome::ALL {
    let lines = format_file_list(results, outcome, root, limit);
    let Some((heading, paths)) = lines.split_first() else {
      continue;
    };
    println!("{}", heading.if_supports_color(Stream::Stdout, |s| s.cyan()));
    for path in paths {
      println!("{}", path);
    }
    println!();
  }
}

/// Print the files whose processing failed.
///
/// Shown even in quiet mode, on stderr.
pub fn print_failures(results: &RunResults, root: &Path) {
  if results.failed().is_empty() {
    return;
  }

  let mut failed = results.failed().to_vec();
  failed.sort();
  eprintln!(
    "{} {} {} could not be processed:",
    "\u{2717}".if_supports_color(Stream::Stderr, |s| s.red()),
    failed.len(),
    if failed.len() == 1 { "file" } else { "files" }
  );
  for path in &failed {
    eprintln!("  {}", make_relative_path(path, root));
  }
}

/// Print the complete run summary: totals, lists, totals.
pub fn print_report(results: &RunResults, root: &Path, limit: Option<usize>) {
  if is_quiet() {
    print_failures(results, root);
    return;
  }

  println!();
  print_totals(results);
  println!();
  print_file_lists(results, root, limit);
  print_totals(results);
  print_failures(results, root);
}
