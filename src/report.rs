//! # Report Module
//!
//! Per-run outcome tallies and the optional JSON report.
//!
//! Every processed file lands in exactly one [`Outcome`] bucket. Files whose
//! processing failed are tracked separately and never counted in a bucket.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Where a file ended up. The declaration order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Outcome {
  /// Larger than the size limit.
  #[serde(rename = "toobig")]
  TooBig,
  /// A change was needed but the action did not allow it.
  #[serde(rename = "skipped")]
  Skipped,
  /// No handler recognizes the file.
  #[serde(rename = "unhandled")]
  Unhandled,
  /// Third-party or foreign header; never touched.
  #[serde(rename = "excluded")]
  Excluded,
  /// Matched an ignore rule or is not text.
  #[serde(rename = "ignored")]
  Ignored,
  #[serde(rename = "modified")]
  Modified,
  #[serde(rename = "injected")]
  Injected,
  /// Carries a license body but no copyright line.
  #[serde(rename = "missingCopyright")]
  MissingCopyright,
  #[serde(rename = "ok")]
  Ok,
}

impl Outcome {
  pub const ALL: [Outcome; 9] = [
    Outcome::TooBig,
    Outcome::Skipped,
    Outcome::Unhandled,
    Outcome::Excluded,
    Outcome::Ignored,
    Outcome::Modified,
    Outcome::Injected,
    Outcome::MissingCopyright,
    Outcome::Ok,
  ];

  /// Short bucket name, as used in the JSON report.
  pub const fn key(self) -> &'static str {
    match self {
      Outcome::TooBig => "toobig",
      Outcome::Skipped => "skipped",
      Outcome::Unhandled => "unhandled",
      Outcome::Excluded => "excluded",
      Outcome::Ignored => "ignored",
      Outcome::Modified => "modified",
      Outcome::Injected => "injected",
      Outcome::MissingCopyright => "missingCopyright",
      Outcome::Ok => "ok",
    }
  }

  /// Human-readable heading for the terminal report.
  pub const fn label(self) -> &'static str {
    match self {
      Outcome::TooBig => "Too big",
      Outcome::Skipped => "Skipped",
      Outcome::Unhandled => "Unhandled",
      Outcome::Excluded => "Excluded",
      Outcome::Ignored => "Ignored",
      Outcome::Modified => "Existing header modified",
      Outcome::Injected => "New header injected",
      Outcome::MissingCopyright => "Licensed with no copyright header",
      Outcome::Ok => "Ok",
    }
  }
}

impl std::fmt::Display for Outcome {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.key())
  }
}

/// Outcome buckets of one run. Owned by the driver task.
#[derive(Debug, Default, Clone)]
pub struct RunResults {
  buckets: BTreeMap<Outcome, Vec<PathBuf>>,
  failed: Vec<PathBuf>,
}

impl RunResults {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&mut self, outcome: Outcome, path: PathBuf) {
    self.buckets.entry(outcome).or_default().push(path);
  }

  pub fn record_failure(&mut self, path: PathBuf) {
    self.failed.push(path);
  }

  /// Files in a bucket, in completion order.
  pub fn files(&self, outcome: Outcome) -> &[PathBuf] {
    self.buckets.get(&outcome).map(Vec::as_slice).unwrap_or_default()
  }

  /// Files in a bucket, sorted.
  pub fn sorted(&self, outcome: Outcome) -> Vec<PathBuf> {
    let mut files = self.files(outcome).to_vec();
    files.sort();
    files
  }

  pub fn count(&self, outcome: Outcome) -> usize {
    self.files(outcome).len()
  }

  /// Files placed in a bucket.
  pub fn total(&self) -> usize {
    self.buckets.values().map(Vec::len).sum()
  }

  pub fn failed(&self) -> &[PathBuf] {
    &self.failed
  }

  /// Returns the bucket of a file, if it has one.
  pub fn outcome_of(&self, path: &Path) -> Option<Outcome> {
    Outcome::ALL
      .into_iter()
      .find(|outcome| self.files(*outcome).iter().any(|file| file == path))
  }
}

/// JSON document written by `--report-json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
  pub target: String,
  pub generated: String,
  pub processing_time_secs: f64,
  pub totals: BTreeMap<String, usize>,
  pub files: BTreeMap<String, Vec<String>>,
  pub failed: Vec<String>,
}

fn relative_display(path: &Path, root: &Path) -> String {
  pathdiff::diff_paths(path, root)
    .unwrap_or_else(|| path.to_path_buf())
    .to_string_lossy()
    .into_owned()
}

impl JsonReport {
  /// Builds the report; paths are relative to `target` and sorted.
  pub fn new(results: &RunResults, target: &Path, processing_time: Duration) -> Self {
    let mut totals = BTreeMap::new();
    let mut files = BTreeMap::new();
    for outcome in Outcome::ALL {
      totals.insert(outcome.key().to_string(), results.count(outcome));
      files.insert(
        outcome.key().to_string(),
        results
          .sorted(outcome)
          .iter()
          .map(|path| relative_display(path, target))
          .collect(),
      );
    }

    let mut failed: Vec<String> = results.failed().iter().map(|path| relative_display(path, target)).collect();
    failed.sort();

    Self {
      target: target.to_string_lossy().into_owned(),
      generated: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
      processing_time_secs: processing_time.as_secs_f64(),
      totals,
      files,
      failed,
    }
  }

  /// Writes the report as pretty-printed JSON.
  pub fn write(&self, output_path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(self).with_context(|| "Failed to serialize report")?;
    std::fs::write(output_path, content)
      .with_context(|| format!("Failed to write report to {}", output_path.display()))
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  #[test]
  fn test_outcome_order_and_keys() {
    let keys: Vec<&str> = Outcome::ALL.iter().map(|outcome| outcome.key()).collect();
    assert_eq!(
      keys,
      vec![
        "toobig",
        "skipped",
        "unhandled",
        "excluded",
        "ignored",
        "modified",
        "injected",
        "missingCopyright",
        "ok"
      ]
    );
    assert!(Outcome::TooBig < Outcome::Ok);
    assert_eq!(serde_json::to_string(&Outcome::MissingCopyright).unwrap(), "\"missingCopyright\"");
  }

  #[test]
  fn test_record_and_count() {
    let mut results = RunResults::new();
    results.record(Outcome::Injected, PathBuf::from("/t/b.c"));
    results.record(Outcome::Injected, PathBuf::from("/t/a.c"));
    results.record(Outcome::Ok, PathBuf::from("/t/c.c"));
    results.record_failure(PathBuf::from("/t/d.c"));

    assert_eq!(results.count(Outcome::Injected), 2);
    assert_eq!(results.count(Outcome::Modified), 0);
    assert_eq!(results.total(), 3);
    assert_eq!(results.failed().len(), 1);
    assert_eq!(results.sorted(Outcome::Injected), vec![PathBuf::from("/t/a.c"), PathBuf::from("/t/b.c")]);
    assert_eq!(results.outcome_of(Path::new("/t/c.c")), Some(Outcome::Ok));
    assert_eq!(results.outcome_of(Path::new("/t/d.c")), None);
  }

  #[test]
  fn test_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path();
    let mut results = RunResults::new();
    results.record(Outcome::Modified, target.join("src/z.c"));
    results.record(Outcome::Modified, target.join("src/a.c"));
    results.record(Outcome::TooBig, target.join("huge.sql"));

    let report = JsonReport::new(&results, target, Duration::from_millis(1500));
    let output = target.join("report.json");
    report.write(&output).unwrap();

    let parsed: JsonReport = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(parsed.totals["modified"], 2);
    assert_eq!(parsed.totals["ok"], 0);
    assert_eq!(parsed.files["modified"], vec!["src/a.c", "src/z.c"]);
    assert_eq!(parsed.files["toobig"], vec!["huge.sql"]);
    assert!((parsed.processing_time_secs - 1.5).abs() < f64::EPSILON);
  }
}
