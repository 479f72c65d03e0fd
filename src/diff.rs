//! # Diff Module
//!
//! Renders the header changes of a run as unified diffs on stderr, so a dry
//! run shows exactly what would be written.

use std::path::Path;

use owo_colors::{OwoColorize, Stream};
use similar::TextDiff;

/// Lines of unchanged context around each hunk.
const CONTEXT_LINES: usize = 3;

/// Renders unified diffs for rewritten files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffManager {
  /// Whether diffs are printed at all.
  pub show_diff: bool,
}

impl DiffManager {
  pub const fn new(show_diff: bool) -> Self {
    Self { show_diff }
  }

  /// Builds the unified diff text between two versions of a file.
  ///
  /// # Parameters
  ///
  /// * `path` - Path shown in the `---`/`+++` header lines
  /// * `original` - Content before the rewrite
  /// * `new` - Content after the rewrite
  pub fn render(path: &Path, original: &str, new: &str) -> String {
    let name = path.display().to_string();
    TextDiff::from_lines(original, new)
      .unified_diff()
      .context_radius(CONTEXT_LINES)
      .header(&name, &name)
      .to_string()
  }

  /// Prints the diff to stderr, colored by change kind, when enabled.
  pub fn display_diff(&self, path: &Path, original: &str, new: &str) {
    if !self.show_diff || original == new {
      return;
    }

    // The first two lines are the `---`/`+++` file header.
    for (index, line) in Self::render(path, original, new).lines().enumerate() {
      if index < 2 {
        eprintln!("{}", line.if_supports_color(Stream::Stderr, |s| s.bold()));
      } else if line.starts_with("@@") {
        eprintln!("{}", line.if_supports_color(Stream::Stderr, |s| s.cyan()));
      } else if line.starts_with('-') {
        eprintln!("{}", line.if_supports_color(Stream::Stderr, |s| s.red()));
      } else if line.starts_with('+') {
        eprintln!("{}", line.if_supports_color(Stream::Stderr, |s| s.green()));
      } else {
        eprintln!("{line}");
      }
    }
  }
}
