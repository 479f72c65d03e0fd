//! # Header Matcher Module
//!
//! Locates an existing copyright header in a [`SourceFile`].
//!
//! A header is found in two steps. First a legacy copyright marker is searched
//! line by line; the text before the marker is the comment prefix. Then each
//! known license body is aligned against the lines that follow: a body matches
//! when every one of its lines is the tail of consecutive file lines, whatever
//! comment decoration precedes them.

use std::sync::LazyLock;

use regex::Regex;

use crate::licenses::License;
use crate::patterns::GuardedPattern;
use crate::source_file::SourceFile;

/// Number of lines, starting at the marker, searched for authors and the
/// license body.
pub const SCAN_WINDOW: usize = 10;

static AUTHOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[Aa]uthor\b").expect("author regex must compile"));

/// A legacy copyright marker and, if found, the license body aligned with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyHeader {
  /// Index of the marker line.
  pub index: usize,
  /// Text before the marker.
  pub prefix: String,
  /// Name of the aligned license body, if any.
  pub license: Option<String>,
  /// Author lines in the scan window, with their indices.
  pub authors: Vec<(usize, String)>,
  /// First and last line of the body; both are the marker line when no body
  /// was aligned.
  pub first_line: usize,
  pub last_line: usize,
  /// Decoration before each body line.
  pub line_prefixes: Vec<String>,
}

/// A header located in a file, split into the lines around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
  pub pre: Vec<String>,
  pub post: Vec<String>,
  /// Text before the copyright marker.
  pub copyright_prefix: String,
  /// Decoration before each body line.
  pub prefix: String,
  pub copyright_line: String,
  pub copyright_index: usize,
  pub start_line: usize,
  pub end_line: usize,
  pub authors: Vec<String>,
  pub license: Option<String>,
}

impl HeaderMatch {
  /// The `(start, end)` body lines of this match.
  pub const fn span(&self) -> (usize, usize) {
    (self.start_line, self.end_line)
  }
}

/// Aligns a license body with the file, looking for its first line within
/// `window`.
///
/// # Returns
///
/// The first and last body line and the prefix in front of each body line, or
/// `None` when any body line fails to match.
fn align_license(lines: &[String], window: std::ops::Range<usize>, license: &License) -> Option<(usize, usize, Vec<String>)> {
  let first = license.first_line().trim();
  if first.is_empty() {
    return None;
  }

  let start = window.clone().find(|&n| lines[n].trim_end().ends_with(first))?;

  let mut prefixes = Vec::with_capacity(license.lines().len());
  for (offset, body_line) in license.lines().iter().enumerate() {
    let line = lines.get(start + offset)?.trim_end();
    let expected = body_line.trim();
    if !line.ends_with(expected) {
      return None;
    }
    prefixes.push(line[..line.len() - expected.len()].to_string());
  }

  Some((start, start + license.lines().len() - 1, prefixes))
}

/// Finds legacy headers using the configured markers and known licenses.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
  markers: Vec<GuardedPattern>,
  licenses: Vec<License>,
}

impl HeaderMatcher {
  pub const fn new(markers: Vec<GuardedPattern>, licenses: Vec<License>) -> Self {
    Self { markers, licenses }
  }

  /// Searches for the first legacy marker at or after `start_line`.
  ///
  /// # Parameters
  ///
  /// * `file` - The file to search
  /// * `start_line` - The first line to consider
  ///
  /// # Returns
  ///
  /// The marker position and prefix with the first license body that aligns
  /// within [`SCAN_WINDOW`] lines of it, or `None` if no line carries a
  /// marker.
  pub fn find_legacy_header(&self, file: &SourceFile, start_line: usize) -> Option<LegacyHeader> {
    let lines = file.lines();

    let (index, offset) = lines.iter().enumerate().skip(start_line).find_map(|(index, line)| {
      self
        .markers
        .iter()
        .find_map(|marker| marker.find(line))
        .map(|hit| (index, hit.start()))
    })?;

    let window = index..(index + SCAN_WINDOW).min(lines.len());
    let authors = window
      .clone()
      .filter(|&n| AUTHOR_RE.is_match(&lines[n]))
      .map(|n| (n, lines[n].clone()))
      .collect();

    let prefix = lines[index][..offset].to_string();
    let mut header = LegacyHeader {
      index,
      prefix,
      license: None,
      authors,
      first_line: index,
      last_line: index,
      line_prefixes: Vec::new(),
    };

    for license in &self.licenses {
      if let Some((first_line, last_line, line_prefixes)) = align_license(lines, window.clone(), license) {
        header.license = Some(license.name().to_string());
        header.first_line = first_line;
        header.last_line = last_line;
        header.line_prefixes = line_prefixes;
        break;
      }
    }

    Some(header)
  }

  /// Locates a header at or after `start_line` and splits the file around it.
  pub fn match_license(&self, file: &SourceFile, start_line: usize) -> Option<HeaderMatch> {
    let header = self.find_legacy_header(file, start_line)?;
    let lines = file.lines();

    let prefix = header
      .line_prefixes
      .last()
      .cloned()
      .unwrap_or_else(|| header.prefix.clone());

    // Authors at or past the body start end up in `post` and must not be
    // repeated.
    let authors = header
      .authors
      .iter()
      .filter(|(n, _)| *n > header.index && *n < header.first_line)
      .map(|(_, line)| line.clone())
      .collect();

    Some(HeaderMatch {
      pre: lines[..header.index].to_vec(),
      post: lines[header.last_line + 1..].to_vec(),
      copyright_prefix: header.prefix,
      prefix,
      copyright_line: lines[header.index].clone(),
      copyright_index: header.index,
      start_line: header.first_line,
      end_line: header.last_line,
      authors,
      license: header.license,
    })
  }
}
