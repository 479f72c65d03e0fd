//! # Patterns Module
//!
//! Line-oriented regular expressions with an optional negative guard.
//!
//! The `regex` crate has no look-around, so a pattern such as
//! "a copyright line that does not mention Couchbase" is written as a
//! [`GuardedPattern`]: a hit of `pattern` is rejected whenever the remainder of
//! the line, starting at the hit, matches `unless`. A rejected hit does not end
//! the search: matching resumes at the next character, which reproduces a
//! negative look-ahead placed at the start of the pattern.

use regex::{Match, Regex};
use serde::Deserialize;

/// Serialized form of a guarded pattern, as written in the config file.
///
/// ```toml
/// [[excluded-patterns]]
/// pattern = '[Cc]opyright.*[0-9]{4}.*$'
/// unless = '[Cc]ouchbase|North[Ss]cale'
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PatternConfig {
  /// The regex a line must contain.
  pub pattern: String,

  /// Rejects a hit when the rest of the line from the hit onward matches.
  #[serde(default)]
  pub unless: Option<String>,
}

impl PatternConfig {
  /// A plain pattern without a guard.
  pub fn new(pattern: &str) -> Self {
    Self {
      pattern: pattern.to_string(),
      unless: None,
    }
  }

  /// A pattern whose hits are rejected when `unless` matches the remainder.
  pub fn guarded(pattern: &str, unless: &str) -> Self {
    Self {
      pattern: pattern.to_string(),
      unless: Some(unless.to_string()),
    }
  }
}

/// A compiled [`PatternConfig`].
#[derive(Debug, Clone)]
pub struct GuardedPattern {
  pattern: Regex,
  unless: Option<Regex>,
}

impl GuardedPattern {
  /// Compiles a pattern and its optional guard.
  pub fn new(pattern: &str, unless: Option<&str>) -> Result<Self, regex::Error> {
    Ok(Self {
      pattern: Regex::new(pattern)?,
      unless: unless.map(Regex::new).transpose()?,
    })
  }

  pub fn compile(config: &PatternConfig) -> Result<Self, regex::Error> {
    Self::new(&config.pattern, config.unless.as_deref())
  }

  /// Source text of the main pattern.
  pub fn as_str(&self) -> &str {
    self.pattern.as_str()
  }

  /// Finds the leftmost accepted hit in a single line.
  ///
  /// # Parameters
  ///
  /// * `line` - One line of text, without its line break
  ///
  /// # Returns
  ///
  /// The first hit whose remainder is not rejected by the guard, or `None`.
  pub fn find<'h>(&self, line: &'h str) -> Option<Match<'h>> {
    let mut start = 0;
    while start <= line.len() {
      let hit = self.pattern.find_at(line, start)?;
      match &self.unless {
        Some(guard) if guard.is_match(&line[hit.start()..]) => {
          start = hit.start() + line[hit.start()..].chars().next().map_or(1, char::len_utf8);
        }
        _ => return Some(hit),
      }
    }
    None
  }

  pub fn is_match(&self, line: &str) -> bool {
    self.find(line).is_some()
  }

  /// Returns true if any of the given lines contains an accepted hit.
  pub fn matches_any<S: AsRef<str>>(&self, lines: &[S]) -> bool {
    lines.iter().any(|line| self.is_match(line.as_ref()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_plain_pattern_finds_leftmost_hit() {
    let pattern = GuardedPattern::new("Couchbase CONFIDENTIAL", None).unwrap();
    let hit = pattern.find("// Couchbase CONFIDENTIAL").unwrap();
    assert_eq!(hit.start(), 3);
    assert!(!pattern.is_match("// Couchbase"));
  }

  #[test]
  fn test_guard_rejects_hit() {
    let pattern = GuardedPattern::new("[Cc]opyright.*[0-9]{4}.*$", Some("[Cc]ouchbase|North[Ss]cale")).unwrap();
    assert!(pattern.is_match(" * Copyright 2019 Example Corp."));
    assert!(!pattern.is_match(" * Copyright 2019 Couchbase, Inc."));
    assert!(!pattern.is_match(" * copyright 2011 NorthScale"));
  }

  #[test]
  fn test_guard_only_sees_remainder() {
    // The guard is anchored at the hit, so text before the hit is not inspected.
    let pattern = GuardedPattern::new("[Cc]opyright.*[0-9]{4}", Some("Couchbase")).unwrap();
    assert!(pattern.is_match("Couchbase fork: Copyright 2015 Example"));
  }

  #[test]
  fn test_rejected_hit_retries_later_start() {
    // First "copyright" is followed by Couchbase, the second one is not.
    let pattern = GuardedPattern::new("copyright [0-9]{4}", Some("^copyright [0-9]{4} Couchbase")).unwrap();
    let line = "copyright 2001 Couchbase; copyright 2002 Other";
    let hit = pattern.find(line).unwrap();
    assert_eq!(hit.as_str(), "copyright 2002");
  }

  #[test]
  fn test_guard_with_multibyte_characters() {
    let pattern = GuardedPattern::new("é", Some("^é$")).unwrap();
    assert!(pattern.is_match("éé"));
    assert!(!pattern.is_match("é"));
  }

  #[test]
  fn test_matches_any() {
    let pattern = GuardedPattern::compile(&PatternConfig::new("License: MIT")).unwrap();
    let lines = vec!["# header".to_string(), "# License: MIT".to_string()];
    assert!(pattern.matches_any(&lines));
    assert!(!pattern.matches_any(&["nothing here"]));
  }

  #[test]
  fn test_invalid_guard_is_an_error() {
    assert!(GuardedPattern::new("ok", Some("(")).is_err());
  }
}
