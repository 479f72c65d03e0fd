//! # Licenses Module
//!
//! Canonical license bodies. Each body is a plain text file whose name carries
//! the width it is wrapped at, e.g. `bsl_wrap_74.txt`. The same license is
//! usually provided at several widths so a header still fits the line width
//! behind a long comment prefix.
//!
//! Every body is a *source* license: its presence in a file identifies an
//! existing header. The bodies whose name starts with the configured prefix
//! are the *target* licenses that new headers are written with.

use std::path::Path;

use tracing::debug;

use crate::config::ConfigError;
use crate::source_file::split_lines;

const BUILTIN_LICENSES: [(&str, &str); 3] = [
  ("apache2_wrap_76.txt", include_str!("../licenses/apache2_wrap_76.txt")),
  ("bsl_wrap_60.txt", include_str!("../licenses/bsl_wrap_60.txt")),
  ("bsl_wrap_74.txt", include_str!("../licenses/bsl_wrap_74.txt")),
];

/// A license body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License {
  name: String,
  lines: Vec<String>,
  wrap: usize,
}

/// Reads the width out of a `_wrap_<N>` name segment.
fn parse_wrap(name: &str) -> Option<usize> {
  let (_, rest) = name.split_once("_wrap_")?;
  let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
  digits.parse().ok()
}

impl License {
  /// Parses a body. Leading and trailing blank lines are dropped.
  pub fn new(name: &str, text: &str) -> Self {
    let (_, mut lines) = split_lines(text);
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
      lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.trim().is_empty()).count();
    lines.drain(..leading);

    let wrap = parse_wrap(name).unwrap_or_else(|| {
      let widest = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
      debug!("License '{}' has no wrap width in its name, using {}", name, widest);
      widest
    });

    Self {
      name: name.to_string(),
      lines,
      wrap,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn lines(&self) -> &[String] {
    &self.lines
  }

  /// The first body line, used to recognize the license in a file.
  pub fn first_line(&self) -> &str {
    self.lines.first().map_or("", String::as_str)
  }

  pub const fn wrap(&self) -> usize {
    self.wrap
  }

}

/// All known license bodies, sorted by name.
#[derive(Debug, Clone)]
pub struct LicenseCatalog {
  licenses: Vec<License>,
}

impl LicenseCatalog {
  /// The embedded license bodies.
  pub fn builtin() -> Self {
    Self::from_sources(BUILTIN_LICENSES.iter().map(|(name, text)| ((*name).to_string(), *text)))
  }

  /// Loads every regular file in a directory as a license body.
  pub fn load_dir(dir: &Path) -> Result<Self, ConfigError> {
    let read_error = |source| ConfigError::ReadError {
      path: dir.to_path_buf(),
      source,
    };

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
      let path = entry.map_err(read_error)?.path();
      if !path.is_file() {
        continue;
      }
      let Some(name) = path.file_name().map(|name| name.to_string_lossy().into_owned()) else {
        continue;
      };
      let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
        path: path.clone(),
        source,
      })?;
      sources.push((name, text));
    }

    Ok(Self::from_sources(sources))
  }

  pub fn from_sources<I, S>(sources: I) -> Self
  where
    I: IntoIterator<Item = (String, S)>,
    S: AsRef<str>,
  {
    let mut licenses: Vec<License> = sources
      .into_iter()
      .map(|(name, text)| License::new(&name, text.as_ref()))
      .filter(|license| !license.lines.is_empty())
      .collect();
    licenses.sort_by(|a, b| a.name.cmp(&b.name));

    Self { licenses }
  }

  /// Every license body; any of them identifies an existing header.
  pub fn sources(&self) -> &[License] {
    &self.licenses
  }

  /// Selects the target licenses whose name starts with `prefix`.
  ///
  /// # Parameters
  ///
  /// * `prefix` - The configured target license prefix, e.g. `bsl`
  /// * `line_width` - The column limit a rendered header must fit in
  ///
  /// # Returns
  ///
  /// The targets sorted by descending wrap, or
  /// [`ConfigError::NoTargetLicense`] when no name carries the prefix.
  pub fn targets(&self, prefix: &str, line_width: usize) -> Result<TargetLicenses, ConfigError> {
    let mut licenses: Vec<License> = self
      .licenses
      .iter()
      .filter(|license| license.name.starts_with(prefix))
      .cloned()
      .collect();

    if prefix.is_empty() || licenses.is_empty() {
      return Err(ConfigError::NoTargetLicense(prefix.to_string()));
    }

    licenses.sort_by(|a, b| b.wrap.cmp(&a.wrap));
    debug!(
      "Target licenses for '{}': {}",
      prefix,
      licenses.iter().map(License::name).collect::<Vec<_>>().join(", ")
    );

    Ok(TargetLicenses { licenses, line_width })
  }
}

/// The licenses new headers are rendered with, widest first.
#[derive(Debug, Clone)]
pub struct TargetLicenses {
  licenses: Vec<License>,
  line_width: usize,
}

impl TargetLicenses {
  /// Picks the widest target that fits behind a prefix of `prefix_len`
  /// columns, or the narrowest one if none fits.
  pub fn select(&self, prefix_len: usize) -> &License {
    let narrowest = self.licenses.len() - 1;
    self
      .licenses
      .iter()
      .find(|license| license.wrap + prefix_len <= self.line_width)
      .unwrap_or(&self.licenses[narrowest])
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  #[test]
  fn test_parse_wrap() {
    assert_eq!(parse_wrap("bsl_wrap_74.txt"), Some(74));
    assert_eq!(parse_wrap("apache2_wrap_76"), Some(76));
    assert_eq!(parse_wrap("plain.txt"), None);
    assert_eq!(parse_wrap("odd_wrap_.txt"), None);
  }

  #[test]
  fn test_builtin_bodies_fit_their_wrap() {
    let catalog = LicenseCatalog::builtin();
    assert_eq!(catalog.sources().len(), 3);
    for license in catalog.sources() {
      for line in license.lines() {
        assert!(
          line.chars().count() <= license.wrap(),
          "{} exceeds its wrap: {line}",
          license.name()
        );
      }
    }
  }

  #[test]
  fn test_trailing_blank_lines_are_dropped() {
    let license = License::new("x_wrap_10.txt", "one\ntwo\n\n\n");
    assert_eq!(license.lines(), ["one", "two"]);
    assert_eq!(license.first_line(), "one");
  }

  #[test]
  fn test_leading_blank_lines_are_dropped() {
    let license = License::new("x_wrap_10.txt", "\n  \none\ntwo\n");
    assert_eq!(license.lines(), ["one", "two"]);
    assert_eq!(license.first_line(), "one");
  }

  #[test]
  fn test_missing_wrap_uses_widest_line() {
    let license = License::new("custom.txt", "short\na longer line\n");
    assert_eq!(license.wrap(), 13);
  }

  #[test]
  fn test_targets_sorted_by_descending_wrap() {
    let catalog = LicenseCatalog::builtin();
    let targets = catalog.targets("bsl", 80).unwrap();
    assert_eq!(targets.select(0).name(), "bsl_wrap_74.txt");
    assert_eq!(targets.select(80).name(), "bsl_wrap_60.txt");
  }

  #[test]
  fn test_select_by_prefix_length() {
    let catalog = LicenseCatalog::builtin();
    let targets = catalog.targets("bsl", 80).unwrap();
    assert_eq!(targets.select(0).wrap(), 74);
    assert_eq!(targets.select(6).wrap(), 74);
    assert_eq!(targets.select(7).wrap(), 60);
    // Nothing fits: the narrowest body is used.
    assert_eq!(targets.select(40).wrap(), 60);
  }

  #[test]
  fn test_unknown_target_prefix() {
    let catalog = LicenseCatalog::builtin();
    assert!(matches!(catalog.targets("gpl", 80), Err(ConfigError::NoTargetLicense(_))));
    assert!(matches!(catalog.targets("", 80), Err(ConfigError::NoTargetLicense(_))));
  }

  #[test]
  fn test_load_dir() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("mit_wrap_70.txt"), "Permission is hereby granted\r\n").unwrap();
    std::fs::write(temp_dir.path().join("empty_wrap_70.txt"), "\n\n").unwrap();
    std::fs::create_dir(temp_dir.path().join("nested")).unwrap();

    let catalog = LicenseCatalog::load_dir(temp_dir.path()).unwrap();
    assert_eq!(catalog.sources().len(), 1);
    let license = &catalog.sources()[0];
    assert_eq!(license.lines(), ["Permission is hereby granted"]);
  }
}
