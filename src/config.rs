//! # Configuration Module
//!
//! Tunables for the header normalizer: the copyright template, the legacy and
//! hard-excluded line patterns, the exclusion lists and the size limits.
//!
//! Configuration can be specified in a `.license-injector.toml` file or via
//! the `LICENSE_INJECTOR_CONFIG` environment variable. Every key is optional;
//! missing keys keep the built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::patterns::{GuardedPattern, PatternConfig};
use crate::verbose_log;

/// The default config file name.
pub const DEFAULT_CONFIG_FILENAME: &str = ".license-injector.toml";

/// Environment variable for specifying config file path.
pub const CONFIG_ENV_VAR: &str = "LICENSE_INJECTOR_CONFIG";

/// Placeholder replaced by the copyright year in the template.
pub const YEAR_PLACEHOLDER: &str = "YYYY";

/// Main configuration struct for the license injector.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
  /// Copyright line template. `YYYY` is replaced by the year.
  pub copyright: String,

  /// Regex recognizing an already canonical copyright line.
  pub copyright_pattern: String,

  /// Ordered markers of a legacy copyright line. The first pattern that hits
  /// a line wins.
  pub legacy_patterns: Vec<PatternConfig>,

  /// Lines that mark a file as third-party; such files are never touched.
  pub excluded_patterns: Vec<PatternConfig>,

  /// Path suffixes that are never processed.
  pub excluded_names: Vec<String>,

  /// Extensions (without the leading dot) that are never processed.
  pub excluded_extensions: Vec<String>,

  /// Files above this many bytes are reported as too big.
  pub max_file_size: u64,

  /// Copyright lines longer than this are assumed to be foreign.
  pub max_copyright_length: usize,

  /// Column limit used to pick the license wrap width.
  pub line_width: usize,

  /// Number of files processed concurrently.
  pub queue_depth: usize,

  /// Name of the per-repository ignore file.
  pub ignore_file: String,
}

impl Default for Config {
  fn default() -> Self {
    const COPYRIGHT_HOLDERS: &str = "[Cc]ouchbase|North[Ss]cale";

    Self {
      copyright: "copyright YYYY-Present Couchbase, Inc.".to_string(),
      copyright_pattern: r"[Cc]opyright [0-9]{4}-Present Couchbase, Inc\.".to_string(),
      legacy_patterns: vec![
        PatternConfig::guarded(
          r"[Cc]op(y|ie)right.*(Couchbase|North[Ss]cale)[,]?( Inc)?[.]?[ ]*[0-9]*[ ]*[-]*[ ]*([Aa]ll [Rr]ights [Rr]eserved)?[.]?$",
          r"\}",
        ),
        PatternConfig::new("Couchbase CONFIDENTIAL"),
        PatternConfig::new("COUCHBASE LITE ENTERPRISE EDITION"),
        PatternConfig::new(r"\(C\)[ ]*[0-9]{4}[ ]*Jung-Sang Ahn <jungsang\.ahn@gmail\.com>"),
      ],
      excluded_patterns: vec![
        PatternConfig::guarded(r"[Cc]opyright.*[0-9]{4}.*$", COPYRIGHT_HOLDERS),
        PatternConfig::guarded(r"[Cc]opyright.* by .*$", COPYRIGHT_HOLDERS),
        PatternConfig::new("in the public domain"),
        PatternConfig::new("Licensed to the Apache Software Foundation"),
        PatternConfig::new("License: MIT"),
        PatternConfig::new(r"COUCHBASE INC\. COMMUNITY EDITION LICENSE AGREEMENT"),
        PatternConfig::new(r"This is Apache 2\.0 licensed free software"),
        PatternConfig::new("License: Creative Commons Attribution"),
        PatternConfig::new("The author hereby disclaims copyright to this source code"),
        PatternConfig::new(r"For license information please see antlr4\.js\.LICENSE\.txt"),
        PatternConfig::new("Released under the MIT license"),
      ],
      excluded_names: vec!["d3.v3.min.js".to_string()],
      excluded_extensions: ["json", "map", "adm", "big", "csv", "plan", "sqlpp"]
        .iter()
        .map(|ext| (*ext).to_string())
        .collect(),
      max_file_size: 1_000_000,
      max_copyright_length: 90,
      line_width: 80,
      queue_depth: 10,
      ignore_file: ".copyrightignore".to_string(),
    }
  }
}

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// A config, handler or license file could not be read.
  #[error("Failed to read '{path}': {source}")]
  ReadError { path: PathBuf, source: std::io::Error },

  /// The config file contains invalid TOML.
  #[error("Failed to parse config file '{path}': {source}")]
  ParseError { path: PathBuf, source: toml::de::Error },

  /// A handler definition contains invalid TOML.
  #[error("Failed to parse handler '{style}': {source}")]
  InvalidHandler { style: String, source: toml::de::Error },

  /// A configured regular expression does not compile.
  #[error("Invalid pattern '{pattern}': {source}")]
  InvalidPattern { pattern: String, source: regex::Error },

  /// The copyright template has no year placeholder.
  #[error("Copyright template '{0}' must contain the YYYY placeholder")]
  InvalidTemplate(String),

  /// A numeric setting is out of range.
  #[error("Invalid value for '{field}': {message}")]
  InvalidValue { field: &'static str, message: String },

  /// Optional handlers were requested that no definition provides.
  #[error("Optional handlers not found: {}", .0.join(", "))]
  UnknownHandler(Vec<String>),

  /// No license body carries the requested target prefix.
  #[error("No license found for target prefix '{0}'")]
  NoTargetLicense(String),
}

/// Compiles a regex, mapping the failure to [`ConfigError::InvalidPattern`].
pub fn compile_regex(pattern: &str) -> Result<Regex, ConfigError> {
  Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
    pattern: pattern.to_string(),
    source,
  })
}

fn compile_patterns(patterns: &[PatternConfig]) -> Result<Vec<GuardedPattern>, ConfigError> {
  patterns
    .iter()
    .map(|config| {
      GuardedPattern::compile(config).map_err(|source| ConfigError::InvalidPattern {
        pattern: config.pattern.clone(),
        source,
      })
    })
    .collect()
}

/// The validated, compiled form of a [`Config`].
#[derive(Debug, Clone)]
pub struct Rules {
  pub copyright: String,
  pub canonical: Regex,
  pub legacy: Vec<GuardedPattern>,
  pub excluded: Vec<GuardedPattern>,
  pub excluded_names: Vec<String>,
  pub excluded_extensions: Vec<String>,
  pub max_file_size: u64,
  pub max_copyright_length: usize,
  pub line_width: usize,
  pub queue_depth: usize,
  pub ignore_file: String,
}

impl Config {
  /// Load configuration from a file.
  ///
  /// # Arguments
  ///
  /// * `path` - Path to the configuration file
  ///
  /// # Returns
  ///
  /// The loaded configuration, or an error if the file cannot be read or
  /// parsed.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    verbose_log!("Loading config from: {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
      path: path.to_path_buf(),
      source: e,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
      path: path.to_path_buf(),
      source: e,
    })?;

    Ok(config)
  }

  /// Validates the settings and compiles every pattern.
  pub fn compile(&self) -> Result<Rules, ConfigError> {
    if !self.copyright.contains(YEAR_PLACEHOLDER) {
      return Err(ConfigError::InvalidTemplate(self.copyright.clone()));
    }
    if self.queue_depth == 0 {
      return Err(ConfigError::InvalidValue {
        field: "queue-depth",
        message: "must be at least 1".to_string(),
      });
    }
    if self.line_width == 0 {
      return Err(ConfigError::InvalidValue {
        field: "line-width",
        message: "must be at least 1".to_string(),
      });
    }
    if self.ignore_file.trim().is_empty() || self.ignore_file.contains('/') {
      return Err(ConfigError::InvalidValue {
        field: "ignore-file",
        message: format!("'{}' is not a plain file name", self.ignore_file),
      });
    }

    Ok(Rules {
      copyright: self.copyright.clone(),
      canonical: compile_regex(&self.copyright_pattern)?,
      legacy: compile_patterns(&self.legacy_patterns)?,
      excluded: compile_patterns(&self.excluded_patterns)?,
      excluded_names: self.excluded_names.clone(),
      excluded_extensions: self
        .excluded_extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_string())
        .collect(),
      max_file_size: self.max_file_size,
      max_copyright_length: self.max_copyright_length,
      line_width: self.line_width,
      queue_depth: self.queue_depth,
      ignore_file: self.ignore_file.clone(),
    })
  }
}

/// Discover the configuration file path.
///
/// The configuration file is discovered in the following order:
/// 1. Path specified via `--config` flag (passed as `explicit_path`)
/// 2. Path specified via `LICENSE_INJECTOR_CONFIG` environment variable
/// 3. `.license-injector.toml` in the target root
///
/// # Arguments
///
/// * `explicit_path` - Optional explicit path from CLI flag
/// * `target_root` - The directory being processed
///
/// # Returns
///
/// The path to the configuration file, or `None` if no config file is found.
pub fn discover_config_path(explicit_path: Option<&Path>, target_root: &Path) -> Option<PathBuf> {
  if let Some(path) = explicit_path {
    // A missing explicit file is reported by Config::load.
    verbose_log!("Using explicit config path: {}", path.display());
    return Some(path.to_path_buf());
  }

  if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
    let path = PathBuf::from(&env_path);
    if path.exists() {
      verbose_log!("Using config from {}: {}", CONFIG_ENV_VAR, path.display());
      return Some(path);
    }
    verbose_log!("{} path does not exist: {}", CONFIG_ENV_VAR, env_path);
  }

  let target_config = target_root.join(DEFAULT_CONFIG_FILENAME);
  if target_config.exists() {
    verbose_log!("Using target config: {}", target_config.display());
    return Some(target_config);
  }

  verbose_log!("No config file found, using defaults");
  None
}

/// Load configuration from the discovered path, or return the defaults.
///
/// # Arguments
///
/// * `explicit_path` - Optional explicit path from CLI flag
/// * `target_root` - The directory being processed
/// * `no_config` - If true, skip config file discovery and use defaults
pub fn load_config(explicit_path: Option<&Path>, target_root: &Path, no_config: bool) -> Result<Config> {
  if no_config {
    verbose_log!("Config file discovery disabled (--no-config)");
    return Ok(Config::default());
  }

  match discover_config_path(explicit_path, target_root) {
    Some(path) => Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display())),
    None => Ok(Config::default()),
  }
}
