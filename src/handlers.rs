//! # Handlers Module
//!
//! A handler describes one comment style: how a header is wrapped (block or
//! inline leader), which files it applies to, and which leading lines (shebangs,
//! XML prologs) must stay above an injected header.
//!
//! Definitions are small TOML files named after their style. The builtin set
//! lives in `handlers/` and is embedded into the binary; `--handlers-dir`
//! replaces it with a directory of the same shape.
//!
//! ```toml
//! extensions = ["py", "sh"]
//! names = ["Makefile"]
//! shebangs = ['^#!.*python']
//! inline = ["#"]
//! ```

use std::path::{MAIN_SEPARATOR, Path};

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::config::{ConfigError, compile_regex};

const BUILTIN_HANDLERS: [(&str, &str); 8] = [
  ("batch", include_str!("../handlers/batch.toml")),
  ("c", include_str!("../handlers/c.toml")),
  ("erlang", include_str!("../handlers/erlang.toml")),
  ("hash", include_str!("../handlers/hash.toml")),
  ("markdown", include_str!("../handlers/markdown.toml")),
  ("slashes", include_str!("../handlers/slashes.toml")),
  ("sql", include_str!("../handlers/sql.toml")),
  ("xml", include_str!("../handlers/xml.toml")),
];

/// Block comment delimiters, each written on its own line.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BlockComment {
  pub open: String,
  pub close: String,
}

/// Serialized handler definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct HandlerDefinition {
  #[serde(default)]
  pub block: Option<BlockComment>,

  /// Inline comment leaders; the first one is used for new headers.
  #[serde(default)]
  pub inline: Option<Vec<String>>,

  /// File name regexes, matched against the last path component(s).
  #[serde(default)]
  pub names: Vec<String>,

  #[serde(default)]
  pub extensions: Vec<String>,

  /// Regexes tested against the first line of the file.
  #[serde(default)]
  pub shebangs: Vec<String>,

  /// Lines that must stay above an injected header.
  #[serde(default)]
  pub after: Vec<String>,

  #[serde(default = "enabled_by_default")]
  pub enabled: bool,

  /// When set, only paths matching one of these regexes get this style.
  #[serde(default)]
  pub limit_to: Vec<String>,
}

const fn enabled_by_default() -> bool {
  true
}

/// A compiled, enabled comment style.
#[derive(Debug, Clone)]
pub struct Handler {
  style: String,
  block: Option<BlockComment>,
  inline: Vec<String>,
  names: Vec<Regex>,
  extensions: Vec<String>,
  shebangs: Vec<Regex>,
  after: Vec<Regex>,
  limit_to: Vec<Regex>,
}

/// Matches a file name pattern against the end of a path.
fn name_pattern(name: &str) -> Result<Regex, ConfigError> {
  compile_regex(&format!("(^|/)(?:{name})$"))
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
  patterns.iter().map(|pattern| compile_regex(pattern)).collect()
}

/// Path text with `/` separators, as seen by name and `limit_to` patterns.
pub fn path_text(path: &Path) -> String {
  path.to_string_lossy().replace(MAIN_SEPARATOR, "/")
}

impl Handler {
  fn compile(style: String, definition: &HandlerDefinition, extensions: Vec<String>) -> Result<Self, ConfigError> {
    let shebangs = compile_all(&definition.shebangs)?;
    let mut after = compile_all(&definition.after)?;
    // A shebang always stays on the first line.
    if !shebangs.is_empty() {
      after.push(compile_regex("^#!")?);
    }

    let inline = match &definition.inline {
      Some(leaders) if !leaders.is_empty() => leaders.clone(),
      _ => vec![String::new()],
    };

    Ok(Self {
      style,
      block: definition.block.clone(),
      inline,
      names: definition.names.iter().map(|name| name_pattern(name)).collect::<Result<_, _>>()?,
      extensions,
      shebangs,
      after,
      limit_to: compile_all(&definition.limit_to)?,
    })
  }

  pub fn style(&self) -> &str {
    &self.style
  }

  pub const fn block(&self) -> Option<&BlockComment> {
    self.block.as_ref()
  }

  /// Leader used for new inline headers.
  pub fn inline_leader(&self) -> &str {
    self.inline.first().map_or("", String::as_str)
  }

  /// Scores how well this style fits a file.
  ///
  /// # Parameters
  ///
  /// * `path` - The file path, with `/` separators
  /// * `first_line` - The first line of the file, for shebang detection
  ///
  /// # Returns
  ///
  /// The number of matching name patterns, extensions and shebangs, or 0 when
  /// a `limit_to` list exists and does not cover the path.
  pub fn weight(&self, path: &str, first_line: &str) -> usize {
    if !self.limit_to.is_empty() && !self.limit_to.iter().any(|limit| limit.is_match(path)) {
      return 0;
    }

    let names = self.names.iter().filter(|name| name.is_match(path)).count();
    let extensions = self
      .extensions
      .iter()
      .filter(|ext| path.ends_with(&format!(".{ext}")) || path.ends_with(&format!(".{ext}.in")))
      .count();
    let shebangs = self.shebangs.iter().filter(|shebang| shebang.is_match(first_line)).count();

    names + extensions + shebangs
  }

  /// Splits a file around the first anchor line.
  ///
  /// Returns `(lines[..=i] + [""], lines[i+1..])` for the first line `i` that
  /// matches an anchor, dropping one blank line at the start of the remainder.
  /// Without an anchor the whole file is the remainder.
  pub fn split_around_anchor(&self, lines: &[String]) -> (Vec<String>, Vec<String>) {
    let Some(anchor) = lines
      .iter()
      .position(|line| self.after.iter().any(|pattern| pattern.is_match(line)))
    else {
      return (Vec::new(), lines.to_vec());
    };

    let mut pre = lines[..=anchor].to_vec();
    pre.push(String::new());

    let mut rest = &lines[anchor + 1..];
    if rest.first().is_some_and(|line| line.trim().is_empty()) {
      rest = &rest[1..];
    }

    (pre, rest.to_vec())
  }
}

/// The set of enabled handlers, in registration order.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
  handlers: Vec<Handler>,
  excluded_names: Vec<Regex>,
  excluded_extensions: Vec<String>,
}

impl HandlerRegistry {
  /// Loads the embedded handler definitions.
  pub fn builtin(optional: &[String]) -> Result<Self, ConfigError> {
    Self::from_sources(
      BUILTIN_HANDLERS.iter().map(|(style, text)| ((*style).to_string(), *text)),
      optional,
    )
  }

  /// Loads every `*.toml` definition in a directory. The file stem is the
  /// style name.
  pub fn load_dir(dir: &Path, optional: &[String]) -> Result<Self, ConfigError> {
    let read_error = |source| ConfigError::ReadError {
      path: dir.to_path_buf(),
      source,
    };

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
      let path = entry.map_err(read_error)?.path();
      if path.extension().is_none_or(|ext| ext != "toml") {
        continue;
      }
      let Some(style) = path.file_stem().map(|stem| stem.to_string_lossy().into_owned()) else {
        continue;
      };
      let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
        path: path.clone(),
        source,
      })?;
      sources.push((style, text));
    }

    Self::from_sources(sources, optional)
  }

  /// Builds the registry from `(style, toml)` pairs.
  ///
  /// Disabled styles are dropped unless named in `optional`
  /// (case-insensitive); their names and extensions join the exclusion lists
  /// so their files are never stamped with another style's header.
  pub fn from_sources<I, S>(sources: I, optional: &[String]) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = (String, S)>,
    S: AsRef<str>,
  {
    let mut definitions = sources
      .into_iter()
      .map(|(style, text)| {
        toml::from_str::<HandlerDefinition>(text.as_ref())
          .map(|definition| (style.clone(), definition))
          .map_err(|source| ConfigError::InvalidHandler { style, source })
      })
      .collect::<Result<Vec<_>, _>>()?;
    definitions.sort_by(|a, b| a.0.cmp(&b.0));

    let wanted: Vec<String> = optional
      .iter()
      .map(|name| name.trim().to_lowercase())
      .filter(|name| !name.is_empty())
      .collect();
    let unknown: Vec<String> = wanted
      .iter()
      .filter(|name| !definitions.iter().any(|(style, _)| style.to_lowercase() == **name))
      .cloned()
      .collect();
    if !unknown.is_empty() {
      return Err(ConfigError::UnknownHandler(unknown));
    }

    let mut registry = Self {
      handlers: Vec::new(),
      excluded_names: Vec::new(),
      excluded_extensions: Vec::new(),
    };

    for (style, definition) in definitions {
      let extensions: Vec<String> = definition
        .extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_string())
        .collect();

      if !definition.enabled && !wanted.contains(&style.to_lowercase()) {
        debug!("Handler '{}' is disabled, excluding its files", style);
        for name in &definition.names {
          registry.excluded_names.push(name_pattern(name)?);
        }
        registry.excluded_extensions.extend(extensions);
        continue;
      }

      registry.handlers.push(Handler::compile(style, &definition, extensions)?);
    }

    debug!(
      "Loaded handlers: {}",
      registry.handlers().iter().map(Handler::style).collect::<Vec<_>>().join(", ")
    );

    Ok(registry)
  }

  pub fn get(&self, style: &str) -> Option<&Handler> {
    self.handlers.iter().find(|handler| handler.style == style)
  }

  pub fn handlers(&self) -> &[Handler] {
    &self.handlers
  }

  /// Name patterns of disabled styles.
  pub fn excluded_names(&self) -> &[Regex] {
    &self.excluded_names
  }

  /// Extensions of disabled styles.
  pub fn excluded_extensions(&self) -> &[String] {
    &self.excluded_extensions
  }

  /// Picks the style with the highest non-zero weight for a file.
  ///
  /// Ties go to the handler registered first.
  pub fn guess_style(&self, path: &Path, first_line: &str) -> Option<&Handler> {
    let path = path_text(path);
    let mut best: Option<(&Handler, usize)> = None;

    for handler in &self.handlers {
      let weight = handler.weight(&path, first_line);
      if weight == 0 {
        continue;
      }
      match best {
        Some((current, top)) if weight == top => {
          debug!(
            "{}: styles '{}' and '{}' tie, using '{}'",
            path, current.style, handler.style, current.style
          );
        }
        Some((_, top)) if weight < top => {}
        _ => best = Some((handler, weight)),
      }
    }

    best.map(|(handler, _)| handler)
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  fn lines(text: &[&str]) -> Vec<String> {
    text.iter().map(|line| (*line).to_string()).collect()
  }

  fn style_of(registry: &HandlerRegistry, path: &str, first_line: &str) -> Option<String> {
    registry
      .guess_style(Path::new(path), first_line)
      .map(|handler| handler.style().to_string())
  }

  #[test]
  fn test_builtin_handlers_load_in_lexicographic_order() {
    let registry = HandlerRegistry::builtin(&[]).unwrap();
    let styles: Vec<&str> = registry.handlers().iter().map(Handler::style).collect();
    assert_eq!(styles, vec!["batch", "c", "erlang", "hash", "slashes", "sql", "xml"]);
  }

  #[test]
  fn test_guess_style_by_extension() {
    let registry = HandlerRegistry::builtin(&[]).unwrap();
    assert_eq!(style_of(&registry, "/src/main.c", "").as_deref(), Some("c"));
    assert_eq!(style_of(&registry, "/src/lib.rs", "").as_deref(), Some("slashes"));
    assert_eq!(style_of(&registry, "/src/query.sql", "").as_deref(), Some("sql"));
    assert_eq!(style_of(&registry, "/src/config.h.in", "").as_deref(), Some("c"));
    assert_eq!(style_of(&registry, "/src/notes.unknown", ""), None);
  }

  #[test]
  fn test_guess_style_by_name_and_shebang() {
    let registry = HandlerRegistry::builtin(&[]).unwrap();
    assert_eq!(style_of(&registry, "/repo/CMakeLists.txt", "").as_deref(), Some("hash"));
    assert_eq!(style_of(&registry, "/repo/Jenkinsfile", "").as_deref(), Some("c"));
    assert_eq!(
      style_of(&registry, "/repo/bin/tool", "#!/usr/bin/env python3").as_deref(),
      Some("hash")
    );
    assert_eq!(style_of(&registry, "/repo/bin/tool", "plain text"), None);
    // The name pattern is anchored to a whole path component.
    assert_eq!(style_of(&registry, "/repo/NotMakefile", ""), None);
  }

  #[test]
  fn test_disabled_handler_folds_into_exclusions() {
    let registry = HandlerRegistry::builtin(&[]).unwrap();
    assert!(registry.get("markdown").is_none());
    assert!(registry.excluded_extensions().contains(&"md".to_string()));

    let registry = HandlerRegistry::builtin(&["Markdown".to_string()]).unwrap();
    assert!(registry.get("markdown").is_some());
    assert!(registry.excluded_extensions().is_empty());
    assert_eq!(style_of(&registry, "/docs/README.md", "").as_deref(), Some("markdown"));
  }

  #[test]
  fn test_unknown_optional_handler() {
    let err = HandlerRegistry::builtin(&["markdown".to_string(), "cobol".to_string()]).expect_err("should fail");
    match err {
      ConfigError::UnknownHandler(names) => assert_eq!(names, vec!["cobol".to_string()]),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn test_tie_goes_to_first_registered() {
    let sources = vec![
      ("zeta".to_string(), "extensions = [\"x\"]\ninline = [\"#\"]\n"),
      ("alpha".to_string(), "extensions = [\".x\"]\ninline = [\"//\"]\n"),
    ];
    let registry = HandlerRegistry::from_sources(sources, &[]).unwrap();
    assert_eq!(style_of(&registry, "/a/b.x", "").as_deref(), Some("alpha"));
  }

  #[test]
  fn test_higher_weight_wins() {
    let sources = vec![
      ("alpha".to_string(), "extensions = [\"x\"]\n"),
      ("beta".to_string(), "extensions = [\"x\"]\nshebangs = ['^#!.*tool']\n"),
    ];
    let registry = HandlerRegistry::from_sources(sources, &[]).unwrap();
    assert_eq!(style_of(&registry, "/a/b.x", "#!/usr/bin/tool").as_deref(), Some("beta"));
    assert_eq!(style_of(&registry, "/a/b.x", "").as_deref(), Some("alpha"));
  }

  #[test]
  fn test_limit_to() {
    let sources = vec![(
      "scoped".to_string(),
      "extensions = [\"x\"]\nlimit-to = ['/scripts/']\n",
    )];
    let registry = HandlerRegistry::from_sources(sources, &[]).unwrap();
    assert_eq!(style_of(&registry, "/repo/scripts/a.x", "").as_deref(), Some("scoped"));
    assert_eq!(style_of(&registry, "/repo/src/a.x", ""), None);
  }

  #[test]
  fn test_inline_defaults_to_empty_leader() {
    let registry = HandlerRegistry::from_sources(vec![("bare".to_string(), "extensions = [\"x\"]\n")], &[]).unwrap();
    let handler = registry.get("bare").unwrap();
    assert_eq!(handler.inline_leader(), "");
    assert!(handler.block().is_none());
  }

  #[test]
  fn test_invalid_definition() {
    let err = HandlerRegistry::from_sources(vec![("bad".to_string(), "extensions = 3\n")], &[]).expect_err("should fail");
    assert!(matches!(err, ConfigError::InvalidHandler { ref style, .. } if style == "bad"));
  }

  #[test]
  fn test_split_around_shebang() {
    let registry = HandlerRegistry::builtin(&[]).unwrap();
    let handler = registry.get("hash").unwrap();

    let (pre, post) = handler.split_around_anchor(&lines(&["#!/usr/bin/env python", "", "import os"]));
    assert_eq!(pre, lines(&["#!/usr/bin/env python", ""]));
    assert_eq!(post, lines(&["import os"]));

    let (pre, post) = handler.split_around_anchor(&lines(&["#!/bin/sh", "echo hi"]));
    assert_eq!(pre, lines(&["#!/bin/sh", ""]));
    assert_eq!(post, lines(&["echo hi"]));
  }

  #[test]
  fn test_split_without_anchor() {
    let registry = HandlerRegistry::builtin(&[]).unwrap();
    let handler = registry.get("c").unwrap();

    let (pre, post) = handler.split_around_anchor(&lines(&["int x;", ""]));
    assert!(pre.is_empty());
    assert_eq!(post, lines(&["int x;", ""]));
  }

  #[test]
  fn test_split_after_xml_prolog() {
    let registry = HandlerRegistry::builtin(&[]).unwrap();
    let handler = registry.get("xml").unwrap();

    let (pre, post) = handler.split_around_anchor(&lines(&["<?xml version=\"1.0\"?>", "<root/>"]));
    assert_eq!(pre, lines(&["<?xml version=\"1.0\"?>", ""]));
    assert_eq!(post, lines(&["<root/>"]));
  }

  #[test]
  fn test_load_dir() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("lua.toml"), "extensions = [\"lua\"]\ninline = [\"--\"]\n").unwrap();
    std::fs::write(temp_dir.path().join("README"), "not a handler").unwrap();

    let registry = HandlerRegistry::load_dir(temp_dir.path(), &[]).unwrap();
    assert_eq!(registry.handlers().len(), 1);
    assert_eq!(registry.get("lua").unwrap().inline_leader(), "--");
  }
}
