//! # Source File Module
//!
//! A file held in memory as a sequence of lines. The line break is detected
//! once and reused for every rewrite, so joining the lines restores the text
//! byte for byte.

use std::path::{Path, PathBuf};

use crate::handlers::HandlerRegistry;

/// The line break convention of a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreak {
  Lf,
  CrLf,
  Cr,
}

impl LineBreak {
  /// Detects the convention from the first line break in `text`.
  ///
  /// A `\n` preceded by `\r` means CRLF. Without any `\n`, a lone `\r` means
  /// classic Mac line breaks; a text without breaks defaults to LF.
  pub fn detect(text: &str) -> Self {
    let bytes = text.as_bytes();
    match bytes.iter().position(|&b| b == b'\n') {
      Some(index) if index > 0 && bytes[index - 1] == b'\r' => LineBreak::CrLf,
      Some(_) => LineBreak::Lf,
      None if bytes.contains(&b'\r') => LineBreak::Cr,
      None => LineBreak::Lf,
    }
  }

  pub const fn as_str(self) -> &'static str {
    match self {
      LineBreak::Lf => "\n",
      LineBreak::CrLf => "\r\n",
      LineBreak::Cr => "\r",
    }
  }
}

/// Splits `text` on its detected line break.
pub fn split_lines(text: &str) -> (LineBreak, Vec<String>) {
  let line_break = LineBreak::detect(text);
  let lines = text.split(line_break.as_str()).map(str::to_string).collect();
  (line_break, lines)
}

/// A file's content together with its inferred comment style.
#[derive(Debug, Clone)]
pub struct SourceFile {
  path: PathBuf,
  text: String,
  line_break: LineBreak,
  lines: Vec<String>,
  style: Option<String>,
}

impl SourceFile {
  /// Wraps `text` read from `path` and guesses its style.
  pub fn new(path: impl Into<PathBuf>, text: String, registry: &HandlerRegistry) -> Self {
    let path = path.into();
    let (line_break, lines) = split_lines(&text);
    let style = registry
      .guess_style(&path, lines.first().map_or("", String::as_str))
      .map(|handler| handler.style().to_string());

    Self {
      path,
      text,
      line_break,
      lines,
      style,
    }
  }

  /// Rebuilds the file from rewritten text, keeping the path.
  pub fn with_text(&self, text: String, registry: &HandlerRegistry) -> Self {
    Self::new(self.path.clone(), text, registry)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub const fn line_break(&self) -> LineBreak {
    self.line_break
  }

  pub fn lines(&self) -> &[String] {
    &self.lines
  }

  pub fn style(&self) -> Option<&str> {
    self.style.as_deref()
  }

  /// Returns true if `line` followed by this file's line break occurs in the
  /// text.
  pub fn contains_line(&self, line: &str) -> bool {
    self.text.contains(&format!("{line}{}", self.line_break.as_str()))
  }
}
