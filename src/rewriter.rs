//! # Header Rewriter Module
//!
//! Renders canonical headers. [`HeaderRewriter::modify`] replaces a header
//! located by the matcher, keeping the file's own comment decoration;
//! [`HeaderRewriter::inject`] adds a header to a file that has none, using the
//! comment style of its handler.
//!
//! Both return the new text in memory, joined with the file's line break.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::YEAR_PLACEHOLDER;
use crate::handlers::Handler;
use crate::licenses::{License, TargetLicenses};
use crate::matcher::HeaderMatch;
use crate::source_file::SourceFile;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([0-9]{4})\b").expect("year regex must compile"));

/// Returns the first four-digit year on a copyright line.
pub fn extract_year(line: &str) -> Option<String> {
  YEAR_RE.captures(line).map(|caps| caps[1].to_string())
}

fn capitalize_first(text: &str) -> String {
  let mut chars = text.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// Rewritten file text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
  pub text: String,
  /// Index of the last header line in the new text.
  pub header_end: usize,
}

/// Renders headers from the copyright template and the target licenses.
#[derive(Debug, Clone)]
pub struct HeaderRewriter {
  template: String,
  targets: TargetLicenses,
}

impl HeaderRewriter {
  pub fn new(template: impl Into<String>, targets: TargetLicenses) -> Self {
    Self {
      template: template.into(),
      targets,
    }
  }

  /// The target license a new header of this style would carry.
  pub fn target_for(&self, handler: &Handler) -> &License {
    if handler.block().is_some() {
      self.targets.select(0)
    } else {
      self.targets.select(inline_lead(handler.inline_leader()).len())
    }
  }

  /// Fills in the template.
  ///
  /// # Parameters
  ///
  /// * `year` - The year replacing `YYYY`
  /// * `capitalize` - Whether to upper-case the first letter
  pub fn copyright_line(&self, year: &str, capitalize: bool) -> String {
    let line = self.template.replace(YEAR_PLACEHOLDER, year);
    if capitalize { capitalize_first(&line) } else { line }
  }

  /// Rewrites a matched header in place.
  ///
  /// The copyright line keeps its prefix, the body keeps the decoration of
  /// its last line, and author lines found between the two are carried over.
  /// A copyright prefix ending in `@` (as in Texinfo `@c`) keeps the template
  /// lower-case.
  pub fn modify(&self, file: &SourceFile, header: &HeaderMatch, year: &str) -> Rewrite {
    let body_prefix = header.prefix.as_str();
    let blank = body_prefix.trim_end();
    let target = self.targets.select(body_prefix.len());
    let capitalize = !header.copyright_prefix.ends_with('@');

    let mut lines = Vec::with_capacity(header.pre.len() + target.lines().len() + header.post.len() + 4);
    lines.extend(header.pre.iter().cloned());
    lines.push(format!("{}{}", header.copyright_prefix, self.copyright_line(year, capitalize)));
    lines.push(blank.to_string());
    if !header.authors.is_empty() {
      lines.extend(header.authors.iter().cloned());
      lines.push(blank.to_string());
    }
    for line in target.lines() {
      if line.trim().is_empty() {
        lines.push(blank.to_string());
      } else {
        lines.push(format!("{body_prefix}{line}"));
      }
    }
    let header_end = lines.len() - 1;
    lines.extend(header.post.iter().cloned());

    Rewrite {
      text: lines.join(file.line_break().as_str()),
      header_end,
    }
  }

  /// Adds a new header below any anchor line (shebang, XML prolog).
  ///
  /// Block styles wrap the copyright and body between the open and close
  /// delimiters; inline styles prefix every line with the leader. A blank
  /// line separates the header from code that follows it directly.
  pub fn inject(&self, file: &SourceFile, handler: &Handler, year: &str) -> Rewrite {
    let (pre, post) = handler.split_around_anchor(file.lines());
    let copyright = self.copyright_line(year, true);

    let mut header = Vec::new();
    if let Some(block) = handler.block() {
      header.push(block.open.clone());
      header.push(copyright);
      header.push(String::new());
      header.extend(self.targets.select(0).lines().iter().cloned());
      header.push(block.close.clone());
    } else {
      let leader = handler.inline_leader();
      let lead = inline_lead(leader);
      header.push(format!("{lead}{copyright}"));
      header.push(leader.to_string());
      for line in self.targets.select(lead.len()).lines() {
        if line.is_empty() {
          header.push(leader.to_string());
        } else {
          header.push(format!("{lead}{line}"));
        }
      }
    }
    if post.first().is_some_and(|line| !line.trim().is_empty()) {
      header.push(String::new());
    }

    let header_end = pre.len() + header.len() - 1;
    let lines: Vec<String> = pre.into_iter().chain(header).chain(post).collect();

    Rewrite {
      text: lines.join(file.line_break().as_str()),
      header_end,
    }
  }
}

/// Leader plus the separating space, or nothing for an empty leader.
fn inline_lead(leader: &str) -> String {
  if leader.is_empty() {
    String::new()
  } else {
    format!("{leader} ")
  }
}
