#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use anyhow::{Context, Result};
use license_injector::config::Config;
use license_injector::git::VersionControl;
use license_injector::handlers::HandlerRegistry;
use license_injector::licenses::LicenseCatalog;
use license_injector::processor::{Processor, ProcessorConfig};
use tempfile::TempDir;

/// Year reported by [`FixedVcs`] for every file.
pub const FIRST_COMMIT_YEAR: i32 = 2013;

/// The `bsl_wrap_74` body, the target for short prefixes.
pub const BSL_74: [&str; 5] = [
  "Use of this software is governed by the Business Source License included",
  "in the file licenses/BSL-Couchbase.txt.  As of the Change Date specified",
  "in that file, in accordance with the Business Source License, use of this",
  "software will be governed by the Apache License, Version 2.0, included in",
  "the file licenses/APL2.txt.",
];

/// Treats `root` as a repository whose files all first appeared in
/// [`FIRST_COMMIT_YEAR`].
pub struct FixedVcs {
  pub root: PathBuf,
}

impl VersionControl for FixedVcs {
  fn toplevel(&self, dir: &Path) -> Result<Option<PathBuf>> {
    Ok(dir.starts_with(&self.root).then(|| self.root.clone()))
  }

  fn first_commit_year(&self, _root: &Path, _path: &Path) -> Result<Option<i32>> {
    Ok(Some(FIRST_COMMIT_YEAR))
  }
}

/// A temporary directory and its canonical path.
pub fn canonical_tempdir() -> Result<(TempDir, PathBuf)> {
  let temp_dir = TempDir::new()?;
  let root = temp_dir.path().canonicalize()?;
  Ok((temp_dir, root))
}

/// Processor defaults for tests: builtin handlers and licenses, target "bsl",
/// and [`FixedVcs`] rooted at `root`.
pub fn base_config(root: &Path) -> ProcessorConfig {
  ProcessorConfig {
    vcs: Arc::new(FixedVcs {
      root: root.to_path_buf(),
    }),
    ..ProcessorConfig::new(
      Config::default().compile().expect("default config compiles"),
      HandlerRegistry::builtin(&[]).expect("builtin handlers load"),
      LicenseCatalog::builtin(),
      "bsl",
    )
  }
}

pub fn test_processor(root: &Path) -> Processor {
  Processor::new(base_config(root)).expect("processor builds")
}

/// Lines prefixed with `prefix`.
pub fn prefixed(prefix: &str, lines: &[&str]) -> Vec<String> {
  lines.iter().map(|line| format!("{prefix}{line}")).collect()
}

/// Checks if git is available on the system.
pub fn is_git_available() -> bool {
  Command::new("git").arg("--version").status().is_ok()
}

/// Runs a git command in the given directory, returning an error with stderr on
/// failure.
pub fn run_git(dir: &Path, args: &[&str]) -> Result<()> {
  run_git_with_env(dir, args, &[])
}

fn run_git_with_env(dir: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<()> {
  let output = Command::new("git")
    .args(args)
    .envs(envs.iter().copied())
    .current_dir(dir)
    .output()
    .with_context(|| format!("Failed to execute git {:?}", args))?;

  if !output.status.success() {
    anyhow::bail!("git {:?} failed: {}", args, String::from_utf8_lossy(&output.stderr));
  }
  Ok(())
}

/// Initializes a git repository in the given directory with deterministic
/// settings.
///
/// Configures:
/// - Default branch name set to `main`
/// - User name and email for commits
/// - Disables commit signing for test isolation
pub fn init_git_repo(dir: &Path) -> Result<()> {
  run_git(dir, &["init"])?;
  run_git(dir, &["config", "init.defaultBranch", "main"])?;
  run_git(dir, &["branch", "-M", "main"])?;
  run_git(dir, &["config", "user.name", "Test User"])?;
  run_git(dir, &["config", "user.email", "test@example.com"])?;
  // Disable commit signing for test isolation
  run_git(dir, &["config", "commit.gpgsign", "false"])?;
  Ok(())
}

/// Stages a file and creates a commit authored at `date` (RFC 2822 or ISO
/// 8601).
pub fn git_add_and_commit_at(dir: &Path, file: &str, message: &str, date: &str) -> Result<()> {
  run_git(dir, &["add", file])?;
  run_git_with_env(
    dir,
    &["commit", "-m", message],
    &[("GIT_AUTHOR_DATE", date), ("GIT_COMMITTER_DATE", date)],
  )
}
