//! # Git Module
//!
//! Version control queries used by the pipeline: locating the repository that
//! owns a file, and the year a file first appeared in history (the fallback
//! copyright year when a header carries none).
//!
//! The queries sit behind the [`VersionControl`] trait so tests can substitute
//! a fixed answer for a real repository.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike};
use git2::{ErrorCode, Repository, Sort};
use tracing::trace;

/// Repository queries. Implementations are blocking and run on the blocking
/// thread pool.
pub trait VersionControl: Send + Sync {
  /// Returns the working directory root of the repository containing `dir`.
  ///
  /// # Returns
  ///
  /// `Ok(None)` when `dir` is not inside a repository.
  fn toplevel(&self, dir: &Path) -> Result<Option<PathBuf>>;

  /// Returns the year of the earliest commit that contains `path`.
  ///
  /// # Parameters
  ///
  /// * `root` - The repository root returned by [`VersionControl::toplevel`]
  /// * `path` - The file, inside `root`
  fn first_commit_year(&self, root: &Path, path: &Path) -> Result<Option<i32>>;
}

/// [`VersionControl`] backed by libgit2.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitRepository;

impl VersionControl for GitRepository {
  fn toplevel(&self, dir: &Path) -> Result<Option<PathBuf>> {
    match Repository::discover(dir) {
      // Bare repositories have no working tree to stamp.
      Ok(repo) => Ok(repo.workdir().map(|workdir| workdir.components().collect())),
      Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
      Err(e) => Err(e).with_context(|| format!("Failed to discover git repository for {}", dir.display())),
    }
  }

  fn first_commit_year(&self, root: &Path, path: &Path) -> Result<Option<i32>> {
    let repo = Repository::open(root).with_context(|| format!("Failed to open git repository: {}", root.display()))?;
    let relative = path
      .strip_prefix(root)
      .with_context(|| format!("{} is outside repository {}", path.display(), root.display()))?;

    let mut revwalk = repo.revwalk().with_context(|| "Failed to create revision walker")?;
    if revwalk.push_head().is_err() {
      // Unborn HEAD: nothing is committed yet.
      return Ok(None);
    }
    revwalk
      .set_sorting(Sort::TIME | Sort::REVERSE)
      .with_context(|| "Failed to sort revisions")?;

    for oid in revwalk {
      let oid = oid.with_context(|| "Failed to walk revisions")?;
      let commit = repo
        .find_commit(oid)
        .with_context(|| format!("Failed to find commit {oid}"))?;
      let tree = commit.tree().with_context(|| format!("Failed to read tree of {oid}"))?;
      if tree.get_path(relative).is_ok() {
        let when = commit.author().when();
        let local = when.seconds() + i64::from(when.offset_minutes()) * 60;
        trace!("{} first appears in {}", relative.display(), oid);
        return Ok(DateTime::from_timestamp(local, 0).map(|date| date.year()));
      }
    }

    Ok(None)
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  #[test]
  fn test_toplevel_outside_repository() {
    let temp_dir = TempDir::new().unwrap();
    // The temp dir may itself live inside a checkout; only a positive answer
    // that points inside the temp dir would be wrong.
    if let Some(root) = GitRepository.toplevel(temp_dir.path()).unwrap() {
      assert!(!root.starts_with(temp_dir.path()));
    }
  }

  #[test]
  fn test_toplevel_and_year_with_libgit2() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().canonicalize().unwrap();
    let repo = Repository::init(&root).unwrap();

    let nested = root.join("src");
    std::fs::create_dir(&nested).unwrap();
    std::fs::write(nested.join("a.c"), "int x;\n").unwrap();

    assert_eq!(GitRepository.toplevel(&nested).unwrap(), Some(root.clone()));
    // Nothing committed yet.
    assert_eq!(GitRepository.first_commit_year(&root, &nested.join("a.c")).unwrap(), None);

    let mut index = repo.index().unwrap();
    index.add_path(Path::new("src/a.c")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let time = git2::Time::new(1_262_347_200, 0); // 2010-01-01T12:00:00Z
    let signature = git2::Signature::new("Test", "test@example.com", &time).unwrap();
    repo
      .commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
      .unwrap();

    assert_eq!(
      GitRepository.first_commit_year(&root, &nested.join("a.c")).unwrap(),
      Some(2010)
    );
    assert_eq!(
      GitRepository.first_commit_year(&root, &nested.join("missing.c")).unwrap(),
      None
    );
  }
}
