//! # Repository Index Module
//!
//! Run-scoped cache of repository metadata. Each file asks which repository it
//! belongs to and what that repository's ignore list says; the answers are
//! computed once per directory and once per repository root, however many
//! files ask concurrently.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::{OnceCell, Semaphore};
use tracing::debug;

use crate::git::VersionControl;
use crate::ignore::RepoIgnore;

/// Metadata of one repository root.
#[derive(Debug)]
pub struct RepoInfo {
  pub root: PathBuf,
  /// False when the root is the fallback target directory.
  pub is_git: bool,
  pub ignore: RepoIgnore,
}

type CellMap<K, V> = Mutex<HashMap<K, Arc<OnceCell<V>>>>;

/// Returns the cell for `key`, creating it on first use.
///
/// The first caller to initialize the cell does the work; concurrent callers
/// await the same result.
fn cell_for<K: Eq + Hash + Clone, V>(map: &CellMap<K, V>, key: &K) -> Arc<OnceCell<V>> {
  let mut guard = map.lock().expect("mutex poisoned");
  Arc::clone(guard.entry(key.clone()).or_default())
}

/// Single-flight cache of repository roots and ignore lists.
pub struct RepoIndex {
  vcs: Arc<dyn VersionControl>,
  fallback_root: PathBuf,
  ignore_file: String,
  limiter: Arc<Semaphore>,
  toplevels: CellMap<PathBuf, Option<PathBuf>>,
  repos: CellMap<PathBuf, Arc<RepoInfo>>,
}

impl RepoIndex {
  /// Creates an empty index.
  ///
  /// # Parameters
  ///
  /// * `vcs` - Repository queries
  /// * `fallback_root` - Root used for files outside any repository
  /// * `ignore_file` - Name of the per-repository ignore file
  /// * `limiter` - Permits bounding concurrent external calls
  pub fn new(
    vcs: Arc<dyn VersionControl>,
    fallback_root: PathBuf,
    ignore_file: impl Into<String>,
    limiter: Arc<Semaphore>,
  ) -> Self {
    Self {
      vcs,
      fallback_root,
      ignore_file: ignore_file.into(),
      limiter,
      toplevels: Mutex::new(HashMap::new()),
      repos: Mutex::new(HashMap::new()),
    }
  }

  async fn toplevel(&self, dir: &Path) -> Result<Option<PathBuf>> {
    let cell = cell_for(&self.toplevels, &dir.to_path_buf());
    let root = cell
      .get_or_try_init(|| async {
        let _permit = self.limiter.acquire().await?;
        let vcs = Arc::clone(&self.vcs);
        let dir = dir.to_path_buf();
        let found = tokio::task::spawn_blocking(move || vcs.toplevel(&dir)).await??;
        Ok::<_, anyhow::Error>(found)
      })
      .await?;
    Ok(root.clone())
  }

  /// Returns the repository owning `path`.
  pub async fn repo_for(&self, path: &Path) -> Result<Arc<RepoInfo>> {
    let dir = path.parent().unwrap_or(path);
    let toplevel = self.toplevel(dir).await?;
    let is_git = toplevel.is_some();
    let root = toplevel.unwrap_or_else(|| self.fallback_root.clone());

    let cell = cell_for(&self.repos, &root);
    let info = cell
      .get_or_try_init(|| async {
        let ignore_path = root.join(&self.ignore_file);
        let ignore = match tokio::fs::read_to_string(&ignore_path).await {
          Ok(content) => RepoIgnore::parse(root.clone(), &content),
          Err(e) if e.kind() == std::io::ErrorKind::NotFound => RepoIgnore::empty(root.clone()),
          Err(e) => return Err(anyhow::Error::new(e).context(format!("Failed to read {}", ignore_path.display()))),
        };
        debug!(
          "Repository {} ({} ignore entries, git: {})",
          root.display(),
          ignore.len(),
          is_git
        );
        Ok::<_, anyhow::Error>(Arc::new(RepoInfo {
          root: root.clone(),
          is_git,
          ignore,
        }))
      })
      .await?;

    Ok(Arc::clone(info))
  }

  /// Year of the first commit containing `path`, if it is under version
  /// control.
  pub async fn first_commit_year(&self, path: &Path) -> Result<Option<i32>> {
    let repo = self.repo_for(path).await?;
    if !repo.is_git {
      return Ok(None);
    }

    let _permit = self.limiter.acquire().await?;
    let vcs = Arc::clone(&self.vcs);
    let root = repo.root.clone();
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || vcs.first_commit_year(&root, &path)).await?
  }
}
