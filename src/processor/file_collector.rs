//! # File Collector Module
//!
//! Walks the target tree and sorts files into candidates and files excluded by
//! extension. `.git` directories and symlinks are never entered or returned.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Files found under a target.
#[derive(Debug, Default)]
pub struct CollectedFiles {
  /// Files to run through the pipeline.
  pub candidates: Vec<PathBuf>,
  /// Files whose extension is excluded; they are never opened.
  pub excluded: Vec<PathBuf>,
}

/// Returns the extension of a file name: the text after the last dot, when
/// the name does not start with that dot.
pub fn extension_of(path: &Path) -> Option<&str> {
  let name = path.file_name()?.to_str()?;
  match name.rfind('.') {
    Some(index) if index > 0 => Some(&name[index + 1..]),
    _ => None,
  }
}

/// File collector for directory traversal.
pub struct FileCollector {
  excluded_extensions: HashSet<String>,
}

impl FileCollector {
  pub fn new<I, S>(excluded_extensions: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      excluded_extensions: excluded_extensions.into_iter().map(Into::into).collect(),
    }
  }

  fn classify(&self, path: PathBuf, collected: &mut CollectedFiles) {
    if extension_of(&path).is_some_and(|ext| self.excluded_extensions.contains(ext)) {
      trace!("Excluded by extension: {}", path.display());
      collected.excluded.push(path);
    } else {
      collected.candidates.push(path);
    }
  }

  /// Collects every regular file under `target` (or `target` itself when it is
  /// a file).
  ///
  /// Unreadable directory entries are logged and skipped.
  pub fn collect(&self, target: &Path) -> CollectedFiles {
    let mut collected = CollectedFiles::default();
    let start_time = std::time::Instant::now();

    let walker = WalkDir::new(target)
      .follow_links(false)
      .into_iter()
      .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == ".git"));

    for entry in walker {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
          warn!("Skipping unreadable entry: {}", e);
          continue;
        }
      };

      let file_type = entry.file_type();
      if file_type.is_symlink() {
        trace!("Skipping symlink: {}", entry.path().display());
      } else if file_type.is_file() {
        self.classify(entry.into_path(), &mut collected);
      }
    }

    debug!(
      "Found {} candidate and {} excluded files in {}ms",
      collected.candidates.len(),
      collected.excluded.len(),
      start_time.elapsed().as_millis()
    );

    collected
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  #[test]
  fn test_extension_of() {
    assert_eq!(extension_of(Path::new("/a/b.json")), Some("json"));
    assert_eq!(extension_of(Path::new("/a/b.tar.gz")), Some("gz"));
    assert_eq!(extension_of(Path::new("/a/.bashrc")), None);
    assert_eq!(extension_of(Path::new("/a/Makefile")), None);
  }

  #[test]
  fn test_collect_skips_git_and_sorts_excluded() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join(".git/objects")).unwrap();
    std::fs::create_dir_all(root.join("src/nested")).unwrap();
    std::fs::write(root.join(".git/config"), "").unwrap();
    std::fs::write(root.join("src/a.c"), "").unwrap();
    std::fs::write(root.join("src/nested/b.py"), "").unwrap();
    std::fs::write(root.join("src/data.json"), "{}").unwrap();

    let collected = FileCollector::new(["json"]).collect(root);

    let mut candidates = collected.candidates.clone();
    candidates.sort();
    assert_eq!(candidates, vec![root.join("src/a.c"), root.join("src/nested/b.py")]);
    assert_eq!(collected.excluded, vec![root.join("src/data.json")]);
  }

  #[cfg(unix)]
  #[test]
  fn test_collect_skips_symlinks() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::write(root.join("real.c"), "").unwrap();
    std::os::unix::fs::symlink(root.join("real.c"), root.join("link.c")).unwrap();

    let collected = FileCollector::new(Vec::<String>::new()).collect(root);
    assert_eq!(collected.candidates, vec![root.join("real.c")]);
  }

  #[test]
  fn test_collect_single_file() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("one.sh");
    std::fs::write(&file, "echo\n").unwrap();

    let collected = FileCollector::new(["json"]).collect(&file);
    assert_eq!(collected.candidates, vec![file]);
  }
}
