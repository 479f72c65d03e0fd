mod common;

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use common::{base_config, canonical_tempdir, git_add_and_commit_at, init_git_repo, is_git_available};
use license_injector::git::{GitRepository, VersionControl};
use license_injector::processor::{Processor, ProcessorConfig};
use license_injector::report::Outcome;

#[test]
fn test_toplevel_and_first_commit_year() -> Result<()> {
  // Skip test if git is not available
  if !is_git_available() {
    println!("Skipping git test because git command is not available");
    return Ok(());
  }

  let (_temp_dir, root) = canonical_tempdir()?;
  init_git_repo(&root)?;
  fs::create_dir_all(root.join("src"))?;
  fs::write(root.join("src/old.c"), "int old;\n")?;
  git_add_and_commit_at(&root, "src/old.c", "Add old.c", "2011-06-01T12:00:00+00:00")?;
  fs::write(root.join("src/new.c"), "int new;\n")?;
  git_add_and_commit_at(&root, "src/new.c", "Add new.c", "2019-03-15T12:00:00+00:00")?;
  fs::write(root.join("src/untracked.c"), "int untracked;\n")?;

  let git = GitRepository;
  assert_eq!(git.toplevel(&root.join("src"))?, Some(root.clone()));
  assert_eq!(git.first_commit_year(&root, &root.join("src/old.c"))?, Some(2011));
  assert_eq!(git.first_commit_year(&root, &root.join("src/new.c"))?, Some(2019));
  assert_eq!(git.first_commit_year(&root, &root.join("src/untracked.c"))?, None);

  let (_outside_dir, outside) = canonical_tempdir()?;
  assert_eq!(git.toplevel(&outside)?, None);

  Ok(())
}

#[tokio::test]
async fn test_injected_year_comes_from_history() -> Result<()> {
  if !is_git_available() {
    println!("Skipping git test because git command is not available");
    return Ok(());
  }

  let (_temp_dir, root) = canonical_tempdir()?;
  init_git_repo(&root)?;
  fs::write(root.join("job.sql"), "select 1;\n")?;
  git_add_and_commit_at(&root, "job.sql", "Add job", "2014-09-09T09:00:00+00:00")?;

  let processor = Processor::new(ProcessorConfig {
    vcs: Arc::new(GitRepository),
    ..base_config(&root)
  })?;
  let results = processor.run(&root).await?;

  let path = root.join("job.sql");
  assert_eq!(results.outcome_of(&path), Some(Outcome::Injected));
  assert!(fs::read_to_string(&path)?.starts_with("-- Copyright 2014-Present Couchbase, Inc.\n--\n"));

  Ok(())
}

#[tokio::test]
async fn test_nested_repository_has_its_own_ignore_list() -> Result<()> {
  if !is_git_available() {
    println!("Skipping git test because git command is not available");
    return Ok(());
  }

  let (_temp_dir, root) = canonical_tempdir()?;
  let nested = root.join("nested");
  fs::create_dir_all(&nested)?;
  init_git_repo(&nested)?;
  fs::write(nested.join(".copyrightignore"), "skip\\.c\n")?;
  fs::write(nested.join("skip.c"), "int skip;\n")?;
  fs::write(root.join("skip.c"), "int top;\n")?;

  let processor = Processor::new(ProcessorConfig {
    vcs: Arc::new(GitRepository),
    dry_run: true,
    ..base_config(&root)
  })?;
  let results = processor.run(&root).await?;

  assert_eq!(results.outcome_of(&nested.join("skip.c")), Some(Outcome::Ignored));
  assert_eq!(results.outcome_of(&root.join("skip.c")), Some(Outcome::Injected));

  Ok(())
}
