//! Integration tests for `librarian release`

use crate::helpers::{TWO_LIBRARIES, TestRepo, run_librarian, run_librarian_failing};
use anyhow::Result;

fn released_repo() -> Result<TestRepo> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;
  repo.tag("a-v1.0.0")?;
  repo.tag("b-v2.3.0")?;
  Ok(repo)
}

#[test]
fn test_release_init_bumps_changed_library() -> Result<()> {
  let repo = released_repo()?;
  repo.write_file("a/widget.go", "package a\n")?;
  repo.commit("feat: add widget")?;
  repo.write_file("b/notes.txt", "nothing releasable\n")?;
  repo.commit("tidy up b")?;

  let output = run_librarian(&repo.path, &["release", "init"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("1.0.0 → 1.1.0"), "stdout: {}", stdout);
  assert!(stdout.contains("unchanged: b"), "stdout: {}", stdout);

  let changelog = repo.read_file("a/CHANGELOG.md")?;
  assert!(changelog.starts_with("# Changelog"));
  assert!(changelog.contains("1.1.0"));
  assert!(changelog.contains("add widget"));
  assert!(!repo.file_exists("b/CHANGELOG.md"));

  let state = repo.read_file(".librarian/state.yaml")?;
  assert!(state.contains("1.1.0"));
  assert!(state.contains("2.3.0"));

  Ok(())
}

#[test]
fn test_release_init_breaking_change_bumps_major() -> Result<()> {
  let repo = released_repo()?;
  repo.write_file("b/api.go", "package b\n")?;
  repo.commit("feat!: remove deprecated client")?;

  let output = run_librarian(&repo.path, &["release", "init", "--library", "b"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("2.3.0 → 3.0.0"), "stdout: {}", stdout);
  assert!(repo.read_file("b/CHANGELOG.md")?.contains("remove deprecated client"));

  Ok(())
}

#[test]
fn test_release_init_nothing_to_release() -> Result<()> {
  let repo = released_repo()?;

  let output = run_librarian(&repo.path, &["release", "init"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Nothing to release"), "stdout: {}", stdout);
  assert_eq!(repo.read_file(".librarian/state.yaml")?, TWO_LIBRARIES);

  Ok(())
}

#[test]
fn test_release_init_missing_tag_fails_only_that_library() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;
  repo.tag("a-v1.0.0")?;
  repo.write_file("a/widget.go", "package a\n")?;
  repo.commit("fix: handle empty widget")?;

  // b has no release tag; a still lands and the run exits 0
  let output = run_librarian(&repo.path, &["release", "init"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("b-v2.3.0"), "stderr: {}", stderr);
  assert!(repo.read_file("a/CHANGELOG.md")?.contains("1.0.1"));

  Ok(())
}

#[test]
fn test_release_init_unknown_library() -> Result<()> {
  let repo = released_repo()?;

  let (code, stderr) = run_librarian_failing(&repo.path, &["release", "init", "--library", "nope"])?;
  assert_eq!(code, 1);
  assert!(stderr.contains("nope"));

  Ok(())
}

#[test]
fn test_release_init_requires_clean_tree() -> Result<()> {
  let repo = released_repo()?;
  repo.write_file("a/scratch.txt", "uncommitted\n")?;

  let (code, _) = run_librarian_failing(&repo.path, &["release", "init"])?;
  assert_eq!(code, 2);
  assert!(!repo.file_exists("a/CHANGELOG.md"));

  Ok(())
}

#[test]
fn test_tag_and_release_requires_token() -> Result<()> {
  let repo = TestRepo::bare()?;

  let (code, stderr) = run_librarian_failing(
    &repo.path,
    &["release", "tag-and-release", "--repo", "https://github.com/googleapis/google-cloud-go"],
  )?;
  assert_eq!(code, 1);
  assert!(stderr.contains("GITHUB_TOKEN"));

  Ok(())
}

#[test]
fn test_release_init_remote_repo_requires_push() -> Result<()> {
  let cwd = TestRepo::bare()?;

  let (code, stderr) = run_librarian_failing(
    &cwd.path,
    &["release", "init", "--repo", "https://github.com/example/never-cloned"],
  )?;
  assert_eq!(code, 1);
  assert!(stderr.contains("--push"), "stderr: {}", stderr);

  Ok(())
}
