//! Integration tests for `librarian generate` and `librarian configure`

use crate::helpers::{TWO_LIBRARIES, TestRepo, run_librarian_failing};
use anyhow::Result;

/// Local API-definitions repository with one commit
fn api_source() -> Result<TestRepo> {
  let source = TestRepo::bare()?;
  source.write_file("google/cloud/a/v1/a.proto", "syntax = \"proto3\";\n")?;
  source.commit("feat: add a v1")?;
  Ok(source)
}

#[test]
fn test_generate_without_state_file() -> Result<()> {
  let repo = TestRepo::bare()?;
  repo.write_file("README.md", "# empty\n")?;
  repo.commit("chore: initial")?;

  let (code, stderr) = run_librarian_failing(&repo.path, &["generate"])?;
  assert_eq!(code, 1);
  assert!(stderr.contains("state.yaml"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_generate_requires_image() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;
  let source = api_source()?;

  let (code, stderr) = run_librarian_failing(&repo.path, &["generate", "--api-source", source.path_str()])?;
  assert_eq!(code, 1);
  assert!(stderr.contains("No generator image"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_generate_unknown_library() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;

  let (code, stderr) = run_librarian_failing(&repo.path, &["generate", "--library", "zeta"])?;
  assert_eq!(code, 1);
  assert!(stderr.contains("zeta"));

  Ok(())
}

#[test]
fn test_generate_library_must_own_api() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;

  let (code, stderr) = run_librarian_failing(
    &repo.path,
    &["generate", "--library", "a", "--api", "google/cloud/b/v1"],
  )?;
  assert_eq!(code, 3);
  assert!(stderr.contains("does not own API"));

  Ok(())
}

#[test]
fn test_generate_unowned_api() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;

  let (code, _) = run_librarian_failing(&repo.path, &["generate", "--api", "google/cloud/zeta/v1"])?;
  assert_eq!(code, 3);

  Ok(())
}

#[test]
fn test_generate_every_container_failing_leaves_state_untouched() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;
  let source = api_source()?;

  let (code, stderr) = run_librarian_failing(
    &repo.path,
    &[
      "generate",
      "--api-source",
      source.path_str(),
      "--image",
      "gcr.io/test/generator:latest",
      "--runtime",
      "/nonexistent/container-runtime",
    ],
  )?;
  assert_eq!(code, 2);
  assert!(stderr.contains("2 of 2"), "stderr: {}", stderr);
  assert_eq!(repo.read_file(".librarian/state.yaml")?, TWO_LIBRARIES);

  Ok(())
}

#[test]
fn test_configure_requires_api_and_library() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;

  let (code, stderr) = run_librarian_failing(&repo.path, &["configure", "--library", "c"])?;
  assert_eq!(code, 1);
  assert!(stderr.contains("--api and --library"));

  Ok(())
}

#[test]
fn test_configure_rejects_existing_library() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;

  let (code, _) = run_librarian_failing(
    &repo.path,
    &["configure", "--library", "a", "--api", "google/cloud/a/v2"],
  )?;
  assert_eq!(code, 3);

  Ok(())
}

#[test]
fn test_generate_remote_repo_requires_push() -> Result<()> {
  let cwd = TestRepo::bare()?;

  let (code, stderr) = run_librarian_failing(
    &cwd.path,
    &["generate", "--repo", "https://github.com/example/never-cloned"],
  )?;
  assert_eq!(code, 1);
  assert!(stderr.contains("--push"), "stderr: {}", stderr);
  assert!(stderr.contains("temporary"), "stderr: {}", stderr);

  Ok(())
}
