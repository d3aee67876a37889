//! Integration tests for `librarian migrate-config`

use crate::helpers::{TWO_LIBRARIES, TestRepo, run_librarian, run_librarian_failing};
use anyhow::Result;

#[test]
fn test_migrate_config_writes_librarian_toml() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;

  let output = run_librarian(&repo.path, &["migrate-config", "--language", "go"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("2 libraries"), "stdout: {}", stdout);

  let toml = repo.read_file("librarian.toml")?;
  assert!(toml.contains("language = \"go\""));
  assert!(toml.contains("googleapis/google-cloud-go"));
  assert!(toml.contains("name = \"a\""));
  assert!(toml.contains("name = \"b\""));
  assert!(toml.contains("google/cloud/a/v1"));
  assert!(toml.contains("1111111111111111111111111111111111111111"));

  Ok(())
}

#[test]
fn test_migrate_config_carries_overrides() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;
  repo.write_file(
    ".librarian/config.yaml",
    "libraries:\n  - id: b\n    release_blocked: true\n",
  )?;

  run_librarian(&repo.path, &["migrate-config", "--repo", repo.path_str(), "--language", "go"])?;

  let toml = repo.read_file("librarian.toml")?;
  assert!(toml.contains("skip_release = true"), "librarian.toml: {}", toml);
  assert!(!toml.contains("skip_generate"));

  Ok(())
}

#[test]
fn test_migrate_config_unknown_language() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;

  let (code, stderr) = run_librarian_failing(&repo.path, &["migrate-config", "--language", "cobol"])?;
  assert_eq!(code, 3);
  assert!(stderr.contains("cobol"));
  assert!(!repo.file_exists("librarian.toml"));

  Ok(())
}

#[test]
fn test_migrate_config_reports_new_libraries() -> Result<()> {
  let repo = TestRepo::with_state(TWO_LIBRARIES)?;
  repo.write_file(
    "librarian.toml",
    "language = \"go\"\nrepo = \"googleapis/google-cloud-go\"\n\n[[libraries]]\nname = \"a\"\n",
  )?;

  let output = run_librarian(&repo.path, &["migrate-config", "--language", "go"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("new since last migration: b"), "stdout: {}", stdout);
  assert!(repo.read_file("librarian.toml")?.contains("name = \"b\""));

  Ok(())
}

#[test]
fn test_migrate_config_rejects_remote_repo() -> Result<()> {
  let cwd = TestRepo::bare()?;

  let (code, stderr) = run_librarian_failing(
    &cwd.path,
    &["migrate-config", "--language", "go", "--repo", "git@github.com:example/never-cloned.git"],
  )?;
  assert_eq!(code, 1);
  assert!(stderr.contains("temporary clone"), "stderr: {}", stderr);
  assert!(!cwd.file_exists("librarian.toml"));

  Ok(())
}
