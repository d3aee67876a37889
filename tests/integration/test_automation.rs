//! Integration tests for `librarian automation`

use crate::helpers::{TestRepo, run_librarian_failing};
use anyhow::Result;

const REGISTRY: &str = r#"repositories:
  - name: google-cloud-go
    git_url: https://github.com/googleapis/google-cloud-go
    secret_name: go-github-token
    supported_commands:
      - generate
      - stage-release
  - name: google-cloud-python
    git_url: https://github.com/googleapis/google-cloud-python
    supported_commands:
      - publish-release
"#;

#[test]
fn test_automation_unknown_command() -> Result<()> {
  let dir = TestRepo::bare()?;
  dir.write_file("repositories.yaml", REGISTRY)?;

  let (code, stderr) = run_librarian_failing(
    &dir.path,
    &["automation", "--command", "deploy", "--project", "p"],
  )?;
  assert_eq!(code, 3);
  assert!(stderr.contains("unknown automation command 'deploy'"));

  Ok(())
}

#[test]
fn test_automation_missing_registry() -> Result<()> {
  let dir = TestRepo::bare()?;

  let (code, stderr) = run_librarian_failing(
    &dir.path,
    &["automation", "--command", "generate", "--project", "p"],
  )?;
  assert_eq!(code, 1);
  assert!(stderr.contains("repositories.yaml"));

  Ok(())
}

#[test]
fn test_automation_rejects_duplicate_repositories() -> Result<()> {
  let dir = TestRepo::bare()?;
  let duplicated = format!(
    "{}  - name: google-cloud-go\n    git_url: https://github.com/googleapis/google-cloud-go\n",
    REGISTRY
  );
  dir.write_file("registry.yaml", &duplicated)?;

  let (code, stderr) = run_librarian_failing(
    &dir.path,
    &[
      "automation",
      "--command",
      "generate",
      "--project",
      "p",
      "--repositories",
      "registry.yaml",
    ],
  )?;
  assert_eq!(code, 3);
  assert!(stderr.contains("listed twice"));

  Ok(())
}

#[test]
fn test_automation_requires_cloud_token() -> Result<()> {
  let dir = TestRepo::bare()?;
  dir.write_file("repositories.yaml", REGISTRY)?;

  let (code, stderr) = run_librarian_failing(
    &dir.path,
    &["automation", "--command", "generate", "--project", "p"],
  )?;
  assert_eq!(code, 1);
  assert!(stderr.contains("LIBRARIAN_GCP_TOKEN"));

  Ok(())
}
