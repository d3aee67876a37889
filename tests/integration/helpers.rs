//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// State with two libraries, `a` and `b`, each owning its own directory
pub const TWO_LIBRARIES: &str = r#"image: ""
libraries:
  - id: a
    version: 1.0.0
    last_generated_commit: 1111111111111111111111111111111111111111
    apis:
      - path: google/cloud/a/v1
    source_roots:
      - a
  - id: b
    version: 2.3.0
    apis:
      - path: google/cloud/b/v1
    source_roots:
      - b
"#;

/// A language repository with git history and a `.librarian/state.yaml`
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  /// Empty git repository on `main`
  pub fn bare() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;

    Ok(Self { _root: root, path })
  }

  /// Repository whose initial commit holds `state` and a README per library root
  pub fn with_state(state: &str) -> Result<Self> {
    let repo = Self::bare()?;
    repo.write_file(".librarian/state.yaml", state)?;
    repo.write_file("a/README.md", "# a\n")?;
    repo.write_file("b/README.md", "# b\n")?;
    repo.commit("chore: initial import")?;
    Ok(repo)
  }

  /// Write a file relative to the repository root, creating parents
  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    let full = self.path.join(path);
    if let Some(parent) = full.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(full, content)?;
    Ok(())
  }

  /// Commit current changes
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "--all"])?;
    git(&self.path, &["commit", "-m", message])?;

    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Lightweight tag at HEAD
  pub fn tag(&self, name: &str) -> Result<()> {
    git(&self.path, &["tag", name])?;
    Ok(())
  }

  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  pub fn path_str(&self) -> &str {
    self.path.to_str().unwrap_or_default()
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

fn librarian(cwd: &Path, args: &[&str]) -> Result<Output> {
  Command::new(env!("CARGO_BIN_EXE_librarian"))
    .current_dir(cwd)
    .args(args)
    .env_remove("GITHUB_TOKEN")
    .env_remove("LIBRARIAN_GCP_TOKEN")
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run librarian")
}

/// Run librarian and require success
pub fn run_librarian(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = librarian(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "librarian command failed: librarian {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run librarian expecting failure; returns the exit code and stderr
pub fn run_librarian_failing(cwd: &Path, args: &[&str]) -> Result<(i32, String)> {
  let output = librarian(cwd, args)?;
  if output.status.success() {
    anyhow::bail!("librarian {} unexpectedly succeeded", args.join(" "));
  }
  let code = output.status.code().context("librarian was killed by a signal")?;
  Ok((code, String::from_utf8_lossy(&output.stderr).to_string()))
}
