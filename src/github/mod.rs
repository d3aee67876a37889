//! GitHub collaborator
//!
//! The engine only talks to GitHub through [`GitHubClient`]. The production
//! implementation is the blocking REST client in [`rest`]; tests use the
//! in-memory fake.

#[cfg(test)]
pub mod fake;
pub mod rest;

use crate::core::error::{LibrarianError, LibrarianResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment variable holding the GitHub token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Label applied to release PRs until their tags and releases exist
pub const LABEL_PENDING: &str = "release:pending";

/// Label applied once every library in a release PR was tagged
pub const LABEL_DONE: &str = "release:done";

/// A GitHub repository coordinate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitHubRepo {
  pub owner: String,
  pub name: String,
}

impl GitHubRepo {
  pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      owner: owner.into(),
      name: name.into(),
    }
  }

  /// Parse a GitHub remote URL.
  ///
  /// Accepts `https://github.com/owner/name(.git)`, `git@github.com:owner/name(.git)`
  /// and `ssh://git@github.com/owner/name(.git)`.
  pub fn parse(url: &str) -> LibrarianResult<Self> {
    let url = url.trim();
    let rest = url
      .strip_prefix("https://github.com/")
      .or_else(|| url.strip_prefix("http://github.com/"))
      .or_else(|| url.strip_prefix("git@github.com:"))
      .or_else(|| url.strip_prefix("ssh://git@github.com/"))
      .ok_or_else(|| LibrarianError::invalid(format!("'{}' is not a GitHub repository URL", url)))?;

    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let mut parts = rest.split('/');
    match (parts.next(), parts.next(), parts.next()) {
      (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(Self::new(owner, name)),
      _ => Err(LibrarianError::invalid(format!(
        "'{}' does not name an owner/repository pair",
        url
      ))),
    }
  }

  pub fn html_url(&self) -> String {
    format!("https://github.com/{}/{}", self.owner, self.name)
  }
}

impl fmt::Display for GitHubRepo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.owner, self.name)
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PullRequest {
  pub number: u64,
  pub title: String,
  pub body: String,
  pub html_url: String,
  pub merged: bool,
  pub merge_commit_sha: Option<String>,
  pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPullRequest {
  pub title: String,
  pub body: String,
  pub head: String,
  pub base: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRelease {
  pub tag_name: String,
  pub target_commitish: String,
  pub name: String,
  pub body: String,
  pub prerelease: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Release {
  pub id: u64,
  pub html_url: String,
}

/// Capabilities the engine needs from GitHub
pub trait GitHubClient: Send + Sync {
  fn get_pull_request(&self, repo: &GitHubRepo, number: u64) -> LibrarianResult<PullRequest>;

  /// Merged PRs carrying `label`, lowest number first
  fn list_merged_pull_requests(&self, repo: &GitHubRepo, label: &str) -> LibrarianResult<Vec<PullRequest>>;

  fn add_labels(&self, repo: &GitHubRepo, number: u64, labels: &[&str]) -> LibrarianResult<()>;

  /// Removing a label that is not present is not an error
  fn remove_label(&self, repo: &GitHubRepo, number: u64, label: &str) -> LibrarianResult<()>;

  /// Raw file contents at `git_ref`
  fn get_contents(&self, repo: &GitHubRepo, path: &str, git_ref: &str) -> LibrarianResult<Vec<u8>>;

  fn create_release(&self, repo: &GitHubRepo, release: &NewRelease) -> LibrarianResult<Release>;

  /// Release published for `tag`, if any
  fn get_release_by_tag(&self, repo: &GitHubRepo, tag: &str) -> LibrarianResult<Option<Release>>;

  /// Create a lightweight tag `refs/tags/{tag}` at `sha`; fails if the ref exists
  fn create_tag_ref(&self, repo: &GitHubRepo, tag: &str, sha: &str) -> LibrarianResult<()>;

  /// Commit SHA `refs/tags/{tag}` points at, if the tag exists
  fn get_tag_ref(&self, repo: &GitHubRepo, tag: &str) -> LibrarianResult<Option<String>>;

  fn create_pull_request(&self, repo: &GitHubRepo, pr: &NewPullRequest) -> LibrarianResult<PullRequest>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_github_urls() {
    let expected = GitHubRepo::new("googleapis", "google-cloud-go");
    assert_eq!(GitHubRepo::parse("https://github.com/googleapis/google-cloud-go").unwrap(), expected);
    assert_eq!(GitHubRepo::parse("https://github.com/googleapis/google-cloud-go.git").unwrap(), expected);
    assert_eq!(GitHubRepo::parse("git@github.com:googleapis/google-cloud-go.git").unwrap(), expected);
    assert_eq!(GitHubRepo::parse("ssh://git@github.com/googleapis/google-cloud-go").unwrap(), expected);
    assert_eq!(expected.to_string(), "googleapis/google-cloud-go");
  }

  #[test]
  fn test_parse_rejects_non_github_urls() {
    assert!(GitHubRepo::parse("https://gitlab.com/a/b").is_err());
    assert!(GitHubRepo::parse("https://github.com/only-owner").is_err());
    assert!(GitHubRepo::parse("https://github.com/a/b/c").is_err());
  }
}
