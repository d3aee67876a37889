//! In-memory GitHub used by unit tests

use super::{GitHubClient, GitHubRepo, NewPullRequest, NewRelease, PullRequest, Release};
use crate::core::error::{LibrarianError, LibrarianResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Recorded mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
  CreateTag { repo: String, tag: String, sha: String },
  CreateRelease { repo: String, release: NewRelease },
  AddLabels { repo: String, number: u64, labels: Vec<String> },
  RemoveLabel { repo: String, number: u64, label: String },
  CreatePullRequest { repo: String, pr: NewPullRequest },
}

#[derive(Default)]
pub struct FakeGitHub {
  pub pull_requests: Mutex<BTreeMap<(String, u64), PullRequest>>,
  pub contents: Mutex<BTreeMap<(String, String, String), Vec<u8>>>,
  /// Repositories whose PR listing fails
  pub failing_lists: Mutex<BTreeSet<String>>,
  /// Tags whose release creation fails
  pub failing_releases: Mutex<BTreeSet<String>>,
  /// (repo, tag) -> SHA
  pub tags: Mutex<BTreeMap<(String, String), String>>,
  /// (repo, tag) -> release
  pub releases: Mutex<BTreeMap<(String, String), Release>>,
  pub calls: Mutex<Vec<Call>>,
}

impl FakeGitHub {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_pull_request(&self, repo: &GitHubRepo, pr: PullRequest) {
    self.pull_requests.lock().unwrap().insert((repo.to_string(), pr.number), pr);
  }

  pub fn add_contents(&self, repo: &GitHubRepo, path: &str, git_ref: &str, data: &str) {
    self
      .contents
      .lock()
      .unwrap()
      .insert((repo.to_string(), path.to_string(), git_ref.to_string()), data.as_bytes().to_vec());
  }

  pub fn fail_listing(&self, repo: &GitHubRepo) {
    self.failing_lists.lock().unwrap().insert(repo.to_string());
  }

  pub fn fail_release(&self, tag: &str) {
    self.failing_releases.lock().unwrap().insert(tag.to_string());
  }

  pub fn add_tag(&self, repo: &GitHubRepo, tag: &str, sha: &str) {
    self
      .tags
      .lock()
      .unwrap()
      .insert((repo.to_string(), tag.to_string()), sha.to_string());
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  fn record(&self, call: Call) {
    self.calls.lock().unwrap().push(call);
  }
}

impl GitHubClient for FakeGitHub {
  fn get_pull_request(&self, repo: &GitHubRepo, number: u64) -> LibrarianResult<PullRequest> {
    self
      .pull_requests
      .lock()
      .unwrap()
      .get(&(repo.to_string(), number))
      .cloned()
      .ok_or_else(|| LibrarianError::external("GitHub", format!("404: PR #{} not found", number)))
  }

  fn list_merged_pull_requests(&self, repo: &GitHubRepo, label: &str) -> LibrarianResult<Vec<PullRequest>> {
    if self.failing_lists.lock().unwrap().contains(&repo.to_string()) {
      return Err(LibrarianError::external("GitHub", format!("500: listing {} failed", repo)));
    }
    let key = repo.to_string();
    Ok(
      self
        .pull_requests
        .lock()
        .unwrap()
        .iter()
        .filter(|((r, _), pr)| *r == key && pr.merged && pr.labels.iter().any(|l| l == label))
        .map(|(_, pr)| pr.clone())
        .collect(),
    )
  }

  fn add_labels(&self, repo: &GitHubRepo, number: u64, labels: &[&str]) -> LibrarianResult<()> {
    if let Some(pr) = self.pull_requests.lock().unwrap().get_mut(&(repo.to_string(), number)) {
      pr.labels.extend(labels.iter().map(|l| l.to_string()));
    }
    self.record(Call::AddLabels {
      repo: repo.to_string(),
      number,
      labels: labels.iter().map(|l| l.to_string()).collect(),
    });
    Ok(())
  }

  fn remove_label(&self, repo: &GitHubRepo, number: u64, label: &str) -> LibrarianResult<()> {
    if let Some(pr) = self.pull_requests.lock().unwrap().get_mut(&(repo.to_string(), number)) {
      pr.labels.retain(|l| l != label);
    }
    self.record(Call::RemoveLabel {
      repo: repo.to_string(),
      number,
      label: label.to_string(),
    });
    Ok(())
  }

  fn get_contents(&self, repo: &GitHubRepo, path: &str, git_ref: &str) -> LibrarianResult<Vec<u8>> {
    self
      .contents
      .lock()
      .unwrap()
      .get(&(repo.to_string(), path.to_string(), git_ref.to_string()))
      .cloned()
      .ok_or_else(|| LibrarianError::external("GitHub", format!("404: {} not found at {}", path, git_ref)))
  }

  fn create_release(&self, repo: &GitHubRepo, release: &NewRelease) -> LibrarianResult<Release> {
    if self.failing_releases.lock().unwrap().contains(&release.tag_name) {
      return Err(LibrarianError::external("GitHub", "422: release rejected"));
    }
    let key = (repo.to_string(), release.tag_name.clone());
    if self.releases.lock().unwrap().contains_key(&key) {
      return Err(LibrarianError::external("GitHub", "422: already_exists"));
    }
    self.record(Call::CreateRelease {
      repo: repo.to_string(),
      release: release.clone(),
    });
    let created = Release {
      id: self.calls.lock().unwrap().len() as u64,
      html_url: format!("{}/releases/tag/{}", repo.html_url(), release.tag_name),
    };
    self.releases.lock().unwrap().insert(key, created.clone());
    Ok(created)
  }

  fn get_release_by_tag(&self, repo: &GitHubRepo, tag: &str) -> LibrarianResult<Option<Release>> {
    Ok(self.releases.lock().unwrap().get(&(repo.to_string(), tag.to_string())).cloned())
  }

  fn create_tag_ref(&self, repo: &GitHubRepo, tag: &str, sha: &str) -> LibrarianResult<()> {
    let key = (repo.to_string(), tag.to_string());
    if self.tags.lock().unwrap().contains_key(&key) {
      return Err(LibrarianError::external("GitHub", "422: Reference already exists"));
    }
    self.record(Call::CreateTag {
      repo: repo.to_string(),
      tag: tag.to_string(),
      sha: sha.to_string(),
    });
    self.tags.lock().unwrap().insert(key, sha.to_string());
    Ok(())
  }

  fn get_tag_ref(&self, repo: &GitHubRepo, tag: &str) -> LibrarianResult<Option<String>> {
    Ok(self.tags.lock().unwrap().get(&(repo.to_string(), tag.to_string())).cloned())
  }

  fn create_pull_request(&self, repo: &GitHubRepo, pr: &NewPullRequest) -> LibrarianResult<PullRequest> {
    self.record(Call::CreatePullRequest {
      repo: repo.to_string(),
      pr: pr.clone(),
    });
    let number = self.pull_requests.lock().unwrap().len() as u64 + 1;
    Ok(PullRequest {
      number,
      title: pr.title.clone(),
      body: pr.body.clone(),
      html_url: format!("{}/pull/{}", repo.html_url(), number),
      ..Default::default()
    })
  }
}
