//! Blocking GitHub REST client

use super::{GitHubClient, GitHubRepo, NewPullRequest, NewRelease, PullRequest, Release, TOKEN_ENV};
use crate::core::error::{LibrarianError, LibrarianResult};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

const API_URL: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;
const SERVICE: &str = "GitHub";

/// GitHub REST API client
pub struct RestGitHub {
  client: Client,
  api_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
  name: String,
}

#[derive(Debug, Deserialize)]
struct ApiPullRequest {
  number: u64,
  #[serde(default)]
  title: String,
  #[serde(default)]
  body: Option<String>,
  #[serde(default)]
  html_url: String,
  #[serde(default)]
  merged_at: Option<String>,
  #[serde(default)]
  merge_commit_sha: Option<String>,
  #[serde(default)]
  labels: Vec<ApiLabel>,
}

impl From<ApiPullRequest> for PullRequest {
  fn from(pr: ApiPullRequest) -> Self {
    PullRequest {
      number: pr.number,
      title: pr.title,
      body: pr.body.unwrap_or_default(),
      html_url: pr.html_url,
      merged: pr.merged_at.is_some(),
      merge_commit_sha: pr.merge_commit_sha,
      labels: pr.labels.into_iter().map(|l| l.name).collect(),
    }
  }
}

/// Entry of the issues listing; pull requests carry a `pull_request` link
#[derive(Debug, Deserialize)]
struct ApiIssue {
  number: u64,
  #[serde(default)]
  pull_request: Option<ApiIssuePullLink>,
}

#[derive(Debug, Deserialize)]
struct ApiIssuePullLink {
  #[serde(default)]
  merged_at: Option<String>,
}

/// Numbers of the merged pull requests among `issues`
fn merged_pull_numbers(issues: Vec<ApiIssue>) -> impl Iterator<Item = u64> {
  issues
    .into_iter()
    .filter(|issue| issue.pull_request.as_ref().is_some_and(|pr| pr.merged_at.is_some()))
    .map(|issue| issue.number)
}

#[derive(Debug, Deserialize)]
struct ApiRef {
  object: ApiRefObject,
}

#[derive(Debug, Deserialize)]
struct ApiRefObject {
  sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiRelease {
  id: u64,
  #[serde(default)]
  html_url: String,
}

impl RestGitHub {
  /// Client authenticated with `token`
  pub fn new(token: &str) -> LibrarianResult<Self> {
    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&format!("Bearer {}", token))
      .map_err(|e| LibrarianError::invalid(format!("{} is not a valid header value: {}", TOKEN_ENV, e)))?;
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    headers.insert(USER_AGENT, HeaderValue::from_static("librarian"));
    headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));

    let client = Client::builder().default_headers(headers).build()?;
    Ok(Self {
      client,
      api_url: API_URL.to_string(),
    })
  }

  /// Client using the token from `GITHUB_TOKEN`
  pub fn from_env() -> LibrarianResult<Self> {
    let token = std::env::var(TOKEN_ENV).map_err(|_| {
      LibrarianError::with_help(
        format!("{} is not set", TOKEN_ENV),
        "Export a token with repo scope before talking to GitHub.",
      )
    })?;
    Self::new(&token)
  }

  fn repo_url(&self, repo: &GitHubRepo, rest: &str) -> String {
    format!("{}/repos/{}/{}/{}", self.api_url, repo.owner, repo.name, rest)
  }

  fn send(request: RequestBuilder) -> LibrarianResult<Response> {
    let response = request.send()?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().unwrap_or_default();
      return Err(LibrarianError::external(SERVICE, format!("{}: {}", status, body)));
    }
    Ok(response)
  }

  /// Like [`Self::send`], but a 404 is `None`
  fn send_optional(request: RequestBuilder) -> LibrarianResult<Option<Response>> {
    let response = request.send()?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let status = response.status();
    if !status.is_success() {
      let body = response.text().unwrap_or_default();
      return Err(LibrarianError::external(SERVICE, format!("{}: {}", status, body)));
    }
    Ok(Some(response))
  }
}

impl GitHubClient for RestGitHub {
  fn get_pull_request(&self, repo: &GitHubRepo, number: u64) -> LibrarianResult<PullRequest> {
    let response = Self::send(self.client.get(self.repo_url(repo, &format!("pulls/{}", number))))?;
    let pr: ApiPullRequest = response.json()?;
    Ok(pr.into())
  }

  fn list_merged_pull_requests(&self, repo: &GitHubRepo, label: &str) -> LibrarianResult<Vec<PullRequest>> {
    // The issues listing filters by label server-side; the pulls listing cannot
    let mut numbers = Vec::new();
    let mut page = 1;
    loop {
      let request = self.client.get(self.repo_url(repo, "issues")).query(&[
        ("state", "closed".to_string()),
        ("labels", label.to_string()),
        ("per_page", PAGE_SIZE.to_string()),
        ("page", page.to_string()),
      ]);
      let batch: Vec<ApiIssue> = Self::send(request)?.json()?;
      let len = batch.len();
      numbers.extend(merged_pull_numbers(batch));
      if len < PAGE_SIZE {
        break;
      }
      page += 1;
    }
    numbers.sort_unstable();

    // The listing lacks merge commits, so fetch each PR
    numbers
      .into_iter()
      .map(|number| self.get_pull_request(repo, number))
      .collect()
  }

  fn add_labels(&self, repo: &GitHubRepo, number: u64, labels: &[&str]) -> LibrarianResult<()> {
    let body = serde_json::json!({ "labels": labels });
    Self::send(
      self
        .client
        .post(self.repo_url(repo, &format!("issues/{}/labels", number)))
        .json(&body),
    )?;
    Ok(())
  }

  fn remove_label(&self, repo: &GitHubRepo, number: u64, label: &str) -> LibrarianResult<()> {
    let url = self.repo_url(repo, &format!("issues/{}/labels/{}", number, label));
    let response = self.client.delete(url).send()?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(());
    }
    if !response.status().is_success() {
      let status = response.status();
      return Err(LibrarianError::external(
        SERVICE,
        format!("{}: {}", status, response.text().unwrap_or_default()),
      ));
    }
    Ok(())
  }

  fn get_contents(&self, repo: &GitHubRepo, path: &str, git_ref: &str) -> LibrarianResult<Vec<u8>> {
    let request = self
      .client
      .get(self.repo_url(repo, &format!("contents/{}", path)))
      .query(&[("ref", git_ref)])
      .header(ACCEPT, "application/vnd.github.raw+json");
    let bytes = Self::send(request)?.bytes()?;
    Ok(bytes.to_vec())
  }

  fn create_release(&self, repo: &GitHubRepo, release: &NewRelease) -> LibrarianResult<Release> {
    let response = Self::send(self.client.post(self.repo_url(repo, "releases")).json(release))?;
    let created: ApiRelease = response.json()?;
    Ok(Release {
      id: created.id,
      html_url: created.html_url,
    })
  }

  fn get_release_by_tag(&self, repo: &GitHubRepo, tag: &str) -> LibrarianResult<Option<Release>> {
    let request = self.client.get(self.repo_url(repo, &format!("releases/tags/{}", tag)));
    match Self::send_optional(request)? {
      Some(response) => {
        let found: ApiRelease = response.json()?;
        Ok(Some(Release {
          id: found.id,
          html_url: found.html_url,
        }))
      }
      None => Ok(None),
    }
  }

  fn get_tag_ref(&self, repo: &GitHubRepo, tag: &str) -> LibrarianResult<Option<String>> {
    let request = self.client.get(self.repo_url(repo, &format!("git/ref/tags/{}", tag)));
    match Self::send_optional(request)? {
      Some(response) => {
        let found: ApiRef = response.json()?;
        Ok(Some(found.object.sha))
      }
      None => Ok(None),
    }
  }

  fn create_tag_ref(&self, repo: &GitHubRepo, tag: &str, sha: &str) -> LibrarianResult<()> {
    let body = serde_json::json!({ "ref": format!("refs/tags/{}", tag), "sha": sha });
    Self::send(self.client.post(self.repo_url(repo, "git/refs")).json(&body))?;
    Ok(())
  }

  fn create_pull_request(&self, repo: &GitHubRepo, pr: &NewPullRequest) -> LibrarianResult<PullRequest> {
    let response = Self::send(self.client.post(self.repo_url(repo, "pulls")).json(pr))?;
    let created: ApiPullRequest = response.json()?;
    Ok(created.into())
  }
}
