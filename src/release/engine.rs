//! Per-library release analysis
//!
//! For each library: find the commit tagged with its current version, parse
//! every commit on its source roots since then, keep the entries attributed
//! to the library and derive the next version and changelog section.

use crate::core::error::{GitError, LibrarianError, LibrarianResult};
use crate::core::vcs::{CommitInfo, SystemGit};
use crate::github::GitHubRepo;
use crate::release::changelog::Changelog;
use crate::release::commit::{ParsedCommit, entries_for_library};
use crate::release::version::{VersionBump, next_version};
use crate::state::model::LibraryState;
use semver::Version;

/// A library that will be released
#[derive(Debug, Clone)]
pub struct LibraryRelease {
  pub library_id: String,
  /// `None` for a first release
  pub previous: Option<Version>,
  pub version: Version,
  pub bump: VersionBump,
  pub commits: Vec<ParsedCommit>,
  pub changelog: Changelog,
}

impl LibraryRelease {
  pub fn previous_display(&self) -> String {
    self
      .previous
      .as_ref()
      .map(|v| v.to_string())
      .unwrap_or_else(|| "unreleased".to_string())
  }
}

/// Shared inputs for analyzing libraries of one repository
pub struct ReleaseEngine<'a> {
  git: &'a SystemGit,
  repo: Option<GitHubRepo>,
  date: String,
}

impl<'a> ReleaseEngine<'a> {
  pub fn new(git: &'a SystemGit, repo: Option<GitHubRepo>, date: String) -> Self {
    Self { git, repo, date }
  }

  /// Commits on the library's source roots since its last release tag
  pub fn history(&self, library: &LibraryState) -> LibrarianResult<(Option<String>, Vec<CommitInfo>)> {
    let Some(current) = library.current_version()? else {
      return Ok((None, self.git.commits_since(None, &library.source_roots)?));
    };

    let tag = library.render_tag(&current.to_string());
    let sha = self
      .git
      .resolve_tag(&tag)?
      .ok_or_else(|| LibrarianError::Git(GitError::TagNotFound { tag: tag.clone() }))?;
    let commits = self.git.commits_since(Some(&sha), &library.source_roots)?;
    Ok((Some(tag), commits))
  }

  /// Analyze one library; `None` when nothing releasable happened
  pub fn analyze(&self, library: &LibraryState, pinned: Option<Version>) -> LibrarianResult<Option<LibraryRelease>> {
    let (previous_tag, history) = self.history(library)?;
    tracing::debug!(library = %library.id, commits = history.len(), "scanning history");
    plan_release(library, &history, previous_tag, pinned, self.repo.clone(), &self.date)
  }
}

/// Turn a library's history into a release, without touching git
pub fn plan_release(
  library: &LibraryState,
  history: &[CommitInfo],
  previous_tag: Option<String>,
  pinned: Option<Version>,
  repo: Option<GitHubRepo>,
  date: &str,
) -> LibrarianResult<Option<LibraryRelease>> {
  let mut commits = Vec::new();
  for commit in history {
    commits.extend(entries_for_library(&commit.message, &commit.sha, &library.id)?);
  }

  let bump = VersionBump::from_commits(&commits);
  if bump == VersionBump::None {
    return Ok(None);
  }

  let previous = library.current_version()?;
  let base = previous.clone().unwrap_or_else(|| Version::new(0, 0, 0));
  let version = next_version(&base, bump, pinned);

  let mut changelog = Changelog::new(
    version.to_string(),
    date.to_string(),
    library.render_tag(&version.to_string()),
  )
  .with_previous_tag(previous_tag)
  .with_repo(repo);
  for commit in &commits {
    changelog.add_commit(commit.clone());
  }

  Ok(Some(LibraryRelease {
    library_id: library.id.clone(),
    previous,
    version,
    bump,
    commits,
    changelog,
  }))
}
