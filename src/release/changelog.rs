//! Changelog rendering from parsed conventional commits
//!
//! One [`Changelog`] covers one library release. Entries are grouped into
//! fixed, ordered sections; breaking entries are also listed up front.

use crate::github::GitHubRepo;
use crate::release::commit::{CommitType, ParsedCommit};
use std::collections::BTreeMap;

/// Changelog file name inside a library's first source root
pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

const TITLE: &str = "# Changelog";
const BREAKING_TITLE: &str = "⚠ BREAKING CHANGES";

/// Generated changelog section for one release
#[derive(Debug, Clone)]
pub struct Changelog {
  pub version: String,
  /// Release date (YYYY-MM-DD)
  pub date: String,
  /// Tag of the previous release, if there was one
  pub previous_tag: Option<String>,
  pub tag: String,
  /// Repository used for compare and commit links
  pub repo: Option<GitHubRepo>,
  /// Commits grouped by type, in commit order
  pub commits_by_type: BTreeMap<CommitType, Vec<ParsedCommit>>,
}

impl Changelog {
  /// Create a new changelog
  pub fn new(version: String, date: String, tag: String) -> Self {
    Self {
      version,
      date,
      previous_tag: None,
      tag,
      repo: None,
      commits_by_type: BTreeMap::new(),
    }
  }

  pub fn with_previous_tag(mut self, previous_tag: Option<String>) -> Self {
    self.previous_tag = previous_tag;
    self
  }

  pub fn with_repo(mut self, repo: Option<GitHubRepo>) -> Self {
    self.repo = repo;
    self
  }

  /// Add a commit to the changelog
  pub fn add_commit(&mut self, commit: ParsedCommit) {
    self.commits_by_type.entry(commit.commit_type).or_default().push(commit);
  }

  pub fn is_empty(&self) -> bool {
    self.commits_by_type.values().all(|c| c.is_empty())
  }

  /// Version heading, linked to the compare view when possible
  pub fn heading(&self) -> String {
    match (&self.repo, &self.previous_tag) {
      (Some(repo), Some(previous)) => format!(
        "## [{}]({}/compare/{}...{}) ({})",
        self.version,
        repo.html_url(),
        previous,
        self.tag,
        self.date
      ),
      _ => format!("## {} ({})", self.version, self.date),
    }
  }

  fn render_entry(&self, commit: &ParsedCommit, text: &str) -> String {
    let scope = commit
      .scope
      .as_ref()
      .map(|s| format!("**{}:** ", s))
      .unwrap_or_default();
    let short = &commit.sha[..commit.sha.len().min(7)];
    let link = match &self.repo {
      Some(repo) if !short.is_empty() => format!(" ([{}]({}/commit/{}))", short, repo.html_url(), commit.sha),
      _ if !short.is_empty() => format!(" ({})", short),
      _ => String::new(),
    };
    format!("* {}{}{}\n", scope, text, link)
  }

  /// Sections without the heading (used as release notes)
  pub fn notes(&self) -> String {
    let mut output = String::new();

    let breaking: Vec<&ParsedCommit> = CommitType::ALL
      .iter()
      .filter_map(|t| self.commits_by_type.get(t))
      .flatten()
      .filter(|c| c.breaking)
      .collect();
    if !breaking.is_empty() {
      output.push_str(&format!("### {}\n\n", BREAKING_TITLE));
      for commit in breaking {
        let text = commit.breaking_note.as_deref().unwrap_or(&commit.description);
        output.push_str(&self.render_entry(commit, text));
      }
      output.push('\n');
    }

    for commit_type in &CommitType::ALL {
      let Some(commits) = self.commits_by_type.get(commit_type) else {
        continue;
      };
      if commits.is_empty() {
        continue;
      }

      output.push_str(&format!("### {}\n\n", commit_type.section_title()));
      for commit in commits {
        output.push_str(&self.render_entry(commit, &commit.description));
      }
      output.push('\n');
    }

    output.trim_end().to_string()
  }

  /// Render as markdown with the version heading
  pub fn to_markdown(&self) -> String {
    format!("{}\n\n{}\n", self.heading(), self.notes())
  }
}

/// Prepend `section` to existing changelog content, keeping the top-level title first
pub fn prepend(existing: &str, section: &str) -> String {
  let rest = existing.trim_start();
  let rest = rest.strip_prefix(TITLE).unwrap_or(rest).trim_start();
  if rest.is_empty() {
    format!("{}\n\n{}", TITLE, section)
  } else {
    format!("{}\n\n{}\n{}", TITLE, section, rest)
  }
}
