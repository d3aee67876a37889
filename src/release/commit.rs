//! Conventional commit parsing
//!
//! Every line of a commit message that looks like `type(scope)!: description`
//! is an entry of its own, so one commit can carry several changes. A
//! `BREAKING CHANGE:` footer marks the latest entry breaking.
//!
//! Commits that touch many libraries can spell out per-library entries:
//!
//! ```text
//! chore: regenerate everything
//!
//! BEGIN_COMMIT_OVERRIDE
//! BEGIN_NESTED_COMMIT
//! [pubsub] feat: add ordering keys
//! fix: handle empty batches
//! END_NESTED_COMMIT
//! BEGIN_NESTED_COMMIT
//! [storage] fix: retry on 503
//! END_NESTED_COMMIT
//! END_COMMIT_OVERRIDE
//! ```
//!
//! With an override block the outer subject contributes nothing. Unprefixed
//! lines inside a nested block inherit the block's latest `[id]` prefix, or
//! the library being scanned when there is none.

use crate::core::error::{LibrarianError, LibrarianResult};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

const BEGIN_OVERRIDE: &str = "BEGIN_COMMIT_OVERRIDE";
const END_OVERRIDE: &str = "END_COMMIT_OVERRIDE";
const BEGIN_NESTED: &str = "BEGIN_NESTED_COMMIT";
const END_NESTED: &str = "END_NESTED_COMMIT";

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(?P<type>[A-Za-z]+)(?:\((?P<scope>[^()]*)\))?(?P<bang>!)?:\s*(?P<desc>\S.*)$")
    .expect("valid regex")
});

static LIBRARY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^\[(?P<id>[^\]\s]+)\]\s*(?P<rest>.*)$").expect("valid regex")
});

/// Conventional commit types, in changelog section order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommitType {
  Feat,
  Fix,
  Perf,
  Revert,
  Docs,
  Deps,
  Refactor,
  Test,
  Build,
  Ci,
  Chore,
  Style,
}

impl CommitType {
  /// All types in section order
  pub const ALL: [CommitType; 12] = [
    CommitType::Feat,
    CommitType::Fix,
    CommitType::Perf,
    CommitType::Revert,
    CommitType::Docs,
    CommitType::Deps,
    CommitType::Refactor,
    CommitType::Test,
    CommitType::Build,
    CommitType::Ci,
    CommitType::Chore,
    CommitType::Style,
  ];

  /// Case-insensitive lookup; unknown types are not recognized
  pub fn parse(s: &str) -> Option<Self> {
    match s.to_ascii_lowercase().as_str() {
      "feat" => Some(Self::Feat),
      "fix" => Some(Self::Fix),
      "perf" => Some(Self::Perf),
      "revert" => Some(Self::Revert),
      "docs" => Some(Self::Docs),
      "deps" => Some(Self::Deps),
      "refactor" => Some(Self::Refactor),
      "test" => Some(Self::Test),
      "build" => Some(Self::Build),
      "ci" => Some(Self::Ci),
      "chore" => Some(Self::Chore),
      "style" => Some(Self::Style),
      _ => None,
    }
  }

  /// Changelog section title
  pub fn section_title(&self) -> &'static str {
    match self {
      Self::Feat => "Features",
      Self::Fix => "Bug Fixes",
      Self::Perf => "Performance Improvements",
      Self::Revert => "Reverts",
      Self::Docs => "Documentation",
      Self::Deps => "Dependencies",
      Self::Refactor => "Code Refactoring",
      Self::Test => "Tests",
      Self::Build => "Build System",
      Self::Ci => "Continuous Integration",
      Self::Chore => "Miscellaneous Chores",
      Self::Style => "Styles",
    }
  }
}

impl fmt::Display for CommitType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.section_title())
  }
}

/// One conventional entry attributed to one library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit {
  pub commit_type: CommitType,
  pub scope: Option<String>,
  pub description: String,
  pub breaking: bool,
  /// Text of a `BREAKING CHANGE:` footer, if any
  pub breaking_note: Option<String>,
  pub library_id: String,
  /// Source commit
  pub sha: String,
}

/// Parse a `type(scope)!: description` line
fn parse_header(line: &str, library_id: &str, sha: &str) -> Option<ParsedCommit> {
  let caps = HEADER.captures(line.trim())?;
  let commit_type = CommitType::parse(&caps["type"])?;
  Some(ParsedCommit {
    commit_type,
    scope: caps
      .name("scope")
      .map(|m| m.as_str().trim().to_string())
      .filter(|s| !s.is_empty()),
    description: caps["desc"].trim().to_string(),
    breaking: caps.name("bang").is_some(),
    breaking_note: None,
    library_id: library_id.to_string(),
    sha: sha.to_string(),
  })
}

/// `BREAKING CHANGE: text` / `BREAKING-CHANGE: text`
fn breaking_footer(line: &str) -> Option<&str> {
  let (key, value) = line.trim().split_once(':')?;
  let key = key.trim();
  (key.eq_ignore_ascii_case("BREAKING CHANGE") || key.eq_ignore_ascii_case("BREAKING-CHANGE")).then(|| value.trim())
}

/// Feed one line into `entries`, handling breaking footers
fn push_line(entries: &mut Vec<ParsedCommit>, line: &str, library_id: &str, sha: &str) {
  if let Some(note) = breaking_footer(line) {
    if let Some(last) = entries.last_mut() {
      last.breaking = true;
      if !note.is_empty() {
        last.breaking_note = Some(note.to_string());
      }
    }
    return;
  }
  if let Some(entry) = parse_header(line, library_id, sha) {
    entries.push(entry);
  }
}

/// Parse every conventional entry in one commit message.
///
/// `library_id` is the library whose history is being scanned; entries without
/// an explicit `[id]` prefix are attributed to it. Callers filter the result by
/// library.
pub fn parse_message(message: &str, sha: &str, library_id: &str) -> LibrarianResult<Vec<ParsedCommit>> {
  let lines: Vec<&str> = message.lines().collect();

  let Some(start) = lines.iter().position(|l| l.trim() == BEGIN_OVERRIDE) else {
    let mut entries = Vec::new();
    for line in &lines {
      push_line(&mut entries, line, library_id, sha);
    }
    return Ok(entries);
  };

  let end = lines[start + 1..]
    .iter()
    .position(|l| l.trim() == END_OVERRIDE)
    .map(|offset| start + 1 + offset)
    .ok_or_else(|| {
      LibrarianError::parse(
        format!("commit {}", sha),
        format!("{} without {}", BEGIN_OVERRIDE, END_OVERRIDE),
      )
    })?;

  parse_override_body(&lines[start + 1..end], sha, library_id)
}

/// Lines between the override markers. Each nested block restarts prefix inheritance.
fn parse_override_body(lines: &[&str], sha: &str, library_id: &str) -> LibrarianResult<Vec<ParsedCommit>> {
  let mut entries = Vec::new();
  let mut in_nested = false;
  let mut block_entries: Vec<ParsedCommit> = Vec::new();
  let mut prefix: Option<String> = None;

  for line in lines {
    let trimmed = line.trim();
    if trimmed == BEGIN_NESTED {
      if in_nested {
        return Err(LibrarianError::parse(
          format!("commit {}", sha),
          format!("{} inside an open nested block", BEGIN_NESTED),
        ));
      }
      in_nested = true;
      prefix = None;
      continue;
    }
    if trimmed == END_NESTED {
      in_nested = false;
      entries.append(&mut block_entries);
      continue;
    }

    let (target, rest) = match LIBRARY_PREFIX.captures(trimmed) {
      Some(caps) => {
        let id = caps["id"].to_string();
        let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("").to_string();
        prefix = Some(id.clone());
        (id, rest)
      }
      None => (
        prefix.clone().unwrap_or_else(|| library_id.to_string()),
        trimmed.to_string(),
      ),
    };

    if in_nested {
      push_line(&mut block_entries, &rest, &target, sha);
    } else {
      push_line(&mut entries, &rest, &target, sha);
    }
  }

  if in_nested {
    return Err(LibrarianError::parse(
      format!("commit {}", sha),
      format!("{} without {}", BEGIN_NESTED, END_NESTED),
    ));
  }

  Ok(entries)
}

/// Entries attributed to `library_id`
pub fn entries_for_library(message: &str, sha: &str, library_id: &str) -> LibrarianResult<Vec<ParsedCommit>> {
  Ok(
    parse_message(message, sha, library_id)?
      .into_iter()
      .filter(|c| c.library_id == library_id)
      .collect(),
  )
}
