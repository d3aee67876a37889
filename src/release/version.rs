//! Version bump policy

use crate::release::commit::{CommitType, ParsedCommit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version bump type based on conventional commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
  /// No recognized commits
  None,
  /// Any recognized commit
  Patch,
  /// New features
  Minor,
  /// Breaking changes
  Major,
}

impl VersionBump {
  /// Bump implied by a library's attributed commits
  pub fn from_commits(commits: &[ParsedCommit]) -> Self {
    if commits.is_empty() {
      VersionBump::None
    } else if commits.iter().any(|c| c.breaking) {
      VersionBump::Major
    } else if commits.iter().any(|c| c.commit_type == CommitType::Feat) {
      VersionBump::Minor
    } else {
      VersionBump::Patch
    }
  }

  /// Apply bump to a semver version.
  ///
  /// Breaking changes before 1.0.0 bump the minor version instead of major.
  pub fn apply(&self, version: &semver::Version) -> semver::Version {
    match self {
      VersionBump::Major if version.major == 0 => semver::Version::new(0, version.minor + 1, 0),
      VersionBump::Major => semver::Version::new(version.major + 1, 0, 0),
      VersionBump::Minor => semver::Version::new(version.major, version.minor + 1, 0),
      VersionBump::Patch => semver::Version::new(version.major, version.minor, version.patch + 1),
      VersionBump::None => version.clone(),
    }
  }
}

impl fmt::Display for VersionBump {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      VersionBump::None => "none",
      VersionBump::Patch => "patch",
      VersionBump::Minor => "minor",
      VersionBump::Major => "major",
    };
    f.write_str(name)
  }
}

/// Pick the version to release: the computed one, or `pinned` when strictly greater
pub fn next_version(current: &semver::Version, bump: VersionBump, pinned: Option<semver::Version>) -> semver::Version {
  let computed = bump.apply(current);
  match pinned {
    Some(pinned) if pinned > computed => pinned,
    _ => computed,
  }
}
