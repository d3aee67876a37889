//! Persisted library registry
//!
//! One [`LibrarianState`] lives in each repository at `.librarian/state.yaml`.
//! It lists every library the repository publishes, which directories each
//! library owns, and where generation and release left off.
//!
//! Fields this version does not know about are kept in `extra` maps so that
//! a load/save round trip never drops data written by a newer tool.

use crate::core::error::{LibrarianError, LibrarianResult, ValidationError};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag format used when a library does not declare one
pub const DEFAULT_TAG_FORMAT: &str = "{id}-v{version}";

const VERSION_TOKEN: &str = "{version}";
const ID_TOKEN: &str = "{id}";

/// Repository-wide state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LibrarianState {
  /// Generator container image reference
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub image: String,

  #[serde(default)]
  pub libraries: Vec<LibraryState>,

  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// One API surface owned by a library
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Api {
  pub path: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub service_config: String,

  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// State of one library
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LibraryState {
  pub id: String,

  /// Last released version; empty if never released
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub version: String,

  /// API-source commit the library was last generated from
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub last_generated_commit: String,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub apis: Vec<Api>,

  /// Repo-relative directories owned exclusively by this library
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub source_roots: Vec<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub preserve_regex: Vec<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub remove_regex: Vec<String>,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub tag_format: String,

  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl LibraryState {
  /// Create a library with just an ID (used by onboarding and tests)
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      ..Default::default()
    }
  }

  /// Effective tag format (falls back to [`DEFAULT_TAG_FORMAT`])
  pub fn tag_format(&self) -> &str {
    if self.tag_format.is_empty() {
      DEFAULT_TAG_FORMAT
    } else {
      &self.tag_format
    }
  }

  /// Render the release tag for `version`
  pub fn render_tag(&self, version: &str) -> String {
    render_tag(self.tag_format(), &self.id, version)
  }

  /// Parsed current version, `None` if the library was never released
  pub fn current_version(&self) -> LibrarianResult<Option<Version>> {
    if self.version.is_empty() {
      return Ok(None);
    }
    Version::parse(&self.version)
      .map(Some)
      .map_err(|e| LibrarianError::parse(format!("version of '{}'", self.id), e.to_string()))
  }

  /// Advance the version. Versions only move forward.
  pub fn set_version(&mut self, next: &Version) -> LibrarianResult<()> {
    if let Some(current) = self.current_version()?
      && *next <= current
    {
      return Err(LibrarianError::Validation(ValidationError::VersionRegression {
        id: self.id.clone(),
        current: current.to_string(),
        proposed: next.to_string(),
      }));
    }
    self.version = next.to_string();
    Ok(())
  }

  /// Whether a repo-relative path falls under one of this library's source roots
  pub fn owns_path(&self, path: &str) -> bool {
    self.source_roots.iter().any(|root| path_under_root(path, root))
  }

  /// Whether the library owns the given API path
  pub fn has_api(&self, path: &str) -> bool {
    self.apis.iter().any(|api| api.path == path)
  }
}

impl LibrarianState {
  pub fn find_library(&self, id: &str) -> Option<&LibraryState> {
    self.libraries.iter().find(|l| l.id == id)
  }

  pub fn find_library_mut(&mut self, id: &str) -> Option<&mut LibraryState> {
    self.libraries.iter_mut().find(|l| l.id == id)
  }

  /// Library owning a given API path
  pub fn library_for_api(&self, api_path: &str) -> Option<&LibraryState> {
    self.libraries.iter().find(|l| l.has_api(api_path))
  }

  /// Check every invariant of the registry.
  ///
  /// - IDs are unique
  /// - source roots of distinct libraries never overlap
  /// - tag formats carry exactly one `{version}` placeholder
  /// - non-empty versions are valid semver
  pub fn validate(&self) -> LibrarianResult<()> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for (idx, library) in self.libraries.iter().enumerate() {
      if library.id.trim().is_empty() {
        return Err(LibrarianError::invalid(format!("library at position {} has an empty id", idx)));
      }
      if seen.insert(&library.id, idx).is_some() {
        return Err(LibrarianError::Validation(ValidationError::DuplicateLibrary {
          id: library.id.clone(),
        }));
      }
      validate_tag_format(&library.id, library.tag_format())?;
      library.current_version()?;
    }

    for (i, first) in self.libraries.iter().enumerate() {
      for second in &self.libraries[i + 1..] {
        for a in &first.source_roots {
          for b in &second.source_roots {
            if roots_overlap(a, b) {
              return Err(LibrarianError::Validation(ValidationError::OverlappingSourceRoots {
                first: first.id.clone(),
                second: second.id.clone(),
                root: if a.len() <= b.len() { a.clone() } else { b.clone() },
              }));
            }
          }
        }
      }
    }

    Ok(())
  }

  /// Copy with libraries ordered by ID (the on-disk order)
  pub fn canonicalized(&self) -> Self {
    let mut state = self.clone();
    state.libraries.sort_by(|a, b| a.id.cmp(&b.id));
    state
  }
}

/// Substitute `{id}` and `{version}` into a tag format
pub fn render_tag(format: &str, id: &str, version: &str) -> String {
  format.replace(ID_TOKEN, id).replace(VERSION_TOKEN, version)
}

/// A tag format must contain exactly one `{version}` token
pub fn validate_tag_format(id: &str, format: &str) -> LibrarianResult<()> {
  if format.matches(VERSION_TOKEN).count() != 1 {
    return Err(LibrarianError::Validation(ValidationError::TagFormat {
      id: id.to_string(),
      format: format.to_string(),
    }));
  }
  Ok(())
}

fn normalize_root(root: &str) -> &str {
  let trimmed = root.trim_end_matches('/');
  let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
  if trimmed == "." { "" } else { trimmed }
}

/// `path` equals `root` or lies beneath it (component-wise)
pub fn path_under_root(path: &str, root: &str) -> bool {
  let root = normalize_root(root);
  if root.is_empty() {
    return true;
  }
  let path = path.trim_end_matches('/');
  path == root || (path.starts_with(root) && path.as_bytes().get(root.len()) == Some(&b'/'))
}

/// Two roots overlap when one contains the other
pub fn roots_overlap(a: &str, b: &str) -> bool {
  path_under_root(normalize_root(a), b) || path_under_root(normalize_root(b), a)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn library(id: &str, roots: &[&str]) -> LibraryState {
    LibraryState {
      source_roots: roots.iter().map(|r| r.to_string()).collect(),
      ..LibraryState::new(id)
    }
  }

  #[test]
  fn test_render_tag_default_and_custom() {
    let mut lib = LibraryState::new("storage");
    assert_eq!(lib.render_tag("1.2.0"), "storage-v1.2.0");

    lib.tag_format = "{id}/v{version}".to_string();
    assert_eq!(lib.render_tag("1.2.0"), "storage/v1.2.0");

    lib.tag_format = "v{version}".to_string();
    assert_eq!(lib.render_tag("0.9.0"), "v0.9.0");
  }

  #[test]
  fn test_tag_format_requires_single_version_token() {
    assert!(validate_tag_format("a", "{id}-v{version}").is_ok());
    assert!(validate_tag_format("a", "{id}").is_err());
    assert!(validate_tag_format("a", "{version}-{version}").is_err());
  }

  #[test]
  fn test_roots_overlap_is_component_wise() {
    assert!(roots_overlap("a/b", "a/b"));
    assert!(roots_overlap("a/b", "a/b/c"));
    assert!(roots_overlap("a/b/c/", "a/b"));
    assert!(!roots_overlap("a/b", "a/bc"));
    assert!(roots_overlap(".", "anything"));
  }

  #[test]
  fn test_validate_rejects_duplicates_and_overlaps() {
    let state = LibrarianState {
      libraries: vec![library("a", &["x"]), library("a", &["y"])],
      ..Default::default()
    };
    assert!(matches!(
      state.validate(),
      Err(LibrarianError::Validation(ValidationError::DuplicateLibrary { .. }))
    ));

    let state = LibrarianState {
      libraries: vec![library("a", &["x"]), library("b", &["x/y"])],
      ..Default::default()
    };
    assert!(matches!(
      state.validate(),
      Err(LibrarianError::Validation(ValidationError::OverlappingSourceRoots { .. }))
    ));

    let state = LibrarianState {
      libraries: vec![library("a", &["x"]), library("b", &["xy"])],
      ..Default::default()
    };
    assert!(state.validate().is_ok());
  }

  #[test]
  fn test_set_version_only_advances() {
    let mut lib = LibraryState::new("a");
    lib.set_version(&Version::new(0, 1, 0)).unwrap();
    assert_eq!(lib.version, "0.1.0");

    assert!(lib.set_version(&Version::new(0, 1, 0)).is_err());
    assert!(lib.set_version(&Version::new(0, 0, 9)).is_err());
    lib.set_version(&Version::new(1, 0, 0)).unwrap();
    assert_eq!(lib.version, "1.0.0");
  }

  #[test]
  fn test_owns_path() {
    let lib = library("a", &["packages/a", "docs/a"]);
    assert!(lib.owns_path("packages/a/src/lib.rs"));
    assert!(lib.owns_path("docs/a"));
    assert!(!lib.owns_path("packages/ab/src/lib.rs"));
  }
}
