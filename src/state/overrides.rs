//! Per-library overrides from `.librarian/config.yaml`
//!
//! Overrides are edited by humans, unlike the state file which the tool owns.
//! They block generation or release for a library and can pin the next
//! release version.

use crate::core::error::{LibrarianError, LibrarianResult, ResultExt};
use crate::state::store::LIBRARIAN_DIR;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Override file name inside `.librarian/`
pub const CONFIG_FILE: &str = "config.yaml";

/// Overrides for one library
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LibraryConfig {
  pub id: String,

  #[serde(default)]
  pub generate_blocked: bool,

  #[serde(default)]
  pub release_blocked: bool,

  /// Force the next release to this version (when higher than computed)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next_version: Option<String>,
}

/// Contents of `.librarian/config.yaml`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LibrarianConfig {
  #[serde(default)]
  pub libraries: Vec<LibraryConfig>,
}

impl LibrarianConfig {
  /// Load overrides for a repository; a missing file means no overrides
  pub fn load(repo_root: &Path) -> LibrarianResult<Self> {
    let path = repo_root.join(LIBRARIAN_DIR).join(CONFIG_FILE);
    if !path.exists() {
      return Ok(Self::default());
    }

    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Self = serde_yaml::from_str(&content)
      .map_err(|e| LibrarianError::parse(format!("config file {}", path.display()), e.to_string()))?;

    for library in &config.libraries {
      if let Some(version) = &library.next_version {
        semver::Version::parse(version)
          .map_err(|e| LibrarianError::parse(format!("next_version of '{}'", library.id), e.to_string()))?;
      }
    }
    Ok(config)
  }

  pub fn for_library(&self, id: &str) -> Option<&LibraryConfig> {
    self.libraries.iter().find(|l| l.id == id)
  }

  pub fn generate_blocked(&self, id: &str) -> bool {
    self.for_library(id).is_some_and(|l| l.generate_blocked)
  }

  pub fn release_blocked(&self, id: &str) -> bool {
    self.for_library(id).is_some_and(|l| l.release_blocked)
  }

  /// Pinned next version, if configured
  pub fn next_version(&self, id: &str) -> Option<semver::Version> {
    self
      .for_library(id)
      .and_then(|l| l.next_version.as_deref())
      .and_then(|v| semver::Version::parse(v).ok())
  }
}
