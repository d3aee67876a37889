//! Load and save `.librarian/state.yaml`
//!
//! Saves are deterministic: libraries are written in ID order, fields in
//! declaration order, unknown fields in key order. Saving the same logical
//! state twice yields byte-identical files, which keeps diffs minimal.

use crate::core::error::{ConfigError, LibrarianError, LibrarianResult, ResultExt};
use crate::state::model::LibrarianState;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory holding librarian files inside a repository
pub const LIBRARIAN_DIR: &str = ".librarian";

/// State file name inside [`LIBRARIAN_DIR`]
pub const STATE_FILE: &str = "state.yaml";

/// Repo-relative path of the state file (also used for remote reads)
pub fn state_file_path() -> String {
  format!("{}/{}", LIBRARIAN_DIR, STATE_FILE)
}

/// Owner of the on-disk state representation
#[derive(Debug, Clone)]
pub struct StateStore {
  path: PathBuf,
}

impl StateStore {
  /// Store for the state file of the repository at `repo_root`
  pub fn for_repo(repo_root: &Path) -> Self {
    Self {
      path: repo_root.join(LIBRARIAN_DIR).join(STATE_FILE),
    }
  }

  /// Store at an explicit file path
  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn exists(&self) -> bool {
    self.path.exists()
  }

  /// Load and validate the state file
  pub fn load(&self) -> LibrarianResult<LibrarianState> {
    if !self.path.exists() {
      return Err(LibrarianError::Config(ConfigError::NotFound {
        path: self.path.clone(),
      }));
    }

    let content =
      fs::read_to_string(&self.path).with_context(|| format!("Failed to read state from {}", self.path.display()))?;
    parse_state(&content, &self.path.display().to_string())
  }

  /// Validate and write the state atomically
  pub fn save(&self, state: &LibrarianState) -> LibrarianResult<()> {
    let content = render_state(state)?;

    let dir = self
      .path
      .parent()
      .ok_or_else(|| LibrarianError::invalid(format!("state path {} has no parent", self.path.display())))?;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp
      .persist(&self.path)
      .map_err(|e| LibrarianError::Io(e.error))
      .with_context(|| format!("Failed to write state to {}", self.path.display()))?;

    tracing::debug!(path = %self.path.display(), libraries = state.libraries.len(), "saved state");
    Ok(())
  }
}

/// Parse and validate state from YAML text. `origin` names the source in errors.
pub fn parse_state(content: &str, origin: &str) -> LibrarianResult<LibrarianState> {
  let state: LibrarianState =
    serde_yaml::from_str(content).map_err(|e| LibrarianError::parse(format!("state file {}", origin), e.to_string()))?;
  state.validate()?;
  Ok(state)
}

/// Canonical YAML rendering of a state
pub fn render_state(state: &LibrarianState) -> LibrarianResult<String> {
  state.validate()?;
  let mut content = serde_yaml::to_string(&state.canonicalized())?;
  while content.ends_with("\n\n") {
    content.pop();
  }
  if !content.ends_with('\n') {
    content.push('\n');
  }
  Ok(content)
}
