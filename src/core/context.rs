//! Repository context - build once, pass everywhere
//!
//! Every command works against one language repository. [`RepoContext`]
//! resolves it (local path or clone), loads the state and overrides, and
//! figures out the GitHub coordinates from `origin`.

use crate::core::error::{LibrarianError, LibrarianResult};
use crate::core::vcs::SystemGit;
use crate::github::GitHubRepo;
use crate::state::{LibrarianConfig, LibrarianState, StateStore};
use crate::utils::is_local_path;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Remote used for pushes and GitHub coordinates
pub const ORIGIN: &str = "origin";

pub struct RepoContext {
  /// Working tree root (absolute path)
  pub root: PathBuf,

  pub git: SystemGit,

  pub store: StateStore,

  /// State snapshot as loaded
  pub state: LibrarianState,

  /// Human-edited overrides
  pub overrides: LibrarianConfig,

  /// GitHub repository behind `origin`, when it is one
  pub github: Option<GitHubRepo>,

  /// Keeps a cloned checkout alive for the lifetime of the context
  _clone: Option<TempDir>,
}

impl RepoContext {
  /// Resolve `--repo` (default: current directory) and load its state.
  ///
  /// A non-local value is cloned into a temporary directory.
  pub fn build(repo: Option<&str>) -> LibrarianResult<Self> {
    match repo {
      Some(url) if Self::is_remote(repo) => {
        let dir = TempDir::new()?;
        let checkout = dir.path().join("repo");
        let git = SystemGit::clone_repo(url, &checkout)?;
        Self::load(git, Some(dir))
      }
      Some(path) => Self::open(Path::new(path)),
      None => Self::open(&std::env::current_dir()?),
    }
  }

  /// Whether `--repo` names a repository that [`RepoContext::build`] clones
  pub fn is_remote(repo: Option<&str>) -> bool {
    repo.is_some_and(|url| !is_local_path(url) && !Path::new(url).exists())
  }

  /// Open a local checkout
  pub fn open(path: &Path) -> LibrarianResult<Self> {
    Self::load(SystemGit::open(path)?, None)
  }

  fn load(git: SystemGit, clone: Option<TempDir>) -> LibrarianResult<Self> {
    let root = git.work_tree().to_path_buf();
    let store = StateStore::for_repo(&root);
    let state = store.load()?;
    let overrides = LibrarianConfig::load(&root)?;

    let github = match git.get_remote_url(ORIGIN)? {
      Some(url) => match GitHubRepo::parse(&url) {
        Ok(repo) => Some(repo),
        Err(_) => {
          tracing::debug!(url, "origin is not a GitHub repository");
          None
        }
      },
      None => None,
    };

    tracing::debug!(root = %root.display(), libraries = state.libraries.len(), "loaded repository context");
    Ok(Self {
      root,
      git,
      store,
      state,
      overrides,
      github,
      _clone: clone,
    })
  }

  /// GitHub coordinates or a helpful error
  pub fn require_github(&self) -> LibrarianResult<&GitHubRepo> {
    self.github.as_ref().ok_or_else(|| {
      LibrarianError::with_help(
        "The repository's origin remote is not a GitHub repository",
        "Set origin to https://github.com/<owner>/<repo> before using --push.",
      )
    })
  }

  /// Directory containing generator configuration, if the repository has one
  pub fn generator_input(&self) -> Option<PathBuf> {
    let dir = self
      .root
      .join(crate::state::store::LIBRARIAN_DIR)
      .join("generator-input");
    dir.is_dir().then_some(dir)
  }
}
