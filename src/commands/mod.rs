//! CLI commands
//!
//! Each command resolves its collaborators (repository context, container
//! runtime, REST clients), calls into the engine and prints a summary.
//!
//! - **generate** / **configure**: regenerate or onboard libraries
//! - **release**: `release init` and `release tag-and-release`
//! - **automation**: trigger a pipeline across the repository registry
//! - **migrate**: derive `librarian.toml` from state and overrides

pub mod automation;
pub mod generate;
pub mod migrate;
pub mod release;

pub use automation::run_automation;
pub use generate::{run_configure, run_generate};
pub use migrate::run_migrate_config;
pub use release::{run_release_init, run_tag_and_release};

use crate::core::context::RepoContext;
use crate::core::error::{LibrarianError, LibrarianResult};
use crate::github::GitHubClient;
use crate::github::rest::RestGitHub;

/// GitHub client, only when the command will talk to GitHub
fn github_client(push: bool) -> LibrarianResult<Option<Box<dyn GitHubClient>>> {
  if !push {
    return Ok(None);
  }
  Ok(Some(Box::new(RestGitHub::from_env()?)))
}

/// A cloned `--repo` lives in a temporary directory, so its changes only
/// survive when they are pushed
fn require_push_for_remote(repo: Option<&str>, push: bool) -> LibrarianResult<()> {
  if push || !RepoContext::is_remote(repo) {
    return Ok(());
  }
  Err(LibrarianError::with_help(
    format!("--repo {} is cloned into a temporary directory that is deleted on exit", repo.unwrap_or_default()),
    "Pass --push to publish the changes, or point --repo at a local checkout.",
  ))
}

/// Surface a unit-level failure after the summary has been printed
fn finish(failure: Option<LibrarianError>) -> LibrarianResult<()> {
  match failure {
    Some(err) => Err(err),
    None => Ok(()),
  }
}
