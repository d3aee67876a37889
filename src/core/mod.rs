//! Core building blocks shared by every command
//!
//! - **cancel**: cooperative cancellation with per-unit deadlines
//! - **config**: derived `librarian.toml` (migrate-config)
//! - **context**: the resolved language repository (root, git, state, overrides)
//! - **error**: error types with contextual help messages and exit codes
//! - **outcome**: per-unit results for fan-out operations
//! - **vcs**: Git operations abstraction (SystemGit)

pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod outcome;
pub mod vcs;
