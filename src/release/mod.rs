//! Release engine
//!
//! - **commit**: conventional-commit parsing, including override blocks
//! - **version**: bump derivation and next-version arithmetic
//! - **changelog**: per-library changelog sections
//! - **notes**: the release PR body format
//! - **engine**: per-library history scan and release plan
//! - **init**: `release init`
//! - **tag_and_release**: `release tag-and-release`

pub mod changelog;
pub mod commit;
pub mod engine;
pub mod init;
pub mod notes;
pub mod tag_and_release;
pub mod version;

pub use engine::{LibraryRelease, ReleaseEngine};
pub use init::{InitOptions, InitReport, run_release_init};
pub use tag_and_release::{TagOptions, TagReport, run_tag_and_release};
pub use version::VersionBump;
