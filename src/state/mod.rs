//! Persisted per-repository state
//!
//! - **model**: `LibrarianState` / `LibraryState` and their invariants
//! - **store**: deterministic load/save of `.librarian/state.yaml`
//! - **overrides**: human-edited per-library overrides (`.librarian/config.yaml`)

pub mod model;
pub mod overrides;
pub mod store;

pub use model::{Api, LibrarianState, LibraryState};
pub use overrides::LibrarianConfig;
pub use store::StateStore;
