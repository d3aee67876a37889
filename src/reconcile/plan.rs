//! Reconcile plans
//!
//! A plan is the exact list of file operations needed to bring a library's
//! source roots in line with freshly staged output. Operations that would not
//! change any bytes are left out, so applying the same staged tree twice
//! leaves the second plan empty.

use std::fmt;

/// One file operation, with a repo-relative forward-slash path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
  Remove { path: String },
  Write { path: String },
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operation::Remove { path } => write!(f, "- {}", path),
      Operation::Write { path } => write!(f, "+ {}", path),
    }
  }
}

/// Operations for one library, removals first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
  pub library: String,
  pub operations: Vec<Operation>,
  /// Staged files whose destination already had identical bytes
  pub unchanged: usize,
  /// Staged files outside every source root
  pub ignored: Vec<String>,
}

impl ReconcilePlan {
  pub fn new(library: impl Into<String>) -> Self {
    Self {
      library: library.into(),
      ..Default::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }

  pub fn removals(&self) -> impl Iterator<Item = &str> {
    self.operations.iter().filter_map(|op| match op {
      Operation::Remove { path } => Some(path.as_str()),
      Operation::Write { .. } => None,
    })
  }

  pub fn writes(&self) -> impl Iterator<Item = &str> {
    self.operations.iter().filter_map(|op| match op {
      Operation::Write { path } => Some(path.as_str()),
      Operation::Remove { .. } => None,
    })
  }

  /// One-line summary for CLI output
  pub fn summary(&self) -> String {
    format!(
      "{}: {} written, {} removed, {} unchanged",
      self.library,
      self.writes().count(),
      self.removals().count(),
      self.unchanged
    )
  }
}
