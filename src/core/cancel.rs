//! Cooperative cancellation for long-running units
//!
//! Container runs and trigger invocations can block for a long time. Each one
//! receives a [`CancelToken`]; cancelling it (or passing its deadline) aborts
//! only the unit that is polling it. Tokens derived with [`CancelToken::child`]
//! share the parent's cancel flag but may carry a tighter deadline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
  cancelled: Arc<AtomicBool>,
  deadline: Option<Instant>,
}

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  /// Derive a token that also expires after `timeout`
  pub fn child(&self, timeout: Option<Duration>) -> Self {
    let deadline = match (self.deadline, timeout.map(|t| Instant::now() + t)) {
      (Some(a), Some(b)) => Some(a.min(b)),
      (a, b) => a.or(b),
    };
    Self {
      cancelled: Arc::clone(&self.cancelled),
      deadline,
    }
  }

  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cancel_propagates_to_children() {
    let parent = CancelToken::new();
    let child = parent.child(None);
    assert!(!child.is_cancelled());
    parent.cancel();
    assert!(child.is_cancelled());
  }

  #[test]
  fn test_deadline_expires() {
    let token = CancelToken::new().child(Some(Duration::from_millis(0)));
    assert!(token.is_cancelled());
  }

  #[test]
  fn test_child_keeps_tighter_deadline() {
    let parent = CancelToken::new().child(Some(Duration::from_millis(0)));
    let child = parent.child(Some(Duration::from_secs(3600)));
    assert!(child.is_cancelled());
  }
}
