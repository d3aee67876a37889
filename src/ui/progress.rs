//! Progress indicators for fan-out operations
//!
//! Uses `linya`, whose bars are cheap to tick from many threads at once.
//! Bars are only drawn when stderr is a terminal and there is more than one
//! unit to wait for.

use linya::{Bar, Progress};
use std::io::IsTerminal;
use std::sync::{Arc, Mutex};

/// One bar ticked once per finished unit (thread-safe)
#[derive(Clone, Default)]
pub struct UnitProgress {
  inner: Option<Arc<Mutex<(Progress, Bar)>>>,
}

impl UnitProgress {
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    if total < 2 || !std::io::stderr().is_terminal() {
      return Self::hidden();
    }
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      inner: Some(Arc::new(Mutex::new((progress, bar)))),
    }
  }

  /// A bar that never draws
  pub fn hidden() -> Self {
    Self { inner: None }
  }

  /// Mark one unit finished
  pub fn inc(&self) {
    if let Some(inner) = &self.inner
      && let Ok(mut guard) = inner.lock()
    {
      let (progress, bar) = &mut *guard;
      progress.inc_and_draw(bar, 1);
    }
  }
}
