//! In-memory build-trigger service used by unit tests

use super::trigger::{BuildTriggerClient, Location, Trigger, TriggerPage};
use crate::core::error::{LibrarianError, LibrarianResult};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Recorded trigger run
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
  pub trigger_id: String,
  pub substitutions: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct FakeTriggers {
  pages: Vec<Vec<Trigger>>,
  fetched: AtomicUsize,
  fail_listing: AtomicBool,
  runs: Mutex<Vec<Run>>,
}

impl FakeTriggers {
  /// Pages of trigger names; IDs are `{name}-{page}-{index}`
  pub fn with_pages(pages: Vec<Vec<&str>>) -> Self {
    let pages = pages
      .into_iter()
      .enumerate()
      .map(|(p, names)| {
        names
          .into_iter()
          .enumerate()
          .map(|(i, name)| Trigger {
            id: format!("{}-{}-{}", name, p, i),
            name: name.to_string(),
          })
          .collect()
      })
      .collect();
    Self {
      pages,
      ..Default::default()
    }
  }

  pub fn fail_listing(&self) {
    self.fail_listing.store(true, Ordering::SeqCst);
  }

  pub fn pages_fetched(&self) -> usize {
    self.fetched.load(Ordering::SeqCst)
  }

  pub fn runs(&self) -> Vec<Run> {
    self.runs.lock().unwrap().clone()
  }
}

impl BuildTriggerClient for FakeTriggers {
  fn list_page(&self, _location: &Location, page_token: Option<&str>) -> LibrarianResult<TriggerPage> {
    if self.fail_listing.load(Ordering::SeqCst) {
      return Err(LibrarianError::external("Cloud Build", "503: unavailable"));
    }
    self.fetched.fetch_add(1, Ordering::SeqCst);
    let index: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
    let triggers = self.pages.get(index).cloned().unwrap_or_default();
    let next_page_token = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
    Ok(TriggerPage {
      triggers,
      next_page_token,
    })
  }

  fn run_trigger(
    &self,
    _location: &Location,
    trigger_id: &str,
    substitutions: &BTreeMap<String, String>,
  ) -> LibrarianResult<String> {
    let mut runs = self.runs.lock().unwrap();
    runs.push(Run {
      trigger_id: trigger_id.to_string(),
      substitutions: substitutions.clone(),
    });
    Ok(format!("build-{}", runs.len()))
  }
}
