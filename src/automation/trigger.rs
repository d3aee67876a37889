//! Build-trigger collaborator
//!
//! Triggers are listed page by page. [`Triggers`] walks the pages lazily, so
//! a lookup stops at the first exact match without fetching the rest, and
//! calling [`BuildTriggerClient::triggers`] again restarts from the first page.

use crate::core::error::{LibrarianError, LibrarianResult};
use std::collections::BTreeMap;

/// Environment variable holding the Cloud Build access token
pub const TOKEN_ENV: &str = "LIBRARIAN_GCP_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
  pub id: String,
  pub name: String,
}

/// One page of a trigger listing
#[derive(Debug, Clone, Default)]
pub struct TriggerPage {
  pub triggers: Vec<Trigger>,
  /// Absent on the last page
  pub next_page_token: Option<String>,
}

/// Where triggers live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
  pub project: String,
  pub region: String,
}

/// Capabilities the automation fan-out needs from the build service
pub trait BuildTriggerClient: Send + Sync {
  /// Fetch one page; `None` requests the first
  fn list_page(&self, location: &Location, page_token: Option<&str>) -> LibrarianResult<TriggerPage>;

  /// Start a build from `trigger_id`; returns the build ID
  fn run_trigger(
    &self,
    location: &Location,
    trigger_id: &str,
    substitutions: &BTreeMap<String, String>,
  ) -> LibrarianResult<String>;

  /// Lazy listing from the first page
  fn triggers<'a>(&'a self, location: &'a Location) -> Triggers<'a>
  where
    Self: Sized,
  {
    Triggers::new(self, location)
  }
}

/// Lazy iterator over every trigger in a location
pub struct Triggers<'a> {
  client: &'a dyn BuildTriggerClient,
  location: &'a Location,
  buffer: std::vec::IntoIter<Trigger>,
  next_page: Option<String>,
  started: bool,
  failed: bool,
}

impl<'a> Triggers<'a> {
  pub fn new(client: &'a dyn BuildTriggerClient, location: &'a Location) -> Self {
    Self {
      client,
      location,
      buffer: Vec::new().into_iter(),
      next_page: None,
      started: false,
      failed: false,
    }
  }
}

impl Iterator for Triggers<'_> {
  type Item = LibrarianResult<Trigger>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if let Some(trigger) = self.buffer.next() {
        return Some(Ok(trigger));
      }
      if self.failed || (self.started && self.next_page.is_none()) {
        return None;
      }

      let token = self.next_page.take();
      self.started = true;
      match self.client.list_page(self.location, token.as_deref()) {
        Ok(page) => {
          self.buffer = page.triggers.into_iter();
          self.next_page = page.next_page_token.filter(|t| !t.is_empty());
        }
        Err(e) => {
          self.failed = true;
          return Some(Err(e));
        }
      }
    }
  }
}

/// First trigger whose name matches exactly
pub fn find_trigger(client: &dyn BuildTriggerClient, location: &Location, name: &str) -> LibrarianResult<Trigger> {
  for trigger in Triggers::new(client, location) {
    let trigger = trigger?;
    if trigger.name == name {
      return Ok(trigger);
    }
  }
  Err(LibrarianError::TriggerNotFound {
    name: name.to_string(),
    project: location.project.clone(),
    region: location.region.clone(),
  })
}
