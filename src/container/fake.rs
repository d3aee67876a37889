//! Scriptable container runner used by unit tests

use super::{ContainerRequest, ContainerRunner, Verb};
use crate::core::cancel::CancelToken;
use crate::core::error::{ContainerError, LibrarianError, LibrarianResult};
use serde_json::Value;
use std::fs;
use std::sync::Mutex;

/// What the fake container does for one unit
#[derive(Debug, Clone)]
pub enum FakeBehavior {
  /// Write these (path, content) pairs into the output mount and succeed
  Files(Vec<(&'static str, &'static str)>),
  /// Write a response document and files
  Respond { body: Value, files: Vec<(&'static str, &'static str)> },
  /// Exit non-zero
  ExitFailure,
  /// Succeed but report an error in the response
  ReportError(String),
  /// Exit zero without writing a response
  NoResponse,
}

#[derive(Default)]
pub struct FakeRunner {
  behaviors: Vec<(Option<Verb>, String, FakeBehavior)>,
  invocations: Mutex<Vec<(Verb, String)>>,
}

impl FakeRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Behavior for `unit` under every verb
  pub fn with(mut self, unit: &str, behavior: FakeBehavior) -> Self {
    self.behaviors.push((None, unit.to_string(), behavior));
    self
  }

  /// Behavior for `unit` under one verb only
  pub fn with_verb(mut self, verb: Verb, unit: &str, behavior: FakeBehavior) -> Self {
    self.behaviors.push((Some(verb), unit.to_string(), behavior));
    self
  }

  pub fn invocations(&self) -> Vec<(Verb, String)> {
    self.invocations.lock().unwrap().clone()
  }

  fn behavior(&self, verb: Verb, unit: &str) -> Option<&FakeBehavior> {
    self
      .behaviors
      .iter()
      .find(|(v, u, _)| *v == Some(verb) && u == unit)
      .or_else(|| self.behaviors.iter().find(|(v, u, _)| v.is_none() && u == unit))
      .map(|(_, _, b)| b)
  }
}

fn write_files(request: &ContainerRequest, files: &[(&str, &str)]) -> LibrarianResult<()> {
  for (path, content) in files {
    let full = request.mounts.output.join(path);
    if let Some(parent) = full.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(full, content)?;
  }
  Ok(())
}

fn write_response(request: &ContainerRequest, body: &Value) -> LibrarianResult<()> {
  let path = request.mounts.exchange.join(request.verb.response_file());
  fs::write(path, serde_json::to_string(body)?)?;
  Ok(())
}

impl ContainerRunner for FakeRunner {
  fn execute(&self, request: &ContainerRequest, _cancel: &CancelToken) -> LibrarianResult<()> {
    self
      .invocations
      .lock()
      .unwrap()
      .push((request.verb, request.unit.clone()));

    match self.behavior(request.verb, &request.unit) {
      None => write_response(request, &serde_json::json!({})),
      Some(FakeBehavior::Files(files)) => {
        write_files(request, files)?;
        write_response(request, &serde_json::json!({}))
      }
      Some(FakeBehavior::Respond { body, files }) => {
        write_files(request, files)?;
        write_response(request, body)
      }
      Some(FakeBehavior::ExitFailure) => Err(LibrarianError::Container(ContainerError::ExitStatus {
        verb: request.verb.to_string(),
        unit: request.unit.clone(),
        code: Some(1),
      })),
      Some(FakeBehavior::ReportError(error)) => write_response(request, &serde_json::json!({ "error": error })),
      Some(FakeBehavior::NoResponse) => Ok(()),
    }
  }
}
