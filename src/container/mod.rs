//! Language container contract
//!
//! Every language plugs in a container image that understands a handful of
//! verbs. The orchestrator mounts four directories, writes
//! `<verb>-request.json` into the exchange mount, runs the container with the
//! verb as its only argument and then reads `<verb>-response.json` back.
//!
//! | Mount        | Contents                                      |
//! |--------------|-----------------------------------------------|
//! | `/librarian` | request/response documents                    |
//! | `/input`     | repository-provided generator configuration   |
//! | `/output`    | files produced by the container               |
//! | `/source`    | API-source checkout                           |
//!
//! A non-zero exit, a missing or malformed response, or a response with a
//! non-empty `error` field fails the unit.

pub mod docker;
#[cfg(test)]
pub mod fake;

use crate::core::cancel::CancelToken;
use crate::core::error::{ContainerError, LibrarianError, LibrarianResult, ResultExt};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub use docker::DockerRunner;

pub const EXCHANGE_MOUNT: &str = "/librarian";
pub const INPUT_MOUNT: &str = "/input";
pub const OUTPUT_MOUNT: &str = "/output";
pub const SOURCE_MOUNT: &str = "/source";

/// Verbs understood by language containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
  Configure,
  Generate,
  Build,
  ReleaseInit,
}

impl Verb {
  pub fn as_str(&self) -> &'static str {
    match self {
      Verb::Configure => "configure",
      Verb::Generate => "generate",
      Verb::Build => "build",
      Verb::ReleaseInit => "release-init",
    }
  }

  pub fn request_file(&self) -> String {
    format!("{}-request.json", self.as_str())
  }

  pub fn response_file(&self) -> String {
    format!("{}-response.json", self.as_str())
  }
}

impl fmt::Display for Verb {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Host directories bound to the well-known container paths
#[derive(Debug, Clone)]
pub struct Mounts {
  pub exchange: PathBuf,
  pub input: Option<PathBuf>,
  pub output: PathBuf,
  pub source: Option<PathBuf>,
}

impl Mounts {
  /// Mounts rooted at `unit_dir`: exchange in `librarian/`, output in `output/`
  pub fn under(unit_dir: &Path, input: Option<PathBuf>, source: Option<PathBuf>) -> Self {
    Self {
      exchange: unit_dir.join("librarian"),
      input,
      output: unit_dir.join("output"),
      source,
    }
  }

  /// Empty the exchange and output directories so a reused work directory
  /// cannot leak an earlier run's files into this one
  pub fn reset(&self) -> LibrarianResult<()> {
    for dir in [&self.exchange, &self.output] {
      if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("Failed to clear {}", dir.display()))?;
      }
      fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(())
  }

  /// (host, container) pairs for every mount that is present
  pub fn bindings(&self) -> Vec<(&Path, &'static str)> {
    let mut bindings = vec![(self.exchange.as_path(), EXCHANGE_MOUNT)];
    if let Some(input) = &self.input {
      bindings.push((input.as_path(), INPUT_MOUNT));
    }
    bindings.push((self.output.as_path(), OUTPUT_MOUNT));
    if let Some(source) = &self.source {
      bindings.push((source.as_path(), SOURCE_MOUNT));
    }
    bindings
  }
}

/// One container invocation
#[derive(Debug, Clone)]
pub struct ContainerRequest {
  pub verb: Verb,
  /// Library ID (or another unit name) used in errors and logs
  pub unit: String,
  pub image: String,
  pub mounts: Mounts,
  /// Request document body
  pub payload: Value,
}

/// Parsed response document
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerResponse {
  pub body: Value,
}

/// Executes language containers.
///
/// Implementations only need [`ContainerRunner::execute`]; [`ContainerRunner::run`]
/// wraps it with the request/response exchange.
pub trait ContainerRunner: Send + Sync {
  /// Run the container to completion (or cancellation)
  fn execute(&self, request: &ContainerRequest, cancel: &CancelToken) -> LibrarianResult<()>;

  /// Write the request, execute, read and check the response
  fn run(&self, request: &ContainerRequest, cancel: &CancelToken) -> LibrarianResult<ContainerResponse> {
    if cancel.is_cancelled() {
      return Err(LibrarianError::Cancelled {
        unit: request.unit.clone(),
      });
    }
    write_request(request)?;
    tracing::debug!(verb = %request.verb, unit = %request.unit, image = %request.image, "running container");
    self.execute(request, cancel)?;
    read_response(request)
  }
}

/// Prepare mount directories and write `<verb>-request.json`
pub fn write_request(request: &ContainerRequest) -> LibrarianResult<()> {
  fs::create_dir_all(&request.mounts.exchange)
    .with_context(|| format!("Failed to create {}", request.mounts.exchange.display()))?;
  fs::create_dir_all(&request.mounts.output)
    .with_context(|| format!("Failed to create {}", request.mounts.output.display()))?;

  let path = request.mounts.exchange.join(request.verb.request_file());
  let _ = fs::remove_file(request.mounts.exchange.join(request.verb.response_file()));
  let content = serde_json::to_string_pretty(&request.payload)?;
  fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
  Ok(())
}

/// Read `<verb>-response.json` and turn a reported error into a unit failure
pub fn read_response(request: &ContainerRequest) -> LibrarianResult<ContainerResponse> {
  let path = request.mounts.exchange.join(request.verb.response_file());
  let malformed = |reason: String| {
    LibrarianError::Container(ContainerError::MalformedResponse {
      verb: request.verb.to_string(),
      unit: request.unit.clone(),
      reason,
    })
  };

  let content = fs::read_to_string(&path).map_err(|e| malformed(format!("{}: {}", path.display(), e)))?;
  let body: Value = serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;
  if !body.is_object() {
    return Err(malformed("response is not a JSON object".to_string()));
  }

  if let Some(error) = body.get("error").and_then(Value::as_str)
    && !error.trim().is_empty()
  {
    return Err(LibrarianError::Container(ContainerError::Reported {
      verb: request.verb.to_string(),
      unit: request.unit.clone(),
      error: error.to_string(),
    }));
  }

  Ok(ContainerResponse { body })
}
