//! `docker run` backed container runner

use super::{ContainerRequest, ContainerRunner};
use crate::core::cancel::CancelToken;
use crate::core::error::{ContainerError, LibrarianError, LibrarianResult};
use std::process::{Command, Stdio};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Runs containers through a docker-compatible CLI
#[derive(Debug, Clone)]
pub struct DockerRunner {
  runtime: String,
}

impl Default for DockerRunner {
  fn default() -> Self {
    Self::new("docker")
  }
}

impl DockerRunner {
  /// Runner invoking `runtime` (`docker`, `podman`, ...)
  pub fn new(runtime: impl Into<String>) -> Self {
    Self { runtime: runtime.into() }
  }

  /// Full argument list for one invocation
  pub fn command_args(&self, request: &ContainerRequest) -> Vec<String> {
    let mut args: Vec<String> = vec!["run".into(), "--rm".into()];
    for (host, container) in request.mounts.bindings() {
      args.push("-v".into());
      args.push(format!("{}:{}", host.display(), container));
    }
    args.push(request.image.clone());
    args.push(request.verb.as_str().to_string());
    args
  }
}

impl ContainerRunner for DockerRunner {
  fn execute(&self, request: &ContainerRequest, cancel: &CancelToken) -> LibrarianResult<()> {
    let mut child = Command::new(&self.runtime)
      .args(self.command_args(request))
      .stdin(Stdio::null())
      .spawn()
      .map_err(|e| {
        LibrarianError::Container(ContainerError::Spawn {
          runtime: self.runtime.clone(),
          reason: e.to_string(),
        })
      })?;

    loop {
      if let Some(status) = child.try_wait()? {
        if status.success() {
          return Ok(());
        }
        return Err(LibrarianError::Container(ContainerError::ExitStatus {
          verb: request.verb.to_string(),
          unit: request.unit.clone(),
          code: status.code(),
        }));
      }

      if cancel.is_cancelled() {
        tracing::warn!(unit = %request.unit, verb = %request.verb, "cancelling container");
        let _ = child.kill();
        let _ = child.wait();
        return Err(LibrarianError::Cancelled {
          unit: request.unit.clone(),
        });
      }

      std::thread::sleep(POLL_INTERVAL);
    }
  }
}
