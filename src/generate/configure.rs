//! `configure`: onboard a new library
//!
//! The container proposes the library record for a new API; it is validated
//! against the existing registry, appended and generated like any other
//! library. The state is only saved once generation has landed.

use super::{ApiSource, GenerateOptions, GenerateReport, Landed, generate_and_reconcile, open_pull_request, prepare};
use crate::container::{ContainerRequest, ContainerRunner, Mounts, Verb};
use crate::core::cancel::CancelToken;
use crate::core::context::RepoContext;
use crate::core::error::{ContainerError, LibrarianError, LibrarianResult, ValidationError};
use crate::github::GitHubClient;
use crate::state::model::{Api, LibraryState};
use crate::utils::release_date;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tempfile::TempDir;

/// Decode the library record from a configure response
fn library_from_response(id: &str, api: &str, body: &Value) -> LibrarianResult<LibraryState> {
  let mut record = body.get("library").unwrap_or(body).clone();
  if let Some(obj) = record.as_object_mut() {
    obj.entry("id").or_insert_with(|| Value::String(id.to_string()));
  }
  let mut library: LibraryState = serde_json::from_value(record).map_err(|e| {
    LibrarianError::Container(ContainerError::MalformedResponse {
      verb: Verb::Configure.to_string(),
      unit: id.to_string(),
      reason: format!("library record: {}", e),
    })
  })?;

  if library.id != id {
    return Err(LibrarianError::invalid(format!(
      "configure returned library '{}' but '{}' was requested",
      library.id, id
    )));
  }
  if !library.has_api(api) {
    library.apis.push(Api {
      path: api.to_string(),
      ..Default::default()
    });
  }
  if library.source_roots.is_empty() {
    return Err(LibrarianError::invalid(format!(
      "configure returned no source roots for library '{}'",
      id
    )));
  }
  Ok(library)
}

/// Run `configure --api P --library L`
pub fn run_configure(
  ctx: &RepoContext,
  opts: &GenerateOptions,
  runner: &dyn ContainerRunner,
  github: Option<&dyn GitHubClient>,
  cancel: &CancelToken,
  now: DateTime<Utc>,
) -> LibrarianResult<GenerateReport> {
  let (Some(api), Some(id)) = (opts.api.as_deref(), opts.library.as_deref()) else {
    return Err(LibrarianError::with_help(
      "configure requires both --api and --library",
      "Example: librarian configure --api google/cloud/secretmanager/v1 --library secretmanager",
    ));
  };
  if ctx.state.find_library(id).is_some() {
    return Err(LibrarianError::Validation(ValidationError::DuplicateLibrary { id: id.to_string() }));
  }
  ctx.git.ensure_clean()?;

  let source = ApiSource::resolve(opts.api_source.as_deref())?;
  let scratch = TempDir::new()?;
  let generation = prepare(ctx, opts, runner, &source, &scratch)?;

  let draft = LibraryState {
    apis: vec![Api {
      path: api.to_string(),
      ..Default::default()
    }],
    ..LibraryState::new(id)
  };
  let request = ContainerRequest {
    verb: Verb::Configure,
    unit: id.to_string(),
    image: generation.image.clone(),
    mounts: Mounts::under(
      &generation.work.join(id),
      generation.input.clone(),
      Some(source.root().to_path_buf()),
    ),
    payload: serde_json::to_value(&draft)?,
  };
  request.mounts.reset()?;
  let response = runner.run(&request, &cancel.child(opts.timeout))?;
  let library = library_from_response(id, api, &response.body)?;

  let mut candidate = ctx.state.clone();
  candidate.libraries.push(library.clone());
  candidate.validate()?;
  tracing::info!(library = %id, roots = ?library.source_roots, "configured new library");

  let Landed { mut report, state } = generate_and_reconcile(ctx, candidate, &[library], &generation, Some(1), cancel)?;
  if report.generated.is_empty() {
    return Err(
      report
        .failure
        .take()
        .unwrap_or_else(|| LibrarianError::message(format!("library '{}' was not generated", id))),
    );
  }
  ctx.store.save(&state)?;

  if opts.push {
    let github = github.ok_or_else(|| LibrarianError::invalid("--push requires a GitHub client"))?;
    let title = format!("feat: onboard {} ({})", id, release_date(now));
    let body = format!("Onboards `{}` for API `{}`.", id, api);
    let (branch, pr) = open_pull_request(ctx, github, title, body, now)?;
    report.branch = Some(branch);
    report.pull_request = Some(pr);
  }

  Ok(report)
}
