//! `release init`: prepare a release PR
//!
//! 1. analyze every releasable library in parallel
//! 2. write changelogs into an output tree and let the language container
//!    update version files there (when the state names an image)
//! 3. copy the output into the repository and advance versions in state
//! 4. optionally commit, push and open a PR labelled `release:pending`

use crate::container::{ContainerRequest, ContainerRunner, Mounts, Verb};
use crate::core::cancel::CancelToken;
use crate::core::context::{ORIGIN, RepoContext};
use crate::core::error::{ConfigError, LibrarianError, LibrarianResult, ResultExt};
use crate::core::outcome::Outcomes;
use crate::github::{GitHubClient, LABEL_PENDING, NewPullRequest, PullRequest};
use crate::reconcile::{self, Mode};
use crate::release::changelog::{self, CHANGELOG_FILE};
use crate::release::engine::{LibraryRelease, ReleaseEngine};
use crate::release::notes::{self, LibraryNotes};
use crate::state::model::{LibrarianState, LibraryState};
use crate::utils::{branch_name, release_date};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Branch prefix for release PRs
pub const RELEASE_BRANCH_PREFIX: &str = "librarian-release";

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
  /// Only consider this library
  pub library: Option<String>,
  /// Output tree (default: a temporary directory)
  pub output: Option<PathBuf>,
  pub push: bool,
}

#[derive(Debug, Default)]
pub struct InitReport {
  pub released: Vec<LibraryRelease>,
  /// Libraries with nothing to release
  pub unchanged: Vec<String>,
  /// Partial failure across libraries, if any
  pub failure: Option<LibrarianError>,
  pub pr_body: String,
  pub branch: Option<String>,
  pub pull_request: Option<PullRequest>,
}

/// Libraries to analyze: the named one, or every library not release-blocked
fn select_libraries<'a>(ctx: &'a RepoContext, library: Option<&str>) -> LibrarianResult<Vec<&'a LibraryState>> {
  match library {
    Some(id) => {
      let lib = ctx
        .state
        .find_library(id)
        .ok_or_else(|| LibrarianError::Config(ConfigError::LibraryNotFound { id: id.to_string() }))?;
      Ok(vec![lib])
    }
    None => Ok(
      ctx
        .state
        .libraries
        .iter()
        .filter(|lib| {
          let blocked = ctx.overrides.release_blocked(&lib.id);
          if blocked {
            tracing::info!(library = %lib.id, "release blocked by overrides; skipping");
          }
          !blocked
        })
        .collect(),
    ),
  }
}

/// Request document for the `release-init` verb
fn release_payload(state: &LibrarianState, released: &[LibraryRelease]) -> LibrarianResult<Value> {
  let mut libraries = Vec::new();
  for library in &state.libraries {
    let mut value = serde_json::to_value(library)?;
    if let Some(release) = released.iter().find(|r| r.library_id == library.id)
      && let Some(obj) = value.as_object_mut()
    {
      obj.insert("release_triggered".to_string(), Value::Bool(true));
      obj.insert("previous_version".to_string(), Value::String(release.previous_display()));
      obj.insert("changelog".to_string(), Value::String(release.changelog.notes()));
    }
    libraries.push(value);
  }
  Ok(serde_json::json!({ "image": state.image, "libraries": libraries }))
}

/// Write the prepended changelog for `release` into the output tree
fn write_changelog(
  repo_root: &Path,
  output: &Path,
  library: &LibraryState,
  release: &LibraryRelease,
) -> LibrarianResult<()> {
  let Some(root) = library.source_roots.first() else {
    tracing::warn!(library = %library.id, "library has no source roots; changelog not written");
    return Ok(());
  };

  let existing_path = repo_root.join(root).join(CHANGELOG_FILE);
  let existing = if existing_path.exists() {
    fs::read_to_string(&existing_path).with_context(|| format!("Failed to read {}", existing_path.display()))?
  } else {
    String::new()
  };

  let target = output.join(root).join(CHANGELOG_FILE);
  if let Some(parent) = target.parent() {
    fs::create_dir_all(parent)?;
  }
  fs::write(&target, changelog::prepend(&existing, &release.changelog.to_markdown()))
    .with_context(|| format!("Failed to write {}", target.display()))?;
  Ok(())
}

/// Run release-init against a repository
pub fn run_release_init(
  ctx: &RepoContext,
  opts: &InitOptions,
  runner: &dyn ContainerRunner,
  github: Option<&dyn GitHubClient>,
  cancel: &CancelToken,
  now: DateTime<Utc>,
) -> LibrarianResult<InitReport> {
  ctx.git.ensure_clean()?;
  if opts.push && github.is_none() {
    return Err(LibrarianError::invalid("--push requires a GitHub client"));
  }

  let libraries = select_libraries(ctx, opts.library.as_deref())?;
  let engine = ReleaseEngine::new(&ctx.git, ctx.github.clone(), release_date(now));

  let analyzed: Vec<(String, LibrarianResult<Option<LibraryRelease>>)> = libraries
    .par_iter()
    .map(|lib| (lib.id.clone(), engine.analyze(lib, ctx.overrides.next_version(&lib.id))))
    .collect();

  let mut outcomes = Outcomes::new("release init");
  for (id, result) in analyzed {
    outcomes.push(id, result);
  }
  if outcomes.all_failed() {
    return outcomes.into_result().map(|_| InitReport::default());
  }

  let (successes, failure) = outcomes.split();
  let mut report = InitReport {
    failure,
    ..Default::default()
  };
  for (id, release) in successes {
    match release {
      Some(release) => report.released.push(release),
      None => report.unchanged.push(id),
    }
  }

  if report.released.is_empty() {
    return Ok(report);
  }

  let mut state = ctx.state.clone();
  for release in &report.released {
    let library = state
      .find_library_mut(&release.library_id)
      .ok_or_else(|| LibrarianError::Config(ConfigError::LibraryNotFound {
        id: release.library_id.clone(),
      }))?;
    library.set_version(&release.version)?;
  }

  let scratch = tempfile::TempDir::new()?;
  let output = match &opts.output {
    Some(dir) => dir.clone(),
    None => scratch.path().join("output"),
  };
  fs::create_dir_all(&output).with_context(|| format!("Failed to create {}", output.display()))?;

  for release in &report.released {
    if let Some(library) = state.find_library(&release.library_id) {
      write_changelog(&ctx.root, &output, library, release)?;
    }
  }

  if !state.image.is_empty() {
    let request = ContainerRequest {
      verb: Verb::ReleaseInit,
      unit: "release-init".to_string(),
      image: state.image.clone(),
      mounts: Mounts {
        exchange: scratch.path().join("librarian"),
        input: ctx.generator_input(),
        output: output.clone(),
        source: None,
      },
      payload: release_payload(&state, &report.released)?,
    };
    runner.run(&request, cancel)?;
  }

  for release in &report.released {
    if let Some(library) = state.find_library(&release.library_id) {
      let plan = reconcile::reconcile(library, &output, &ctx.root, Mode::CopyOnly)?;
      tracing::debug!("{}", plan.summary());
    }
  }

  ctx.store.save(&state)?;

  let blocks: Vec<LibraryNotes> = report
    .released
    .iter()
    .map(|r| LibraryNotes {
      library_id: r.library_id.clone(),
      version: r.version.to_string(),
      notes: r.changelog.notes(),
    })
    .collect();
  report.pr_body = notes::render_body(&blocks);

  if opts.push
    && let Some(github) = github
  {
    let repo = ctx.require_github()?;
    let base = ctx.git.current_branch()?;
    let branch = branch_name(RELEASE_BRANCH_PREFIX, now);
    ctx.git.create_and_checkout_branch(&branch)?;
    ctx
      .git
      .commit_all(&format!("chore: librarian release pull request: {}", release_date(now)))?;
    ctx.git.push_to_remote(ORIGIN, &branch)?;

    let pr = github.create_pull_request(
      repo,
      &NewPullRequest {
        title: format!("chore: librarian release pull request: {}", release_date(now)),
        body: report.pr_body.clone(),
        head: branch.clone(),
        base,
      },
    )?;
    github.add_labels(repo, pr.number, &[LABEL_PENDING])?;
    report.branch = Some(branch);
    report.pull_request = Some(pr);
  }

  Ok(report)
}
