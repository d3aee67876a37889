//! Library generation
//!
//! Each selected library gets its own container invocation in a bounded rayon
//! pool. Results are joined in library order and reconciled into the
//! repository on the calling thread, so the working tree has a single writer.
//! One failing library never prevents the others from landing.

pub mod configure;

use crate::container::{ContainerRequest, ContainerRunner, Mounts, Verb};
use crate::core::cancel::CancelToken;
use crate::core::context::{ORIGIN, RepoContext};
use crate::core::error::{ConfigError, GitError, LibrarianError, LibrarianResult};
use crate::core::outcome::Outcomes;
use crate::core::vcs::SystemGit;
use crate::github::{GitHubClient, NewPullRequest, PullRequest};
use crate::reconcile::{self, Mode, ReconcilePlan};
use crate::state::model::{LibrarianState, LibraryState};
use crate::ui::progress::UnitProgress;
use crate::utils::{branch_name, is_local_path, release_date};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub use configure::run_configure;

/// API definitions cloned when `--api-source` is not given
pub const DEFAULT_API_SOURCE: &str = "https://github.com/googleapis/googleapis";

/// Branch prefix for generation PRs
pub const GENERATE_BRANCH_PREFIX: &str = "librarian-generate";

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
  /// API path, e.g. `google/cloud/secretmanager/v1`
  pub api: Option<String>,
  pub library: Option<String>,
  /// Keep per-library work directories here (default: temporary)
  pub output: Option<PathBuf>,
  /// Local path or URL of the API definitions repository
  pub api_source: Option<String>,
  /// Overrides the image recorded in state
  pub image: Option<String>,
  /// Run the `build` verb after generating
  pub build: bool,
  /// Parallel container runs (default: available parallelism)
  pub jobs: Option<usize>,
  /// Per-container deadline
  pub timeout: Option<Duration>,
  pub push: bool,
}

#[derive(Debug, Default)]
pub struct GenerateReport {
  /// Reconciled libraries in library order
  pub generated: Vec<ReconcilePlan>,
  pub failure: Option<LibrarianError>,
  /// API-source commit the libraries were generated from
  pub source_commit: String,
  pub branch: Option<String>,
  pub pull_request: Option<PullRequest>,
}

/// Checked-out API definitions
pub struct ApiSource {
  pub git: SystemGit,
  _clone: Option<TempDir>,
}

impl ApiSource {
  /// Open a local checkout or clone a URL (default: [`DEFAULT_API_SOURCE`])
  pub fn resolve(source: Option<&str>) -> LibrarianResult<Self> {
    let source = source.unwrap_or(DEFAULT_API_SOURCE);
    if is_local_path(source) || Path::new(source).exists() {
      return Ok(Self {
        git: SystemGit::open(Path::new(source))?,
        _clone: None,
      });
    }
    let dir = TempDir::new()?;
    let git = SystemGit::clone_repo(source, &dir.path().join("googleapis"))?;
    Ok(Self {
      git,
      _clone: Some(dir),
    })
  }

  pub fn root(&self) -> &Path {
    self.git.work_tree()
  }
}

/// Shared inputs for one generation run
pub(crate) struct Generation<'a> {
  pub runner: &'a dyn ContainerRunner,
  pub image: String,
  pub input: Option<PathBuf>,
  pub source: &'a ApiSource,
  pub head: String,
  pub work: PathBuf,
  pub build: bool,
  pub timeout: Option<Duration>,
}

impl Generation<'_> {
  /// Generate (and optionally build) one library; returns its staging directory
  fn generate_library(&self, library: &LibraryState, cancel: &CancelToken) -> LibrarianResult<PathBuf> {
    let previous = &library.last_generated_commit;
    if !previous.is_empty() && *previous != self.head && !self.source.git.is_ancestor(previous, &self.head)? {
      return Err(LibrarianError::Git(GitError::NotDescendant {
        previous: previous.clone(),
        proposed: self.head.clone(),
      }));
    }

    let cancel = cancel.child(self.timeout);
    let mut request = ContainerRequest {
      verb: Verb::Generate,
      unit: library.id.clone(),
      image: self.image.clone(),
      mounts: Mounts::under(
        &self.work.join(&library.id),
        self.input.clone(),
        Some(self.source.root().to_path_buf()),
      ),
      payload: serde_json::to_value(library)?,
    };
    request.mounts.reset()?;
    self.runner.run(&request, &cancel)?;

    if self.build {
      request.verb = Verb::Build;
      self.runner.run(&request, &cancel)?;
    }

    Ok(request.mounts.output)
  }

  /// Run every library in a bounded pool; outcomes come back in input order
  pub fn run_all(
    &self,
    libraries: &[LibraryState],
    jobs: Option<usize>,
    cancel: &CancelToken,
  ) -> LibrarianResult<Outcomes<PathBuf>> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = jobs {
      builder = builder.num_threads(jobs.max(1));
    }
    let pool = builder.build()?;
    let progress = UnitProgress::new(libraries.len(), "Generating");

    let results: Vec<(String, LibrarianResult<PathBuf>)> = pool.install(|| {
      libraries
        .par_iter()
        .map(|library| {
          let result = self.generate_library(library, cancel);
          match &result {
            Ok(_) => tracing::info!(library = %library.id, "generated"),
            Err(e) => tracing::warn!(library = %library.id, error = %e, "generation failed"),
          }
          progress.inc();
          (library.id.clone(), result)
        })
        .collect()
    });

    let mut outcomes = Outcomes::new("generate");
    for (id, result) in results {
      outcomes.push(id, result);
    }
    Ok(outcomes)
  }
}

/// Libraries to generate for the given flags
pub fn select_libraries(
  state: &LibrarianState,
  overrides: &crate::state::LibrarianConfig,
  api: Option<&str>,
  library: Option<&str>,
) -> LibrarianResult<Vec<LibraryState>> {
  match (library, api) {
    (Some(id), api) => {
      let lib = state
        .find_library(id)
        .ok_or_else(|| LibrarianError::Config(ConfigError::LibraryNotFound { id: id.to_string() }))?;
      if let Some(api) = api
        && !lib.has_api(api)
      {
        return Err(LibrarianError::invalid(format!(
          "library '{}' does not own API '{}'; use configure to onboard a new library",
          id, api
        )));
      }
      Ok(vec![lib.clone()])
    }
    (None, Some(api)) => state
      .library_for_api(api)
      .map(|lib| vec![lib.clone()])
      .ok_or_else(|| LibrarianError::invalid(format!("no library owns API '{}'", api))),
    (None, None) => Ok(
      state
        .libraries
        .iter()
        .filter(|lib| {
          let blocked = overrides.generate_blocked(&lib.id);
          if blocked {
            tracing::info!(library = %lib.id, "generation blocked by overrides; skipping");
          }
          !blocked
        })
        .cloned()
        .collect(),
    ),
  }
}

/// Generated output, reconciled libraries and the state that records them
pub(crate) struct Landed {
  pub report: GenerateReport,
  pub state: LibrarianState,
}

/// Generate `libraries`, reconcile every success in order, and advance their
/// last generated commit in a copy of `state`. Nothing is written when every
/// library failed.
pub(crate) fn generate_and_reconcile(
  ctx: &RepoContext,
  state: LibrarianState,
  libraries: &[LibraryState],
  generation: &Generation<'_>,
  jobs: Option<usize>,
  cancel: &CancelToken,
) -> LibrarianResult<Landed> {
  if libraries.is_empty() {
    return Err(LibrarianError::invalid("no libraries selected for generation"));
  }

  let outcomes = generation.run_all(libraries, jobs, cancel)?;
  if outcomes.all_failed() {
    return Err(
      outcomes
        .split()
        .1
        .unwrap_or_else(|| LibrarianError::message("every library failed to generate")),
    );
  }

  let mut state = state;
  let mut landed = Outcomes::new("generate");
  let mut generated = Vec::new();
  for unit in outcomes {
    let staging = match unit.result {
      Ok(staging) => staging,
      Err(e) => {
        landed.push(unit.unit, Err(e));
        continue;
      }
    };
    let Some(library) = state.find_library_mut(&unit.unit) else {
      continue;
    };
    match reconcile::reconcile(library, &staging, &ctx.root, Mode::CleanAndCopy) {
      Ok(plan) => {
        library.last_generated_commit = generation.head.clone();
        println!("   ✅ {}", plan.summary());
        generated.push(plan);
        landed.push(unit.unit, Ok(()));
      }
      Err(e) => landed.push(unit.unit, Err(e)),
    }
  }

  let (_, failure) = landed.split();
  Ok(Landed {
    report: GenerateReport {
      generated,
      failure,
      source_commit: generation.head.clone(),
      ..Default::default()
    },
    state,
  })
}

/// Commit the working tree on a fresh branch, push it and open a PR
pub(crate) fn open_pull_request(
  ctx: &RepoContext,
  github: &dyn GitHubClient,
  title: String,
  body: String,
  now: DateTime<Utc>,
) -> LibrarianResult<(String, PullRequest)> {
  let repo = ctx.require_github()?;
  let base = ctx.git.current_branch()?;
  let branch = branch_name(GENERATE_BRANCH_PREFIX, now);
  ctx.git.create_and_checkout_branch(&branch)?;
  ctx.git.commit_all(&title)?;
  ctx.git.push_to_remote(ORIGIN, &branch)?;
  let pr = github.create_pull_request(
    repo,
    &NewPullRequest {
      title,
      body,
      head: branch.clone(),
      base,
    },
  )?;
  Ok((branch, pr))
}

fn pull_request_body(report: &GenerateReport) -> String {
  let mut body = format!("Generated from googleapis commit {}.\n\n", report.source_commit);
  for plan in &report.generated {
    body.push_str(&format!("- {}\n", plan.summary()));
  }
  body
}

/// Shared setup for generate and configure: image, pool inputs, work directory
pub(crate) fn prepare<'a>(
  ctx: &RepoContext,
  opts: &GenerateOptions,
  runner: &'a dyn ContainerRunner,
  source: &'a ApiSource,
  scratch: &TempDir,
) -> LibrarianResult<Generation<'a>> {
  let image = opts.image.clone().unwrap_or_else(|| ctx.state.image.clone());
  if image.is_empty() {
    return Err(LibrarianError::with_help(
      "No generator image configured",
      "Set `image` in .librarian/state.yaml or pass --image.",
    ));
  }

  Ok(Generation {
    runner,
    image,
    input: ctx.generator_input(),
    source,
    head: source.git.head_commit()?,
    work: opts.output.clone().unwrap_or_else(|| scratch.path().to_path_buf()),
    build: opts.build,
    timeout: opts.timeout,
  })
}

/// Run `generate` against a repository
pub fn run_generate(
  ctx: &RepoContext,
  opts: &GenerateOptions,
  runner: &dyn ContainerRunner,
  github: Option<&dyn GitHubClient>,
  cancel: &CancelToken,
  now: DateTime<Utc>,
) -> LibrarianResult<GenerateReport> {
  ctx.git.ensure_clean()?;
  let libraries = select_libraries(&ctx.state, &ctx.overrides, opts.api.as_deref(), opts.library.as_deref())?;

  let source = ApiSource::resolve(opts.api_source.as_deref())?;
  let scratch = TempDir::new()?;
  let generation = prepare(ctx, opts, runner, &source, &scratch)?;

  let Landed { mut report, state } =
    generate_and_reconcile(ctx, ctx.state.clone(), &libraries, &generation, opts.jobs, cancel)?;
  if report.generated.is_empty() {
    return Ok(report);
  }
  ctx.store.save(&state)?;

  if opts.push {
    let github = github.ok_or_else(|| LibrarianError::invalid("--push requires a GitHub client"))?;
    let title = format!("feat: regenerate libraries ({})", release_date(now));
    let (branch, pr) = open_pull_request(ctx, github, title, pull_request_body(&report), now)?;
    report.branch = Some(branch);
    report.pull_request = Some(pr);
  }

  Ok(report)
}
