//! Fleet-wide automation
//!
//! A static registry lists every language repository and the pipeline
//! commands it supports. `automation --command X` starts the `X` build
//! trigger once per eligible repository. Repositories are independent: a
//! failure for one is recorded and the rest still run.

pub mod cloudbuild;
#[cfg(test)]
pub mod fake;
pub mod trigger;

use crate::core::cancel::CancelToken;
use crate::core::error::{ConfigError, LibrarianError, LibrarianResult, ResultExt};
use crate::core::outcome::Outcomes;
use crate::github::{GitHubClient, GitHubRepo, LABEL_PENDING};
use crate::ui::progress::UnitProgress;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use trigger::{BuildTriggerClient, Location, Trigger};

/// Region used when `--region` is not given
pub const DEFAULT_REGION: &str = "global";

/// Pipeline commands a repository can opt into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
  Generate,
  StageRelease,
  PublishRelease,
}

impl Command {
  pub const ALL: [Command; 3] = [Command::Generate, Command::StageRelease, Command::PublishRelease];

  pub fn as_str(&self) -> &'static str {
    match self {
      Command::Generate => "generate",
      Command::StageRelease => "stage-release",
      Command::PublishRelease => "publish-release",
    }
  }

  /// Build trigger started for this command
  pub fn trigger_name(&self) -> &'static str {
    self.as_str()
  }
}

impl FromStr for Command {
  type Err = LibrarianError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Command::ALL
      .into_iter()
      .find(|c| c.as_str() == s)
      .ok_or_else(|| {
        LibrarianError::invalid(format!(
          "unknown automation command '{}' (expected one of: generate, stage-release, publish-release)",
          s
        ))
      })
  }
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One registered repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
  pub name: String,
  pub git_url: String,
  /// Secret Manager name of the GitHub token the build uses
  #[serde(default)]
  pub secret_name: String,
  #[serde(default)]
  pub supported_commands: Vec<String>,
}

impl RepositoryConfig {
  pub fn supports(&self, command: Command) -> bool {
    self.supported_commands.iter().any(|c| c == command.as_str())
  }

  pub fn github(&self) -> LibrarianResult<GitHubRepo> {
    GitHubRepo::parse(&self.git_url)
  }
}

/// The repository registry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RepositoriesConfig {
  #[serde(default)]
  pub repositories: Vec<RepositoryConfig>,
}

impl RepositoriesConfig {
  /// Parse and validate a registry file
  pub fn load(path: &Path) -> LibrarianResult<Self> {
    if !path.exists() {
      return Err(LibrarianError::Config(ConfigError::NotFound {
        path: path.to_path_buf(),
      }));
    }
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Self::parse(&content)
  }

  pub fn parse(content: &str) -> LibrarianResult<Self> {
    let config: Self = serde_yaml::from_str(content)
      .map_err(|e| LibrarianError::parse("repositories config", e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Unique names, GitHub URLs, known commands
  pub fn validate(&self) -> LibrarianResult<()> {
    let mut names = BTreeSet::new();
    for repo in &self.repositories {
      if repo.name.trim().is_empty() {
        return Err(LibrarianError::invalid("repository entry with an empty name"));
      }
      if !names.insert(repo.name.as_str()) {
        return Err(LibrarianError::invalid(format!("repository '{}' is listed twice", repo.name)));
      }
      repo
        .github()
        .map_err(|e| LibrarianError::invalid(format!("repository '{}': {}", repo.name, e)))?;
      for command in &repo.supported_commands {
        command
          .parse::<Command>()
          .map_err(|e| LibrarianError::invalid(format!("repository '{}': {}", repo.name, e)))?;
      }
    }
    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct AutomationOptions {
  pub command: Command,
  pub location: Location,
  /// Passed to the build as `_PUSH`
  pub push: bool,
  /// Adds `_BUILD=true` to generate runs
  pub build: bool,
  /// Ignore `supported_commands`
  pub force_run: bool,
  /// Parallel repositories (default 1)
  pub jobs: usize,
}

/// What happened for one repository
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
  Triggered { build_id: String },
  Skipped { reason: String },
}

impl fmt::Display for TriggerOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TriggerOutcome::Triggered { build_id } => write!(f, "triggered build {}", build_id),
      TriggerOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
    }
  }
}

/// Substitutions shared by every command
pub fn substitutions(repo: &RepositoryConfig, opts: &AutomationOptions) -> BTreeMap<String, String> {
  let mut subs = BTreeMap::new();
  subs.insert("_REPOSITORY".to_string(), repo.name.clone());
  subs.insert("_FULL_REPOSITORY".to_string(), repo.git_url.clone());
  subs.insert("_GITHUB_TOKEN_SECRET_NAME".to_string(), repo.secret_name.clone());
  subs.insert("_PUSH".to_string(), opts.push.to_string());
  if opts.build && opts.command == Command::Generate {
    subs.insert("_BUILD".to_string(), "true".to_string());
  }
  subs
}

/// Trigger the pipeline for one repository
pub fn trigger_repository(
  repo: &RepositoryConfig,
  opts: &AutomationOptions,
  triggers: &dyn BuildTriggerClient,
  github: &dyn GitHubClient,
  cancel: &CancelToken,
) -> LibrarianResult<TriggerOutcome> {
  let mut subs = substitutions(repo, opts);

  if opts.command == Command::PublishRelease {
    let pending = github.list_merged_pull_requests(&repo.github()?, LABEL_PENDING)?;
    let Some(pr) = pending.iter().min_by_key(|pr| pr.number) else {
      return Ok(TriggerOutcome::Skipped {
        reason: "no pending release pull requests".to_string(),
      });
    };
    subs.insert("_PR".to_string(), pr.html_url.clone());
  }

  if cancel.is_cancelled() {
    return Err(LibrarianError::Cancelled {
      unit: repo.name.clone(),
    });
  }

  let trigger = trigger::find_trigger(triggers, &opts.location, opts.command.trigger_name())?;
  let build_id = triggers.run_trigger(&opts.location, &trigger.id, &subs)?;
  Ok(TriggerOutcome::Triggered { build_id })
}

/// Fan the command out across the registry; outcomes are in registry order
pub fn run_automation(
  registry: &RepositoriesConfig,
  opts: &AutomationOptions,
  triggers: &dyn BuildTriggerClient,
  github: &dyn GitHubClient,
  cancel: &CancelToken,
) -> LibrarianResult<Outcomes<TriggerOutcome>> {
  let eligible: Vec<&RepositoryConfig> = registry
    .repositories
    .iter()
    .filter(|repo| {
      let ok = opts.force_run || repo.supports(opts.command);
      if !ok {
        tracing::debug!(repository = %repo.name, command = %opts.command, "command not supported; skipping");
      }
      ok
    })
    .collect();

  let pool = rayon::ThreadPoolBuilder::new().num_threads(opts.jobs.max(1)).build()?;
  let progress = UnitProgress::new(eligible.len(), format!("Triggering {}", opts.command));

  let results: Vec<(String, LibrarianResult<TriggerOutcome>)> = pool.install(|| {
    eligible
      .par_iter()
      .map(|repo| {
        let result = trigger_repository(repo, opts, triggers, github, cancel);
        if let Err(e) = &result {
          tracing::warn!(repository = %repo.name, error = %e, "automation failed");
        }
        progress.inc();
        (repo.name.clone(), result)
      })
      .collect()
  });

  let mut outcomes = Outcomes::new(format!("automation {}", opts.command));
  for (name, result) in results {
    outcomes.push(name, result);
  }
  Ok(outcomes)
}
