//! `automation` command glue

use super::finish;
use crate::automation::cloudbuild::CloudBuild;
use crate::automation::{self, AutomationOptions, RepositoriesConfig, TriggerOutcome};
use crate::core::cancel::CancelToken;
use crate::core::error::LibrarianResult;
use crate::github::rest::RestGitHub;
use std::path::Path;

/// Run `librarian automation`
pub fn run_automation(repositories: &Path, opts: AutomationOptions) -> LibrarianResult<()> {
  let registry = RepositoriesConfig::load(repositories)?;
  let triggers = CloudBuild::from_env()?;
  let github = RestGitHub::from_env()?;

  println!(
    "🚀 {} across {} repositor(ies) in {}/{}",
    opts.command,
    registry.repositories.len(),
    opts.location.project,
    opts.location.region
  );
  let outcomes = automation::run_automation(&registry, &opts, &triggers, &github, &CancelToken::new())?;

  for unit in outcomes.iter() {
    match &unit.result {
      Ok(TriggerOutcome::Triggered { build_id }) => println!("   ✅ {}: build {}", unit.unit, build_id),
      Ok(TriggerOutcome::Skipped { reason }) => println!("   ⏭️  {}: {}", unit.unit, reason),
      Err(e) => println!("   ❌ {}: {}", unit.unit, e),
    }
  }

  let (_, failure) = outcomes.split();
  finish(failure)
}
