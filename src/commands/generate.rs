//! `generate` and `configure` command glue

use super::{finish, github_client, require_push_for_remote};
use crate::container::docker::DockerRunner;
use crate::core::cancel::CancelToken;
use crate::core::context::RepoContext;
use crate::core::error::LibrarianResult;
use crate::generate::{self, GenerateOptions, GenerateReport};
use chrono::Utc;

fn print_report(verb: &str, report: &GenerateReport) {
  if report.generated.is_empty() {
    println!("⚠️  No libraries were {}", verb.to_lowercase());
    return;
  }
  println!();
  println!(
    "📦 {} {} librar{} from {}",
    verb,
    report.generated.len(),
    if report.generated.len() == 1 { "y" } else { "ies" },
    short(&report.source_commit)
  );
  if let Some(pr) = &report.pull_request {
    println!("🔗 {}", pr.html_url);
  }
}

fn short(sha: &str) -> &str {
  &sha[..sha.len().min(7)]
}

/// Run `librarian generate`
pub fn run_generate(repo: Option<String>, opts: GenerateOptions, runtime: String) -> LibrarianResult<()> {
  require_push_for_remote(repo.as_deref(), opts.push)?;
  let ctx = RepoContext::build(repo.as_deref())?;
  let github = github_client(opts.push)?;
  let runner = DockerRunner::new(runtime);

  println!("🔧 Generating in {}", ctx.root.display());
  let report = generate::run_generate(&ctx, &opts, &runner, github.as_deref(), &CancelToken::new(), Utc::now())?;
  print_report("Generated", &report);
  finish(report.failure)
}

/// Run `librarian configure`
pub fn run_configure(repo: Option<String>, opts: GenerateOptions, runtime: String) -> LibrarianResult<()> {
  require_push_for_remote(repo.as_deref(), opts.push)?;
  let ctx = RepoContext::build(repo.as_deref())?;
  let github = github_client(opts.push)?;
  let runner = DockerRunner::new(runtime);

  println!(
    "🆕 Configuring {} for {}",
    opts.library.as_deref().unwrap_or("?"),
    opts.api.as_deref().unwrap_or("?")
  );
  let report = generate::run_configure(&ctx, &opts, &runner, github.as_deref(), &CancelToken::new(), Utc::now())?;
  print_report("Configured", &report);
  finish(report.failure)
}
