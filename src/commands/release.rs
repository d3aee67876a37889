//! `release init` and `release tag-and-release` command glue

use super::{finish, github_client, require_push_for_remote};
use crate::container::docker::DockerRunner;
use crate::core::cancel::CancelToken;
use crate::core::context::RepoContext;
use crate::core::error::LibrarianResult;
use crate::github::GitHubRepo;
use crate::github::rest::RestGitHub;
use crate::release::{self, InitOptions, TagOptions};
use chrono::Utc;

/// Run `librarian release init`
pub fn run_release_init(repo: Option<String>, opts: InitOptions, runtime: String) -> LibrarianResult<()> {
  require_push_for_remote(repo.as_deref(), opts.push)?;
  let ctx = RepoContext::build(repo.as_deref())?;
  let github = github_client(opts.push)?;
  let runner = DockerRunner::new(runtime);

  println!("🔍 Analyzing {} librar(ies)...", ctx.state.libraries.len());
  let report = release::run_release_init(&ctx, &opts, &runner, github.as_deref(), &CancelToken::new(), Utc::now())?;

  if report.released.is_empty() {
    println!("✅ Nothing to release");
    return finish(report.failure);
  }

  println!();
  println!("📦 Release plan:");
  for r in &report.released {
    println!("   {} {} → {} ({})", r.library_id, r.previous_display(), r.version, r.bump);
  }
  if !report.unchanged.is_empty() {
    println!("   unchanged: {}", report.unchanged.join(", "));
  }
  if let Some(pr) = &report.pull_request {
    println!();
    println!("🔗 {}", pr.html_url);
  } else if !opts.push {
    println!();
    println!("💡 Changes are in the working tree; re-run with --push to open a release PR");
  }

  finish(report.failure)
}

/// `--repo` as a GitHub URL, or the origin of a local checkout
fn resolve_github_repo(repo: Option<&str>) -> LibrarianResult<GitHubRepo> {
  if let Some(url) = repo
    && let Ok(parsed) = GitHubRepo::parse(url)
  {
    return Ok(parsed);
  }
  let ctx = RepoContext::build(repo)?;
  ctx.require_github().cloned()
}

/// Run `librarian release tag-and-release`
pub fn run_tag_and_release(repo: Option<String>, opts: TagOptions) -> LibrarianResult<()> {
  let github_repo = resolve_github_repo(repo.as_deref())?;
  let github = RestGitHub::from_env()?;

  println!("🏷️  Tagging releases for {}", github_repo);
  let report = release::run_tag_and_release(&github, &github_repo, &opts)?;

  if report.releases.is_empty() && report.failure.is_none() {
    println!("✅ No pending release pull requests");
    return Ok(());
  }

  for r in &report.releases {
    let mode = if opts.push { "created" } else { "would create" };
    println!(
      "   #{} {}: {} tag {} at {}",
      r.pr,
      r.library_id,
      mode,
      r.tag,
      &r.sha[..r.sha.len().min(7)]
    );
  }
  if !opts.push {
    println!();
    println!("💡 Dry run; re-run with --push to create tags and releases");
  }

  finish(report.failure)
}
