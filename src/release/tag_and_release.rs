//! `release tag-and-release`: turn merged release PRs into tags and releases
//!
//! Every `<details>` block in a release PR body names one library and version.
//! The tag name comes from that library's tag format in the state file as of
//! the merge commit. Failures are isolated per library; nothing is rolled back.

use crate::core::error::{LibrarianError, LibrarianResult};
use crate::core::outcome::Outcomes;
use crate::github::{GitHubClient, GitHubRepo, LABEL_DONE, LABEL_PENDING, NewRelease, PullRequest};
use crate::release::notes::{self, LibraryNotes};
use crate::state::model::LibrarianState;
use crate::state::store::{parse_state, state_file_path};

#[derive(Debug, Clone, Default)]
pub struct TagOptions {
  /// Only this PR (default: every merged PR labelled `release:pending`)
  pub pr: Option<u64>,
  /// Without this nothing is created
  pub push: bool,
}

/// One tag + release to create
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRelease {
  pub pr: u64,
  pub library_id: String,
  pub version: String,
  pub tag: String,
  /// Merge commit the tag points at
  pub sha: String,
  pub name: String,
  pub prerelease: bool,
  pub notes: String,
}

#[derive(Debug, Default)]
pub struct TagReport {
  /// Releases planned (dry run) or created, in PR then block order
  pub releases: Vec<PlannedRelease>,
  /// PRs moved from `release:pending` to `release:done`
  pub completed: Vec<u64>,
  pub failure: Option<LibrarianError>,
}

/// Resolve one block against the state at the merge commit
fn plan_block(state: &LibrarianState, pr: u64, sha: &str, block: &LibraryNotes) -> LibrarianResult<PlannedRelease> {
  let library = state.find_library(&block.library_id).ok_or_else(|| {
    LibrarianError::invalid(format!(
      "release PR #{} names library '{}', which is not in the state file",
      pr, block.library_id
    ))
  })?;
  let version = semver::Version::parse(&block.version)?;

  Ok(PlannedRelease {
    pr,
    library_id: library.id.clone(),
    version: block.version.clone(),
    tag: library.render_tag(&block.version),
    sha: sha.to_string(),
    name: format!("{} {}", library.id, block.version),
    prerelease: !version.pre.is_empty(),
    notes: block.notes.clone(),
  })
}

/// Create the tag and release, reusing either one a previous run already made
fn publish(github: &dyn GitHubClient, repo: &GitHubRepo, release: &PlannedRelease) -> LibrarianResult<()> {
  match github.get_tag_ref(repo, &release.tag)? {
    None => github.create_tag_ref(repo, &release.tag, &release.sha)?,
    Some(sha) if sha == release.sha => tracing::info!(tag = %release.tag, "tag already exists"),
    Some(sha) => {
      return Err(LibrarianError::invalid(format!(
        "tag {} already exists at {}, not at merge commit {}",
        release.tag, sha, release.sha
      )));
    }
  }

  let html_url = match github.get_release_by_tag(repo, &release.tag)? {
    Some(existing) => {
      tracing::info!(tag = %release.tag, "release already exists");
      existing.html_url
    }
    None => {
      github
        .create_release(
          repo,
          &NewRelease {
            tag_name: release.tag.clone(),
            target_commitish: release.sha.clone(),
            name: release.name.clone(),
            body: release.notes.clone(),
            prerelease: release.prerelease,
          },
        )?
        .html_url
    }
  };
  println!("   🏷️  {} → {}", release.tag, html_url);
  Ok(())
}

/// Plan (and with `push`, create) every release in one PR.
///
/// PR-level problems (unmerged, no blocks, unreadable state) are errors;
/// per-library problems land in the returned outcomes.
pub fn process_pull_request(
  github: &dyn GitHubClient,
  repo: &GitHubRepo,
  pr: &PullRequest,
  push: bool,
) -> LibrarianResult<Outcomes<PlannedRelease>> {
  if !pr.merged {
    return Err(LibrarianError::invalid(format!("PR #{} is not merged", pr.number)));
  }
  let sha = pr
    .merge_commit_sha
    .as_deref()
    .ok_or_else(|| LibrarianError::invalid(format!("PR #{} has no merge commit", pr.number)))?;

  let blocks = notes::parse_body(&pr.body)?;
  if blocks.is_empty() {
    return Err(LibrarianError::invalid(format!(
      "PR #{} body contains no release blocks",
      pr.number
    )));
  }

  let path = state_file_path();
  let content = String::from_utf8(github.get_contents(repo, &path, sha)?)?;
  let state = parse_state(&content, &format!("{}@{}", path, sha))?;

  let mut outcomes = Outcomes::new(format!("tag-and-release #{}", pr.number));
  for block in &blocks {
    let result = plan_block(&state, pr.number, sha, block).and_then(|planned| {
      if push {
        publish(github, repo, &planned)?;
      }
      Ok(planned)
    });
    if let Err(e) = &result {
      tracing::warn!(pr = pr.number, library = %block.library_id, error = %e, "release failed");
    }
    outcomes.push(block.library_id.clone(), result);
  }

  if push {
    if outcomes.has_failures() {
      tracing::warn!(pr = pr.number, "keeping {} label for a re-run", LABEL_PENDING);
    } else {
      github.remove_label(repo, pr.number, LABEL_PENDING)?;
      github.add_labels(repo, pr.number, &[LABEL_DONE])?;
    }
  }

  Ok(outcomes)
}

/// Process one PR or every pending one
pub fn run_tag_and_release(
  github: &dyn GitHubClient,
  repo: &GitHubRepo,
  opts: &TagOptions,
) -> LibrarianResult<TagReport> {
  let pull_requests = match opts.pr {
    Some(number) => vec![github.get_pull_request(repo, number)?],
    None => github.list_merged_pull_requests(repo, LABEL_PENDING)?,
  };

  if pull_requests.is_empty() {
    tracing::info!(repo = %repo, "no pending release PRs");
    return Ok(TagReport::default());
  }

  // A single named PR fails fast; a sweep isolates PR-level problems too
  let mut all = Outcomes::new("tag-and-release");
  let mut report = TagReport::default();
  for pr in &pull_requests {
    let outcomes = match process_pull_request(github, repo, pr, opts.push) {
      Ok(outcomes) => outcomes,
      Err(e) if opts.pr.is_none() => {
        all.push(format!("#{}", pr.number), Err(e));
        continue;
      }
      Err(e) => return Err(e),
    };

    if opts.push && !outcomes.has_failures() {
      report.completed.push(pr.number);
    }
    for unit in outcomes {
      all.push(format!("#{} {}", pr.number, unit.unit), unit.result);
    }
  }

  if all.all_failed() {
    return all.into_result().map(|_| TagReport::default());
  }
  let (successes, failure) = all.split();
  report.releases = successes.into_iter().map(|(_, planned)| planned).collect();
  report.failure = failure;
  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::github::fake::{Call, FakeGitHub};
  use crate::state::model::LibraryState;
  use crate::state::store::render_state;

  const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

  fn repo() -> GitHubRepo {
    GitHubRepo::new("googleapis", "google-cloud-go")
  }

  fn body(blocks: &[(&str, &str)]) -> String {
    let blocks: Vec<LibraryNotes> = blocks
      .iter()
      .map(|(id, version)| LibraryNotes {
        library_id: id.to_string(),
        version: version.to_string(),
        notes: format!("### Features\n\n* {} things", id),
      })
      .collect();
    notes::render_body(&blocks)
  }

  fn github_with_pr(number: u64, body: String) -> FakeGitHub {
    let github = FakeGitHub::new();
    let state = LibrarianState {
      libraries: vec![
        LibraryState {
          source_roots: vec!["secretmanager".to_string()],
          tag_format: "{id}/v{version}".to_string(),
          ..LibraryState::new("secretmanager")
        },
        LibraryState {
          source_roots: vec!["pubsub".to_string()],
          ..LibraryState::new("pubsub")
        },
      ],
      ..Default::default()
    };
    github.add_contents(&repo(), &state_file_path(), SHA, &render_state(&state).unwrap());
    github.add_pull_request(
      &repo(),
      PullRequest {
        number,
        body,
        merged: true,
        merge_commit_sha: Some(SHA.to_string()),
        labels: vec![LABEL_PENDING.to_string()],
        ..Default::default()
      },
    );
    github
  }

  fn tags(github: &FakeGitHub) -> Vec<String> {
    github
      .calls()
      .into_iter()
      .filter_map(|c| match c {
        Call::CreateTag { tag, .. } => Some(tag),
        _ => None,
      })
      .collect()
  }

  #[test]
  fn test_two_blocks_two_tags_and_releases() {
    let github = github_with_pr(7, body(&[("secretmanager", "1.2.0"), ("pubsub", "2.0.0")]));
    let opts = TagOptions { pr: Some(7), push: true };
    let report = run_tag_and_release(&github, &repo(), &opts).unwrap();

    assert!(report.failure.is_none());
    assert_eq!(tags(&github), vec!["secretmanager/v1.2.0", "pubsub-v2.0.0"]);
    let releases: Vec<_> = github
      .calls()
      .into_iter()
      .filter_map(|c| match c {
        Call::CreateRelease { release, .. } => Some(release),
        _ => None,
      })
      .collect();
    assert_eq!(releases.len(), 2);
    assert_eq!(releases[0].name, "secretmanager 1.2.0");
    assert_eq!(releases[0].target_commitish, SHA);
    assert!(releases[1].body.contains("pubsub things"));
    assert_eq!(report.completed, vec![7]);
    assert!(github.calls().contains(&Call::RemoveLabel {
      repo: repo().to_string(),
      number: 7,
      label: LABEL_PENDING.to_string(),
    }));
  }

  #[test]
  fn test_dry_run_creates_nothing() {
    let github = github_with_pr(7, body(&[("pubsub", "2.1.0-rc.1")]));
    let report = run_tag_and_release(&github, &repo(), &TagOptions { pr: Some(7), push: false }).unwrap();
    assert!(github.calls().is_empty());
    assert_eq!(report.releases.len(), 1);
    assert!(report.releases[0].prerelease);
  }

  #[test]
  fn test_unknown_library_fails_alone_and_keeps_label() {
    let github = github_with_pr(3, body(&[("ghost", "1.0.0"), ("pubsub", "2.0.0")]));
    let report = run_tag_and_release(&github, &repo(), &TagOptions { pr: Some(3), push: true }).unwrap();

    assert_eq!(tags(&github), vec!["pubsub-v2.0.0"]);
    match report.failure {
      Some(LibrarianError::PartialFailure(p)) => assert_eq!(p.failed_units(), vec!["#3 ghost"]),
      other => panic!("expected partial failure, got {:?}", other),
    }
    assert!(report.completed.is_empty());
    assert!(
      !github
        .calls()
        .iter()
        .any(|c| matches!(c, Call::RemoveLabel { .. } | Call::AddLabels { .. }))
    );
  }

  #[test]
  fn test_release_failure_does_not_stop_other_blocks() {
    let github = github_with_pr(3, body(&[("secretmanager", "1.0.0"), ("pubsub", "2.0.0")]));
    github.fail_release("secretmanager/v1.0.0");
    let report = run_tag_and_release(&github, &repo(), &TagOptions { pr: Some(3), push: true }).unwrap();
    assert_eq!(tags(&github), vec!["secretmanager/v1.0.0", "pubsub-v2.0.0"]);
    assert_eq!(report.releases.len(), 1);
    assert!(report.failure.is_some());
  }

  #[test]
  fn test_rerun_after_partial_failure_completes_the_pr() {
    let github = github_with_pr(3, body(&[("secretmanager", "1.0.0"), ("pubsub", "2.0.0")]));
    github.fail_release("secretmanager/v1.0.0");
    let opts = TagOptions { pr: Some(3), push: true };

    let first = run_tag_and_release(&github, &repo(), &opts).unwrap();
    assert!(first.completed.is_empty());
    assert!(first.failure.is_some());

    github.failing_releases.lock().unwrap().clear();
    let second = run_tag_and_release(&github, &repo(), &opts).unwrap();

    assert!(second.failure.is_none());
    assert_eq!(second.completed, vec![3]);
    assert_eq!(tags(&github), vec!["secretmanager/v1.0.0", "pubsub-v2.0.0"]);
    let releases = github
      .calls()
      .into_iter()
      .filter(|c| matches!(c, Call::CreateRelease { .. }))
      .count();
    assert_eq!(releases, 2);
    let labels = github.get_pull_request(&repo(), 3).unwrap().labels;
    assert_eq!(labels, vec![LABEL_DONE.to_string()]);
  }

  #[test]
  fn test_existing_tag_at_other_commit_fails_library() {
    let github = github_with_pr(3, body(&[("pubsub", "2.0.0")]));
    github.add_tag(&repo(), "pubsub-v2.0.0", "ffffffffffffffffffffffffffffffffffffffff");

    let err = run_tag_and_release(&github, &repo(), &TagOptions { pr: Some(3), push: true }).unwrap_err();

    assert!(err.to_string().contains("already exists"));
    assert!(tags(&github).is_empty());
    assert!(!github.calls().iter().any(|c| matches!(c, Call::CreateRelease { .. })));
  }

  #[test]
  fn test_unmerged_or_empty_pr_is_validation_error() {
    let github = github_with_pr(5, "no blocks here".to_string());
    assert!(matches!(
      run_tag_and_release(&github, &repo(), &TagOptions { pr: Some(5), push: true }),
      Err(LibrarianError::Validation(_))
    ));

    let github = github_with_pr(6, body(&[("pubsub", "2.0.0")]));
    github.pull_requests.lock().unwrap().get_mut(&(repo().to_string(), 6)).unwrap().merged = false;
    assert!(matches!(
      run_tag_and_release(&github, &repo(), &TagOptions { pr: Some(6), push: true }),
      Err(LibrarianError::Validation(_))
    ));
  }

  #[test]
  fn test_sweep_processes_every_pending_pr() {
    let github = github_with_pr(1, body(&[("pubsub", "1.0.0")]));
    github.add_pull_request(
      &repo(),
      PullRequest {
        number: 2,
        body: body(&[("secretmanager", "3.0.0")]),
        merged: true,
        merge_commit_sha: Some(SHA.to_string()),
        labels: vec![LABEL_PENDING.to_string()],
        ..Default::default()
      },
    );
    let report = run_tag_and_release(&github, &repo(), &TagOptions { pr: None, push: true }).unwrap();
    assert_eq!(report.completed, vec![1, 2]);
    assert_eq!(tags(&github), vec!["pubsub-v1.0.0", "secretmanager/v3.0.0"]);
  }
}
