//! Additional operations for SystemGit (history, tags, commits, remotes)

use super::CommitInfo;
use super::system_git::SystemGit;
use crate::core::error::{GitError, LibrarianError, LibrarianResult, ResultExt};
use rayon::prelude::*;

impl SystemGit {
  /// Get commits touching specific paths, oldest first
  ///
  /// `since` excludes that commit and its ancestors; `None` walks all of HEAD.
  pub fn get_commits_touching_paths(&self, paths: &[String], since: Option<&str>) -> LibrarianResult<Vec<String>> {
    let mut cmd = self.git_cmd();
    cmd.args(["rev-list", "--no-merges", "--reverse"]);

    if let Some(since_sha) = since {
      cmd.arg(format!("{}..HEAD", since_sha));
    } else {
      cmd.arg("HEAD");
    }

    if !paths.is_empty() {
      cmd.arg("--");
      for path in paths {
        cmd.arg(path);
      }
    }

    let output = cmd.output().context("Failed to run git rev-list")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(LibrarianError::Git(GitError::CommandFailed {
        command: "git rev-list".to_string(),
        stderr: stderr.to_string(),
      }));
    }

    let commits = String::from_utf8_lossy(&output.stdout)
      .lines()
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
      .collect();

    Ok(commits)
  }

  /// Get commit metadata for a single SHA
  pub fn get_commit(&self, sha: &str) -> LibrarianResult<CommitInfo> {
    // %H hash, %an author, %ae email, %at author time, %P parents, %B body
    let format = "%H%n%an%n%ae%n%at%n%P%n%B";

    let output = self
      .git_cmd()
      .args(["log", "-1", &format!("--format={}", format), sha])
      .output()
      .context("Failed to get commit info")?;

    if !output.status.success() {
      return Err(LibrarianError::Git(GitError::CommandFailed {
        command: format!("git log -1 {}", sha),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    parse_commit_output(&output.stdout)
  }

  /// Full commits (with message bodies) touching `paths` since `since`, oldest first
  pub fn commits_since(&self, since: Option<&str>, paths: &[String]) -> LibrarianResult<Vec<CommitInfo>> {
    let shas = self.get_commits_touching_paths(paths, since)?;
    shas.par_iter().map(|sha| self.get_commit(sha)).collect()
  }

  /// Resolve a tag to the commit it points at; `None` if the tag does not exist
  pub fn resolve_tag(&self, tag: &str) -> LibrarianResult<Option<String>> {
    let spec = format!("refs/tags/{}^{{commit}}", tag);
    let output = self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet", &spec])
      .output()
      .context("Failed to resolve tag")?;

    if !output.status.success() {
      return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
  }

  /// Create a lightweight tag at `sha`
  #[cfg(test)]
  pub fn create_tag(&self, tag: &str, sha: &str) -> LibrarianResult<()> {
    self.run(&["tag", tag, sha]).map(|_| ())
  }

  /// Whether `ancestor` is an ancestor of (or equal to) `descendant`
  pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> LibrarianResult<bool> {
    let output = self
      .git_cmd()
      .args(["merge-base", "--is-ancestor", ancestor, descendant])
      .output()
      .context("Failed to run git merge-base")?;

    match output.status.code() {
      Some(0) => Ok(true),
      Some(1) => Ok(false),
      _ => Err(LibrarianError::Git(GitError::CommandFailed {
        command: format!("git merge-base --is-ancestor {} {}", ancestor, descendant),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      })),
    }
  }

  /// Porcelain status entries of the working tree
  pub fn status_entries(&self) -> LibrarianResult<Vec<String>> {
    let output = self
      .git_cmd()
      .args(["status", "--porcelain"])
      .output()
      .context("Failed to run git status")?;

    if !output.status.success() {
      return Err(LibrarianError::Git(GitError::CommandFailed {
        command: "git status --porcelain".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.to_string())
        .collect(),
    )
  }

  /// Fail with [`GitError::DirtyWorkTree`] when there are uncommitted changes
  pub fn ensure_clean(&self) -> LibrarianResult<()> {
    let entries = self.status_entries()?;
    if !entries.is_empty() {
      return Err(LibrarianError::Git(GitError::DirtyWorkTree {
        path: self.work_tree.clone(),
        entries: entries.len(),
      }));
    }
    Ok(())
  }

  /// Stage everything and commit. Returns `None` when there was nothing to commit.
  pub fn commit_all(&self, message: &str) -> LibrarianResult<Option<String>> {
    self.run(&["add", "--all"])?;
    if self.status_entries()?.is_empty() {
      return Ok(None);
    }
    self.run(&["commit", "--quiet", "-m", message])?;
    self.head_commit().map(Some)
  }

  /// List all remotes as (name, fetch url)
  pub fn list_remotes(&self) -> LibrarianResult<Vec<(String, String)>> {
    let output = self
      .git_cmd()
      .args(["remote", "-v"])
      .output()
      .context("Failed to list remotes")?;

    if !output.status.success() {
      return Ok(vec![]);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut remotes = Vec::new();

    for line in stdout.lines() {
      // Format: "origin  git@github.com:user/repo.git (fetch)"
      let parts: Vec<&str> = line.split_whitespace().collect();
      if parts.len() >= 2 && line.contains("(fetch)") {
        remotes.push((parts[0].to_string(), parts[1].to_string()));
      }
    }

    Ok(remotes)
  }

  /// Get remote URL
  pub fn get_remote_url(&self, name: &str) -> LibrarianResult<Option<String>> {
    let remotes = self.list_remotes()?;
    Ok(remotes.iter().find(|(n, _)| n == name).map(|(_, url)| url.clone()))
  }

  /// Push a branch, setting upstream
  pub fn push_to_remote(&self, remote_name: &str, branch: &str) -> LibrarianResult<()> {
    if self.get_remote_url(remote_name)?.is_none() {
      return Err(LibrarianError::Git(GitError::MissingRemote {
        name: remote_name.to_string(),
      }));
    }

    println!("   Pushing to remote '{}'...", remote_name);

    let output = self
      .git_cmd()
      .args(["push", "-u", remote_name, branch])
      .output()
      .context("Failed to push")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(LibrarianError::Git(GitError::PushFailed {
        remote: remote_name.to_string(),
        branch: branch.to_string(),
        reason: stderr.to_string(),
      }));
    }

    println!("   ✅ Pushed to {}/{}", remote_name, branch);
    Ok(())
  }

  /// Create and checkout a branch
  pub fn create_and_checkout_branch(&self, branch_name: &str) -> LibrarianResult<()> {
    self.run(&["checkout", "-b", branch_name]).map(|_| ())
  }
}

/// Parse git log output into CommitInfo
///
/// Format is %H%n%an%n%ae%n%at%n%P%n%B
fn parse_commit_output(data: &[u8]) -> LibrarianResult<CommitInfo> {
  let output = String::from_utf8_lossy(data);
  let mut lines = output.lines();

  let sha = lines
    .next()
    .ok_or_else(|| LibrarianError::message("Missing commit SHA"))?
    .to_string();
  let author = lines
    .next()
    .ok_or_else(|| LibrarianError::message("Missing author name"))?
    .to_string();
  let author_email = lines
    .next()
    .ok_or_else(|| LibrarianError::message("Missing author email"))?
    .to_string();
  let timestamp = lines
    .next()
    .and_then(|s| s.parse::<i64>().ok())
    .ok_or_else(|| LibrarianError::message("Missing/invalid author timestamp"))?;
  let parents_line = lines.next().unwrap_or("");
  let parent_shas = parents_line.split_whitespace().map(|s| s.to_string()).collect();

  // Rest is commit message
  let message: Vec<&str> = lines.collect();
  let message = message.join("\n").trim().to_string();

  Ok(CommitInfo {
    sha,
    author,
    author_email,
    message,
    timestamp,
    parent_shas,
  })
}
