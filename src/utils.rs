//! Small helpers shared across commands

use chrono::{DateTime, Utc};
use std::path::Path;

/// Whether `--repo` names a local checkout rather than a remote URL
///
/// Remote forms: `https://…`, `ssh://…`, `git@host:owner/repo`.
/// Anything else that looks like a path (absolute, `./`, `../`) is local.
pub fn is_local_path(path: &str) -> bool {
  if path.contains("://") {
    return false;
  }
  if path.starts_with("./") || path.starts_with("../") || path == "." || path == ".." {
    return true;
  }
  if let Some((user_host, _)) = path.split_once(':')
    && user_host.contains('@')
    && !user_host.contains('/')
  {
    return false;
  }
  Path::new(path).is_absolute() || path.starts_with('/')
}

/// Forward-slash form of a relative path, as used in state files and regexes
pub fn slash_path(path: &Path) -> String {
  path
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}

/// Release date as written in changelog headings
pub fn release_date(now: DateTime<Utc>) -> String {
  now.format("%Y-%m-%d").to_string()
}

/// Branch name for a release or generation PR, unique per second
pub fn branch_name(prefix: &str, now: DateTime<Utc>) -> String {
  format!("{}-{}", prefix, now.format("%Y%m%dT%H%M%SZ"))
}
