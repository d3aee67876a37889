//! Clean-and-copy reconciliation of generated output
//!
//! For one library:
//! 1. every existing file under its source roots that matches a remove regex
//!    and no preserve regex is removed
//! 2. every staged file under its source roots is copied into the repository
//!
//! Paths outside the library's source roots are never touched. Matching is a
//! regex *search* over repo-relative, forward-slash paths.

pub mod plan;

use crate::core::error::{LibrarianError, LibrarianResult, ResultExt};
use crate::state::model::LibraryState;
use crate::utils::slash_path;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use plan::{Operation, ReconcilePlan};

/// Whether existing files may be removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// Remove per the library's rules, then copy
  CleanAndCopy,
  /// Copy only (release-init version file updates)
  CopyOnly,
}

/// Compiled keep/remove rules for one library
#[derive(Debug)]
pub struct Rules {
  remove: Vec<Regex>,
  preserve: Vec<Regex>,
}

impl Rules {
  /// Compile a library's regexes; an invalid one fails the whole library
  pub fn compile(library: &LibraryState) -> LibrarianResult<Self> {
    let compile = |patterns: &[String], kind: &str| -> LibrarianResult<Vec<Regex>> {
      patterns
        .iter()
        .map(|p| {
          Regex::new(p).map_err(|e| {
            LibrarianError::invalid(format!(
              "library '{}' has an invalid {} regex '{}': {}",
              library.id, kind, p, e
            ))
          })
        })
        .collect()
    };

    Ok(Self {
      remove: compile(&library.remove_regex, "remove")?,
      preserve: compile(&library.preserve_regex, "preserve")?,
    })
  }

  /// Preserve wins over remove
  pub fn should_remove(&self, path: &str) -> bool {
    self.remove.iter().any(|r| r.is_match(path)) && !self.preserve.iter().any(|r| r.is_match(path))
  }
}

/// Repo-relative forward-slash form of `path` under `base`
fn relative(base: &Path, path: &Path) -> LibrarianResult<String> {
  Ok(slash_path(path.strip_prefix(base)?))
}

/// Files under `dir`, relative to `base`, skipping `.git`
fn list_files(base: &Path, dir: &Path) -> LibrarianResult<BTreeSet<String>> {
  let mut files = BTreeSet::new();
  if !dir.exists() {
    return Ok(files);
  }
  let walker = WalkDir::new(dir)
    .follow_links(false)
    .into_iter()
    .filter_entry(|e| e.file_name() != ".git");
  for entry in walker {
    let entry = entry?;
    if entry.file_type().is_file() {
      files.insert(relative(base, entry.path())?);
    }
  }
  Ok(files)
}

fn same_bytes(a: &Path, b: &Path) -> LibrarianResult<bool> {
  if !b.is_file() {
    return Ok(false);
  }
  let (ma, mb) = (fs::metadata(a)?, fs::metadata(b)?);
  if ma.len() != mb.len() {
    return Ok(false);
  }
  Ok(fs::read(a)? == fs::read(b)?)
}

/// Compute the operations reconciling `staging` into `repo` for `library`
pub fn build_plan(library: &LibraryState, staging: &Path, repo: &Path, mode: Mode) -> LibrarianResult<ReconcilePlan> {
  let rules = Rules::compile(library)?;
  let mut plan = ReconcilePlan::new(&library.id);

  let mut staged = BTreeSet::new();
  for path in list_files(staging, staging)? {
    if library.owns_path(&path) {
      staged.insert(path);
    } else {
      plan.ignored.push(path);
    }
  }

  if mode == Mode::CleanAndCopy {
    let mut existing = BTreeSet::new();
    for root in &library.source_roots {
      existing.extend(list_files(repo, &repo.join(root))?);
    }
    for path in existing {
      // A staged file at the same path overwrites it, so no removal is needed
      if rules.should_remove(&path) && !staged.contains(&path) {
        plan.operations.push(Operation::Remove { path });
      }
    }
  }

  for path in staged {
    if same_bytes(&staging.join(&path), &repo.join(&path))? {
      plan.unchanged += 1;
    } else {
      plan.operations.push(Operation::Write { path });
    }
  }

  if !plan.ignored.is_empty() {
    tracing::warn!(
      library = %library.id,
      ignored = plan.ignored.len(),
      "staged files outside source roots were ignored"
    );
  }

  Ok(plan)
}

/// Fail before touching anything when a write would land on a directory that
/// keeps files, or below a file that is not being removed
fn check_conflicts(plan: &ReconcilePlan, repo: &Path) -> LibrarianResult<()> {
  let removed: BTreeSet<&str> = plan.removals().collect();

  for path in plan.writes() {
    let dest = repo.join(path);
    if dest.is_dir() {
      let kept: Vec<String> = list_files(repo, &dest)?
        .into_iter()
        .filter(|f| !removed.contains(f.as_str()))
        .collect();
      if !kept.is_empty() {
        return Err(LibrarianError::invalid(format!(
          "library '{}' generated file '{}', but that directory still holds {}",
          plan.library,
          path,
          kept.join(", ")
        )));
      }
    }

    let mut ancestor = Path::new(path).parent();
    while let Some(rel) = ancestor {
      let rel_str = slash_path(rel);
      if rel_str.is_empty() {
        break;
      }
      if repo.join(rel).is_file() && !removed.contains(rel_str.as_str()) {
        return Err(LibrarianError::invalid(format!(
          "library '{}' generated '{}', but '{}' is a file that is kept",
          plan.library, path, rel_str
        )));
      }
      ancestor = rel.parent();
    }
  }
  Ok(())
}

/// Remove empty directories left behind by removals, deepest first, stopping
/// at the repository root and at source roots
fn prune_empty_dirs(library: &LibraryState, touched_dirs: &BTreeSet<PathBuf>, repo: &Path) -> LibrarianResult<()> {
  for dir in touched_dirs.iter().rev() {
    let mut current = Some(dir.as_path());
    while let Some(rel) = current {
      let rel_str = slash_path(rel);
      if rel_str.is_empty() || library.source_roots.iter().any(|r| r.trim_end_matches('/') == rel_str) {
        break;
      }
      let abs = repo.join(rel);
      let is_empty = fs::read_dir(&abs).map(|mut d| d.next().is_none()).unwrap_or(false);
      if !is_empty {
        break;
      }
      fs::remove_dir(&abs).with_context(|| format!("Failed to prune {}", abs.display()))?;
      current = rel.parent();
    }
  }
  Ok(())
}

/// Apply a plan: removals, then pruning of emptied directories (never a
/// source root), then writes. Path conflicts are rejected before any change.
pub fn apply_plan(library: &LibraryState, plan: &ReconcilePlan, staging: &Path, repo: &Path) -> LibrarianResult<()> {
  check_conflicts(plan, repo)?;

  let mut touched_dirs = BTreeSet::new();
  for path in plan.removals() {
    let dest = repo.join(path);
    fs::remove_file(&dest).with_context(|| format!("Failed to remove {}", dest.display()))?;
    if let Some(parent) = Path::new(path).parent() {
      touched_dirs.insert(parent.to_path_buf());
    }
  }

  // A directory emptied above may be replaced by a file of the same name
  prune_empty_dirs(library, &touched_dirs, repo)?;

  for path in plan.writes() {
    let dest = repo.join(path);
    if let Some(parent) = dest.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::copy(staging.join(path), &dest).with_context(|| format!("Failed to write {}", dest.display()))?;
  }

  tracing::debug!(library = %library.id, operations = plan.operations.len(), "applied reconcile plan");
  Ok(())
}

/// Plan and apply in one step
pub fn reconcile(library: &LibraryState, staging: &Path, repo: &Path, mode: Mode) -> LibrarianResult<ReconcilePlan> {
  let plan = build_plan(library, staging, repo, mode)?;
  apply_plan(library, &plan, staging, repo)?;
  Ok(plan)
}
