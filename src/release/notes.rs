//! Release PR body blocks
//!
//! Release-init writes one `<details>` block per released library into the
//! pull request body; tag-and-release reads them back after the merge.

use crate::core::error::{LibrarianError, LibrarianResult};
use regex::Regex;
use std::sync::LazyLock;

static BLOCK: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?s)<details>\s*<summary>\s*(?P<id>[^:<\s]+)\s*:\s*v(?P<version>[^<\s]+)\s*</summary>(?P<notes>.*?)</details>")
    .expect("valid regex")
});

/// Notes for one released library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryNotes {
  pub library_id: String,
  pub version: String,
  pub notes: String,
}

impl LibraryNotes {
  pub fn render(&self) -> String {
    format!(
      "<details><summary>{}: v{}</summary>\n\n{}\n</details>",
      self.library_id,
      self.version,
      self.notes.trim()
    )
  }
}

/// Full PR body for a release
pub fn render_body(releases: &[LibraryNotes]) -> String {
  let mut body = String::from("Libraries released in this PR:\n\n");
  for release in releases {
    body.push_str(&release.render());
    body.push_str("\n\n");
  }
  body.trim_end().to_string() + "\n"
}

/// Extract every release block from a PR body
pub fn parse_body(body: &str) -> LibrarianResult<Vec<LibraryNotes>> {
  let mut releases = Vec::new();
  for caps in BLOCK.captures_iter(body) {
    let version = caps["version"].to_string();
    semver::Version::parse(&version)
      .map_err(|e| LibrarianError::parse(format!("release block for '{}'", &caps["id"]), e.to_string()))?;
    releases.push(LibraryNotes {
      library_id: caps["id"].to_string(),
      version,
      notes: caps["notes"].trim().to_string(),
    });
  }
  Ok(releases)
}
