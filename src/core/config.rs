//! Normalized repository configuration (`librarian.toml`)
//!
//! The legacy state file mixes tool-owned bookkeeping with per-library
//! settings. [`build_config`] derives the normalized configuration from a state
//! snapshot plus the human-edited overrides; `migrate-config` persists it.
//!
//! Searched in order: librarian.toml, .librarian.toml, .config/librarian.toml

use crate::core::error::{ConfigError, LibrarianError, LibrarianResult, ResultExt};
use crate::state::model::{DEFAULT_TAG_FORMAT, LibrarianState};
use crate::state::overrides::LibrarianConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the API-source entry in `sources`
pub const GOOGLEAPIS_SOURCE: &str = "googleapis";

/// Normalized configuration for one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  pub language: String,

  /// GitHub `owner/name` of the language repository
  pub repo: String,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub sources: BTreeMap<String, Source>,

  #[serde(default)]
  pub default: Defaults,

  #[serde(default)]
  pub libraries: Vec<Library>,

  /// Notes produced while deriving the config (never persisted)
  #[serde(skip)]
  pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
  pub commit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
  pub tag_format: String,
}

impl Default for Defaults {
  fn default() -> Self {
    Self {
      tag_format: DEFAULT_TAG_FORMAT.to_string(),
    }
  }
}

/// Normalized library record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Library {
  pub name: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub channels: Vec<Channel>,

  /// Paths kept across regeneration (legacy `preserve_regex`)
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub keep: Vec<String>,

  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub skip_generate: bool,

  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub skip_release: bool,

  /// Only set when it differs from `default.tag_format`
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tag_format: Option<String>,
}

/// One API surface published by a library
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Channel {
  pub path: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub service_config: Option<String>,
}

/// Default GitHub repository for a language
pub fn default_repo(language: &str) -> Option<&'static str> {
  match language {
    "go" => Some("googleapis/google-cloud-go"),
    "python" => Some("googleapis/google-cloud-python"),
    "java" => Some("googleapis/google-cloud-java"),
    "node" => Some("googleapis/google-cloud-node"),
    "dotnet" => Some("googleapis/google-cloud-dotnet"),
    "rust" => Some("googleapis/google-cloud-rust"),
    "dart" => Some("googleapis/google-cloud-dart"),
    _ => None,
  }
}

/// Derive a normalized [`Config`] from state and overrides.
///
/// Libraries are emitted sorted by name. A library that only appears in the
/// overrides is still emitted, with defaults.
///
/// The API-source commit is chosen explicitly: libraries are visited in name
/// order and the first non-empty `last_generated_commit` wins. When other
/// libraries carry a different commit, each disagreement is recorded in
/// `diagnostics` so callers can surface it.
pub fn build_config(state: &LibrarianState, overrides: &LibrarianConfig, language: &str) -> LibrarianResult<Config> {
  let repo = default_repo(language).ok_or_else(|| {
    LibrarianError::invalid(format!(
      "unknown language '{}' (expected one of go, python, java, node, dotnet, rust, dart)",
      language
    ))
  })?;

  let mut by_name: BTreeMap<String, Library> = BTreeMap::new();

  for lib in &state.libraries {
    let tag_format = if lib.tag_format.is_empty() || lib.tag_format == DEFAULT_TAG_FORMAT {
      None
    } else {
      Some(lib.tag_format.clone())
    };

    by_name.insert(
      lib.id.clone(),
      Library {
        name: lib.id.clone(),
        version: (!lib.version.is_empty()).then(|| lib.version.clone()),
        channels: lib
          .apis
          .iter()
          .map(|api| Channel {
            path: api.path.clone(),
            service_config: (!api.service_config.is_empty()).then(|| api.service_config.clone()),
          })
          .collect(),
        keep: lib.preserve_regex.clone(),
        tag_format,
        ..Default::default()
      },
    );
  }

  for over in &overrides.libraries {
    let library = by_name.entry(over.id.clone()).or_insert_with(|| Library {
      name: over.id.clone(),
      ..Default::default()
    });
    library.skip_generate = over.generate_blocked;
    library.skip_release = over.release_blocked;
  }

  let mut diagnostics = Vec::new();
  let mut chosen: Option<(&str, &str)> = None;
  let mut sorted: Vec<_> = state.libraries.iter().collect();
  sorted.sort_by(|a, b| a.id.cmp(&b.id));
  for lib in sorted {
    if lib.last_generated_commit.is_empty() {
      continue;
    }
    match chosen {
      None => chosen = Some((&lib.id, &lib.last_generated_commit)),
      Some((source_lib, commit)) if commit != lib.last_generated_commit => diagnostics.push(format!(
        "library '{}' was generated from {} but '{}' from {}; using {}",
        lib.id, lib.last_generated_commit, source_lib, commit, commit
      )),
      Some(_) => {}
    }
  }

  let mut sources = BTreeMap::new();
  if let Some((_, commit)) = chosen {
    sources.insert(
      GOOGLEAPIS_SOURCE.to_string(),
      Source {
        commit: commit.to_string(),
      },
    );
  }

  for note in &diagnostics {
    tracing::warn!("{}", note);
  }

  Ok(Config {
    language: language.to_string(),
    repo: repo.to_string(),
    sources,
    default: Defaults::default(),
    libraries: by_name.into_values().collect(),
    diagnostics,
  })
}

impl Config {
  /// Find config file in search order: librarian.toml, .librarian.toml, .config/librarian.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("librarian.toml"),
      path.join(".librarian.toml"),
      path.join(".config").join("librarian.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config (searches multiple locations)
  pub fn load(path: &Path) -> LibrarianResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      LibrarianError::Config(ConfigError::NotFound {
        path: path.join("librarian.toml"),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: Config = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    Ok(config)
  }

  /// Save config to librarian.toml (default location)
  pub fn save(&self, path: &Path) -> LibrarianResult<PathBuf> {
    let config_path = path.join("librarian.toml");
    let content = toml_edit::ser::to_string_pretty(self).context("Failed to serialize config to TOML")?;
    fs::write(&config_path, content).with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(config_path)
  }

  pub fn library(&self, name: &str) -> Option<&Library> {
    self.libraries.iter().find(|l| l.name == name)
  }
}
