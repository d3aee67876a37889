//! Error types for librarian with contextual messages and exit codes
//!
//! Every failure the engine can produce falls into one of a small number of
//! categories. Unit-local failures (one library, one repository) are captured
//! in an outcome list and surfaced together as a [`LibrarianError::PartialFailure`];
//! only invocation-level failures abort the process with a non-zero exit code.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for librarian
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// Success, or a partial failure that was reported but not fatal
  Ok = 0,
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, network, container runtime, I/O)
  System = 2,
  /// Validation failure (malformed flags, paths or state)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for librarian
#[derive(Debug)]
pub enum LibrarianError {
  /// Configuration or state file missing
  Config(ConfigError),

  /// Malformed flags, paths or state; fatal before any mutation
  Validation(ValidationError),

  /// A container invocation exited non-zero or produced a bad response
  Container(ContainerError),

  /// Several independent units failed; the rest completed
  PartialFailure(PartialFailure),

  /// Git precondition or git command failure
  Git(GitError),

  /// Malformed state file or commit message
  Parse { what: String, reason: String },

  /// GitHub or build-trigger service failure
  ExternalApi { service: String, message: String },

  /// No build trigger with this exact name in the project/region
  TriggerNotFound { name: String, project: String, region: String },

  /// The unit was cancelled or ran past its deadline
  Cancelled { unit: String },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl LibrarianError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    LibrarianError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    LibrarianError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Shorthand for a validation failure with a free-form reason
  pub fn invalid(reason: impl Into<String>) -> Self {
    LibrarianError::Validation(ValidationError::Invalid { reason: reason.into() })
  }

  /// Shorthand for a parse failure
  pub fn parse(what: impl Into<String>, reason: impl Into<String>) -> Self {
    LibrarianError::Parse {
      what: what.into(),
      reason: reason.into(),
    }
  }

  /// Shorthand for an external service failure
  pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
    LibrarianError::ExternalApi {
      service: service.into(),
      message: message.into(),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      LibrarianError::Message { message, context, help } => LibrarianError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      LibrarianError::Io(e) => LibrarianError::Message {
        message: format!("{}: {}", ctx_str, e),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      LibrarianError::Config(_) => ExitCode::User,
      LibrarianError::Validation(_) => ExitCode::Validation,
      LibrarianError::Container(_) => ExitCode::System,
      LibrarianError::PartialFailure(p) if p.all_failed() => ExitCode::System,
      LibrarianError::PartialFailure(_) => ExitCode::Ok,
      LibrarianError::Git(_) => ExitCode::System,
      LibrarianError::Parse { .. } => ExitCode::User,
      LibrarianError::ExternalApi { .. } => ExitCode::System,
      LibrarianError::TriggerNotFound { .. } => ExitCode::User,
      LibrarianError::Cancelled { .. } => ExitCode::System,
      LibrarianError::Io(_) => ExitCode::System,
      LibrarianError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      LibrarianError::Config(e) => e.help_message(),
      LibrarianError::Git(e) => e.help_message(),
      LibrarianError::Validation(e) => e.help_message(),
      LibrarianError::Container(_) => {
        Some("Inspect the container logs above; re-running the command is safe.".to_string())
      }
      LibrarianError::ExternalApi { .. } => {
        Some("Check GITHUB_TOKEN / LIBRARIAN_GCP_TOKEN and retry; no retries are performed automatically.".to_string())
      }
      LibrarianError::TriggerNotFound { .. } => {
        Some("Check --project and --region; trigger names must match the command exactly.".to_string())
      }
      LibrarianError::PartialFailure(p) if !p.all_failed() => Some(format!(
        "Completed units were kept. Re-run for: {}",
        p.failed_units().join(", ")
      )),
      LibrarianError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for LibrarianError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LibrarianError::Config(e) => write!(f, "{}", e),
      LibrarianError::Validation(e) => write!(f, "{}", e),
      LibrarianError::Container(e) => write!(f, "{}", e),
      LibrarianError::PartialFailure(e) => write!(f, "{}", e),
      LibrarianError::Git(e) => write!(f, "{}", e),
      LibrarianError::Parse { what, reason } => write!(f, "Failed to parse {}: {}", what, reason),
      LibrarianError::ExternalApi { service, message } => write!(f, "{} request failed: {}", service, message),
      LibrarianError::TriggerNotFound { name, project, region } => {
        write!(f, "Build trigger '{}' not found in {}/{}", name, project, region)
      }
      LibrarianError::Cancelled { unit } => write!(f, "Cancelled: {}", unit),
      LibrarianError::Io(e) => write!(f, "I/O error: {}", e),
      LibrarianError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for LibrarianError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      LibrarianError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for LibrarianError {
  fn from(err: io::Error) -> Self {
    LibrarianError::Io(err)
  }
}

impl From<String> for LibrarianError {
  fn from(msg: String) -> Self {
    LibrarianError::message(msg)
  }
}

impl From<&str> for LibrarianError {
  fn from(msg: &str) -> Self {
    LibrarianError::message(msg)
  }
}

impl From<serde_json::Error> for LibrarianError {
  fn from(err: serde_json::Error) -> Self {
    LibrarianError::parse("JSON document", err.to_string())
  }
}

impl From<serde_yaml::Error> for LibrarianError {
  fn from(err: serde_yaml::Error) -> Self {
    LibrarianError::parse("YAML document", err.to_string())
  }
}

impl From<toml_edit::de::Error> for LibrarianError {
  fn from(err: toml_edit::de::Error) -> Self {
    LibrarianError::parse("TOML document", err.to_string())
  }
}

impl From<toml_edit::ser::Error> for LibrarianError {
  fn from(err: toml_edit::ser::Error) -> Self {
    LibrarianError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<semver::Error> for LibrarianError {
  fn from(err: semver::Error) -> Self {
    LibrarianError::parse("version", err.to_string())
  }
}

impl From<regex::Error> for LibrarianError {
  fn from(err: regex::Error) -> Self {
    LibrarianError::invalid(format!("invalid regular expression: {}", err))
  }
}

impl From<reqwest::Error> for LibrarianError {
  fn from(err: reqwest::Error) -> Self {
    LibrarianError::external("HTTP", err.to_string())
  }
}

impl From<walkdir::Error> for LibrarianError {
  fn from(err: walkdir::Error) -> Self {
    LibrarianError::message(format!("Directory traversal error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for LibrarianError {
  fn from(err: std::path::StripPrefixError) -> Self {
    LibrarianError::message(format!("Path strip prefix error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for LibrarianError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    LibrarianError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<rayon::ThreadPoolBuildError> for LibrarianError {
  fn from(err: rayon::ThreadPoolBuildError) -> Self {
    LibrarianError::message(format!("Failed to build worker pool: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// A required file (state, registry) was not found
  NotFound { path: PathBuf },

  /// Library not present in state
  LibraryNotFound { id: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Run from the root of a repository that contains .librarian/state.yaml, or pass --repo.".to_string())
      }
      ConfigError::LibraryNotFound { id } => Some(format!(
        "Libraries are listed in .librarian/state.yaml. Use `librarian configure --library {}` to onboard it.",
        id
      )),
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { path } => write!(f, "File not found: {}", path.display()),
      ConfigError::LibraryNotFound { id } => write!(f, "Library '{}' not found in state", id),
    }
  }
}

/// Validation errors
#[derive(Debug)]
pub enum ValidationError {
  /// Two libraries share an ID
  DuplicateLibrary { id: String },

  /// Two libraries claim overlapping source roots
  OverlappingSourceRoots {
    first: String,
    second: String,
    root: String,
  },

  /// A tag format is missing the `{version}` placeholder or repeats it
  TagFormat { id: String, format: String },

  /// A version would move backwards or sideways
  VersionRegression { id: String, current: String, proposed: String },

  /// Anything else that is wrong with flags, paths or state
  Invalid { reason: String },
}

impl ValidationError {
  fn help_message(&self) -> Option<String> {
    match self {
      ValidationError::OverlappingSourceRoots { .. } => {
        Some("Each source root must be owned by exactly one library.".to_string())
      }
      ValidationError::TagFormat { .. } => Some("Tag formats look like \"{id}-v{version}\".".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::DuplicateLibrary { id } => write!(f, "Library '{}' is declared more than once", id),
      ValidationError::OverlappingSourceRoots { first, second, root } => write!(
        f,
        "Libraries '{}' and '{}' both claim source root '{}'",
        first, second, root
      ),
      ValidationError::TagFormat { id, format } => write!(
        f,
        "Tag format '{}' for library '{}' must contain exactly one {{version}} placeholder",
        format, id
      ),
      ValidationError::VersionRegression { id, current, proposed } => write!(
        f,
        "Version of '{}' may only advance: {} -> {} rejected",
        id, current, proposed
      ),
      ValidationError::Invalid { reason } => write!(f, "Validation failed: {}", reason),
    }
  }
}

/// Container invocation failures
#[derive(Debug)]
pub enum ContainerError {
  /// The runtime could not be started at all
  Spawn { runtime: String, reason: String },

  /// The container exited with a non-zero status
  ExitStatus { verb: String, unit: String, code: Option<i32> },

  /// The response document is missing or malformed
  MalformedResponse { verb: String, unit: String, reason: String },

  /// The response document reported an error
  Reported { verb: String, unit: String, error: String },
}

impl fmt::Display for ContainerError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ContainerError::Spawn { runtime, reason } => write!(f, "Failed to start '{}': {}", runtime, reason),
      ContainerError::ExitStatus { verb, unit, code } => match code {
        Some(code) => write!(f, "Container '{}' for '{}' exited with status {}", verb, unit, code),
        None => write!(f, "Container '{}' for '{}' was terminated by a signal", verb, unit),
      },
      ContainerError::MalformedResponse { verb, unit, reason } => {
        write!(f, "Container '{}' for '{}' wrote a malformed response: {}", verb, unit, reason)
      }
      ContainerError::Reported { verb, unit, error } => {
        write!(f, "Container '{}' for '{}' reported an error: {}", verb, unit, error)
      }
    }
  }
}

/// Aggregate of several unit failures
#[derive(Debug)]
pub struct PartialFailure {
  /// Operation name (generate, tag-and-release, automation)
  pub operation: String,
  /// Number of units attempted
  pub attempted: usize,
  /// (unit, error) pairs in unit order
  pub failures: Vec<(String, LibrarianError)>,
}

impl PartialFailure {
  /// True when no unit succeeded
  pub fn all_failed(&self) -> bool {
    self.failures.len() >= self.attempted
  }

  /// Names of the failed units
  pub fn failed_units(&self) -> Vec<&str> {
    self.failures.iter().map(|(unit, _)| unit.as_str()).collect()
  }
}

impl fmt::Display for PartialFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}: {} of {} unit(s) failed",
      self.operation,
      self.failures.len(),
      self.attempted
    )?;
    for (unit, err) in &self.failures {
      write!(f, "\n  - {}: {}", unit, err)?;
    }
    Ok(())
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Working tree has uncommitted changes
  DirtyWorkTree { path: PathBuf, entries: usize },

  /// A remote the command needs is not configured
  MissingRemote { name: String },

  /// A tag that should exist does not
  TagNotFound { tag: String },

  /// A commit is not a descendant of the one it replaces
  NotDescendant { previous: String, proposed: String },

  /// Push failed
  PushFailed {
    remote: String,
    branch: String,
    reason: String,
  },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::DirtyWorkTree { .. } => Some("Commit or stash local changes before running librarian.".to_string()),
      GitError::MissingRemote { name } => Some(format!("Add the remote with: git remote add {} <url>", name)),
      GitError::TagNotFound { tag } => Some(format!("Fetch tags (git fetch --tags) or create '{}' manually.", tag)),
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") {
          Some("The remote has commits you don't have. Pull first.".to_string())
        } else if reason.contains("permission denied") || reason.contains("403") {
          Some("Check your credentials and repository access.".to_string())
        } else {
          None
        }
      }
      GitError::RepoNotFound { path } => Some(format!(
        "Initialize the repository first or check the path: {}",
        path.display()
      )),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::DirtyWorkTree { path, entries } => {
        write!(
          f,
          "Working tree at {} has {} uncommitted change(s)",
          path.display(),
          entries
        )
      }
      GitError::MissingRemote { name } => write!(f, "Remote '{}' is not configured", name),
      GitError::TagNotFound { tag } => write!(f, "Tag not found: {}", tag),
      GitError::NotDescendant { previous, proposed } => write!(
        f,
        "Commit {} is not a descendant of previously generated commit {}",
        proposed, previous
      ),
      GitError::PushFailed { remote, branch, reason } => {
        write!(f, "Push to {}/{} failed: {}", remote, branch, reason)
      }
    }
  }
}

/// Result type alias for librarian
pub type LibrarianResult<T> = Result<T, LibrarianError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> LibrarianResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> LibrarianResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<LibrarianError>,
{
  fn context(self, ctx: impl Into<String>) -> LibrarianResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> LibrarianResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &LibrarianError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
