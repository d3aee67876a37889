//! `migrate-config`: write the derived librarian.toml

use crate::core::config::{Config, build_config};
use crate::core::context::RepoContext;
use crate::core::error::{LibrarianError, LibrarianResult};

/// Run `librarian migrate-config`
pub fn run_migrate_config(repo: Option<String>, language: &str) -> LibrarianResult<()> {
  if RepoContext::is_remote(repo.as_deref()) {
    return Err(LibrarianError::with_help(
      format!(
        "migrate-config writes into the checkout, but --repo {} would be a temporary clone",
        repo.unwrap_or_default()
      ),
      "Clone the repository and pass its local path.",
    ));
  }
  let ctx = RepoContext::build(repo.as_deref())?;
  let config = build_config(&ctx.state, &ctx.overrides, language)?;

  let previous = match Config::find_config_path(&ctx.root) {
    Some(path) => {
      tracing::debug!(path = %path.display(), "replacing existing config");
      Some(Config::load(&ctx.root)?)
    }
    None => None,
  };

  let path = config.save(&ctx.root)?;

  for diagnostic in &config.diagnostics {
    println!("⚠️  {}", diagnostic);
  }
  println!(
    "✅ Wrote {} ({} librar{})",
    path.display(),
    config.libraries.len(),
    if config.libraries.len() == 1 { "y" } else { "ies" }
  );

  if let Some(previous) = previous {
    let added: Vec<&str> = config
      .libraries
      .iter()
      .filter(|lib| previous.library(&lib.name).is_none())
      .map(|lib| lib.name.as_str())
      .collect();
    if !added.is_empty() {
      println!("   new since last migration: {}", added.join(", "));
    }
  }
  Ok(())
}
