//! Diagnostic logging
//!
//! Diagnostics go to stderr through `tracing`; the user-facing summary each
//! command prints stays on stdout. `RUST_LOG` overrides the default filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(verbose: bool) -> &'static str {
  if verbose { "librarian=debug" } else { "librarian=info" }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

  let _ = tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
    .try_init();
}
