mod automation;
mod commands;
mod container;
mod core;
mod generate;
mod github;
mod logging;
mod reconcile;
mod release;
mod state;
mod ui;
mod utils;

use automation::{AutomationOptions, DEFAULT_REGION, Location};
use clap::{Args, Parser, Subcommand};
use core::error::{LibrarianError, print_error};
use generate::GenerateOptions;
use release::{InitOptions, TagOptions};
use std::path::PathBuf;
use std::time::Duration;

/// Generate and release client libraries across language repositories
#[derive(Parser)]
#[command(name = "librarian")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Show debug diagnostics on stderr (RUST_LOG takes precedence)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Generation
  // ============================================================================
  /// Regenerate libraries from the API definitions
  Generate(GenerateArgs),

  /// Onboard a new library for an API, then generate it
  Configure(GenerateArgs),

  // ============================================================================
  // Release
  // ============================================================================
  /// Release preparation and publishing
  #[command(subcommand)]
  Release(ReleaseCommands),

  // ============================================================================
  // Fleet
  // ============================================================================
  /// Start a pipeline trigger for every registered repository
  Automation {
    /// Pipeline command: generate, stage-release, publish-release
    #[arg(long)]
    command: String,
    /// Cloud project hosting the build triggers
    #[arg(long)]
    project: String,
    /// Build trigger region
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,
    /// Let the triggered pipeline push branches and open PRs
    #[arg(long)]
    push: bool,
    /// Ask generate pipelines to also build
    #[arg(long)]
    build: bool,
    /// Ignore each repository's supported command list
    #[arg(long)]
    force_run: bool,
    /// Repository registry (YAML)
    #[arg(long, default_value = "repositories.yaml")]
    repositories: PathBuf,
    /// Repositories processed concurrently
    #[arg(long, default_value_t = 1)]
    jobs: usize,
  },

  // ============================================================================
  // Migration
  // ============================================================================
  /// Write librarian.toml derived from state.yaml and config.yaml
  MigrateConfig {
    /// Local path or URL of the language repository (default: current directory)
    #[arg(long)]
    repo: Option<String>,
    /// Language of the repository, e.g. go, python
    #[arg(long)]
    language: String,
  },
}

#[derive(Args)]
struct GenerateArgs {
  /// API path, e.g. google/cloud/secretmanager/v1
  #[arg(long)]
  api: Option<String>,
  /// Library ID
  #[arg(long)]
  library: Option<String>,
  /// Keep per-library work directories here
  #[arg(long)]
  output: Option<PathBuf>,
  /// Local path or URL of the language repository (default: current directory)
  #[arg(long)]
  repo: Option<String>,
  /// Local path or URL of the API definitions repository
  #[arg(long)]
  api_source: Option<String>,
  /// Push a branch and open a pull request
  #[arg(long)]
  push: bool,
  /// Run the build verb after generating
  #[arg(long)]
  build: bool,
  /// Generator image (default: image recorded in state)
  #[arg(long)]
  image: Option<String>,
  /// Libraries generated concurrently (default: available parallelism)
  #[arg(long)]
  jobs: Option<usize>,
  /// Per-container timeout in seconds
  #[arg(long)]
  timeout: Option<u64>,
  /// Container runtime binary
  #[arg(long, default_value = "docker")]
  runtime: String,
}

impl GenerateArgs {
  fn split(self) -> (Option<String>, GenerateOptions, String) {
    let opts = GenerateOptions {
      api: self.api,
      library: self.library,
      output: self.output,
      api_source: self.api_source,
      image: self.image,
      build: self.build,
      jobs: self.jobs,
      timeout: self.timeout.map(Duration::from_secs),
      push: self.push,
    };
    (self.repo, opts, self.runtime)
  }
}

#[derive(Subcommand)]
enum ReleaseCommands {
  /// Bump versions, write changelogs and open a release PR
  Init {
    /// Local path or URL of the language repository (default: current directory)
    #[arg(long)]
    repo: Option<String>,
    /// Write changelogs and container output here instead of the repository
    #[arg(long)]
    output: Option<PathBuf>,
    /// Release only this library
    #[arg(long)]
    library: Option<String>,
    /// Push a branch and open a pull request
    #[arg(long)]
    push: bool,
    /// Container runtime binary
    #[arg(long, default_value = "docker")]
    runtime: String,
  },

  /// Tag merged release PRs and publish GitHub releases
  TagAndRelease {
    /// GitHub URL or local checkout of the language repository
    #[arg(long)]
    repo: Option<String>,
    /// Process only this pull request
    #[arg(long)]
    pr: Option<u64>,
    /// Create tags and releases (default: dry run)
    #[arg(long)]
    push: bool,
  },
}

fn main() {
  let cli = Cli::parse();
  logging::init(cli.verbose);

  let result = match cli.command {
    Commands::Generate(args) => {
      let (repo, opts, runtime) = args.split();
      commands::run_generate(repo, opts, runtime)
    }
    Commands::Configure(args) => {
      let (repo, opts, runtime) = args.split();
      commands::run_configure(repo, opts, runtime)
    }

    Commands::Release(release_cmd) => match release_cmd {
      ReleaseCommands::Init {
        repo,
        output,
        library,
        push,
        runtime,
      } => commands::run_release_init(repo, InitOptions { library, output, push }, runtime),
      ReleaseCommands::TagAndRelease { repo, pr, push } => {
        commands::run_tag_and_release(repo, TagOptions { pr, push })
      }
    },

    Commands::Automation {
      command,
      project,
      region,
      push,
      build,
      force_run,
      repositories,
      jobs,
    } => command.parse::<automation::Command>().and_then(|command| {
      let opts = AutomationOptions {
        command,
        location: Location { project, region },
        push,
        build,
        force_run,
        jobs,
      };
      commands::run_automation(&repositories, opts)
    }),

    Commands::MigrateConfig { repo, language } => commands::run_migrate_config(repo, &language),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: LibrarianError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}
