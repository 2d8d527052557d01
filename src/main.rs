mod bundle;
mod commands;
mod core;
mod forge;
mod library;
mod telemetry;
mod ui;
mod utils;

use clap::{Args, Parser, Subcommand};
use core::error::{BotError, print_error};
use library::plan::VersionBump;
use std::path::PathBuf;

/// Keep CircuitPython-style library bundles in step with their libraries
#[derive(Parser)]
#[command(name = "bundlebot")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Configuration file (default: bundlebot.toml in the current directory)
  #[arg(long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  /// More log output (-v info, -vv debug); RUST_LOG overrides
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  /// Also write logs to this file
  #[arg(long, global = true, value_name = "FILE")]
  log_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

/// Where a registry comes from
#[derive(Args)]
struct RegistrySource {
  /// Read this local .gitmodules instead of fetching the bundle's
  #[arg(long, value_name = "FILE")]
  manifest: Option<PathBuf>,

  /// Only this bundle (default: every configured bundle)
  #[arg(long, value_name = "NAME")]
  bundle: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Setup & Inspection
  // ============================================================================
  /// Write a default bundlebot.toml
  Init {
    /// Overwrite an existing configuration
    #[arg(long)]
    force: bool,
  },

  /// List the submodules registered in a bundle
  Submodules {
    #[command(flatten)]
    source: RegistrySource,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Check whether a repository is pinned as a library of a bundle
  Contains {
    /// Repository URL, any scheme, with or without .git
    url: String,
    #[command(flatten)]
    source: RegistrySource,
  },

  // ============================================================================
  // Bundles
  // ============================================================================
  /// Bundle maintenance and releases
  #[command(subcommand)]
  Bundle(BundleCommands),

  // ============================================================================
  // Libraries
  // ============================================================================
  /// Library release state
  #[command(subcommand)]
  Library(LibraryCommands),
}

#[derive(Subcommand)]
enum BundleCommands {
  /// Move every library submodule to its newest release and commit
  Update {
    /// Only this bundle
    #[arg(long, value_name = "NAME")]
    bundle: Option<String>,
    /// Commit but don't push
    #[arg(long)]
    no_push: bool,
    /// Show the commit message without committing
    #[arg(long)]
    dry_run: bool,
  },

  /// Show submodule changes of a local checkout since a tag (no network)
  Changes {
    /// Tag or commit to compare against
    #[arg(long)]
    since: String,
    /// Umbrella checkout (default: current directory)
    #[arg(long, value_name = "DIR")]
    path: Option<PathBuf>,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Publish a dated release describing changes since the last one
  Release {
    /// Only this bundle
    #[arg(long, value_name = "NAME")]
    bundle: Option<String>,
    /// Build the release description without publishing
    #[arg(long)]
    dry_run: bool,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },
}

#[derive(Subcommand)]
enum LibraryCommands {
  /// Does each library have unreleased changes?
  Status {
    /// Repositories as owner/repo
    #[arg(required = true, value_name = "OWNER/REPO")]
    repos: Vec<String>,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Propose the next release tag for a library
  Plan {
    /// Repository as owner/repo
    #[arg(value_name = "OWNER/REPO")]
    repo: String,
    /// Which proposal to highlight
    #[arg(long, value_enum, default_value = "patch")]
    bump: VersionBump,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },
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

fn main() {
  let cli = Cli::parse();

  if let Err(e) = telemetry::init_tracing(cli.verbose, cli.log_file.as_deref()) {
    eprintln!("Error: Failed to open log file: {}", e);
    std::process::exit(1);
  }

  let root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  // init must work when the existing config is broken
  let ctx = match &cli.command {
    Commands::Init { .. } => core::context::RunContext::with_defaults(&root),
    _ => match core::context::RunContext::build(&root, cli.config.as_deref()) {
      Ok(ctx) => ctx,
      Err(e) => handle_error(e, None),
    },
  };

  let result = match cli.command {
    Commands::Init { force } => commands::run_init(&ctx, force),
    Commands::Submodules { source, json } => {
      commands::run_submodules(&ctx, source.manifest.as_deref(), source.bundle.as_deref(), json)
    }
    Commands::Contains { url, source } => {
      match commands::run_contains(&ctx, &url, source.manifest.as_deref(), source.bundle.as_deref()) {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => Err(e),
      }
    }

    Commands::Bundle(bundle_cmd) => match bundle_cmd {
      BundleCommands::Update {
        bundle,
        no_push,
        dry_run,
      } => commands::run_bundle_update(&ctx, bundle.as_deref(), no_push, dry_run),
      BundleCommands::Changes { since, path, json } => {
        commands::run_bundle_changes(&ctx, &since, path.as_deref(), json)
      }
      BundleCommands::Release { bundle, dry_run, json } => {
        commands::run_bundle_release(&ctx, bundle.as_deref(), dry_run, json)
      }
    },

    Commands::Library(library_cmd) => match library_cmd {
      LibraryCommands::Status { repos, json } => commands::run_library_status(&ctx, &repos, json),
      LibraryCommands::Plan { repo, bump, json } => commands::run_library_plan(&ctx, &repo, bump, json),
    },
  };

  if let Err(err) = result {
    handle_error(err, ctx.config.forge.token().as_deref());
  }
}

/// Record the failure in the log, print it, and exit
///
/// `secret` is scrubbed from the logged message and help text.
fn handle_error(err: BotError, secret: Option<&str>) -> ! {
  let help = err.help_message().map(|h| utils::redact(&h, secret)).unwrap_or_default();
  tracing::error!(
    target: telemetry::FAILURE_TARGET,
    exit_code = err.exit_code().as_i32(),
    help = %help,
    "{}",
    utils::redact(&err.to_string(), secret)
  );
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
