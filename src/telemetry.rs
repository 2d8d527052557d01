//! Tracing initialisation
//!
//! Call [`init_tracing`] once at program start. Logs go to stderr so stdout
//! stays clean for reports and `--json` output.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Target of the record written when a command fails
///
/// Kept off stderr, where `print_error` already shows the same error.
pub const FAILURE_TARGET: &str = "bundlebot::failure";

/// Default level for a `-v` count
pub fn level_for(verbosity: u8) -> Level {
  match verbosity {
    0 => Level::WARN,
    1 => Level::INFO,
    _ => Level::DEBUG,
  }
}

/// Initialise the global tracing subscriber
///
/// `RUST_LOG` wins over `verbosity`. With `log_file`, a second layer appends
/// plain (uncoloured) lines to that file. Only the first call takes effect.
pub fn init_tracing(verbosity: u8, log_file: Option<&Path>) -> std::io::Result<()> {
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity).as_str()));

  let file_layer = match log_file {
    Some(path) => {
      let file = OpenOptions::new().create(true).append(true).open(path)?;
      Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
    }
    None => None,
  };

  tracing_subscriber::registry()
    .with(env_filter)
    .with(
      fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter_fn(|meta| meta.target() != FAILURE_TARGET)),
    )
    .with(file_layer)
    .try_init()
    .ok();

  Ok(())
}
