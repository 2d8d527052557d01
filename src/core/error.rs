//! Error types for bundlebot with contextual messages and exit codes
//!
//! Every fatal condition of a run is a [`BotError`]. Recoverable problems
//! (one submodule's contributors could not be resolved, one commit had no
//! forge identity) are not errors at all; they are recorded as
//! [`Diagnostic`]s and surfaced in the final summary.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for bundlebot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, network, I/O)
  System = 2,
  /// The forge refused an operation (release rejected, manifest missing)
  Forge = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// How an error affects the run that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Halts the run; propagated to `main`
  Fatal,
  /// The caller may drop the affected unit of work and continue
  Recoverable,
}

/// Main error type for bundlebot
#[derive(Debug)]
pub enum BotError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Forge (HTTP API) errors
  Forge(ForgeError),

  /// Bundle reconciliation contract violations
  Bundle(BundleError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl BotError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    BotError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    BotError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      BotError::Message { message, context, help } => BotError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      BotError::Io(err) => BotError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Classify the error for callers that can skip a unit of work
  ///
  /// Transport failures and unresolvable commits only cost one submodule's or
  /// one commit's credit. Everything else ends the run.
  pub fn kind(&self) -> ErrorKind {
    match self {
      BotError::Forge(ForgeError::Transport { .. })
      | BotError::Forge(ForgeError::Status { .. })
      | BotError::Forge(ForgeError::Decode { .. }) => ErrorKind::Recoverable,
      BotError::Git(GitError::CommandFailed { .. }) => ErrorKind::Recoverable,
      _ => ErrorKind::Fatal,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      BotError::Config(_) => ExitCode::User,
      BotError::Git(_) => ExitCode::System,
      BotError::Forge(_) => ExitCode::Forge,
      BotError::Bundle(_) => ExitCode::System,
      BotError::Io(_) => ExitCode::System,
      BotError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      BotError::Config(e) => e.help_message(),
      BotError::Git(e) => e.help_message(),
      BotError::Forge(e) => e.help_message(),
      BotError::Bundle(e) => e.help_message(),
      BotError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for BotError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BotError::Config(e) => write!(f, "{}", e),
      BotError::Git(e) => write!(f, "{}", e),
      BotError::Forge(e) => write!(f, "{}", e),
      BotError::Bundle(e) => write!(f, "{}", e),
      BotError::Io(e) => write!(f, "I/O error: {}", e),
      BotError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for BotError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      BotError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for BotError {
  fn from(err: io::Error) -> Self {
    BotError::Io(err)
  }
}

impl From<String> for BotError {
  fn from(msg: String) -> Self {
    BotError::message(msg)
  }
}

impl From<&str> for BotError {
  fn from(msg: &str) -> Self {
    BotError::message(msg)
  }
}

impl From<ConfigError> for BotError {
  fn from(err: ConfigError) -> Self {
    BotError::Config(err)
  }
}

impl From<GitError> for BotError {
  fn from(err: GitError) -> Self {
    BotError::Git(err)
  }
}

impl From<ForgeError> for BotError {
  fn from(err: ForgeError) -> Self {
    BotError::Forge(err)
  }
}

impl From<BundleError> for BotError {
  fn from(err: BundleError) -> Self {
    BotError::Bundle(err)
  }
}

impl From<toml_edit::de::Error> for BotError {
  fn from(err: toml_edit::de::Error) -> Self {
    BotError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for BotError {
  fn from(err: toml_edit::ser::Error) -> Self {
    BotError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for BotError {
  fn from(err: serde_json::Error) -> Self {
    BotError::message(format!("JSON error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// An explicitly requested config file does not exist
  NotFound { path: PathBuf },

  /// A field holds a value the tool cannot work with
  InvalidField { field: String, reason: String },

  /// Bundle not found in configuration
  BundleNotFound { name: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => Some("Run `bundlebot init` to create a configuration file.".to_string()),
      ConfigError::BundleNotFound { name } => Some(format!(
        "Add a [[bundles]] entry named '{}' to bundlebot.toml, or omit --bundle to process every bundle.",
        name
      )),
      ConfigError::InvalidField { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { path } => {
        write!(f, "Configuration file not found: {}", path.display())
      }
      ConfigError::InvalidField { field, reason } => {
        write!(f, "Invalid value for '{}': {}", field, reason)
      }
      ConfigError::BundleNotFound { name } => {
        write!(f, "Bundle '{}' not found in configuration", name)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Clone failed
  CloneFailed { url: String, reason: String },

  /// Push failed
  PushFailed { reason: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason } => {
        if reason.contains("non-fast-forward") {
          Some("The remote bundle has commits you don't have. Re-run `bundlebot bundle update` to pull first.".to_string())
        } else if reason.contains("permission denied") || reason.contains("403") {
          Some("Check that the configured access token may push to the bundle repository.".to_string())
        } else {
          None
        }
      }
      GitError::RepoNotFound { path } => Some(format!(
        "Run `bundlebot bundle update` to clone the bundle, or check the path: {}",
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
      GitError::CloneFailed { url, reason } => {
        write!(f, "Failed to clone {}: {}", url, reason)
      }
      GitError::PushFailed { reason } => {
        write!(f, "Push failed: {}", reason)
      }
    }
  }
}

/// Forge API errors
///
/// Messages are already redacted when constructed: no variant ever carries
/// the raw access token.
#[derive(Debug)]
pub enum ForgeError {
  /// Request never produced a response (DNS, TLS, timeout)
  Transport { url: String, reason: String },

  /// Response with a non-success status
  Status { url: String, status: u16, message: String },

  /// Body could not be decoded into the expected type
  Decode { url: String, reason: String },

  /// The bundle's submodule manifest could not be fetched
  ManifestUnavailable { url: String, status: u16 },

  /// The forge refused to create a release
  ReleaseRejected { tag: String, status: u16, message: String },
}

impl ForgeError {
  fn help_message(&self) -> Option<String> {
    match self {
      ForgeError::Status { status: 401, .. } | ForgeError::ReleaseRejected { status: 401, .. } => {
        Some("The access token was rejected. Check the token environment variable named in bundlebot.toml.".to_string())
      }
      ForgeError::ReleaseRejected { status: 422, .. } => {
        Some("A release with today's tag probably exists already. Releases are tagged once per day.".to_string())
      }
      ForgeError::ManifestUnavailable { .. } => {
        Some("Check the bundle name, owner and default_branch in bundlebot.toml.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ForgeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ForgeError::Transport { url, reason } => write!(f, "Request to {} failed: {}", url, reason),
      ForgeError::Status { url, status, message } => {
        write!(f, "Forge returned {} for {}: {}", status, url, message)
      }
      ForgeError::Decode { url, reason } => write!(f, "Unexpected response from {}: {}", url, reason),
      ForgeError::ManifestUnavailable { url, status } => {
        write!(f, "Failed to access bundle .gitmodules file ({}): {}", status, url)
      }
      ForgeError::ReleaseRejected { tag, status, message } => {
        write!(f, "Failed to create release {} ({}): {}", tag, status, message)
      }
    }
  }
}

/// Bundle reconciliation errors
#[derive(Debug)]
pub enum BundleError {
  /// A diff hunk names a submodule the registry snapshot doesn't know
  UnregisteredSubmodule { path: String },

  /// Working tree holds a change the updater won't commit
  UnsupportedUpdate { status_line: String },

  /// Submodule diff output couldn't be interpreted
  MalformedDiff { path: String, reason: String },
}

impl BundleError {
  fn help_message(&self) -> Option<String> {
    match self {
      BundleError::UnregisteredSubmodule { .. } => Some(
        "The registry and the diff were read from different snapshots. Pull the bundle and run again.".to_string(),
      ),
      BundleError::UnsupportedUpdate { .. } => {
        Some("Only modified library submodules can be committed automatically. Clean the bundle working copy.".to_string())
      }
      BundleError::MalformedDiff { .. } => None,
    }
  }
}

impl fmt::Display for BundleError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BundleError::UnregisteredSubmodule { path } => {
        write!(f, "Submodule '{}' changed but is not in the bundle's .gitmodules", path)
      }
      BundleError::UnsupportedUpdate { status_line } => {
        write!(f, "Unsupported updates in bundle working copy: {}", status_line)
      }
      BundleError::MalformedDiff { path, reason } => {
        write!(f, "Could not read submodule diff for '{}': {}", path, reason)
      }
    }
  }
}

/// Result type alias for bundlebot
pub type BotResult<T> = Result<T, BotError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> BotResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> BotResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<BotError>,
{
  fn context(self, ctx: impl Into<String>) -> BotResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> BotResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// What kind of partial failure a diagnostic records
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
  /// A submodule's contributors were omitted from the tally
  ContributorsSkipped,
  /// A single commit could not be credited
  CommitUnresolved,
  /// The identity cache could not be loaded or saved
  CacheUnavailable,
}

/// A recoverable problem noticed during a run
#[derive(Debug, Clone, serde::Serialize)]
pub struct Diagnostic {
  pub kind: DiagnosticKind,
  pub subject: String,
  pub message: String,
}

/// In-memory list of recoverable problems, printed once at the end of a run
#[derive(Debug, Default, Clone, serde::Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
  entries: Vec<Diagnostic>,
}

impl Diagnostics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a problem and log it at warn level
  pub fn push(&mut self, kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) {
    let diagnostic = Diagnostic {
      kind,
      subject: subject.into(),
      message: message.into(),
    };
    tracing::warn!(kind = ?diagnostic.kind, subject = %diagnostic.subject, "{}", diagnostic.message);
    self.entries.push(diagnostic);
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
    self.entries.iter()
  }

  /// Print the collected problems as the closing section of a summary
  pub fn print_summary(&self) {
    if self.is_empty() {
      return;
    }
    println!();
    println!("⚠️  {} problem(s) were skipped during this run:", self.len());
    for d in self.iter() {
      println!("   - {}: {}", d.subject, d.message);
    }
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &BotError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
