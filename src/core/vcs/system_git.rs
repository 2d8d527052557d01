//! System git backend
//!
//! Every version-control operation shells out to the `git` binary with an
//! isolated environment. Output is returned as text; interpretation of that
//! text lives with the callers (`bundle::diff` owns all diff scraping).

use crate::core::error::{BotError, BotResult, GitError, ResultExt};
use crate::utils::redact;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Umbrella working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path) -> BotResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") || !path.exists() {
        return Err(BotError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(BotError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      work_tree: PathBuf::from(work_tree),
    })
  }

  /// Clone `url` into `dest`, naming the remote `origin_name`
  ///
  /// `secret` is scrubbed from any error text (token-authenticated URLs).
  pub fn clone(url: &str, dest: &Path, origin_name: &str, secret: Option<&str>) -> BotResult<Self> {
    if let Some(parent) = dest.parent() {
      std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    tracing::info!(dest = %dest.display(), "cloning bundle");
    let output = isolated(Command::new("git"))
      .args(["clone", "-o", origin_name, url])
      .arg(dest)
      .output()
      .context("Failed to run git clone")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(BotError::Git(GitError::CloneFailed {
        url: redact(url, secret),
        reason: redact(&stderr, secret),
      }));
    }

    Self::open(dest)
  }

  /// Umbrella working tree root
  pub fn root(&self) -> &Path {
    &self.work_tree
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to the umbrella root
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = isolated(Command::new("git"));
    cmd.arg("-C").arg(&self.work_tree);
    cmd
  }

  /// Same as [`git_cmd`](Self::git_cmd) but rooted inside a submodule
  pub(crate) fn git_cmd_in(&self, submodule: Option<&str>) -> Command {
    let mut cmd = isolated(Command::new("git"));
    match submodule {
      Some(path) => cmd.arg("-C").arg(self.work_tree.join(path)),
      None => cmd.arg("-C").arg(&self.work_tree),
    };
    cmd
  }

  /// Run a prepared command and return stdout, mapping failure to `GitError`
  pub(crate) fn run(&self, mut cmd: Command, label: &str) -> BotResult<String> {
    tracing::debug!(command = label, "git");
    let output = cmd.output().with_context(|| format!("Failed to run {}", label))?;
    check(output, label)
  }
}

/// Apply the environment isolation shared by every git invocation
fn isolated(mut cmd: Command) -> Command {
  // Isolated environment (don't trust global env)
  cmd.env_clear();
  for key in ["PATH", "HOME", "SSH_AUTH_SOCK"] {
    if let Ok(value) = std::env::var(key) {
      cmd.env(key, value);
    }
  }

  // Force safe behavior (override user config)
  cmd.arg("-c").arg("protocol.version=2");
  cmd.arg("-c").arg("advice.detachedHead=false");
  cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII
  cmd.arg("-c").arg("color.ui=never");
  cmd
}

fn check(output: Output, label: &str) -> BotResult<String> {
  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    return Err(BotError::Git(GitError::CommandFailed {
      command: label.to_string(),
      stderr: stderr.trim().to_string(),
    }));
  }
  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
