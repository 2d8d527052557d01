pub mod system_git;
mod system_git_ops;

pub use system_git::SystemGit;

use crate::core::error::BotResult;

/// One line of `git log --pretty=tformat:%H,%ae,%ce`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
  pub sha: String,
  pub author_email: String,
  pub committer_email: String,
}

/// Version-control operations the reconciliation engine consumes
///
/// `submodule` arguments are paths relative to the umbrella root; `None`
/// means the umbrella repository itself. Implemented by [`SystemGit`] and by
/// in-memory fakes in tests.
pub trait BundleRepo {
  /// `git diff --submodule=short <since>..` in the umbrella
  fn submodule_diff(&self, since: &str) -> BotResult<String>;

  /// Tag pointing exactly at `commit` inside a submodule, if any
  fn exact_tag(&self, submodule: &str, commit: &str) -> BotResult<Option<String>>;

  /// Linear commit log for `range`
  fn commit_log(&self, submodule: Option<&str>, range: &str) -> BotResult<Vec<LogEntry>>;

  /// Umbrella HEAD
  fn head_commit(&self) -> BotResult<String>;
}
