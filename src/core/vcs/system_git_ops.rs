//! Operations on the umbrella working copy and its submodules

use super::system_git::SystemGit;
use super::{BundleRepo, LogEntry};
use crate::core::error::{BotError, BotResult, GitError, ResultExt};

impl BundleRepo for SystemGit {
  fn submodule_diff(&self, since: &str) -> BotResult<String> {
    let mut cmd = self.git_cmd();
    cmd.args(["diff", "--submodule=short", &format!("{}..", since)]);
    self.run(cmd, "git diff --submodule=short")
  }

  fn exact_tag(&self, submodule: &str, commit: &str) -> BotResult<Option<String>> {
    let output = self
      .git_cmd_in(Some(submodule))
      .args(["describe", "--tags", "--exact-match", commit])
      .output()
      .context("Failed to run git describe")?;

    // Exit 128 is the ordinary "no tag points here" answer
    if !output.status.success() {
      return Ok(None);
    }

    let tag = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(if tag.is_empty() { None } else { Some(tag) })
  }

  fn commit_log(&self, submodule: Option<&str>, range: &str) -> BotResult<Vec<LogEntry>> {
    let mut cmd = self.git_cmd_in(submodule);
    cmd.args(["log", "--pretty=tformat:%H,%ae,%ce", range]);
    let stdout = self.run(cmd, "git log")?;
    parse_log_lines(&stdout)
  }

  fn head_commit(&self) -> BotResult<String> {
    let mut cmd = self.git_cmd();
    cmd.args(["rev-parse", "HEAD"]);
    Ok(self.run(cmd, "git rev-parse HEAD")?.trim().to_string())
  }
}

impl SystemGit {
  /// Pull the checked-out branch
  pub fn pull(&self) -> BotResult<()> {
    let mut cmd = self.git_cmd();
    cmd.args(["pull", "--ff-only"]);
    self.run(cmd, "git pull").map(|_| ())
  }

  /// `git submodule init` followed by `git submodule update`
  pub fn init_submodules(&self) -> BotResult<()> {
    let mut init = self.git_cmd();
    init.args(["submodule", "init"]);
    self.run(init, "git submodule init")?;

    let mut update = self.git_cmd();
    update.args(["submodule", "update"]);
    self.run(update, "git submodule update").map(|_| ())
  }

  /// Fetch inside one submodule
  pub fn fetch_submodule(&self, submodule: &str) -> BotResult<()> {
    let mut cmd = self.git_cmd_in(Some(submodule));
    cmd.args(["fetch", "--tags"]);
    self.run(cmd, "git fetch").map(|_| ())
  }

  /// Newest tagged commit that isn't a pre-release
  ///
  /// Release tags look like `x.y.z`; pre-releases carry a `-` (`3.0.0-beta.5`).
  /// `--exclude` has to come before `--tags`.
  pub fn latest_release_commit(&self, submodule: &str) -> BotResult<Option<String>> {
    let mut cmd = self.git_cmd_in(Some(submodule));
    cmd.args(["rev-list", "--exclude=*-*", "--tags", "--max-count=1"]);
    let sha = self.run(cmd, "git rev-list --tags")?.trim().to_string();
    Ok(if sha.is_empty() { None } else { Some(sha) })
  }

  /// Detach a submodule at `rev`
  pub fn checkout_submodule(&self, submodule: &str, rev: &str) -> BotResult<()> {
    let mut cmd = self.git_cmd_in(Some(submodule));
    cmd.args(["checkout", "-q", rev]);
    self.run(cmd, "git checkout").map(|_| ())
  }

  /// `git status --short` lines of the umbrella
  pub fn status_short(&self) -> BotResult<Vec<String>> {
    let mut cmd = self.git_cmd();
    cmd.args(["status", "--short"]);
    let stdout = self.run(cmd, "git status --short")?;
    Ok(stdout.lines().filter(|l| !l.trim().is_empty()).map(str::to_string).collect())
  }

  /// `git diff --submodule=log <path>` against the index
  pub fn submodule_log_diff(&self, path: &str) -> BotResult<String> {
    let mut cmd = self.git_cmd();
    cmd.args(["diff", "--submodule=log", "--", path]);
    self.run(cmd, "git diff --submodule=log")
  }

  /// Stage everything and commit with `message`
  pub fn commit_all(&self, message: &str) -> BotResult<()> {
    let mut add = self.git_cmd();
    add.args(["add", "."]);
    self.run(add, "git add")?;

    let mut commit = self.git_cmd();
    commit.args(["commit", "-m", message]);
    self.run(commit, "git commit").map(|_| ())
  }

  /// Push the current branch to its upstream
  pub fn push(&self) -> BotResult<()> {
    println!("   Pushing bundle updates...");

    let output = self.git_cmd().arg("push").output().context("Failed to push")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(BotError::Git(GitError::PushFailed {
        reason: stderr.to_string(),
      }));
    }

    println!("   ✅ Pushed");
    Ok(())
  }
}

/// Parse `%H,%ae,%ce` lines
///
/// Emails never contain commas, so a plain split is exact.
pub(crate) fn parse_log_lines(output: &str) -> BotResult<Vec<LogEntry>> {
  let mut entries = Vec::new();
  for line in output.lines() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    let mut parts = line.splitn(3, ',');
    let (Some(sha), Some(author), Some(committer)) = (parts.next(), parts.next(), parts.next()) else {
      return Err(BotError::message(format!("Malformed git log line: {}", line)));
    };
    entries.push(LogEntry {
      sha: sha.to_string(),
      author_email: author.to_string(),
      committer_email: committer.to_string(),
    });
  }
  Ok(entries)
}
