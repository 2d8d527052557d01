//! Moving library submodules to their newest releases
//!
//! Clones or refreshes the umbrella checkout, points every library submodule
//! at its newest non-pre-release tag, and turns the result into one commit.

use super::manifest::Registry;
use super::version::VersionResolver;
use crate::core::config::{BundleConfig, ForgeConfig};
use crate::core::error::{BotResult, BundleError, ResultExt};
use crate::core::vcs::SystemGit;
use crate::utils::strip_git_suffix;
use serde::Serialize;
use std::path::Path;

/// One library moved by [`update_bundle`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleUpdate {
  pub path: String,
  /// Repository URL without `.git`
  pub url: String,
  pub old: String,
  pub new: String,
  /// `git diff --submodule=log` commit lines
  pub summary: String,
}

/// Clone the bundle if needed, then pull and sync submodules
pub fn fetch_bundle(forge: &ForgeConfig, bundle: &BundleConfig, root: &Path) -> BotResult<SystemGit> {
  let dest = bundle.working_copy(root);

  if !dest.join(".git").exists() {
    let token = forge.token();
    let host = forge
      .web_url
      .split_once("://")
      .map(|(_, h)| h)
      .unwrap_or(&forge.web_url)
      .trim_end_matches('/');
    let url = match &token {
      Some(t) => format!("https://{}@{}/{}/{}.git", t, host, forge.owner, bundle.name),
      None => format!("https://{}/{}/{}.git", host, forge.owner, bundle.name),
    };
    SystemGit::clone(&url, &dest, &forge.owner, token.as_deref())?;
  }

  let git = SystemGit::open(&dest)?;
  git.pull().with_context(|| format!("Failed to pull {}", bundle.name))?;
  git.init_submodules()?;
  Ok(git)
}

/// Check out the newest release of every library and describe what moved
///
/// Anything in `git status` other than a modified library submodule is
/// refused: the commit that follows stages the whole tree.
pub fn update_bundle(git: &SystemGit, registry: &Registry, libraries_prefix: &str) -> BotResult<Vec<BundleUpdate>> {
  for library in registry.libraries(libraries_prefix) {
    git
      .fetch_submodule(&library.path)
      .with_context(|| format!("Failed to fetch {}", library.path))?;
    match git.latest_release_commit(&library.path)? {
      Some(commit) => git.checkout_submodule(&library.path, &commit)?,
      None => tracing::debug!(path = %library.path, "no release tags; leaving pin alone"),
    }
  }

  let resolver = VersionResolver::new(git);
  let mut updates = Vec::new();

  for line in git.status_short()? {
    let mut parts = line.split_whitespace();
    let (Some(action), Some(path), None) = (parts.next(), parts.next(), parts.next()) else {
      return Err(BundleError::UnsupportedUpdate { status_line: line }.into());
    };
    if action != "M" || !path.starts_with(libraries_prefix) {
      return Err(BundleError::UnsupportedUpdate { status_line: line }.into());
    }

    let diff = git.submodule_log_diff(path)?;
    let Some(moved) = parse_submodule_log(&diff) else {
      return Err(
        BundleError::MalformedDiff {
          path: path.to_string(),
          reason: "missing 'Submodule <path> <old>..<new>:' header".to_string(),
        }
        .into(),
      );
    };

    let url = registry
      .find(path)
      .map(|s| strip_git_suffix(&s.url).to_string())
      .ok_or_else(|| BundleError::UnregisteredSubmodule { path: path.to_string() })?;

    updates.push(BundleUpdate {
      path: path.to_string(),
      url,
      old: resolver.resolve(path, &moved.old).as_str().to_string(),
      new: resolver.resolve(path, &moved.new).as_str().to_string(),
      summary: moved.summary,
    });
  }

  Ok(updates)
}

/// Parsed `git diff --submodule=log` for one submodule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleLog {
  pub old: String,
  pub new: String,
  pub summary: String,
}

/// Read `Submodule <path> <old>..<new>:` and the commit lines below it
///
/// Rewinds print `<old>...<new> (rewind):`; both forms are accepted.
pub fn parse_submodule_log(text: &str) -> Option<SubmoduleLog> {
  let mut lines = text.lines();
  let header = lines.next()?;
  let range = header.strip_prefix("Submodule ")?.split_whitespace().nth(1)?;
  let range = range.trim_end_matches(':');

  let mut ends = range.split('.').filter(|s| !s.is_empty());
  let old = ends.next()?.to_string();
  let new = ends.last()?.to_string();

  let summary = lines.collect::<Vec<_>>().join("\n").trim_end().to_string();
  Some(SubmoduleLog { old, new, summary })
}

/// Commit message for an automated bundle update
///
/// `#123` references in summaries are rewritten to `owner/repo#123` so they
/// still point at the library once they appear in the umbrella's history.
pub fn update_commit_message(version: &str, updates: &[BundleUpdate]) -> String {
  let mut paragraphs = vec![format!("Automated update by bundlebot (bundlebot@{})", version)];

  for update in updates {
    let mut segments = update.url.rsplit('/');
    let repo = segments.next().unwrap_or_default();
    let user = segments.next().unwrap_or_default();
    let summary = update.summary.replace('#', &format!("{}/{}#", user, repo));
    paragraphs.push(format!(
      "Updating {} to {} from {}:\n{}",
      update.url, update.new, update.old, summary
    ));
  }

  paragraphs.join("\n\n")
}
