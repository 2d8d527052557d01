//! Does a library need a release?
//!
//! Compares the latest release tag with the default branch and grades how
//! long user-facing changes have been waiting.

use crate::core::error::BotResult;
use crate::forge::types::Comparison;
use crate::forge::{ForgeClient, api};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Unreleased changes older than this are over a month stale
pub const STALE_AFTER_DAYS: i64 = 30;

/// Window for "recent" releases and week-old changes
pub const RECENT_DAYS: i64 = 7;

/// Files whose changes never warrant a release on their own
const IGNORED_FILES: &[&str] = &[
  "CODE_OF_CONDUCT.md",
  "LICENSE",
  "pyproject.toml.disabled",
  ".github/workflows/build.yml",
  ".github/workflows/release.yml",
  ".pre-commit-config.yaml",
  ".pylintrc",
  ".gitignore",
  "README.rst",
  "pyproject.toml",
];

/// Release state of one library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "days", rename_all = "snake_case")]
pub enum ReleaseState {
  NoRelease,
  UpToDate,
  StaleWithinWeek(i64),
  StaleWithinMonth(i64),
  StaleOverMonth(i64),
}

impl ReleaseState {
  pub fn describe(&self) -> String {
    match self {
      ReleaseState::NoRelease => "no release".to_string(),
      ReleaseState::UpToDate => "up to date".to_string(),
      ReleaseState::StaleWithinWeek(d) => format!("unreleased commits for {} day(s)", d),
      ReleaseState::StaleWithinMonth(d) => format!("unreleased commits for {} days (over a week)", d),
      ReleaseState::StaleOverMonth(d) => format!("unreleased commits for {} days (over a month)", d),
    }
  }
}

/// Whether a library has been released in the last week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
  /// Every release is from the last week
  New,
  /// The latest release is from the last week, older ones exist
  Updated,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryStatus {
  pub repo: String,
  pub default_branch: String,
  pub latest_tag: Option<String>,
  pub state: ReleaseState,
  pub freshness: Option<Freshness>,
}

fn is_ignored(name: &str) -> bool {
  name.starts_with('.')
    || name.starts_with("LICENSES/")
    || name.ends_with(".license")
    || IGNORED_FILES.contains(&name)
}

/// Changed files that matter to users, sorted
pub fn filter_release_files<'a>(files: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
  let mut kept: Vec<&str> = files.into_iter().filter(|f| !is_ignored(f)).collect();
  kept.sort_unstable();
  kept.dedup();
  kept
}

/// Grade the age of the oldest unreleased commit
pub fn classify_age(days: i64) -> ReleaseState {
  if days > STALE_AFTER_DAYS {
    ReleaseState::StaleOverMonth(days)
  } else if days > RECENT_DAYS {
    ReleaseState::StaleWithinMonth(days)
  } else {
    ReleaseState::StaleWithinWeek(days)
  }
}

/// State from an already fetched comparison
pub fn state_from_comparison(comparison: &Comparison, now: DateTime<Utc>) -> ReleaseState {
  if comparison.status == "identical" {
    return ReleaseState::UpToDate;
  }
  if filter_release_files(comparison.files.iter().map(|f| f.filename.as_str())).is_empty() {
    return ReleaseState::UpToDate;
  }

  let oldest = comparison
    .commits
    .iter()
    .filter_map(|c| c.commit.committer.as_ref().map(|s| s.date))
    .min()
    .unwrap_or(now);
  classify_age((now - oldest).num_days().max(0))
}

/// Latest tag and release state of `repo` against `default_branch`
pub fn release_state(
  forge: &dyn ForgeClient,
  repo: &str,
  default_branch: &str,
  now: DateTime<Utc>,
) -> BotResult<(Option<String>, ReleaseState)> {
  let Some(latest) = api::latest_release(forge, repo)? else {
    return Ok((None, ReleaseState::NoRelease));
  };

  let comparison = api::compare(forge, repo, &latest.tag_name, default_branch)?;
  Ok((Some(latest.tag_name), state_from_comparison(&comparison, now)))
}

/// New/updated classification over the last [`RECENT_DAYS`]
pub fn is_new_or_updated(forge: &dyn ForgeClient, repo: &str, now: DateTime<Utc>) -> BotResult<Option<Freshness>> {
  let cutoff = now - Duration::days(RECENT_DAYS);

  let Some(latest) = api::latest_release(forge, repo)? else {
    return Ok(None);
  };
  match latest.published_at {
    Some(published) if published >= cutoff => {}
    _ => return Ok(None),
  }

  let releases = api::list_releases(forge, repo)?;
  let recent = releases
    .iter()
    .filter(|r| r.published_at.is_some_and(|p| p >= cutoff))
    .count();

  Ok(Some(if recent == releases.len() {
    Freshness::New
  } else {
    Freshness::Updated
  }))
}

/// Full status of one `owner/repo`
pub fn library_status(forge: &dyn ForgeClient, repo: &str, now: DateTime<Utc>) -> BotResult<LibraryStatus> {
  let info = api::repo_info(forge, repo)?;
  let (latest_tag, state) = release_state(forge, repo, &info.default_branch, now)?;
  let freshness = is_new_or_updated(forge, repo, now)?;

  Ok(LibraryStatus {
    repo: info.full_name,
    default_branch: info.default_branch,
    latest_tag,
    state,
    freshness,
  })
}
