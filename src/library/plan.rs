//! Next-release proposal for a single library
//!
//! Read-only: the plan says whether a release is due and what the tag would
//! be. Creating the library release stays a human decision.

use crate::core::error::BotResult;
use crate::forge::{ForgeClient, api};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type of version bump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
  /// Bug fixes
  Patch,
  /// New features
  Minor,
  /// Breaking changes
  Major,
}

impl VersionBump {
  pub const ALL: [VersionBump; 3] = [VersionBump::Patch, VersionBump::Minor, VersionBump::Major];

  /// Apply bump to a semver version
  pub fn apply(&self, version: &semver::Version) -> semver::Version {
    match self {
      VersionBump::Major => semver::Version::new(version.major + 1, 0, 0),
      VersionBump::Minor => semver::Version::new(version.major, version.minor + 1, 0),
      VersionBump::Patch => semver::Version::new(version.major, version.minor, version.patch + 1),
    }
  }
}

/// A release tag split into its optional `v` and the version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
  pub prefixed: bool,
  pub version: semver::Version,
}

impl ReleaseTag {
  pub fn parse(tag: &str) -> Option<Self> {
    let (prefixed, raw) = match tag.strip_prefix('v') {
      Some(rest) => (true, rest),
      None => (false, tag),
    };
    let version = semver::Version::parse(raw).ok()?;
    Some(Self { prefixed, version })
  }

  /// Tag for the bumped version, keeping the `v` style
  pub fn bumped(&self, bump: VersionBump) -> String {
    let next = bump.apply(&self.version);
    if self.prefixed { format!("v{}", next) } else { next.to_string() }
  }
}

/// A candidate tag for the next release
#[derive(Debug, Clone, Serialize)]
pub struct Proposal {
  pub bump: VersionBump,
  pub tag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlan {
  pub repo: String,
  pub default_branch: String,
  pub current_tag: Option<String>,
  pub released_at: Option<DateTime<Utc>>,
  pub last_commit_at: Option<DateTime<Utc>>,
  pub needs_release: bool,
  pub proposals: Vec<Proposal>,
  pub selected: VersionBump,
}

impl ReleasePlan {
  pub fn selected_tag(&self) -> Option<&str> {
    self
      .proposals
      .iter()
      .find(|p| p.bump == self.selected)
      .map(|p| p.tag.as_str())
  }
}

/// A release is due when the branch tip is newer than the latest release
///
/// No release at all always needs one; unknown dates never do.
pub fn needs_new_release(released_at: Option<DateTime<Utc>>, has_release: bool, last_commit_at: Option<DateTime<Utc>>) -> bool {
  if !has_release {
    return true;
  }
  match (released_at, last_commit_at) {
    (Some(released), Some(committed)) => released < committed,
    _ => false,
  }
}

/// Proposed tags; a library without releases starts from `0.0.0`
pub fn proposals(current_tag: Option<&str>) -> Vec<Proposal> {
  let base = match current_tag {
    Some(tag) => match ReleaseTag::parse(tag) {
      Some(parsed) => parsed,
      None => {
        tracing::warn!(tag, "latest tag isn't semver; no proposals");
        return Vec::new();
      }
    },
    None => ReleaseTag {
      prefixed: false,
      version: semver::Version::new(0, 0, 0),
    },
  };

  VersionBump::ALL
    .iter()
    .map(|bump| Proposal {
      bump: *bump,
      tag: base.bumped(*bump),
    })
    .collect()
}

/// Build the plan for `repo`
pub fn plan_release(forge: &dyn ForgeClient, repo: &str, selected: VersionBump) -> BotResult<ReleasePlan> {
  let info = api::repo_info(forge, repo)?;
  let latest = api::latest_release(forge, repo)?;
  let tip = api::commit_detail(forge, repo, &info.default_branch)?;

  let current_tag = latest.as_ref().map(|r| r.tag_name.clone());
  let released_at = latest.as_ref().and_then(|r| r.created_at);
  let last_commit_at = tip.committed_at();

  Ok(ReleasePlan {
    repo: info.full_name,
    default_branch: info.default_branch,
    needs_release: needs_new_release(released_at, latest.is_some(), last_commit_at),
    proposals: proposals(current_tag.as_deref()),
    current_tag,
    released_at,
    last_commit_at,
    selected,
  })
}
