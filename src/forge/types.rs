//! Typed forge payloads
//!
//! JSON is decoded into these at the boundary; nothing past `forge::api`
//! looks at raw maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published release
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Release {
  pub tag_name: String,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub published_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub html_url: Option<String>,
}

/// Account attached to a commit, absent when the email maps to no user
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ForgeUser {
  pub login: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GitSignature {
  #[serde(default)]
  pub email: Option<String>,
  pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GitCommit {
  #[serde(default)]
  pub committer: Option<GitSignature>,
}

/// `GET /repos/{repo}/commits/{sha}`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CommitDetail {
  pub sha: String,
  #[serde(default)]
  pub author: Option<ForgeUser>,
  #[serde(default)]
  pub committer: Option<ForgeUser>,
  #[serde(default)]
  pub commit: Option<GitCommit>,
}

impl CommitDetail {
  /// Committer date recorded in the git object
  pub fn committed_at(&self) -> Option<DateTime<Utc>> {
    self.commit.as_ref()?.committer.as_ref().map(|s| s.date)
  }
}

/// `GET /repos/{repo}`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RepoInfo {
  pub full_name: String,
  pub default_branch: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChangedFile {
  pub filename: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CompareCommit {
  pub sha: String,
  pub commit: GitCommit,
}

/// `GET /repos/{repo}/compare/{base}...{head}`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Comparison {
  pub status: String,
  #[serde(default)]
  pub files: Vec<ChangedFile>,
  #[serde(default)]
  pub commits: Vec<CompareCommit>,
}

/// Body of `POST /repos/{repo}/releases`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateRelease {
  pub tag_name: String,
  pub target_commitish: String,
  pub name: String,
  pub body: String,
  pub draft: bool,
  pub prerelease: bool,
}

/// Error JSON returned on failure
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
  pub message: String,
}
