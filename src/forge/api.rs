//! Typed forge endpoints used by the bundle engine and the library commands

use super::client::{ForgeClient, ForgeResponse, ForgeResult};
use super::types::{CommitDetail, Comparison, CreateRelease, Release, RepoInfo};
use crate::core::error::ForgeError;
use serde::de::DeserializeOwned;

/// Safety valve for runaway `Link` chains
const MAX_PAGES: usize = 50;

fn expect_success(response: ForgeResponse) -> ForgeResult<ForgeResponse> {
  if response.is_success() {
    Ok(response)
  } else {
    Err(ForgeError::Status {
      message: response.error_message(),
      url: response.url,
      status: response.status,
    })
  }
}

/// GET `path` and decode the body as `T`
pub fn get_json<T: DeserializeOwned>(client: &dyn ForgeClient, path: &str) -> ForgeResult<T> {
  expect_success(client.get(path)?)?.json()
}

/// GET a listing and follow `rel="next"` links, concatenating every page
pub fn get_paginated<T: DeserializeOwned>(client: &dyn ForgeClient, path: &str) -> ForgeResult<Vec<T>> {
  let mut items = Vec::new();
  let mut next = Some(path.to_string());
  let mut pages = 0;

  while let Some(url) = next.take() {
    let response = expect_success(client.get(&url)?)?;
    let mut page: Vec<T> = response.json()?;
    items.append(&mut page);

    pages += 1;
    if pages >= MAX_PAGES {
      tracing::warn!(path, pages, "stopped following pagination links");
      break;
    }
    next = response.next_page;
  }

  Ok(items)
}

/// Latest published release, `None` when the repository has none
pub fn latest_release(client: &dyn ForgeClient, repo: &str) -> ForgeResult<Option<Release>> {
  let response = client.get(&format!("/repos/{}/releases/latest", repo))?;
  if response.status == 404 {
    return Ok(None);
  }
  expect_success(response)?.json().map(Some)
}

/// Every release of a repository, newest first
pub fn list_releases(client: &dyn ForgeClient, repo: &str) -> ForgeResult<Vec<Release>> {
  get_paginated(client, &format!("/repos/{}/releases?per_page=100", repo))
}

pub fn commit_detail(client: &dyn ForgeClient, repo: &str, sha: &str) -> ForgeResult<CommitDetail> {
  get_json(client, &format!("/repos/{}/commits/{}", repo, sha))
}

pub fn repo_info(client: &dyn ForgeClient, repo: &str) -> ForgeResult<RepoInfo> {
  get_json(client, &format!("/repos/{}", repo))
}

/// Three-dot comparison `base...head`
pub fn compare(client: &dyn ForgeClient, repo: &str, base: &str, head: &str) -> ForgeResult<Comparison> {
  get_json(client, &format!("/repos/{}/compare/{}...{}", repo, base, head))
}

/// Create a release; any non-success answer becomes `ReleaseRejected`
pub fn create_release(client: &dyn ForgeClient, repo: &str, release: &CreateRelease) -> ForgeResult<Release> {
  let body = serde_json::to_value(release).map_err(|e| ForgeError::Decode {
    url: format!("/repos/{}/releases", repo),
    reason: e.to_string(),
  })?;
  let response = client.post_json(&format!("/repos/{}/releases", repo), &body)?;

  if !response.is_success() {
    return Err(ForgeError::ReleaseRejected {
      tag: release.tag_name.clone(),
      status: response.status,
      message: response.error_message(),
    });
  }
  response.json()
}
