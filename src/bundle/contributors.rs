//! Contributor credit across the umbrella and its submodules

use super::identity::IdentityCache;
use crate::core::error::{BotResult, DiagnosticKind, Diagnostics};
use crate::core::vcs::BundleRepo;
use crate::forge::{ForgeClient, api};
use serde::Serialize;
use std::collections::BTreeMap;

/// Forge username → number of credited commits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContributorTally(BTreeMap<String, u64>);

impl ContributorTally {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn credit(&mut self, login: &str, count: u64) {
    *self.0.entry(login.to_string()).or_insert(0) += count;
  }

  #[cfg(test)]
  pub fn get(&self, login: &str) -> u64 {
    self.0.get(login).copied().unwrap_or(0)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Sum of all counts
  #[cfg(test)]
  pub fn total(&self) -> u64 {
    self.0.values().sum()
  }

  /// Highest count first; equal counts by name
  pub fn ranked(&self) -> Vec<(&str, u64)> {
    let mut ranked: Vec<_> = self.0.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
  }
}

impl<S: Into<String>> FromIterator<(S, u64)> for ContributorTally {
  fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
    let mut tally = Self::new();
    for (login, count) in iter {
      tally.credit(&login.into(), count);
    }
    tally
  }
}

/// Fold `child` into `parent`, summing counts key by key
pub fn add_contributors(parent: &mut ContributorTally, child: &ContributorTally) {
  for (login, count) in &child.0 {
    parent.credit(login, *count);
  }
}

/// Builds a tally for one commit range of one repository
pub struct ContributorAggregator<'a> {
  repo: &'a dyn BundleRepo,
  forge: &'a dyn ForgeClient,
  noreply_email: &'a str,
}

impl<'a> ContributorAggregator<'a> {
  pub fn new(repo: &'a dyn BundleRepo, forge: &'a dyn ForgeClient, noreply_email: &'a str) -> Self {
    Self {
      repo,
      forge,
      noreply_email,
    }
  }

  /// Credit every commit in `range`
  ///
  /// `repo_id` is the forge `owner/name` used to look commits up;
  /// `submodule` picks where `git log` runs (`None` for the umbrella).
  /// A failing `git log` is returned to the caller. A commit whose detail
  /// can't be fetched is skipped and noted in `diagnostics`.
  pub fn aggregate(
    &self,
    cache: &mut IdentityCache,
    diagnostics: &mut Diagnostics,
    repo_id: &str,
    submodule: Option<&str>,
    range: &str,
  ) -> BotResult<ContributorTally> {
    let log = self.repo.commit_log(submodule, range)?;
    let mut tally = ContributorTally::new();

    for entry in &log {
      let bot_committed = entry.committer_email == self.noreply_email;

      let mut author = cache.get(&entry.author_email).map(str::to_string);
      let mut committer = if bot_committed {
        None
      } else {
        cache.get(&entry.committer_email).map(str::to_string)
      };

      if author.is_none() || (!bot_committed && committer.is_none()) {
        let detail = match api::commit_detail(self.forge, repo_id, &entry.sha) {
          Ok(detail) => detail,
          Err(e) => {
            diagnostics.push(
              DiagnosticKind::CommitUnresolved,
              format!("{}@{}", repo_id, entry.sha),
              e.to_string(),
            );
            continue;
          }
        };

        if let Some(user) = detail.author {
          cache.insert(&entry.author_email, &user.login);
          author = Some(user.login);
        }
        if !bot_committed && let Some(user) = detail.committer {
          cache.insert(&entry.committer_email, &user.login);
          committer = Some(user.login);
        }
      }

      if let Some(login) = &author {
        tally.credit(login, 1);
      }
      if let Some(login) = &committer
        && author.as_ref() != Some(login)
      {
        tally.credit(login, 1);
      }
    }

    tracing::debug!(repo = repo_id, range, commits = log.len(), contributors = tally.len(), "aggregated contributors");
    Ok(tally)
  }
}
