//! Commit → tag resolution inside a submodule

use crate::core::vcs::BundleRepo;
use serde::Serialize;
use std::fmt;

/// A pinned revision, as specific as the submodule's tags allow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Revision {
  /// A tag points exactly at the commit
  Tag(String),
  /// No exact tag; the raw hash
  Commit(String),
}

impl Revision {
  pub fn as_str(&self) -> &str {
    match self {
      Revision::Tag(s) | Revision::Commit(s) => s,
    }
  }

  #[cfg(test)]
  pub fn is_tag(&self) -> bool {
    matches!(self, Revision::Tag(_))
  }
}

impl fmt::Display for Revision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Maps `(submodule path, hash)` to the exact tag at that hash
///
/// Stateless; repeated calls for the same pair ask git again and get the
/// same answer.
pub struct VersionResolver<'a> {
  repo: &'a dyn BundleRepo,
}

impl<'a> VersionResolver<'a> {
  pub fn new(repo: &'a dyn BundleRepo) -> Self {
    Self { repo }
  }

  /// Exact tag at `hash`, falling back to the hash itself
  ///
  /// Any lookup failure is the fallback too: an untagged pin is ordinary.
  pub fn resolve(&self, path: &str, hash: &str) -> Revision {
    match self.repo.exact_tag(path, hash) {
      Ok(Some(tag)) => Revision::Tag(tag),
      Ok(None) => Revision::Commit(hash.to_string()),
      Err(e) => {
        tracing::debug!(path, hash, error = %e, "tag lookup failed, keeping hash");
        Revision::Commit(hash.to_string())
      }
    }
  }
}
