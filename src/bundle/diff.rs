//! Submodule pointer moves between a release tag and the umbrella tip
//!
//! [`parse_submodule_diff`] is the only code that reads raw
//! `git diff --submodule=short` text. Everything after it works on
//! [`DiffHunk`] records.

use super::manifest::{Registry, SubmoduleEntry};
use super::version::{Revision, VersionResolver};
use crate::core::error::{BotResult, BundleError};
use serde::Serialize;

/// One file section of the umbrella diff
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffHunk {
  /// Path from the `diff --git` header (post-image side)
  pub path: String,
  /// Hashes from the `index` line or `Subproject commit` lines
  pub old_hash: String,
  pub new_hash: String,
  /// The section touches a gitlink rather than a regular file
  pub subproject: bool,
  /// Raw lines of the section, header included
  pub lines: Vec<String>,
}

/// How a submodule pin moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
  Added,
  Updated,
  Removed,
}

/// A submodule that moved, with both endpoints resolved
#[derive(Debug, Clone, Serialize)]
pub struct CommitRange {
  pub submodule: SubmoduleEntry,
  pub kind: ChangeKind,
  pub old_hash: String,
  pub new_hash: String,
  pub old_commit: Revision,
  pub new_commit: Revision,
  pub raw_diff_summary: String,
}

impl CommitRange {
  /// Revision range handed to `git log` for contributor credit
  pub fn log_range(&self) -> String {
    match self.kind {
      ChangeKind::Added => self.new_hash.clone(),
      _ => format!("{}..{}", self.old_hash, self.new_hash),
    }
  }
}

/// A submodule that left the bundle; kept for the record, never rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedSubmodule {
  pub path: String,
  pub old_hash: String,
}

/// Everything the diff extractor found
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractedChanges {
  /// Added and updated submodules, in diff order
  pub ranges: Vec<CommitRange>,
  pub removed: Vec<RemovedSubmodule>,
  /// File sections that weren't submodules
  pub other_files: Vec<String>,
}

impl ExtractedChanges {
  pub fn added(&self) -> impl Iterator<Item = &CommitRange> {
    self.ranges.iter().filter(|r| r.kind == ChangeKind::Added)
  }

  pub fn updated(&self) -> impl Iterator<Item = &CommitRange> {
    self.ranges.iter().filter(|r| r.kind == ChangeKind::Updated)
  }
}

fn is_zero_hash(hash: &str) -> bool {
  !hash.is_empty() && hash.bytes().all(|b| b == b'0')
}

fn subproject_hash(line: &str, sign: char) -> Option<&str> {
  let rest = line.strip_prefix(sign)?.strip_prefix("Subproject commit ")?;
  let hash = rest.trim();
  Some(hash.strip_suffix("-dirty").unwrap_or(hash))
}

/// Split `git diff --submodule=short` output into per-file hunks
///
/// Full hashes from `Subproject commit` lines win over the abbreviated ones
/// on the `index` line. A gitlink section with no usable hashes is an error.
pub fn parse_submodule_diff(text: &str) -> BotResult<Vec<DiffHunk>> {
  let mut hunks: Vec<DiffHunk> = Vec::new();
  let mut current: Option<DiffHunk> = None;

  for line in text.lines() {
    if let Some(header) = line.strip_prefix("diff --git ") {
      if let Some(done) = current.take() {
        hunks.push(done);
      }
      let path = header
        .rsplit_once(" b/")
        .map(|(_, p)| p)
        .unwrap_or_else(|| header.rsplit(' ').next().unwrap_or(header));
      current = Some(DiffHunk {
        path: path.to_string(),
        ..DiffHunk::default()
      });
    }

    let Some(hunk) = current.as_mut() else {
      continue;
    };
    hunk.lines.push(line.to_string());

    if let Some(index) = line.strip_prefix("index ") {
      let range = index.split_whitespace().next().unwrap_or_default();
      if let Some((old, new)) = range.split_once("..") {
        if hunk.old_hash.is_empty() {
          hunk.old_hash = old.to_string();
        }
        if hunk.new_hash.is_empty() {
          hunk.new_hash = new.to_string();
        }
      }
      if index.ends_with(" 160000") {
        hunk.subproject = true;
      }
    } else if line.starts_with("new file mode 160000") || line.starts_with("deleted file mode 160000") {
      hunk.subproject = true;
    } else if let Some(hash) = subproject_hash(line, '-') {
      hunk.old_hash = hash.to_string();
      hunk.subproject = true;
    } else if let Some(hash) = subproject_hash(line, '+') {
      hunk.new_hash = hash.to_string();
      hunk.subproject = true;
    }
  }

  if let Some(done) = current {
    hunks.push(done);
  }

  for hunk in &hunks {
    if hunk.subproject && (hunk.old_hash.is_empty() || hunk.new_hash.is_empty()) {
      return Err(
        BundleError::MalformedDiff {
          path: hunk.path.clone(),
          reason: "no commit hashes for submodule".to_string(),
        }
        .into(),
      );
    }
  }

  Ok(hunks)
}

/// Three-way classification of a hunk; `None` for regular files
pub fn classify(hunk: &DiffHunk) -> Option<ChangeKind> {
  if !hunk.subproject {
    return None;
  }
  if is_zero_hash(&hunk.old_hash) {
    Some(ChangeKind::Added)
  } else if is_zero_hash(&hunk.new_hash) {
    Some(ChangeKind::Removed)
  } else {
    Some(ChangeKind::Updated)
  }
}

/// Turn hunks into resolved commit ranges
///
/// Added and updated submodules must be in `registry`; anything else means
/// the registry and the diff came from different snapshots.
pub fn extract_ranges(hunks: &[DiffHunk], registry: &Registry, resolver: &VersionResolver) -> BotResult<ExtractedChanges> {
  let mut changes = ExtractedChanges::default();

  for hunk in hunks {
    let Some(kind) = classify(hunk) else {
      changes.other_files.push(hunk.path.clone());
      continue;
    };

    if kind == ChangeKind::Removed {
      tracing::debug!(path = %hunk.path, "submodule removed; not listed in the release");
      changes.removed.push(RemovedSubmodule {
        path: hunk.path.clone(),
        old_hash: hunk.old_hash.clone(),
      });
      continue;
    }

    let submodule = registry
      .find(&hunk.path)
      .cloned()
      .ok_or_else(|| BundleError::UnregisteredSubmodule { path: hunk.path.clone() })?;

    let old_commit = match kind {
      ChangeKind::Added => Revision::Commit(hunk.old_hash.clone()),
      _ => resolver.resolve(&hunk.path, &hunk.old_hash),
    };
    let new_commit = resolver.resolve(&hunk.path, &hunk.new_hash);

    changes.ranges.push(CommitRange {
      submodule,
      kind,
      old_hash: hunk.old_hash.clone(),
      new_hash: hunk.new_hash.clone(),
      old_commit,
      new_commit,
      raw_diff_summary: hunk.lines.join("\n"),
    });
  }

  Ok(changes)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bundle::testing::FakeRepo;
  use crate::core::error::BotError;

  const ZERO: &str = "0000000000000000000000000000000000000000";

  fn hunk(path: &str, old: &str, new: &str) -> DiffHunk {
    DiffHunk {
      path: path.to_string(),
      old_hash: old.to_string(),
      new_hash: new.to_string(),
      subproject: true,
      lines: vec![format!("diff --git a/{path} b/{path}")],
    }
  }

  fn registry() -> Registry {
    Registry::from_text(
      "[submodule \"libraries/drivers/foo\"]\n\tpath = libraries/drivers/foo\n\turl = https://github.com/adafruit/Adafruit_CircuitPython_Foo.git\n[submodule \"libraries/helpers/bar\"]\n\tpath = libraries/helpers/bar\n\turl = https://github.com/adafruit/Adafruit_CircuitPython_Bar.git\n[submodule \"libraries/drivers/baz\"]\n\tpath = libraries/drivers/baz\n\turl = https://github.com/adafruit/Adafruit_CircuitPython_Baz.git\n",
    )
  }

  #[test]
  fn test_parse_updated_added_removed_and_file() {
    let text = "\
diff --git a/README.rst b/README.rst
index 1111111..2222222 100644
--- a/README.rst
+++ b/README.rst
@@ -1 +1 @@
-old
+new
diff --git a/libraries/drivers/foo b/libraries/drivers/foo
index aaaa111..bbbb222 160000
--- a/libraries/drivers/foo
+++ b/libraries/drivers/foo
@@ -1 +1 @@
-Subproject commit aaaa111aaaa111aaaa111aaaa111aaaa111aaaa1
+Subproject commit bbbb222bbbb222bbbb222bbbb222bbbb222bbbb2-dirty
diff --git a/libraries/drivers/baz b/libraries/drivers/baz
new file mode 160000
index 0000000..cccc333
--- /dev/null
+++ b/libraries/drivers/baz
@@ -0,0 +1 @@
+Subproject commit cccc333cccc333cccc333cccc333cccc333cccc3
diff --git a/libraries/helpers/old b/libraries/helpers/old
deleted file mode 160000
index dddd444..0000000
--- a/libraries/helpers/old
+++ /dev/null
@@ -1 +0,0 @@
-Subproject commit dddd444dddd444dddd444dddd444dddd444dddd4
";
    let hunks = parse_submodule_diff(text).unwrap();
    assert_eq!(hunks.len(), 4);

    assert!(!hunks[0].subproject);
    assert_eq!(classify(&hunks[0]), None);

    assert_eq!(hunks[1].path, "libraries/drivers/foo");
    assert_eq!(hunks[1].old_hash, "aaaa111aaaa111aaaa111aaaa111aaaa111aaaa1");
    assert_eq!(hunks[1].new_hash, "bbbb222bbbb222bbbb222bbbb222bbbb222bbbb2");
    assert_eq!(classify(&hunks[1]), Some(ChangeKind::Updated));

    assert_eq!(hunks[2].old_hash, "0000000");
    assert_eq!(classify(&hunks[2]), Some(ChangeKind::Added));

    assert_eq!(hunks[3].new_hash, "0000000");
    assert_eq!(classify(&hunks[3]), Some(ChangeKind::Removed));
  }

  #[test]
  fn test_parse_empty_diff_has_no_hunks() {
    assert!(parse_submodule_diff("").unwrap().is_empty());
    assert!(parse_submodule_diff("\n\n").unwrap().is_empty());
  }

  #[test]
  fn test_gitlink_without_hashes_is_malformed() {
    let text = "diff --git a/libraries/x b/libraries/x\nnew file mode 160000\n";
    let err = parse_submodule_diff(text).unwrap_err();
    assert!(matches!(err, BotError::Bundle(BundleError::MalformedDiff { .. })));
  }

  #[test]
  fn test_zero_old_hash_is_always_added() {
    for old in ["0000000", ZERO] {
      let h = hunk("libraries/drivers/baz", old, "cccc333");
      assert_eq!(classify(&h), Some(ChangeKind::Added));
    }
  }

  #[test]
  fn test_updated_with_tags_resolves_both_ends() {
    let repo = FakeRepo::new()
      .with_tag("libraries/drivers/foo", "aaaa111", "1.0.0")
      .with_tag("libraries/drivers/foo", "bbbb222", "1.1.0");
    let resolver = VersionResolver::new(&repo);

    let changes = extract_ranges(&[hunk("libraries/drivers/foo", "aaaa111", "bbbb222")], &registry(), &resolver).unwrap();

    assert_eq!(changes.ranges.len(), 1);
    let range = &changes.ranges[0];
    assert_eq!(range.kind, ChangeKind::Updated);
    assert_eq!(range.old_commit.as_str(), "1.0.0");
    assert_eq!(range.new_commit.as_str(), "1.1.0");
    assert_eq!(range.submodule.path, "libraries/drivers/foo");
    assert_eq!(range.log_range(), "aaaa111..bbbb222");
  }

  #[test]
  fn test_added_untagged_keeps_raw_hash() {
    let repo = FakeRepo::new();
    let resolver = VersionResolver::new(&repo);

    let changes = extract_ranges(&[hunk("libraries/drivers/baz", ZERO, "cccc333")], &registry(), &resolver).unwrap();

    assert_eq!(changes.ranges.len(), 1);
    let range = &changes.ranges[0];
    assert_eq!(range.kind, ChangeKind::Added);
    assert_eq!(range.new_commit, Revision::Commit("cccc333".to_string()));
    assert_eq!(range.log_range(), "cccc333");
    assert_eq!(changes.added().count(), 1);
    assert_eq!(changes.updated().count(), 0);
  }

  #[test]
  fn test_removed_is_recorded_not_ranged() {
    let repo = FakeRepo::new();
    let resolver = VersionResolver::new(&repo);

    let changes = extract_ranges(&[hunk("libraries/helpers/gone", "dddd444", ZERO)], &registry(), &resolver).unwrap();

    assert!(changes.ranges.is_empty());
    assert_eq!(changes.removed.len(), 1);
    assert_eq!(changes.removed[0].path, "libraries/helpers/gone");
  }

  #[test]
  fn test_unregistered_submodule_is_contract_violation() {
    let repo = FakeRepo::new();
    let resolver = VersionResolver::new(&repo);

    let err = extract_ranges(&[hunk("libraries/drivers/ghost", "aaaa111", "bbbb222")], &registry(), &resolver).unwrap_err();
    assert!(matches!(err, BotError::Bundle(BundleError::UnregisteredSubmodule { .. })));
  }
}
