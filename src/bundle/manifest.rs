//! Submodule registry: the bundle's `.gitmodules`
//!
//! The manifest is git-config shaped but not INI: names are quoted inside the
//! section header and indentation mixes tabs and spaces. It is read with a
//! two-pattern line scanner instead of a general config parser.

use crate::core::config::{BundleConfig, ForgeConfig};
use crate::core::error::{BotResult, ForgeError, ResultExt};
use crate::forge::ForgeClient;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

/// One `[submodule "<name>"]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmoduleEntry {
  pub name: String,
  /// Location inside the umbrella (`libraries/drivers/x`)
  pub path: String,
  pub url: String,
  /// Every key seen under the section, lower-cased
  pub variables: BTreeMap<String, String>,
}

impl SubmoduleEntry {
  fn from_section(name: String, variables: BTreeMap<String, String>) -> Self {
    Self {
      path: variables.get("path").cloned().unwrap_or_default(),
      url: variables.get("url").cloned().unwrap_or_default(),
      name,
      variables,
    }
  }

  /// Last path component, used as the library's display name
  pub fn library_name(&self) -> &str {
    self.path.rsplit('/').next().unwrap_or(&self.path)
  }
}

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
  RegexBuilder::new(r#"^\[submodule "(.+)"\]$"#)
    .case_insensitive(true)
    .build()
    .expect("Invalid regex pattern for submodule section")
});

static VARIABLE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\s*([a-zA-Z0-9\-]+)\s*=\s*(.+?)\s*$").expect("Invalid regex pattern for variable line"));

/// Parse manifest text into entries, in file order
///
/// `None` and empty text both give an empty list. Variable lines before the
/// first section are dropped.
pub fn parse_manifest(text: Option<&str>) -> Vec<SubmoduleEntry> {
  let Some(text) = text else {
    return Vec::new();
  };

  let mut entries = Vec::new();
  let mut current: Option<(String, BTreeMap<String, String>)> = None;

  for line in text.lines() {
    if let Some(caps) = SECTION_RE.captures(line) {
      if let Some((name, vars)) = current.take() {
        entries.push(SubmoduleEntry::from_section(name, vars));
      }
      current = Some((caps[1].to_string(), BTreeMap::new()));
    } else if let Some(caps) = VARIABLE_RE.captures(line)
      && let Some((_, vars)) = current.as_mut()
    {
      vars.insert(caps[1].to_lowercase(), caps[2].to_string());
    }
  }

  if let Some((name, vars)) = current {
    entries.push(SubmoduleEntry::from_section(name, vars));
  }
  entries
}

/// Registry snapshot, read once per run
#[derive(Debug, Clone, Default)]
pub struct Registry {
  entries: Vec<SubmoduleEntry>,
}

impl Registry {
  pub fn new(entries: Vec<SubmoduleEntry>) -> Self {
    Self { entries }
  }

  pub fn from_text(text: &str) -> Self {
    Self::new(parse_manifest(Some(text)))
  }

  /// Read `.gitmodules` from a local umbrella checkout
  ///
  /// A checkout without the file has no submodules.
  pub fn from_working_copy(root: &Path) -> BotResult<Self> {
    let path = root.join(".gitmodules");
    if !path.exists() {
      return Ok(Self::default());
    }
    let text = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Self::from_text(&text))
  }

  pub fn find(&self, path: &str) -> Option<&SubmoduleEntry> {
    self.entries.iter().find(|e| e.path == path)
  }

  /// Entries below the libraries prefix
  pub fn libraries<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a SubmoduleEntry> + 'a {
    self.entries.iter().filter(move |e| e.path.starts_with(prefix))
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Fetch and parse the manifest from the bundle's default branch
pub fn get_bundle_submodules(
  client: &dyn ForgeClient,
  forge: &ForgeConfig,
  bundle: &BundleConfig,
) -> BotResult<Vec<SubmoduleEntry>> {
  let url = format!(
    "{}/{}/{}/{}/.gitmodules",
    forge.raw_url.trim_end_matches('/'),
    forge.owner,
    bundle.name,
    bundle.default_branch
  );
  let response = client.get(&url)?;
  if response.status != 200 {
    return Err(
      ForgeError::ManifestUnavailable {
        url,
        status: response.status,
      }
      .into(),
    );
  }
  Ok(parse_manifest(Some(&response.body)))
}

/// Comparable form of a repository URL
///
/// Lower-cased, everything through the last `://` removed, trailing `.git`
/// removed. Applying it twice changes nothing.
pub fn sanitize_url(url: &str) -> String {
  let lower = url.to_lowercase();
  let mut rest = match lower.rfind("://") {
    Some(idx) => &lower[idx + 3..],
    None => lower.as_str(),
  };
  while let Some(stripped) = rest.strip_suffix(".git") {
    rest = stripped;
  }
  rest.to_string()
}

/// Whether `candidate` is pinned as a library of the bundle
///
/// Matches only submodules under `libraries_prefix`; tooling vendored
/// elsewhere in the umbrella doesn't count.
pub fn is_repo_in_bundle(candidate: &str, submodules: &[SubmoduleEntry], libraries_prefix: &str) -> bool {
  let wanted = sanitize_url(candidate);
  submodules
    .iter()
    .any(|s| sanitize_url(&s.url) == wanted && s.path.starts_with(libraries_prefix))
}
