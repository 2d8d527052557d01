//! Email → forge username cache
//!
//! Loaded once at the start of a command and saved once at the end. Entries
//! are only ever added, so a cache left behind by an interrupted run is still
//! correct.

use crate::core::error::{BotResult, ResultExt};
#[cfg(test)]
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const KEY_PREFIX: &str = "repo_identity:";

/// Where the cache lives between runs
pub trait CacheStore {
  fn load(&self) -> BotResult<BTreeMap<String, String>>;
  fn save(&self, entries: &BTreeMap<String, String>) -> BotResult<()>;
}

/// JSON object on disk
pub struct JsonFileStore {
  path: PathBuf,
}

impl JsonFileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl CacheStore for JsonFileStore {
  fn load(&self) -> BotResult<BTreeMap<String, String>> {
    if !self.path.exists() {
      return Ok(BTreeMap::new());
    }
    let content =
      fs::read_to_string(&self.path).with_context(|| format!("Failed to read identity cache {}", self.path.display()))?;
    if content.trim().is_empty() {
      return Ok(BTreeMap::new());
    }
    serde_json::from_str(&content).with_context(|| format!("Failed to parse identity cache {}", self.path.display()))
  }

  fn save(&self, entries: &BTreeMap<String, String>) -> BotResult<()> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(&self.path, json).with_context(|| format!("Failed to write identity cache {}", self.path.display()))
  }
}

/// Store that keeps everything in memory
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
  entries: RefCell<BTreeMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn snapshot(&self) -> BTreeMap<String, String> {
    self.entries.borrow().clone()
  }
}

#[cfg(test)]
impl CacheStore for MemoryStore {
  fn load(&self) -> BotResult<BTreeMap<String, String>> {
    Ok(self.entries.borrow().clone())
  }

  fn save(&self, entries: &BTreeMap<String, String>) -> BotResult<()> {
    *self.entries.borrow_mut() = entries.clone();
    Ok(())
  }
}

/// In-process view of the identity cache
#[derive(Debug, Default, Clone)]
pub struct IdentityCache {
  entries: BTreeMap<String, String>,
  dirty: bool,
}

impl IdentityCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn load(store: &dyn CacheStore) -> BotResult<Self> {
    let entries = store.load()?;
    tracing::debug!(entries = entries.len(), "loaded identity cache");
    Ok(Self { entries, dirty: false })
  }

  /// Write back if anything was added
  pub fn persist(&mut self, store: &dyn CacheStore) -> BotResult<()> {
    if !self.dirty {
      return Ok(());
    }
    store.save(&self.entries)?;
    tracing::debug!(entries = self.entries.len(), "saved identity cache");
    self.dirty = false;
    Ok(())
  }

  fn key(email: &str) -> String {
    format!("{}{}", KEY_PREFIX, email)
  }

  pub fn get(&self, email: &str) -> Option<&str> {
    self.entries.get(&Self::key(email)).map(String::as_str)
  }

  pub fn insert(&mut self, email: &str, login: &str) {
    let previous = self.entries.insert(Self::key(email), login.to_string());
    if previous.as_deref() != Some(login) {
      self.dirty = true;
    }
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
