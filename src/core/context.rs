//! Run context - build once in main, pass to every command
//!
//! Holds the working root and the loaded configuration so commands never
//! re-read `bundlebot.toml` themselves.

use crate::core::config::BotConfig;
use crate::core::error::BotResult;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RunContext {
  /// Directory the tool runs from; relative config paths resolve against it
  pub root: PathBuf,

  /// Loaded configuration (defaults when no file exists)
  pub config: BotConfig,
}

impl RunContext {
  /// Load configuration for `root`, honouring an explicit `--config`
  pub fn build(root: &Path, config_path: Option<&Path>) -> BotResult<Self> {
    let config = BotConfig::load(root, config_path)?;
    Ok(Self {
      root: root.to_path_buf(),
      config,
    })
  }

  /// Context with built-in defaults, for commands that must work before a config exists
  pub fn with_defaults(root: &Path) -> Self {
    Self {
      root: root.to_path_buf(),
      config: BotConfig::default(),
    }
  }

  /// Identity cache file, relative paths resolved against the root
  pub fn cache_path(&self) -> PathBuf {
    if self.config.cache.path.is_absolute() {
      self.config.cache.path.clone()
    } else {
      self.root.join(&self.config.cache.path)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_build_without_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = RunContext::build(dir.path(), None).unwrap();
    assert_eq!(ctx.config.forge.owner, "adafruit");
    assert_eq!(
      ctx.cache_path(),
      dir.path().join(".bundlebot").join("identity-cache.json")
    );
  }

  #[test]
  fn test_build_with_missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(RunContext::build(dir.path(), Some(&missing)).is_err());
  }
}
