use crate::core::error::{BotError, BotResult, ConfigError, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for bundlebot
/// Searched in order: bundlebot.toml, .bundlebot.toml, .config/bundlebot.toml
///
/// Every section is optional; a missing file means the built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
  #[serde(default)]
  pub forge: ForgeConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default = "default_bundles")]
  pub bundles: Vec<BundleConfig>,
}

/// Forge endpoints and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
  /// REST API base; request paths starting with `/` are resolved against it
  #[serde(default = "default_api_url")]
  pub api_url: String,

  /// Raw file host used for the bundle's `.gitmodules`
  #[serde(default = "default_raw_url")]
  pub raw_url: String,

  /// Web host used for clone URLs and release links
  #[serde(default = "default_web_url")]
  pub web_url: String,

  /// Organisation owning the bundles and libraries
  #[serde(default = "default_owner")]
  pub owner: String,

  /// Environment variable holding the access token
  #[serde(default = "default_token_env")]
  pub token_env: String,

  /// Environment variable holding the user for basic auth (bearer auth if unset)
  #[serde(default = "default_user_env")]
  pub user_env: String,

  /// Committer email the forge uses for web merges; never credited
  #[serde(default = "default_noreply_email")]
  pub noreply_email: String,

  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_api_url() -> String {
  "https://api.github.com".to_string()
}

fn default_raw_url() -> String {
  "https://raw.githubusercontent.com".to_string()
}

fn default_web_url() -> String {
  "https://github.com".to_string()
}

fn default_owner() -> String {
  "adafruit".to_string()
}

fn default_token_env() -> String {
  "ADABOT_GITHUB_ACCESS_TOKEN".to_string()
}

fn default_user_env() -> String {
  "ADABOT_GITHUB_USER".to_string()
}

fn default_noreply_email() -> String {
  "noreply@github.com".to_string()
}

fn default_timeout_secs() -> u64 {
  60
}

impl Default for ForgeConfig {
  fn default() -> Self {
    Self {
      api_url: default_api_url(),
      raw_url: default_raw_url(),
      web_url: default_web_url(),
      owner: default_owner(),
      token_env: default_token_env(),
      user_env: default_user_env(),
      noreply_email: default_noreply_email(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

impl ForgeConfig {
  /// Read the access token from the configured environment variable
  pub fn token(&self) -> Option<String> {
    std::env::var(&self.token_env).ok().filter(|t| !t.trim().is_empty())
  }

  /// Read the basic-auth user from the configured environment variable
  pub fn user(&self) -> Option<String> {
    std::env::var(&self.user_env).ok().filter(|u| !u.trim().is_empty())
  }
}

/// Identity cache persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
  /// JSON file mapping `repo_identity:<email>` to forge usernames
  #[serde(default = "default_cache_path")]
  pub path: PathBuf,
}

fn default_cache_path() -> PathBuf {
  PathBuf::from(".bundlebot").join("identity-cache.json")
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      path: default_cache_path(),
    }
  }
}

/// One umbrella repository
///
/// # Example
///
/// ```toml
/// [[bundles]]
/// name = "Adafruit_CircuitPython_Bundle"
/// default_branch = "main"
/// path = ".bundles/Adafruit_CircuitPython_Bundle"
/// libraries_prefix = "libraries/"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
  /// Repository name under the forge owner
  pub name: String,

  /// Branch whose `.gitmodules` is the canonical registry
  #[serde(default = "default_branch")]
  pub default_branch: String,

  /// Local working copy (default: `.bundles/<name>`)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<PathBuf>,

  /// Submodules below this prefix count as bundled libraries
  #[serde(default = "default_libraries_prefix")]
  pub libraries_prefix: String,
}

fn default_branch() -> String {
  "main".to_string()
}

fn default_libraries_prefix() -> String {
  "libraries/".to_string()
}

fn default_bundles() -> Vec<BundleConfig> {
  ["Adafruit_CircuitPython_Bundle", "CircuitPython_Community_Bundle"]
    .into_iter()
    .map(BundleConfig::named)
    .collect()
}

impl BundleConfig {
  /// Bundle with default branch, path and prefix
  pub fn named(name: &str) -> Self {
    Self {
      name: name.to_string(),
      default_branch: default_branch(),
      path: None,
      libraries_prefix: default_libraries_prefix(),
    }
  }

  /// Working copy location, relative paths resolved against `root`
  pub fn working_copy(&self, root: &Path) -> PathBuf {
    match &self.path {
      Some(p) if p.is_absolute() => p.clone(),
      Some(p) => root.join(p),
      None => root.join(".bundles").join(&self.name),
    }
  }

  /// `owner/name` identifier used in API paths
  pub fn repo_id(&self, owner: &str) -> String {
    format!("{}/{}", owner, self.name)
  }
}

impl Default for BotConfig {
  fn default() -> Self {
    Self {
      forge: ForgeConfig::default(),
      cache: CacheConfig::default(),
      bundles: default_bundles(),
    }
  }
}

impl BotConfig {
  /// Find config file in search order: bundlebot.toml, .bundlebot.toml, .config/bundlebot.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("bundlebot.toml"),
      path.join(".bundlebot.toml"),
      path.join(".config").join("bundlebot.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from an explicit file, the search path, or fall back to defaults
  pub fn load(root: &Path, explicit: Option<&Path>) -> BotResult<Self> {
    let config_path = match explicit {
      Some(p) if !p.exists() => {
        return Err(BotError::Config(ConfigError::NotFound { path: p.to_path_buf() }));
      }
      Some(p) => p.to_path_buf(),
      None => match Self::find_config_path(root) {
        Some(p) => p,
        None => {
          tracing::debug!(root = %root.display(), "no bundlebot.toml found, using defaults");
          return Ok(Self::default());
        }
      },
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config = Self::parse(&content).with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    tracing::debug!(path = %config_path.display(), bundles = config.bundles.len(), "loaded configuration");
    Ok(config)
  }

  /// Parse and validate TOML text
  pub fn parse(content: &str) -> BotResult<Self> {
    let config: BotConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Save config to bundlebot.toml (default location)
  pub fn save(&self, path: &Path) -> BotResult<PathBuf> {
    let config_path = path.join("bundlebot.toml");
    let content = toml_edit::ser::to_string_pretty(self).context("Failed to serialize config to TOML")?;
    fs::write(&config_path, content).with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(config_path)
  }

  /// Validate configuration
  pub fn validate(&self) -> BotResult<()> {
    if self.forge.owner.trim().is_empty() {
      return Err(invalid("forge.owner", "must not be empty"));
    }

    for (field, url) in [
      ("forge.api_url", &self.forge.api_url),
      ("forge.raw_url", &self.forge.raw_url),
      ("forge.web_url", &self.forge.web_url),
    ] {
      if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(invalid(field, "must be an http(s) URL"));
      }
    }

    if self.bundles.is_empty() {
      return Err(BotError::with_help(
        "No bundles configured",
        "Add at least one [[bundles]] entry to bundlebot.toml",
      ));
    }

    let mut seen = HashSet::new();
    for bundle in &self.bundles {
      if bundle.name.trim().is_empty() {
        return Err(invalid("bundles.name", "must not be empty"));
      }
      if !seen.insert(bundle.name.as_str()) {
        return Err(invalid("bundles.name", &format!("'{}' is configured twice", bundle.name)));
      }
      if !bundle.libraries_prefix.ends_with('/') {
        return Err(invalid(
          "bundles.libraries_prefix",
          &format!("'{}' must end with '/'", bundle.libraries_prefix),
        ));
      }
    }

    Ok(())
  }

  /// Bundles selected by `--bundle`, or all of them
  pub fn select_bundles(&self, name: Option<&str>) -> BotResult<Vec<&BundleConfig>> {
    match name {
      None => Ok(self.bundles.iter().collect()),
      Some(name) => self
        .bundles
        .iter()
        .find(|b| b.name == name)
        .map(|b| vec![b])
        .ok_or_else(|| BotError::Config(ConfigError::BundleNotFound { name: name.to_string() })),
    }
  }
}

fn invalid(field: &str, reason: &str) -> BotError {
  BotError::Config(ConfigError::InvalidField {
    field: field.to_string(),
    reason: reason.to_string(),
  })
}
