//! Tests for the `init` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_init_creates_config() -> Result<()> {
  let temp = tempfile::TempDir::new()?;

  run_bundlebot(temp.path(), &["init"])?;

  let config = std::fs::read_to_string(temp.path().join("bundlebot.toml"))?;
  assert!(config.contains("[forge]"));
  assert!(config.contains("[[bundles]]"));
  assert!(config.contains("Adafruit_CircuitPython_Bundle"));
  assert!(config.contains("CircuitPython_Community_Bundle"));

  Ok(())
}

#[test]
fn test_init_refuses_to_overwrite() -> Result<()> {
  let temp = tempfile::TempDir::new()?;
  std::fs::write(temp.path().join("bundlebot.toml"), "[forge]\nowner = \"someone\"\n")?;

  let output = bundlebot(temp.path(), &["init"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

  let config = std::fs::read_to_string(temp.path().join("bundlebot.toml"))?;
  assert!(config.contains("someone"));

  Ok(())
}

#[test]
fn test_init_force_overwrites() -> Result<()> {
  let temp = tempfile::TempDir::new()?;
  std::fs::write(temp.path().join("bundlebot.toml"), "not = [valid\n")?;

  run_bundlebot(temp.path(), &["init", "--force"])?;

  let config = std::fs::read_to_string(temp.path().join("bundlebot.toml"))?;
  assert!(config.contains("adafruit"));

  Ok(())
}

#[test]
fn test_invalid_config_is_a_user_error() -> Result<()> {
  let temp = tempfile::TempDir::new()?;
  std::fs::write(
    temp.path().join("bundlebot.toml"),
    "[[bundles]]\nname = \"A\"\n\n[[bundles]]\nname = \"A\"\n",
  )?;
  std::fs::write(temp.path().join(".gitmodules"), MANIFEST)?;

  let output = bundlebot(temp.path(), &["submodules", "--manifest", ".gitmodules"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("configured twice"));

  Ok(())
}
