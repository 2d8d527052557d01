//! Tests for `bundle release` failure handling
//!
//! The forge URL points at a closed local port, so these stay offline.

use crate::helpers::*;
use anyhow::Result;

/// Config for one bundle checked out at `checkout`, with an unreadable
/// identity cache and an unreachable forge
fn unreachable_forge_config(checkout: &std::path::Path) -> String {
  format!(
    r#"[forge]
api_url = "http://127.0.0.1:9"
token_env = "BUNDLEBOT_TEST_UNSET_TOKEN"
user_env = "BUNDLEBOT_TEST_UNSET_USER"
timeout_secs = 5

[cache]
path = "cache-dir"

[[bundles]]
name = "Test_Bundle"
path = '{}'
"#,
    checkout.display()
  )
}

#[test]
fn test_release_failure_still_reports_diagnostics() -> Result<()> {
  let bundle = TestBundle::new()?;
  bundle.publish()?;

  let work = tempfile::TempDir::new()?;
  std::fs::create_dir_all(work.path().join("cache-dir"))?;
  std::fs::write(work.path().join("bundlebot.toml"), unreachable_forge_config(&bundle.path))?;

  let output = bundlebot(work.path(), &["bundle", "release", "--dry-run"])?;
  assert!(!output.status.success());

  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("1 problem(s) were skipped"), "stdout: {stdout}");
  assert!(stdout.contains("cache-dir"));

  Ok(())
}

#[test]
fn test_release_failure_json_keeps_diagnostics() -> Result<()> {
  let bundle = TestBundle::new()?;
  bundle.publish()?;

  let work = tempfile::TempDir::new()?;
  std::fs::create_dir_all(work.path().join("cache-dir"))?;
  std::fs::write(work.path().join("bundlebot.toml"), unreachable_forge_config(&bundle.path))?;

  let output = bundlebot(work.path(), &["bundle", "release", "--dry-run", "--json"])?;
  assert!(!output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(json["reports"].as_array().map(Vec::len), Some(0));
  assert_eq!(json["diagnostics"][0]["kind"], "cache_unavailable");

  Ok(())
}
