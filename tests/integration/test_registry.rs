//! Tests for `submodules` and `contains` against a local manifest

use crate::helpers::*;
use anyhow::Result;

fn workspace_with_manifest() -> Result<tempfile::TempDir> {
  let temp = tempfile::TempDir::new()?;
  std::fs::write(temp.path().join("gitmodules.txt"), MANIFEST)?;
  Ok(temp)
}

#[test]
fn test_submodules_lists_every_section() -> Result<()> {
  let temp = workspace_with_manifest()?;

  let json = run_bundlebot_json(
    temp.path(),
    &["submodules", "--manifest", "gitmodules.txt", "--bundle", "Adafruit_CircuitPython_Bundle", "--json"],
  )?;

  let registries = json.as_array().expect("array of registries");
  assert_eq!(registries.len(), 1);
  assert_eq!(registries[0]["bundle"], "Adafruit_CircuitPython_Bundle");

  let submodules = registries[0]["submodules"].as_array().expect("submodule list");
  assert_eq!(submodules.len(), 3);
  assert_eq!(submodules[0]["path"], "libraries/drivers/foo");
  assert_eq!(
    submodules[1]["url"],
    "https://github.com/adafruit/Adafruit_CircuitPython_Bar.git"
  );
  assert_eq!(submodules[2]["name"], "tools/build");

  Ok(())
}

#[test]
fn test_contains_matches_any_url_form() -> Result<()> {
  let temp = workspace_with_manifest()?;

  for url in [
    "https://github.com/adafruit/Adafruit_CircuitPython_Foo",
    "HTTPS://GITHUB.COM/adafruit/adafruit_circuitpython_foo.git",
    "git://github.com/adafruit/Adafruit_CircuitPython_Bar.git",
  ] {
    let output = run_bundlebot(temp.path(), &["contains", url, "--manifest", "gitmodules.txt"])?;
    assert!(String::from_utf8_lossy(&output.stdout).contains("is in"));
  }

  Ok(())
}

#[test]
fn test_contains_ignores_non_library_submodules() -> Result<()> {
  let temp = workspace_with_manifest()?;

  let output = bundlebot(
    temp.path(),
    &[
      "contains",
      "https://github.com/adafruit/circuitpython-build-tools",
      "--manifest",
      "gitmodules.txt",
    ],
  )?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stdout).contains("is not in"));

  Ok(())
}

#[test]
fn test_unknown_bundle_is_rejected() -> Result<()> {
  let temp = workspace_with_manifest()?;

  let output = bundlebot(
    temp.path(),
    &["submodules", "--manifest", "gitmodules.txt", "--bundle", "Nope"],
  )?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("Bundle 'Nope' not found"));

  Ok(())
}
