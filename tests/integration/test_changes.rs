//! Tests for offline diff extraction (`bundle changes`)

use crate::helpers::*;
use anyhow::Result;

/// Umbrella released as `20240101` with foo at 1.0.0, then foo moved to
/// 1.1.0, baz added at 2.0.0 and the README edited
fn bundle_with_changes() -> Result<TestBundle> {
  let bundle = TestBundle::new()?;
  let foo = bundle.add_library("Adafruit_CircuitPython_Foo", &["1.0.0", "1.1.0"])?;
  let baz = bundle.add_library("Adafruit_CircuitPython_Baz", &["2.0.0"])?;

  bundle.add_submodule(&foo, "libraries/drivers/foo", "1.0.0")?;
  bundle.commit("Add foo")?;
  bundle.tag("20240101")?;

  bundle.checkout_submodule("libraries/drivers/foo", "1.1.0")?;
  bundle.add_submodule(&baz, "libraries/drivers/baz", "2.0.0")?;
  bundle.write_file("README.rst", "Test bundle, now with baz\n")?;
  bundle.commit("Update foo, add baz")?;

  Ok(bundle)
}

#[test]
fn test_changes_classifies_added_and_updated() -> Result<()> {
  let bundle = bundle_with_changes()?;

  let json = run_bundlebot_json(&bundle.path, &["bundle", "changes", "--since", "20240101", "--json"])?;

  let ranges = json["ranges"].as_array().expect("ranges");
  assert_eq!(ranges.len(), 2);

  let foo = ranges
    .iter()
    .find(|r| r["submodule"]["path"] == "libraries/drivers/foo")
    .expect("foo range");
  assert_eq!(foo["kind"], "updated");
  assert_eq!(foo["old_commit"]["value"], "1.0.0");
  assert_eq!(foo["new_commit"]["value"], "1.1.0");
  assert_eq!(foo["old_commit"]["kind"], "tag");

  let baz = ranges
    .iter()
    .find(|r| r["submodule"]["path"] == "libraries/drivers/baz")
    .expect("baz range");
  assert_eq!(baz["kind"], "added");
  assert_eq!(baz["new_commit"]["value"], "2.0.0");
  assert_eq!(baz["old_commit"]["kind"], "commit");

  let others: Vec<_> = json["other_files"]
    .as_array()
    .expect("other files")
    .iter()
    .filter_map(|f| f.as_str())
    .collect();
  assert!(others.contains(&"README.rst"));
  assert!(others.contains(&".gitmodules"));

  Ok(())
}

#[test]
fn test_changes_since_head_is_empty() -> Result<()> {
  let bundle = bundle_with_changes()?;
  bundle.tag("20240202")?;

  let json = run_bundlebot_json(&bundle.path, &["bundle", "changes", "--since", "20240202", "--json"])?;
  assert_eq!(json["ranges"].as_array().map(Vec::len), Some(0));
  assert_eq!(json["other_files"].as_array().map(Vec::len), Some(0));

  let output = run_bundlebot(&bundle.path, &["bundle", "changes", "--since", "20240202"])?;
  assert!(String::from_utf8_lossy(&output.stdout).contains("No submodule changes since 20240202"));

  Ok(())
}

#[test]
fn test_changes_with_path_from_elsewhere() -> Result<()> {
  let bundle = bundle_with_changes()?;
  let path = bundle.path.to_string_lossy().to_string();

  let output = run_bundlebot(
    &bundle.base,
    &["bundle", "changes", "--since", "20240101", "--path", &path],
  )?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("New libraries"));
  assert!(stdout.contains("libraries/drivers/baz"));
  assert!(stdout.contains("1.0.0 → 1.1.0"));

  Ok(())
}

#[test]
fn test_changes_outside_a_repository_fails() -> Result<()> {
  let temp = tempfile::TempDir::new()?;

  let output = bundlebot(temp.path(), &["bundle", "changes", "--since", "20240101"])?;
  assert!(!output.status.success());

  Ok(())
}
