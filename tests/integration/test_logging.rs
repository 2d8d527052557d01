//! Tests for `--log-file`

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_failure_is_written_to_log_file() -> Result<()> {
  let temp = tempfile::TempDir::new()?;
  let log = temp.path().join("run.log");
  let log_arg = log.to_string_lossy().to_string();

  let output = bundlebot(
    temp.path(),
    &["--log-file", &log_arg, "bundle", "changes", "--since", "20240101"],
  )?;
  assert_eq!(output.status.code(), Some(2));

  let logged = std::fs::read_to_string(&log)?;
  assert!(logged.contains("ERROR"));
  assert!(logged.contains("Git repository not found"));
  assert!(logged.contains("exit_code=2"));
  assert!(logged.contains("bundlebot bundle update"));

  Ok(())
}

#[test]
fn test_failure_is_shown_once_on_stderr() -> Result<()> {
  let temp = tempfile::TempDir::new()?;

  let output = bundlebot(temp.path(), &["bundle", "changes", "--since", "20240101"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert_eq!(stderr.matches("Git repository not found").count(), 1);

  Ok(())
}

#[test]
fn test_successful_run_leaves_log_quiet() -> Result<()> {
  let temp = tempfile::TempDir::new()?;
  let log = temp.path().join("run.log");
  let log_arg = log.to_string_lossy().to_string();

  run_bundlebot(temp.path(), &["--log-file", &log_arg, "init"])?;

  assert_eq!(std::fs::read_to_string(&log)?, "");

  Ok(())
}
