//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scratch directory holding library repos and one umbrella repo
pub struct TestBundle {
  _root: TempDir,
  pub base: PathBuf,
  pub path: PathBuf,
}

impl TestBundle {
  /// Create an umbrella repository with one initial commit
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let base = root.path().to_path_buf();
    let path = base.join("umbrella");
    std::fs::create_dir_all(&path)?;

    init_repo(&path)?;
    std::fs::write(path.join("README.rst"), "Test bundle\n")?;
    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial bundle"])?;

    Ok(Self { _root: root, base, path })
  }

  /// Create a library repository with one tagged commit per version
  pub fn add_library(&self, name: &str, versions: &[&str]) -> Result<PathBuf> {
    let lib = self.base.join(name);
    std::fs::create_dir_all(&lib)?;
    init_repo(&lib)?;

    for version in versions {
      std::fs::write(lib.join("code.py"), format!("__version__ = \"{}\"\n", version))?;
      git(&lib, &["add", "."])?;
      git(&lib, &["commit", "-m", &format!("Release {}", version)])?;
      git(&lib, &["tag", version])?;
    }
    Ok(lib)
  }

  /// Pin `library` at `path` inside the umbrella, checked out at `rev`
  pub fn add_submodule(&self, library: &Path, path: &str, rev: &str) -> Result<()> {
    let url = library.to_string_lossy();
    git(
      &self.path,
      &["-c", "protocol.file.allow=always", "submodule", "add", &url, path],
    )?;
    self.checkout_submodule(path, rev)
  }

  /// Move a pinned submodule to `rev`
  pub fn checkout_submodule(&self, path: &str, rev: &str) -> Result<()> {
    git(&self.path.join(path), &["checkout", "--quiet", rev])?;
    git(&self.path, &["add", path])?;
    Ok(())
  }

  /// Commit current changes
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;

    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Tag the umbrella's HEAD
  pub fn tag(&self, name: &str) -> Result<()> {
    git(&self.path, &["tag", name])?;
    Ok(())
  }

  /// Push the umbrella to a bare `origin` next to it and track it
  pub fn publish(&self) -> Result<PathBuf> {
    let origin = self.base.join("origin.git");
    let origin_arg = origin.to_string_lossy().to_string();
    git(&self.base, &["init", "--bare", "--initial-branch=main", &origin_arg])?;
    git(&self.path, &["remote", "add", "origin", &origin_arg])?;
    git(&self.path, &["push", "--quiet", "-u", "origin", "main"])?;
    Ok(origin)
  }

  /// Write a file in the umbrella
  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    std::fs::write(self.path.join(path), content)?;
    Ok(())
  }
}

fn init_repo(path: &Path) -> Result<()> {
  git(path, &["init", "--initial-branch=main"])?;
  git(path, &["config", "user.name", "Test User"])?;
  git(path, &["config", "user.email", "test@example.com"])?;
  git(path, &["config", "commit.gpgsign", "false"])?;
  git(path, &["config", "tag.gpgsign", "false"])?;
  Ok(())
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run bundlebot and return its output whatever the exit status
pub fn bundlebot(cwd: &Path, args: &[&str]) -> Result<Output> {
  Command::new(env!("CARGO_BIN_EXE_bundlebot"))
    .current_dir(cwd)
    .args(args)
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run bundlebot")
}

/// Run bundlebot and fail unless it exits successfully
pub fn run_bundlebot(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = bundlebot(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "bundlebot command failed: bundlebot {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Stdout of a successful run parsed as JSON
pub fn run_bundlebot_json(cwd: &Path, args: &[&str]) -> Result<serde_json::Value> {
  let output = run_bundlebot(cwd, args)?;
  serde_json::from_slice(&output.stdout).context("bundlebot printed invalid JSON")
}

/// A `.gitmodules` with two libraries and one tool outside `libraries/`
pub const MANIFEST: &str = r#"[submodule "libraries/drivers/foo"]
	path = libraries/drivers/foo
	url = https://github.com/adafruit/Adafruit_CircuitPython_Foo.git
[submodule "libraries/helpers/bar"]
    path = libraries/helpers/bar
    url = https://github.com/adafruit/Adafruit_CircuitPython_Bar.git
[submodule "tools/build"]
	path = tools/build
	url = https://github.com/adafruit/circuitpython-build-tools.git
"#;
