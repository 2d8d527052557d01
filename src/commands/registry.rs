//! `submodules` and `contains`: read-only views of a bundle's registry

use crate::bundle::manifest::{self, SubmoduleEntry};
use crate::core::config::BundleConfig;
use crate::core::context::RunContext;
use crate::core::error::{BotError, BotResult, ResultExt};
use crate::forge::GitHubClient;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Registry of one bundle, as listed by `submodules --json`
#[derive(Debug, Serialize)]
struct BundleRegistry<'a> {
  bundle: &'a str,
  libraries_prefix: &'a str,
  submodules: Vec<SubmoduleEntry>,
}

/// Registries for the selected bundles
///
/// A local `--manifest` replaces the forge fetch and is read against the
/// first selected bundle's prefix.
fn load_registries<'a>(
  ctx: &'a RunContext,
  manifest_file: Option<&Path>,
  bundle: Option<&str>,
) -> BotResult<Vec<BundleRegistry<'a>>> {
  let bundles: Vec<&BundleConfig> = ctx.config.select_bundles(bundle)?;

  if let Some(path) = manifest_file {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let target: &BundleConfig = bundles
      .first()
      .copied()
      .ok_or_else(|| BotError::message("No bundles configured"))?;
    return Ok(vec![BundleRegistry {
      bundle: &target.name,
      libraries_prefix: &target.libraries_prefix,
      submodules: manifest::parse_manifest(Some(&text)),
    }]);
  }

  let client = GitHubClient::from_config(&ctx.config.forge)?;
  bundles
    .into_iter()
    .map(|b| {
      Ok(BundleRegistry {
        bundle: &b.name,
        libraries_prefix: &b.libraries_prefix,
        submodules: manifest::get_bundle_submodules(&client, &ctx.config.forge, b)?,
      })
    })
    .collect()
}

/// List every registered submodule
pub fn run_submodules(ctx: &RunContext, manifest_file: Option<&Path>, bundle: Option<&str>, json: bool) -> BotResult<()> {
  let registries = load_registries(ctx, manifest_file, bundle)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&registries)?);
    return Ok(());
  }

  for registry in &registries {
    let libraries = registry
      .submodules
      .iter()
      .filter(|s| s.path.starts_with(registry.libraries_prefix))
      .count();
    println!(
      "📦 {} ({} submodules, {} libraries)",
      registry.bundle,
      registry.submodules.len(),
      libraries
    );
    for entry in &registry.submodules {
      println!("   {:<50} {}", entry.path, manifest::sanitize_url(&entry.url));
    }
    println!();
  }
  Ok(())
}

/// Report which bundles pin `url` as a library; `Ok(false)` when none do
pub fn run_contains(ctx: &RunContext, url: &str, manifest_file: Option<&Path>, bundle: Option<&str>) -> BotResult<bool> {
  let registries = load_registries(ctx, manifest_file, bundle)?;

  let mut found = false;
  for registry in &registries {
    if manifest::is_repo_in_bundle(url, &registry.submodules, registry.libraries_prefix) {
      println!("✅ {} is in {}", url, registry.bundle);
      found = true;
    }
  }
  if !found {
    println!("❌ {} is not in any selected bundle", url);
  }
  Ok(found)
}
