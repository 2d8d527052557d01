//! `bundle update`, `bundle changes` and `bundle release`

use crate::bundle::diff::{self, ExtractedChanges};
use crate::bundle::identity::{IdentityCache, JsonFileStore};
use crate::bundle::manifest::Registry;
use crate::bundle::release::{ReleaseOutcome, ReleaseReport, ReleaseSynthesizer};
use crate::bundle::update::{self, BundleUpdate};
use crate::bundle::version::VersionResolver;
use crate::core::context::RunContext;
use crate::core::error::{BotResult, DiagnosticKind, Diagnostics};
use crate::core::vcs::{BundleRepo, SystemGit};
use crate::forge::GitHubClient;
use std::path::Path;

/// Move every library to its newest release, then commit and push
pub fn run_bundle_update(ctx: &RunContext, bundle: Option<&str>, no_push: bool, dry_run: bool) -> BotResult<()> {
  for bundle in ctx.config.select_bundles(bundle)? {
    println!("📦 Updating {}", bundle.name);

    let git = update::fetch_bundle(&ctx.config.forge, bundle, &ctx.root)?;
    let registry = Registry::from_working_copy(git.root())?;
    let updates = update::update_bundle(&git, &registry, &bundle.libraries_prefix)?;

    if updates.is_empty() {
      println!("   No library has a newer release");
      println!();
      continue;
    }

    print_updates(&updates);
    let message = update::update_commit_message(env!("CARGO_PKG_VERSION"), &updates);

    if dry_run {
      println!();
      println!("🔍 Dry-run mode (nothing committed). Commit message:");
      println!();
      println!("{}", message);
      println!();
      continue;
    }

    git.commit_all(&message)?;
    println!("   ✅ Committed {} update(s)", updates.len());

    if no_push {
      println!("   Skipped push (--no-push)");
    } else {
      git.push()?;
    }
    println!();
  }
  Ok(())
}

fn print_updates(updates: &[BundleUpdate]) {
  for u in updates {
    println!("   {:<50} {} → {}", u.path, u.old, u.new);
  }
}

/// Offline diff extraction against a local umbrella checkout
pub fn run_bundle_changes(ctx: &RunContext, since: &str, path: Option<&Path>, json: bool) -> BotResult<()> {
  let git = SystemGit::open(path.unwrap_or(&ctx.root))?;
  let registry = Registry::from_working_copy(git.root())?;

  let hunks = diff::parse_submodule_diff(&git.submodule_diff(since)?)?;
  let changes = diff::extract_ranges(&hunks, &registry, &VersionResolver::new(&git))?;

  if json {
    println!("{}", serde_json::to_string_pretty(&changes)?);
  } else {
    print_changes(since, &changes);
  }
  Ok(())
}

fn print_changes(since: &str, changes: &ExtractedChanges) {
  if changes.ranges.is_empty() && changes.removed.is_empty() {
    println!("No submodule changes since {}", since);
  }

  let added: Vec<_> = changes.added().collect();
  if !added.is_empty() {
    println!("✨ New libraries:");
    for r in added {
      println!("   {:<50} {}", r.submodule.path, r.new_commit);
    }
  }

  let updated: Vec<_> = changes.updated().collect();
  if !updated.is_empty() {
    println!("⬆️  Updated libraries:");
    for r in updated {
      println!("   {:<50} {} → {}", r.submodule.path, r.old_commit, r.new_commit);
    }
  }

  if !changes.removed.is_empty() {
    println!("🗑️  Removed:");
    for r in &changes.removed {
      println!("   {}", r.path);
    }
  }

  if !changes.other_files.is_empty() {
    println!("   ({} other file(s) changed)", changes.other_files.len());
  }
}

/// Publish a dated release for each selected bundle
///
/// The identity cache is saved after every bundle, whether or not the
/// release went through.
pub fn run_bundle_release(ctx: &RunContext, bundle: Option<&str>, dry_run: bool, json: bool) -> BotResult<()> {
  let bundles = ctx.config.select_bundles(bundle)?;
  let client = GitHubClient::from_config(&ctx.config.forge)?;
  let store = JsonFileStore::new(ctx.cache_path());
  let today = chrono::Local::now().date_naive();

  let mut diagnostics = Diagnostics::new();
  let mut cache = match IdentityCache::load(&store) {
    Ok(cache) => cache,
    Err(e) => {
      diagnostics.push(DiagnosticKind::CacheUnavailable, store.path().display().to_string(), e.to_string());
      IdentityCache::new()
    }
  };

  let mut reports = Vec::new();
  for bundle in bundles {
    let git = update::fetch_bundle(&ctx.config.forge, bundle, &ctx.root)?;
    let registry = Registry::from_working_copy(git.root())?;

    let result = ReleaseSynthesizer::new(&git, &client, &ctx.config.forge, bundle, &registry, today)
      .dry_run(dry_run)
      .run(&mut cache, &mut diagnostics);

    if let Err(e) = cache.persist(&store) {
      diagnostics.push(DiagnosticKind::CacheUnavailable, store.path().display().to_string(), e.to_string());
    }

    let report = match result {
      Ok(report) => report,
      Err(e) => {
        // Problems gathered before the failure still get reported
        print_run_summary(&reports, &diagnostics, json)?;
        return Err(e);
      }
    };
    if !json {
      print_report(&report);
    }
    reports.push(report);
  }

  print_run_summary(&reports, &diagnostics, json)
}

fn print_run_summary(reports: &[ReleaseReport], diagnostics: &Diagnostics, json: bool) -> BotResult<()> {
  if json {
    let output = serde_json::json!({ "reports": reports, "diagnostics": diagnostics });
    println!("{}", serde_json::to_string_pretty(&output)?);
  } else {
    diagnostics.print_summary();
  }
  Ok(())
}

fn print_report(report: &ReleaseReport) {
  println!("📦 {} (since {})", report.bundle, report.previous_tag);

  match &report.outcome {
    ReleaseOutcome::NothingToRelease => {
      println!("   Nothing changed; no release");
      println!();
      return;
    }
    ReleaseOutcome::DryRun { release } => {
      println!("🔍 Dry-run mode (nothing published)");
      println!();
      println!("   Tag:    {}", release.tag_name);
      println!("   Title:  {}", release.title);
      println!("   Target: {}", release.target_commit);
      println!();
      println!("{}", release.body);
    }
    ReleaseOutcome::Published { release, url } => {
      println!("   ✅ Published {}", release.tag_name);
      if let Some(url) = url {
        println!("   {}", url);
      }
    }
  }

  let credited = if report.contributors.is_empty() {
    "no contributors credited".to_string()
  } else {
    format!("{} contributor(s)", report.contributors.len())
  };
  println!(
    "   {} new, {} updated, {}",
    report.changes.added().count(),
    report.changes.updated().count(),
    credited
  );
  println!();
}
