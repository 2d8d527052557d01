//! `library status` and `library plan`

use crate::core::context::RunContext;
use crate::core::error::BotResult;
use crate::forge::GitHubClient;
use crate::library::plan::{self, ReleasePlan, VersionBump};
use crate::library::status::{self, Freshness, LibraryStatus};

/// Release state of each `owner/repo`
pub fn run_library_status(ctx: &RunContext, repos: &[String], json: bool) -> BotResult<()> {
  let client = GitHubClient::from_config(&ctx.config.forge)?;
  let now = chrono::Utc::now();

  let statuses = repos
    .iter()
    .map(|repo| status::library_status(&client, repo, now))
    .collect::<BotResult<Vec<_>>>()?;

  if json {
    println!("{}", serde_json::to_string_pretty(&statuses)?);
  } else {
    print_status_table(&statuses);
  }
  Ok(())
}

fn print_status_table(statuses: &[LibraryStatus]) {
  println!("{:<50} {:<12} STATE", "LIBRARY", "LATEST");
  for s in statuses {
    let fresh = match s.freshness {
      Some(Freshness::New) => " [new]",
      Some(Freshness::Updated) => " [updated]",
      None => "",
    };
    println!(
      "{:<50} {:<12} {}{}",
      s.repo,
      s.latest_tag.as_deref().unwrap_or("-"),
      s.state.describe(),
      fresh
    );
  }
}

/// Whether `repo` needs a release and what the tag would be
pub fn run_library_plan(ctx: &RunContext, repo: &str, bump: VersionBump, json: bool) -> BotResult<()> {
  let client = GitHubClient::from_config(&ctx.config.forge)?;
  let plan = plan::plan_release(&client, repo, bump)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&plan)?);
  } else {
    print_plan(&plan);
  }
  Ok(())
}

fn print_plan(plan: &ReleasePlan) {
  println!("📦 Release Plan for '{}' ({})", plan.repo, plan.default_branch);
  println!();
  println!("  Current:  {}", plan.current_tag.as_deref().unwrap_or("(no release)"));

  if !plan.needs_release {
    println!();
    println!("✅ No commits since the last release");
    return;
  }

  if plan.proposals.is_empty() {
    println!();
    println!("⚠️  Latest tag isn't semver; choose the next tag by hand");
    return;
  }

  println!();
  for p in &plan.proposals {
    let marker = if p.bump == plan.selected { "→" } else { " " };
    let name = match p.bump {
      VersionBump::Patch => "patch",
      VersionBump::Minor => "minor",
      VersionBump::Major => "major",
    };
    println!("  {} {:<6} {}", marker, name, p.tag);
  }
  println!();
  if let Some(tag) = plan.selected_tag() {
    println!("Create release {} on the forge when ready.", tag);
  }
}
