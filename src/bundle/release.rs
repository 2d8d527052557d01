//! Release synthesis for one bundle
//!
//! One run walks a fixed sequence of stages:
//!
//! ```text
//! Start → DiffComputed → Empty
//!                      ↘ Classified → ContributorsAggregated → DescriptionBuilt → Published | Failed
//! ```
//!
//! Only the latest-release lookup, the umbrella diff and the publish call can
//! end a run early. Contributor lookups degrade to diagnostics.

use super::contributors::{ContributorAggregator, ContributorTally, add_contributors};
use super::diff::{CommitRange, ExtractedChanges, extract_ranges, parse_submodule_diff};
use super::identity::IdentityCache;
use super::manifest::Registry;
use super::version::{Revision, VersionResolver};
use crate::core::config::{BundleConfig, ForgeConfig};
use crate::core::error::{BotError, BotResult, DiagnosticKind, Diagnostics, ErrorKind};
use crate::core::vcs::BundleRepo;
use crate::forge::types::CreateRelease;
use crate::forge::{ForgeClient, api};
use crate::ui::progress::SubmoduleProgress;
use crate::utils::{repo_name, strip_git_suffix};
use chrono::NaiveDate;
use serde::Serialize;

const SEPARATOR: &str = "\n--------------------------\n";

const VERSIONS_NOTE: &str = "The libraries in each release are compiled for all recent major versions of CircuitPython. Please download the one that matches the major version of your CircuitPython. For example, if you are running 7.0.0 you should download the `7.x` bundle.\n";

const INSTALL_NOTE: &str = "To install, simply download the matching zip file, unzip it, and selectively copy the libraries you would like to install into the lib folder on your CIRCUITPY drive. This is especially important for non-express boards with limited flash, such as the [Trinket M0](https://www.adafruit.com/product/3500), [Gemma M0](https://www.adafruit.com/product/3501) and [Feather M0 Basic](https://www.adafruit.com/product/2772).";

/// Where a synthesis run is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStage {
  Start,
  DiffComputed,
  /// Nothing moved since the last release; terminal
  Empty,
  Classified,
  ContributorsAggregated,
  DescriptionBuilt,
  Published,
  /// The forge refused the release; terminal
  Failed,
}

/// The release to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseDescriptor {
  pub tag_name: String,
  pub title: String,
  pub body: String,
  pub target_commit: String,
}

impl ReleaseDescriptor {
  pub fn to_request(&self) -> CreateRelease {
    CreateRelease {
      tag_name: self.tag_name.clone(),
      target_commitish: self.target_commit.clone(),
      name: self.title.clone(),
      body: self.body.clone(),
      draft: false,
      prerelease: false,
    }
  }
}

/// `YYYYMMDD`; parsed back into a date by download statistics, keep stable
pub fn release_tag(today: NaiveDate) -> String {
  today.format("%Y%m%d").to_string()
}

pub fn release_title(today: NaiveDate) -> String {
  today.format("%B %d, %Y auto-release").to_string()
}

/// Link shown for a library in the release body
pub fn library_link(range: &CommitRange) -> String {
  let base = strip_git_suffix(&range.submodule.url);
  match &range.new_commit {
    Revision::Tag(tag) => format!("{}/releases/{}", base, tag),
    Revision::Commit(hash) => format!("{}/tree/{}", base, hash),
  }
}

fn link_list<'a>(ranges: impl Iterator<Item = &'a CommitRange>) -> String {
  ranges
    .map(|r| format!("[{}]({})", r.submodule.library_name(), library_link(r)))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Markdown body of the bundle release
///
/// Removed submodules are deliberately absent.
pub fn render_body(changes: &ExtractedChanges, contributors: &ContributorTally) -> String {
  let mut lines = Vec::new();

  if changes.added().next().is_some() {
    lines.push(format!("New libraries: {}", link_list(changes.added())));
  }
  if changes.updated().next().is_some() {
    lines.push(format!("Updated libraries: {}", link_list(changes.updated())));
  }

  lines.push(String::new());

  let thanks = contributors
    .ranked()
    .into_iter()
    .map(|(login, _)| format!("@{}", login))
    .collect::<Vec<_>>()
    .join(", ");
  lines.push(format!("As always, thank you to all of our contributors: {}", thanks));

  lines.push(SEPARATOR.to_string());
  lines.push(VERSIONS_NOTE.to_string());
  lines.push(INSTALL_NOTE.to_string());

  lines.join("\n")
}

/// How a run ended, when it didn't fail
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReleaseOutcome {
  NothingToRelease,
  DryRun { release: ReleaseDescriptor },
  Published { release: ReleaseDescriptor, url: Option<String> },
}

/// Everything a run learned, for printing
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReport {
  pub bundle: String,
  pub previous_tag: String,
  pub stage: ReleaseStage,
  pub changes: ExtractedChanges,
  pub contributors: ContributorTally,
  #[serde(flatten)]
  pub outcome: ReleaseOutcome,
}

/// Drives one bundle from its last release to a new one
pub struct ReleaseSynthesizer<'a> {
  repo: &'a dyn BundleRepo,
  forge: &'a dyn ForgeClient,
  forge_config: &'a ForgeConfig,
  bundle: &'a BundleConfig,
  registry: &'a Registry,
  today: NaiveDate,
  dry_run: bool,
  stage: ReleaseStage,
}

impl<'a> ReleaseSynthesizer<'a> {
  pub fn new(
    repo: &'a dyn BundleRepo,
    forge: &'a dyn ForgeClient,
    forge_config: &'a ForgeConfig,
    bundle: &'a BundleConfig,
    registry: &'a Registry,
    today: NaiveDate,
  ) -> Self {
    Self {
      repo,
      forge,
      forge_config,
      bundle,
      registry,
      today,
      dry_run: false,
      stage: ReleaseStage::Start,
    }
  }

  /// Stop after the description is built
  pub fn dry_run(mut self, dry_run: bool) -> Self {
    self.dry_run = dry_run;
    self
  }

  #[cfg(test)]
  pub fn stage(&self) -> ReleaseStage {
    self.stage
  }

  fn advance(&mut self, stage: ReleaseStage) {
    tracing::info!(bundle = %self.bundle.name, from = ?self.stage, to = ?stage, "release stage");
    self.stage = stage;
  }

  pub fn run(&mut self, cache: &mut IdentityCache, diagnostics: &mut Diagnostics) -> BotResult<ReleaseReport> {
    let bundle_id = self.bundle.repo_id(&self.forge_config.owner);

    let previous_tag = api::latest_release(self.forge, &bundle_id)?
      .map(|r| r.tag_name)
      .ok_or_else(|| {
        BotError::with_help(
          format!("{} has no published release to compare against", bundle_id),
          "Publish an initial release of the bundle by hand; later releases are computed from it.",
        )
      })?;

    let diff = self.repo.submodule_diff(&previous_tag)?;
    let hunks = parse_submodule_diff(&diff)?;
    self.advance(ReleaseStage::DiffComputed);

    if hunks.is_empty() {
      self.advance(ReleaseStage::Empty);
      return Ok(ReleaseReport {
        bundle: self.bundle.name.clone(),
        previous_tag,
        stage: self.stage,
        changes: ExtractedChanges::default(),
        contributors: ContributorTally::new(),
        outcome: ReleaseOutcome::NothingToRelease,
      });
    }

    let resolver = VersionResolver::new(self.repo);
    let changes = extract_ranges(&hunks, self.registry, &resolver)?;
    self.advance(ReleaseStage::Classified);

    let contributors = self.aggregate_contributors(&bundle_id, &previous_tag, &changes, cache, diagnostics)?;
    self.advance(ReleaseStage::ContributorsAggregated);

    let release = ReleaseDescriptor {
      tag_name: release_tag(self.today),
      title: release_title(self.today),
      body: render_body(&changes, &contributors),
      target_commit: self.repo.head_commit()?,
    };
    self.advance(ReleaseStage::DescriptionBuilt);

    if self.dry_run {
      return Ok(ReleaseReport {
        bundle: self.bundle.name.clone(),
        previous_tag,
        stage: self.stage,
        changes,
        contributors,
        outcome: ReleaseOutcome::DryRun { release },
      });
    }

    match api::create_release(self.forge, &bundle_id, &release.to_request()) {
      Ok(created) => {
        self.advance(ReleaseStage::Published);
        Ok(ReleaseReport {
          bundle: self.bundle.name.clone(),
          previous_tag,
          stage: self.stage,
          changes,
          contributors,
          outcome: ReleaseOutcome::Published {
            release,
            url: created.html_url,
          },
        })
      }
      Err(e) => {
        self.advance(ReleaseStage::Failed);
        Err(e.into())
      }
    }
  }

  /// Umbrella range plus one pass per added/updated submodule
  ///
  /// Recoverable failures cost only that range's credit; anything else (git
  /// missing, an unreadable checkout) ends the run.
  fn aggregate_contributors(
    &self,
    bundle_id: &str,
    previous_tag: &str,
    changes: &ExtractedChanges,
    cache: &mut IdentityCache,
    diagnostics: &mut Diagnostics,
  ) -> BotResult<ContributorTally> {
    let aggregator = ContributorAggregator::new(self.repo, self.forge, &self.forge_config.noreply_email);
    let mut total = ContributorTally::new();

    let umbrella_range = format!("{}..", previous_tag);
    match aggregator.aggregate(cache, diagnostics, bundle_id, None, &umbrella_range) {
      Ok(tally) => add_contributors(&mut total, &tally),
      Err(e) if e.kind() == ErrorKind::Recoverable => {
        diagnostics.push(DiagnosticKind::ContributorsSkipped, bundle_id, e.to_string())
      }
      Err(e) => return Err(e),
    }

    let mut progress = SubmoduleProgress::for_terminal(changes.ranges.len(), "Crediting contributors");
    for range in &changes.ranges {
      let path = range.submodule.path.as_str();
      let Some(repo_id) = repo_name(&range.submodule.url) else {
        diagnostics.push(
          DiagnosticKind::ContributorsSkipped,
          path,
          format!("cannot derive a forge repository from '{}'", range.submodule.url),
        );
        continue;
      };

      match aggregator.aggregate(cache, diagnostics, &repo_id, Some(path), &range.log_range()) {
        Ok(tally) => add_contributors(&mut total, &tally),
        Err(e) if e.kind() == ErrorKind::Recoverable => {
          diagnostics.push(DiagnosticKind::ContributorsSkipped, path, e.to_string())
        }
        Err(e) => return Err(e),
      }
      if let Some(p) = progress.as_mut() {
        p.inc();
      }
    }

    Ok(total)
  }
}
