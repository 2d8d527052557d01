use crate::core::config::BotConfig;
use crate::core::context::RunContext;
use crate::core::error::{BotError, BotResult};

/// Write the default configuration to `bundlebot.toml`
pub fn run_init(ctx: &RunContext, force: bool) -> BotResult<()> {
  if let Some(existing) = BotConfig::find_config_path(&ctx.root)
    && !force
  {
    return Err(BotError::with_help(
      format!("Configuration already exists at {}", existing.display()),
      "Pass --force to overwrite it with the defaults.",
    ));
  }

  let config = BotConfig::default();
  let path = config.save(&ctx.root)?;

  println!("✅ Wrote {}", path.display());
  println!();
  println!("   Bundles:");
  for bundle in &config.bundles {
    println!("     - {} ({})", bundle.name, bundle.working_copy(&ctx.root).display());
  }
  println!();
  println!(
    "   Set {} (and optionally {}) before publishing releases.",
    config.forge.token_env, config.forge.user_env
  );
  Ok(())
}
