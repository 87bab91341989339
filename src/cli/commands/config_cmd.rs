//! config command - Get or list configuration values

use anyhow::{bail, Result};

use crate::cli::context::{Context, Globals};
use crate::core::config::KEYS;
use crate::git::Git;
use crate::ui::output;

/// Load config including the repo layer of the current directory, if any.
fn load(globals: Globals) -> Result<Context> {
    let git = Git::open(std::path::Path::new(".")).ok();
    Context::load(globals, git.as_ref().map(Git::git_dir))
}

/// Effective value of `key`, with flags applied where a flag exists.
fn effective(ctx: &Context, key: &str) -> Option<String> {
    match key {
        "host" => Some(ctx.host().to_string()),
        "org" => ctx.org().ok().map(|org| org.to_string()),
        "max_api_retries" => Some(ctx.retry_policy().max_retries.to_string()),
        _ => ctx.config.get(key),
    }
}

/// Get a configuration value.
pub fn get(globals: Globals, key: &str) -> Result<()> {
    if !KEYS.contains(&key) {
        bail!("Unknown configuration key: {} (known keys: {})", key, KEYS.join(", "));
    }
    let ctx = load(globals)?;
    if let Some(value) = effective(&ctx, key) {
        println!("{}", value);
    }
    Ok(())
}

/// List all configuration values.
pub fn list(globals: Globals) -> Result<()> {
    let ctx = load(globals)?;
    if let Some(path) = ctx.config.global_config_loaded_from() {
        output::print(format!("# global: {}", path.display()), ctx.verbosity);
    }
    if let Some(path) = ctx.config.repo_config_loaded_from() {
        output::print(format!("# repo: {}", path.display()), ctx.verbosity);
    }
    for key in KEYS {
        println!("{} = {}", key, effective(&ctx, key).unwrap_or_default());
    }
    Ok(())
}
