//! Init, info and version commands

use std::path::Path;

use colored::Colorize;
use keyward_core::{Config, Provider};
use serde_json::json;

use super::print_json;
use crate::context;
use crate::error::Result;

/// Run the init command
///
/// Creates the key directory and manifest directory, and writes the config
/// file unless one already exists (or `force` is set).
pub fn run_init(config_override: Option<&Path>, force: bool, json: bool) -> Result<()> {
    let defaults = context::defaults(config_override)?;
    let outcome = Config::init(&defaults, force)?;
    let config = &outcome.config;

    if json {
        return print_json(&json!({
            "config_path": config.config_path,
            "key_dir": config.key_dir,
            "manifest_path": config.manifest_path,
            "wrote_config": outcome.wrote_config,
        }));
    }

    if outcome.wrote_config {
        println!(
            "{} Wrote config {}",
            "=>".blue().bold(),
            config.config_path.display().to_string().cyan()
        );
    } else {
        println!(
            "{} Config {} already exists (use {} to rewrite it)",
            "=>".blue().bold(),
            config.config_path.display().to_string().cyan(),
            "--force".yellow()
        );
    }
    println!("   Key directory: {}", config.key_dir.display());
    println!("   Manifest:      {}", config.manifest_path.display());
    Ok(())
}

fn provider_names(config: &Config) -> Vec<&'static str> {
    config
        .policy
        .allowed_providers()
        .iter()
        .map(Provider::as_str)
        .collect()
}

/// Run the info command
pub fn run_info(config: &Config, json: bool) -> Result<()> {
    let providers = provider_names(config);
    if json {
        return print_json(&json!({
            "config_path": config.config_path,
            "config_exists": config.config_path.exists(),
            "key_dir": config.key_dir,
            "manifest_path": config.manifest_path,
            "allowed_providers": providers,
            "name_pattern": config.policy.name_pattern(),
        }));
    }

    let exists = if config.config_path.exists() {
        "".normal()
    } else {
        " (not created, using defaults)".dimmed()
    };
    println!("{}", "keyward configuration".bold());
    println!("  {:<18} {}{}", "Config file:", config.config_path.display(), exists);
    println!("  {:<18} {}", "Key directory:", config.key_dir.display());
    println!("  {:<18} {}", "Manifest:", config.manifest_path.display());
    println!("  {:<18} {}", "Allowed providers:", providers.join(", "));
    println!("  {:<18} {}", "Name pattern:", config.policy.name_pattern());
    Ok(())
}

/// Run the version command
pub fn run_version(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        return print_json(&json!({ "name": "keyward", "version": version }));
    }
    println!("keyward {version}");
    Ok(())
}
