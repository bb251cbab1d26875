//! Read-only key commands: list, pubkey, ssh-config

use colored::Colorize;
use keyward_core::{
    Config, list_keys, public_key_fingerprint, read_public_key, require_key, ssh_config_snippet,
};

use super::print_json;
use crate::error::{CliError, Result};

/// Run the list command
///
/// JSON output is the manifest records with an added `fingerprint`, which is
/// `null` when the public key cannot be read.
pub fn run_list(config: &Config, json: bool) -> Result<()> {
    let records = list_keys(config)?;

    if json {
        let mut entries = Vec::with_capacity(records.len());
        for record in &records {
            let mut value = serde_json::to_value(record)?;
            let fingerprint = public_key_fingerprint(config, record).ok().flatten();
            value["fingerprint"] = fingerprint.into();
            entries.push(value);
        }
        return print_json(&entries);
    }

    if records.is_empty() {
        println!("No keys tracked. Create one with {}.", "keyward create --name NAME".cyan());
        return Ok(());
    }

    for record in &records {
        let resident = if record.is_resident() { " resident" } else { "" };
        println!(
            "{:<24} {:<9} {}{}",
            record.name.green(),
            record.provider().to_string(),
            record.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            resident.yellow()
        );
    }
    Ok(())
}

/// Run the pubkey command
pub fn run_pubkey(config: &Config, name: &str, fingerprint: bool) -> Result<()> {
    let record = require_key(config, name)?;
    if !fingerprint {
        println!("{}", read_public_key(config, &record)?);
        return Ok(());
    }
    match public_key_fingerprint(config, &record)? {
        Some(fp) => {
            println!("{fp}");
            Ok(())
        }
        None => Err(CliError::user(format!(
            "Public key for {name} is not a valid OpenSSH key line"
        ))),
    }
}

/// Run the ssh-config command
pub fn run_ssh_config(config: &Config, name: &str, host: &str) -> Result<()> {
    let record = require_key(config, name)?;
    print!("{}", ssh_config_snippet(config, &record, host)?);
    Ok(())
}
