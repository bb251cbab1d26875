//! Local prerequisite checks

use colored::Colorize;
use keyward_core::{Capability, fido2_capability, probe_keygen, ssh_version};
use serde_json::json;

use super::print_json;
use crate::error::{CliError, Result};

/// Run the doctor command
///
/// Exits with status 1 when `ssh-keygen` is missing, since no key can be
/// created without it.
pub fn run_doctor(json: bool) -> Result<()> {
    let keygen = probe_keygen();
    let banner = ssh_version();
    let fido2 = fido2_capability(banner.as_deref());

    if json {
        print_json(&json!({
            "ssh_keygen": keygen,
            "ssh_version": banner,
            "fido2": fido2,
        }))?;
    } else {
        let status = if keygen { "OK".green() } else { "MISSING".red() };
        println!("  {:<12} {}", "ssh-keygen", status);
        println!(
            "  {:<12} {}",
            "ssh",
            banner.as_deref().unwrap_or("unknown").dimmed()
        );
        let fido2_label = match fido2 {
            Capability::Supported => fido2.to_string().green(),
            Capability::Unsupported => fido2.to_string().red(),
            Capability::Unknown => fido2.to_string().yellow(),
        };
        println!("  {:<12} {}", "fido2", fido2_label);
    }

    if keygen {
        Ok(())
    } else {
        Err(CliError::Exit { code: 1 })
    }
}
