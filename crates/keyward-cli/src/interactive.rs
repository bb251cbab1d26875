//! Interactive prompts for CLI commands
//!
//! Uses dialoguer for terminal prompts. Nothing is asked when stdin is not
//! a terminal: confirmations read as "no" and passphrases are unavailable.

use std::io::{self, IsTerminal};

use dialoguer::{Confirm, Password};

use crate::error::Result;

pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Ask a yes/no question, defaulting to no.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !is_interactive() {
        return Ok(false);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

/// Prompt for a new passphrase twice; an empty passphrase is allowed.
pub fn passphrase() -> Result<String> {
    Ok(Password::new()
        .with_prompt("Passphrase (empty for none)")
        .with_confirmation("Repeat passphrase", "Passphrases do not match")
        .allow_empty_password(true)
        .interact()?)
}
