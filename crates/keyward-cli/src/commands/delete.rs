//! Delete command

use colored::Colorize;
use keyward_core::{Config, delete_key, require_key};

use crate::error::Result;
use crate::interactive;

/// Run the delete command
///
/// Without `--yes` the user is asked first; a declined (or impossible)
/// prompt cancels without error.
pub fn run_delete(config: &Config, name: &str, yes: bool) -> Result<()> {
    require_key(config, name)?;

    if !yes && !interactive::confirm(&format!("Delete key {name} and its files?"))? {
        println!("Canceled");
        return Ok(());
    }

    let record = delete_key(config, name)?;
    println!("{} Deleted {}", "OK".green().bold(), record.name.cyan());
    Ok(())
}
