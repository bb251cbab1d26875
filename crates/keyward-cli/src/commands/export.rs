//! Export command

use std::path::Path;

use colored::Colorize;
use keyward_core::{Config, ExportFormat, export_keys, list_keys};

use crate::error::Result;

/// Run the export command
pub fn run_export(config: &Config, format: ExportFormat, output: &Path) -> Result<()> {
    let records = list_keys(config)?;
    export_keys(&records, format, output)?;
    println!(
        "{} Exported {} keys as {} to {}",
        "OK".green().bold(),
        records.len(),
        format,
        output.display()
    );
    Ok(())
}
