//! Drift commands: scan, repair, resident-import

use colored::Colorize;
use keyward_core::{
    Config, DriftReport, MissingFile, RECONSTRUCTED_CREATED_AT_NOTE, ReconcileOutcome,
    RepairOptions, SshKeygen, import_resident_keys, reconcile, scan,
};

use super::print_json;
use crate::error::{CliError, Result};
use crate::interactive;

/// Run the scan command
///
/// Exits with status 1 when any drift is found.
pub fn run_scan(config: &Config, json: bool) -> Result<()> {
    let report = scan(config)?;
    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::Exit { code: 1 })
    }
}

/// Arguments for [`run_repair`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RepairArgs {
    pub import: bool,
    pub prune_missing: bool,
    pub prune_invalid: bool,
    pub yes: bool,
    pub json: bool,
}

/// Run the repair command
///
/// Imports happen without confirmation. Prunes need `--yes` or an
/// interactive confirmation; unconfirmed prunes are reported, not applied.
pub fn run_repair(config: &Config, args: RepairArgs) -> Result<()> {
    let mut options = RepairOptions {
        import_untracked: args.import,
        prune_missing: args.prune_missing,
        prune_invalid: args.prune_invalid,
        proceed: args.yes,
    };
    if !options.requests_any() {
        return Err(CliError::user(
            "Nothing to do: pass --import, --prune-missing or --prune-invalid",
        ));
    }

    if options.requests_prune() && !options.proceed {
        let candidates = prune_candidates(&scan(config)?, options);
        if !candidates.is_empty() {
            if !args.json {
                println!("{}", "Entries to prune:".bold());
                for name in &candidates {
                    println!("  - {name}");
                }
            }
            options.proceed =
                interactive::confirm(&format!("Prune {} manifest entries?", candidates.len()))?;
        }
    }

    let outcome = reconcile(config, options)?;
    if args.json {
        print_json(&outcome)
    } else {
        print_outcome(&outcome);
        Ok(())
    }
}

/// Run the resident-import command
pub fn run_resident_import(config: &Config, yes: bool, json: bool) -> Result<()> {
    let prompt = format!(
        "Download resident keys from the authenticator into {}?",
        config.key_dir.display()
    );
    if !yes && !interactive::confirm(&prompt)? {
        println!("Canceled");
        return Ok(());
    }

    let outcome = import_resident_keys(config, &SshKeygen::default())?;
    if json {
        print_json(&outcome)
    } else {
        print_outcome(&outcome);
        Ok(())
    }
}

fn prune_candidates(report: &DriftReport, options: RepairOptions) -> Vec<String> {
    let mut names = Vec::new();
    if options.prune_missing {
        names.extend(report.manifest_entries_missing_files.iter().map(|e| e.name.clone()));
    }
    if options.prune_invalid {
        names.extend(report.invalid_manifest_paths.iter().map(|e| e.name.clone()));
    }
    names.sort();
    names.dedup();
    names
}

fn missing_label(missing: &[MissingFile]) -> String {
    missing
        .iter()
        .map(|m| match m {
            MissingFile::Private => "private",
            MissingFile::Public => "public",
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_section(title: &str, lines: Vec<String>) {
    if lines.is_empty() {
        return;
    }
    println!("{}", title.yellow().bold());
    for line in lines {
        println!("  {line}");
    }
}

fn print_report(report: &DriftReport) {
    if report.is_clean() {
        println!("{} Manifest matches key directory", "OK".green().bold());
        return;
    }

    print_section(
        "Invalid manifest paths:",
        report
            .invalid_manifest_paths
            .iter()
            .map(|e| format!("{}: {}", e.name, e.error))
            .collect(),
    );
    print_section(
        "Entries missing files:",
        report
            .manifest_entries_missing_files
            .iter()
            .map(|e| format!("{} ({})", e.name, missing_label(&e.missing)))
            .collect(),
    );
    print_section("Untracked key pairs:", report.key_dir_untracked_pairs.clone());
    print_section("Orphan public keys:", report.key_dir_orphan_public_keys.clone());
    print_section("Orphan private keys:", report.key_dir_orphan_private_keys.clone());
    println!();
    println!(
        "{} {} issue(s). Run {} to fix.",
        "Drift:".red().bold(),
        report.issue_count(),
        "keyward repair".cyan()
    );
}

fn print_outcome(outcome: &ReconcileOutcome) {
    let applied = &outcome.applied;
    for key in &applied.imported {
        println!(
            "{} Imported {} ({}, {})",
            "+".green().bold(),
            key.name.cyan(),
            key.provider,
            key.key_type
        );
    }
    for skipped in &applied.skipped_imports {
        println!("{} Skipped {}: {}", "!".yellow().bold(), skipped.name, skipped.error);
    }
    for name in applied.pruned_missing.iter().chain(&applied.pruned_invalid) {
        println!("{} Pruned {}", "-".red().bold(), name.cyan());
    }
    if !applied.unconfirmed.is_empty() {
        println!(
            "{} Not pruned without confirmation (use {}): {}",
            "!".yellow().bold(),
            "--yes".yellow(),
            applied.unconfirmed.join(", ")
        );
    }
    if !applied.imported.is_empty() {
        println!("{} {}", "note:".dimmed(), RECONSTRUCTED_CREATED_AT_NOTE.dimmed());
    }
    if !applied.changed() {
        println!("No changes made.");
    }

    if outcome.report.is_clean() {
        println!("{} Manifest matches key directory", "OK".green().bold());
    } else {
        println!(
            "{} {} issue(s) remain. Run {} for details.",
            "Drift:".yellow().bold(),
            outcome.report.issue_count(),
            "keyward scan".cyan()
        );
    }
}
