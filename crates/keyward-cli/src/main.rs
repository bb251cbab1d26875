//! keyward CLI
//!
//! Tracks SSH key pairs in a manifest and reconciles it with the key directory.

mod cli;
mod commands;
mod context;
mod error;
mod interactive;

use std::io;
use std::path::Path;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use error::{CliError, Result};

fn main() {
    let code = match run() {
        Ok(()) => 0,
        Err(CliError::Exit { code }) => code,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => execute_command(cmd, cli.config.as_deref()),
        None => {
            // No command provided - show help hint
            println!("{} SSH key manifest keeper", "keyward".green().bold());
            println!();
            println!("Run {} for available commands.", "keyward --help".cyan());
            Ok(())
        }
    }
}

/// Logs go to stderr so JSON on stdout stays machine readable.
fn init_tracing(verbose: bool) {
    let result = if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    if let Err(e) = result {
        eprintln!("{} could not install logger: {e}", "warning:".yellow().bold());
    }
    tracing::debug!("Verbose mode enabled");
}

fn execute_command(cmd: Commands, config_override: Option<&Path>) -> Result<()> {
    match cmd {
        Commands::Init { force, json } => commands::run_init(config_override, force, json),
        Commands::Info { json } => commands::run_info(&context::load(config_override)?, json),
        Commands::Version { json } => commands::run_version(json),
        Commands::Doctor { json } => commands::run_doctor(json),
        Commands::Create {
            name,
            provider,
            comment,
            resident,
            application,
            passphrase,
            no_passphrase,
            rounds,
        } => {
            let config = context::load(config_override)?;
            let args = commands::CreateArgs {
                name,
                provider: provider.into(),
                comment,
                resident,
                application,
                passphrase,
                no_passphrase,
                rounds,
            };
            commands::run_create(&config, args)
        }
        Commands::List { json } => commands::run_list(&context::load(config_override)?, json),
        Commands::Pubkey { name, fingerprint } => {
            commands::run_pubkey(&context::load(config_override)?, &name, fingerprint)
        }
        Commands::Delete { name, yes } => {
            commands::run_delete(&context::load(config_override)?, &name, yes)
        }
        Commands::SshConfig { name, host } => {
            commands::run_ssh_config(&context::load(config_override)?, &name, &host)
        }
        Commands::Scan { json } => commands::run_scan(&context::load(config_override)?, json),
        Commands::Repair {
            import,
            prune_missing,
            prune_invalid,
            yes,
            json,
        } => {
            let config = context::load(config_override)?;
            let args = commands::RepairArgs {
                import,
                prune_missing,
                prune_invalid,
                yes,
                json,
            };
            commands::run_repair(&config, args)
        }
        Commands::ResidentImport { yes, json } => {
            commands::run_resident_import(&context::load(config_override)?, yes, json)
        }
        Commands::Export { format, output } => {
            commands::run_export(&context::load(config_override)?, format.into(), &output)
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "keyward", &mut io::stdout());
            Ok(())
        }
    }
}
