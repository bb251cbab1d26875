//! Create command

use colored::Colorize;
use keyward_core::{
    Capability, Config, CreateKeyRequest, Error as CoreError, Provider, SshKeygen, create_key,
    fido2_capability, ssh_version,
};

use crate::error::{CliError, Result};
use crate::interactive;

/// Arguments for [`run_create`], as given on the command line
#[derive(Debug, Clone)]
pub struct CreateArgs {
    pub name: String,
    pub provider: Provider,
    pub comment: Option<String>,
    pub resident: bool,
    pub application: Option<String>,
    pub passphrase: Option<String>,
    pub no_passphrase: bool,
    pub rounds: u32,
}

/// Run the create command
pub fn run_create(config: &Config, args: CreateArgs) -> Result<()> {
    // Reject bad names before probing tools or prompting
    config
        .policy
        .validate(&args.name, args.provider)
        .map_err(CoreError::from)?;

    let passphrase = match args.provider {
        Provider::HardwareBacked => {
            check_fido2_support()?;
            None
        }
        // create_key rejects these; don't prompt first
        Provider::Software if args.resident || args.application.is_some() => None,
        Provider::Software => Some(resolve_passphrase(args.passphrase, args.no_passphrase)?),
    };

    let request = CreateKeyRequest {
        name: args.name,
        provider: args.provider,
        comment: args.comment,
        passphrase,
        resident: args.resident,
        application: args.application,
        rounds: args.rounds,
    };
    let record = create_key(config, &request, &SshKeygen::default())?;

    println!(
        "{} Created {} ({})",
        "OK".green().bold(),
        record.name.cyan(),
        record.provider()
    );
    println!("   Public key: {}", record.public_key_path);
    Ok(())
}

fn check_fido2_support() -> Result<()> {
    match fido2_capability(ssh_version().as_deref()) {
        Capability::Supported => Ok(()),
        Capability::Unsupported => Err(CliError::user(
            "OpenSSH 8.2 or newer is required for fido2 keys",
        )),
        Capability::Unknown => {
            eprintln!(
                "{} Could not determine the OpenSSH version; fido2 support is unverified",
                "warning:".yellow().bold()
            );
            Ok(())
        }
    }
}

fn resolve_passphrase(given: Option<String>, none: bool) -> Result<String> {
    match given {
        Some(passphrase) => Ok(passphrase),
        None if none => Ok(String::new()),
        None if interactive::is_interactive() => interactive::passphrase(),
        None => Err(CliError::user(
            "No terminal for the passphrase prompt; pass --passphrase or --no-passphrase",
        )),
    }
}
