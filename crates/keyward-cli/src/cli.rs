//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use keyward_core::{DEFAULT_ROUNDS, ExportFormat, Provider};

/// keyward - Track SSH key pairs and keep the manifest honest
#[derive(Parser, Debug)]
#[command(name = "keyward")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of the platform default
    #[arg(long, global = true, env = "KEYWARD_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Key provider as spelled on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderArg {
    /// FIDO2 authenticator (ed25519-sk)
    Fido2,
    /// Passphrase-protected key file (ed25519)
    Software,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Fido2 => Provider::HardwareBacked,
            ProviderArg::Software => Provider::Software,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create the config file, key directory and manifest directory
    ///
    /// An existing config file is left untouched unless --force is given.
    Init {
        /// Rewrite the config file from defaults
        #[arg(long)]
        force: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Info {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the keyward version
    Version {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Check local prerequisites (ssh-keygen, OpenSSH FIDO2 support)
    Doctor {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Create a new key pair
    ///
    /// Examples:
    ///   keyward create --name work                       # FIDO2 key
    ///   keyward create --name work --resident            # resident FIDO2 key
    ///   keyward create --name backup --provider software # passphrase prompt
    Create {
        /// Key name, used as the file name
        #[arg(long)]
        name: String,

        #[arg(long, value_enum, default_value_t = ProviderArg::Fido2)]
        provider: ProviderArg,

        /// Key comment (default: NAME@keyward)
        #[arg(long)]
        comment: Option<String>,

        /// Store the key on the authenticator (fido2 only)
        #[arg(long)]
        resident: bool,

        /// FIDO application string, e.g. ssh:work (fido2 only)
        #[arg(long)]
        application: Option<String>,

        /// Passphrase for software keys
        #[arg(long, conflicts_with = "no_passphrase")]
        passphrase: Option<String>,

        /// Create a software key without a passphrase
        #[arg(long)]
        no_passphrase: bool,

        /// KDF rounds for software keys
        #[arg(long, default_value_t = DEFAULT_ROUNDS)]
        rounds: u32,
    },

    /// List tracked keys
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Print a key's public key
    Pubkey {
        /// Name of the key
        name: String,

        /// Print the SHA256 fingerprint instead
        #[arg(long)]
        fingerprint: bool,
    },

    /// Delete a key's files and manifest entry
    Delete {
        /// Name of the key
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Print an ssh_config block for a key
    SshConfig {
        /// Name of the key
        name: String,

        /// Host pattern for the block
        #[arg(long)]
        host: String,
    },

    /// Compare the manifest with the key directory
    ///
    /// Exits with status 1 when drift is found.
    Scan {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Repair drift between the manifest and the key directory
    ///
    /// Examples:
    ///   keyward repair --import              # track untracked key pairs
    ///   keyward repair --prune-missing --yes # drop entries whose files are gone
    Repair {
        /// Add manifest entries for untracked key pairs
        #[arg(long)]
        import: bool,

        /// Remove entries whose key files are missing
        #[arg(long)]
        prune_missing: bool,

        /// Remove entries whose paths point outside the key directory
        #[arg(long)]
        prune_invalid: bool,

        /// Confirm destructive repairs without prompting
        #[arg(short, long)]
        yes: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Download resident keys from the authenticator and track them
    ResidentImport {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Export the manifest
    Export {
        #[arg(long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   keyward completions bash > ~/.local/share/bash-completion/completions/keyward
    ///   keyward completions zsh > ~/.zfunc/_keyward
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
