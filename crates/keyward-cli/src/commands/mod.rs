//! Command implementations for keyward-cli

pub mod create;
pub mod delete;
pub mod doctor;
pub mod export;
pub mod init;
pub mod list;
pub mod scan;

pub use create::{CreateArgs, run_create};
pub use delete::run_delete;
pub use doctor::run_doctor;
pub use export::run_export;
pub use init::{run_info, run_init, run_version};
pub use list::{run_list, run_pubkey, run_ssh_config};
pub use scan::{RepairArgs, run_repair, run_resident_import, run_scan};

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> crate::error::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
