//! Shared test utilities for the keyward workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`keydir`]: [`TestKeyDir`](keydir::TestKeyDir), a scratch key directory with
//!   manifest and config locations beside it
//! - [`keys`]: well-formed OpenSSH public key lines

pub mod keydir;
pub mod keys;

pub use keydir::TestKeyDir;
