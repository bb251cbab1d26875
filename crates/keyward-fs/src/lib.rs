//! Filesystem layer for keyward
//!
//! Provides crash-safe (temp file + rename) writes with owner-only
//! permissions, and lenient path resolution that follows symlinks without
//! requiring the target to exist.

pub mod error;
pub mod io;
pub mod path;

pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::{expand_home, resolve_lenient};
