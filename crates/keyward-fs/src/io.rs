//! Atomic I/O operations with file locking
//!
//! Every write goes to a sibling temp file that is flushed and then renamed
//! over the target, so readers observe either the previous or the new
//! content and never a partial write. Written files are owner-only (`0600`).
//! Writers of private data ([`write_private_json`]) also tighten the parent
//! directory to `0700` where the platform supports it; other writes leave
//! the parent's mode alone.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::ExponentialBackoff;
use fs2::FileExt;
use serde::Serialize;

use crate::{Error, Result};

/// Permissions applied to every file written through this module.
pub const FILE_MODE: u32 = 0o600;

/// Permissions applied to the directory holding a written file.
pub const DIR_MODE: u32 = 0o700;

/// Tuning knobs for [`write_atomic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// How long to keep retrying the advisory lock before giving up.
    pub lock_timeout: Duration,
    /// Whether to fsync the temp file before renaming it into place.
    pub enable_fsync: bool,
    /// Whether to restrict the parent directory to [`DIR_MODE`].
    pub tighten_parent: bool,
}

impl RobustnessConfig {
    /// Defaults plus an owner-only parent directory.
    pub fn private() -> Self {
        Self {
            tighten_parent: true,
            ..Self::default()
        }
    }
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            enable_fsync: true,
            tighten_parent: false,
        }
    }
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// An advisory lock on a hidden sibling `.<name>.lock` file serialises
/// concurrent writers of the same target.
pub fn write_atomic(path: &Path, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidPath {
            path: path.to_path_buf(),
            reason: "path has no file name".into(),
        })?
        .to_string_lossy()
        .into_owned();
    let parent = parent_dir(path);

    fs::create_dir_all(&parent).map_err(|e| Error::io(&parent, e))?;
    if config.tighten_parent {
        tighten_permissions(&parent, DIR_MODE);
    }

    let lock_path = parent.join(format!(".{file_name}.lock"));
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| Error::io(&lock_path, e))?;
    acquire_lock(&lock_file, path, config.lock_timeout)?;

    let temp_path = parent.join(format!(".{file_name}.{}.tmp", std::process::id()));
    let result = write_then_rename(&temp_path, path, content, config.enable_fsync);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    // Lock is also released when lock_file is dropped
    let _ = FileExt::unlock(&lock_file);

    if result.is_ok() {
        tracing::debug!(path = %path.display(), bytes = content.len(), "atomic write complete");
    }
    result
}

/// Write text content to a file atomically with default robustness settings.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes(), RobustnessConfig::default())
}

/// Serialize `value` as pretty JSON (with a trailing newline) and write it atomically.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, json_bytes(path, value)?.as_bytes(), RobustnessConfig::default())
}

/// [`write_json`] for private data: the parent directory is made owner-only.
pub fn write_private_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, json_bytes(path, value)?.as_bytes(), RobustnessConfig::private())
}

fn json_bytes<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<String> {
    let mut content = serde_json::to_string_pretty(value).map_err(|e| Error::Serialize {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    content.push('\n');
    Ok(content)
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Read text content, returning `None` when the file does not exist.
///
/// Reads directly instead of checking existence first, so a file removed
/// between the check and the read cannot turn into a spurious error.
pub fn read_optional_text(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Create `dir` (and parents) and restrict it to its owner, best effort.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    tighten_permissions(dir, DIR_MODE);
    Ok(())
}

/// Set unix permission bits on `path`, logging instead of failing.
///
/// No-op on platforms without unix permissions.
pub fn tighten_permissions(path: &Path, mode: u32) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
            tracing::warn!(path = %path.display(), error = %e, "could not tighten permissions");
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn acquire_lock(lock_file: &File, target: &Path, timeout: Duration) -> Result<()> {
    let policy = ExponentialBackoff {
        current_interval: Duration::from_millis(10),
        initial_interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(250),
        max_elapsed_time: Some(timeout),
        ..ExponentialBackoff::default()
    };

    backoff::retry(policy, || {
        FileExt::try_lock_exclusive(lock_file).map_err(backoff::Error::transient)
    })
    .map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })
}

fn write_then_rename(temp_path: &Path, target: &Path, content: &[u8], fsync: bool) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }

    let mut temp_file = options
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;
    // A stale temp file from a crashed run keeps its old mode; reset it
    tighten_permissions(temp_path, FILE_MODE);

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    if fsync {
        temp_file
            .sync_all()
            .map_err(|e| Error::io(temp_path, e))?;
    }
    drop(temp_file);

    fs::rename(temp_path, target).map_err(|e| Error::io(target, e))?;
    Ok(())
}
