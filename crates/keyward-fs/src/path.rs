//! Lenient path resolution
//!
//! [`resolve_lenient`] behaves like a non-strict `realpath`: components that
//! exist are resolved through symlinks, components that do not exist are
//! appended as-is, and `..` is applied to whatever has been resolved so far.
//! The target never has to exist.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Upper bound on symlinks followed in a single resolution (matches Linux `MAXSYMLINKS`).
const MAX_SYMLINK_HOPS: usize = 40;

/// Expand a leading `~` component to the current user's home directory.
///
/// `~user` forms are not supported and are returned unchanged, as is any
/// path when the home directory cannot be determined.
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) if components.as_path().as_os_str().is_empty() => home,
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

#[derive(Debug)]
enum Step {
    Parent,
    Name(OsString),
}

fn steps(path: &Path) -> impl Iterator<Item = Step> + '_ {
    path.components().filter_map(|component| match component {
        Component::Normal(name) => Some(Step::Name(name.to_os_string())),
        Component::ParentDir => Some(Step::Parent),
        _ => None,
    })
}

/// The prefix and root of an absolute path (`/` on unix, `C:\` on Windows).
fn anchor(path: &Path) -> PathBuf {
    path.components()
        .take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
        .collect()
}

/// Resolve `path` to an absolute, symlink-free form without requiring it to exist.
///
/// Relative paths are taken relative to the current working directory.
///
/// # Errors
///
/// Returns [`Error::SymlinkLoop`] when more than 40 symlinks are followed,
/// and an I/O error when the working directory or a symlink target cannot
/// be read.
pub fn resolve_lenient(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::io(path, e))?
            .join(path)
    };

    let mut resolved = anchor(&absolute);
    let mut remaining: VecDeque<Step> = steps(&absolute).collect();
    let mut hops = 0usize;

    while let Some(step) = remaining.pop_front() {
        let name = match step {
            Step::Parent => {
                resolved.pop();
                continue;
            }
            Step::Name(name) => name,
        };

        let candidate = resolved.join(&name);
        let is_symlink = fs::symlink_metadata(&candidate)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);

        if !is_symlink {
            resolved = candidate;
            continue;
        }

        hops += 1;
        if hops > MAX_SYMLINK_HOPS {
            return Err(Error::SymlinkLoop {
                path: path.to_path_buf(),
            });
        }

        let target = fs::read_link(&candidate).map_err(|e| Error::io(&candidate, e))?;
        if target.is_absolute() {
            resolved = anchor(&target);
        }
        for step in steps(&target).collect::<Vec<_>>().into_iter().rev() {
            remaining.push_front(step);
        }
    }

    Ok(dunce::simplified(&resolved).to_path_buf())
}
