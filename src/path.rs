// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::{Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if home directory path cannot be
///   determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(PathError::NoWayHome)
}

/// Rebase path from one root directory onto another.
///
/// Strips `old_root` off the front of `path`, and joins whatever remains onto
/// `new_root`. Operates on path components rather than raw strings, so an
/// unrelated path that merely _contains_ `old_root` as a substring can never
/// be rewritten by accident.
///
/// # Errors
///
/// - Return [`PathError::OutsideRoot`] if `path` does not live under
///   `old_root`.
pub fn rebase(
    path: impl AsRef<Path>,
    old_root: impl AsRef<Path>,
    new_root: impl AsRef<Path>,
) -> Result<PathBuf> {
    let relative = path
        .as_ref()
        .strip_prefix(old_root.as_ref())
        .map_err(|_| PathError::OutsideRoot {
            path: path.as_ref().to_path_buf(),
            root: old_root.as_ref().to_path_buf(),
        })?;

    Ok(new_root.as_ref().join(relative))
}

/// Verify that the host operating system has usable symbolic links.
///
/// Homelink's entire overlay strategy rests on symlinks behaving like Unix
/// symlinks. Windows gates symlink creation behind privileges and treats
/// directory links specially, so it is refused outright.
///
/// # Errors
///
/// - Return [`PathError::UnsupportedOs`] when symbolic links cannot be relied
///   upon.
pub fn ensure_symlink_support() -> Result<()> {
    if cfg!(unix) {
        Ok(())
    } else {
        Err(PathError::UnsupportedOs {
            os: std::env::consts::OS,
        })
    }
}

/// Path resolution error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PathError {
    /// Home directory path cannot be determined.
    #[error("cannot determine absolute path to user's home directory")]
    NoWayHome,

    /// Path cannot be rebased, because it lives outside the old root.
    #[error("path {:?} lives outside of root {:?}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Host operating system lacks reliable symbolic link semantics.
    #[error("operating system {os:?} lacks reliable symbolic link support")]
    UnsupportedOs { os: &'static str },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
