// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dangling overlay link cleanup.
//!
//! Deleting a tracked file from the repository leaves its overlay link in the
//! home directory pointing at nothing. [`clean_home`] sweeps those up: one
//! pass over the entries directly under the home directory, deleting every
//! dotted symlink whose resolved target no longer exists. Non-dotted entries,
//! non-symlinks, and anything nested deeper than one level are never touched.

use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Remove dangling dotted symlinks directly under the home directory.
///
/// Returns the number of links removed. Entries that cannot be inspected or
/// removed are logged and skipped.
///
/// # Errors
///
/// - Return [`CleanError::ReadHome`] if the home directory itself cannot be
///   listed.
#[instrument(level = "debug")]
pub fn clean_home(home_dir: &Path) -> Result<usize> {
    let entries = fs::read_dir(home_dir).map_err(|err| CleanError::ReadHome {
        source: err,
        home_dir: home_dir.to_path_buf(),
    })?;

    let mut removed = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("cannot inspect entry under {:?}: {err}", home_dir.display());
                continue;
            }
        };

        if !entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        let is_symlink = entry
            .file_type()
            .map(|kind| kind.is_symlink())
            .unwrap_or(false);
        if !is_symlink {
            continue;
        }

        // INVARIANT: `exists` follows the link, so a dead target reports
        // false while the link entry itself is still there.
        let path = entry.path();
        if path.exists() {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                info!("removed dangling link {:?}", path.display());
                removed += 1;
            }
            Err(err) => warn!("cannot remove dangling link {:?}: {err}", path.display()),
        }
    }

    Ok(removed)
}

/// Cleanup error types.
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    /// Home directory cannot be listed.
    #[error("failed to list home directory at {:?}", home_dir.display())]
    ReadHome {
        #[source]
        source: std::io::Error,
        home_dir: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = CleanError> = std::result::Result<T, E>;
