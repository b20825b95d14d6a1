// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Hook chaining for the installer.
//!
//! Homelink keeps the overlay fresh by chaining into the repository's
//! `post-commit` and `post-merge` hooks. Chaining has to coexist with hooks
//! the user already has, so every install run classifies each hook file
//! fresh:
//!
//! - __absent__ — no hook file; a new shell script is written whole.
//! - __already installed__ — the file already carries our invocation line;
//!   nothing is done, so repeated installs never stack duplicate
//!   invocations.
//! - __shell appendable__ — the file is a shell script (`sh` or `bash`
//!   shebang, direct or through `env`); our invocation line is appended
//!   after the existing content.
//! - __foreign incompatible__ — the file uses some other interpreter; it is
//!   left untouched and noted in the log.
//!
//! The invocation line itself never changes. It execs a generated
//! __dispatcher__ script at a fixed path inside the hook directory, and the
//! dispatcher in turn runs the incremental sync through an
//! __interpreter-pinning wrapper__. Hooks run with a restricted `PATH`, so
//! when the homelink binary does not live in the system bin directory, the
//! wrapper prepends the binary's directory to `PATH` before delegating.
//! Later installs may regenerate the dispatcher and wrapper freely; the hook
//! files only ever reference them by name.

use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Hook names homelink chains into.
pub const HOOK_NAMES: [&str; 2] = ["post-commit", "post-merge"];

/// Name of the homelink binary as resolved through `PATH`.
pub const TOOL_NAME: &str = "homelink";

/// File name of the generated dispatcher script, named after the tool.
pub const DISPATCHER_NAME: &str = TOOL_NAME;

/// File name of the generated interpreter-pinning wrapper script.
pub const WRAPPER_NAME: &str = "homelink-env";

/// The signature invocation line appended to chained hooks.
pub const HOOK_INVOCATION: &str = r#"exec "$(dirname -- "$0")/homelink""#;

/// System-wide bin directory hooks can already reach through `PATH`.
const SYSTEM_BIN_DIR: &str = "/usr/local/bin";

/// Compatibility of an existing hook file with chaining.
///
/// Recomputed fresh on every install run; never persisted anywhere except as
/// the resulting hook file content on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookState {
    /// No hook file exists.
    Absent,

    /// Hook file already carries the invocation line.
    AlreadyInstalled,

    /// Hook file is a shell script the invocation line can be appended to.
    ShellAppendable,

    /// Hook file uses an unrecognized interpreter, and must be left alone.
    ForeignIncompatible,
}

/// Classify existing hook file content.
pub fn classify(content: &str) -> HookState {
    if content.lines().any(|line| line.trim() == HOOK_INVOCATION) {
        return HookState::AlreadyInstalled;
    }

    let shebang = content.lines().next().unwrap_or("");
    if is_shell_shebang(shebang) {
        HookState::ShellAppendable
    } else {
        HookState::ForeignIncompatible
    }
}

fn is_shell_shebang(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("#!") else {
        return false;
    };

    let mut words = rest.split_whitespace();
    let Some(first) = words.next() else {
        return false;
    };

    // INVARIANT: "#!/usr/bin/env bash" names the interpreter second.
    let interpreter = match Path::new(first).file_name().map(|name| name.to_string_lossy()) {
        Some(name) if name == "env" => match words.next() {
            Some(second) => second.to_string(),
            None => return false,
        },
        Some(name) => name.into_owned(),
        None => return false,
    };

    matches!(interpreter.as_str(), "sh" | "bash")
}

/// Hook installer.
///
/// Chains the invocation line into each hook, and generates the dispatcher
/// and interpreter-pinning wrapper scripts next to them. All generated files
/// are marked executable.
#[derive(Debug)]
pub struct Installer {
    hooks_dir: PathBuf,
    exe_path: PathBuf,
}

impl Installer {
    /// Construct new installer for a hook directory.
    ///
    /// `exe_path` is the absolute path of the running homelink binary, used
    /// to decide interpreter pinning.
    pub fn new(hooks_dir: impl Into<PathBuf>, exe_path: impl Into<PathBuf>) -> Self {
        Self {
            hooks_dir: hooks_dir.into(),
            exe_path: exe_path.into(),
        }
    }

    /// Chain hooks and generate the dispatcher and wrapper scripts.
    ///
    /// A hook file that cannot be read or written is logged and skipped; the
    /// other hook still gets chained.
    ///
    /// # Errors
    ///
    /// - Return [`HookError::WriteHook`] if the dispatcher or wrapper script
    ///   cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub fn install_hooks(&self) -> Result<()> {
        for name in HOOK_NAMES {
            if let Err(err) = self.chain_hook(name) {
                warn!("cannot chain hook {name}: {err}");
            }
        }

        self.write_executable(DISPATCHER_NAME, &dispatcher_script())?;
        self.write_executable(WRAPPER_NAME, &wrapper_script(&self.exe_path))?;

        Ok(())
    }

    fn chain_hook(&self, name: &str) -> Result<()> {
        let path = self.hooks_dir.join(name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                return Err(HookError::ReadHook {
                    source: err,
                    path,
                })
            }
        };

        let state = content.as_deref().map_or(HookState::Absent, classify);
        match state {
            HookState::Absent => {
                info!("write new hook {name}");
                self.write_executable(name, &format!("#!/bin/sh\n{HOOK_INVOCATION}\n"))?;
            }
            HookState::ShellAppendable => {
                info!("append invocation to existing hook {name}");
                let mut chained = content.unwrap_or_default();
                if !chained.ends_with('\n') {
                    chained.push('\n');
                }
                chained.push_str(HOOK_INVOCATION);
                chained.push('\n');
                self.write_executable(name, &chained)?;
            }
            HookState::AlreadyInstalled => info!("hook {name} already chained"),
            HookState::ForeignIncompatible => {
                info!("hook {name} uses an unrecognized interpreter, leaving it untouched");
            }
        }

        Ok(())
    }

    fn write_executable(&self, name: &str, content: &str) -> Result<()> {
        let path = self.hooks_dir.join(name);
        fs::write(&path, content).map_err(|err| HookError::WriteHook {
            source: err,
            path: path.clone(),
        })?;
        mark_executable(&path).map_err(|err| HookError::WriteHook { source: err, path })?;

        Ok(())
    }
}

/// Render the dispatcher script.
///
/// The dispatcher is what chained hooks exec. It delegates to the wrapper
/// with the incremental-sync subcommand.
pub fn dispatcher_script() -> String {
    format!("#!/bin/sh\nexec \"$(dirname -- \"$0\")/{WRAPPER_NAME}\" sync\n")
}

/// Render the interpreter-pinning wrapper script.
///
/// Hooks run with a restricted search path. When the running binary lives
/// outside the system bin directory, the wrapper prepends the binary's
/// directory to `PATH` so hook execution resolves the same binary as the
/// interactive session. Otherwise it delegates directly.
pub fn wrapper_script(exe_path: &Path) -> String {
    match exe_path.parent() {
        Some(dir) if dir != Path::new(SYSTEM_BIN_DIR) => format!(
            "#!/bin/sh\nPATH=\"{}:$PATH\"\nexport PATH\nexec {TOOL_NAME} \"$@\"\n",
            dir.display()
        ),
        _ => format!("#!/bin/sh\nexec {TOOL_NAME} \"$@\"\n"),
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}
#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Hook chaining error types.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Existing hook file cannot be read.
    #[error("failed to read hook file at {:?}", path.display())]
    ReadHook {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Hook file cannot be written.
    #[error("failed to write hook file at {:?}", path.display())]
    WriteHook {
        #[source]
        source: io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = HookError> = std::result::Result<T, E>;
