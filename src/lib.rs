// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Homelink keeps a version-controlled directory of dotfiles overlaid onto
//! the user's home directory.
//!
//! # The Overlay
//!
//! Every top-level entry of the repository's working tree gets exposed at the
//! equivalent path under the home directory as a symbolic link. A directory
//! like `config/` tracked in the repository becomes a single `~/config`
//! symlink rather than one link per leaf file. The overlay maintains itself:
//! homelink chains into the repository's `post-commit` and `post-merge`
//! hooks, so every commit or merge re-synchronizes whatever that commit
//! touched.
//!
//! # Crate Layout
//!
//! - [`sync`] — the symlink synchronization engine: root reduction, link
//!   planning, and the interactive conflict policy.
//! - [`repo`] — tracked-path listings pulled out of the Git repository.
//! - [`hook`] — hook chaining, dispatcher generation, and interpreter
//!   pinning for the installer.
//! - [`clean`] — removal of dangling overlay links left behind by deleted
//!   tracked files.
//! - [`path`] — home directory discovery and path rebasing.
//!
//! Homelink only works on operating systems with real symbolic link
//! semantics. See [`path::ensure_symlink_support`].

pub mod clean;
pub mod hook;
pub mod path;
pub mod repo;
pub mod sync;
