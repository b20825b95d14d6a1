// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tracked-path listings out of the dotfile repository.
//!
//! The synchronizer does not care where its path listings come from. It only
//! needs two answers from the version control system: "which files does the
//! tip of the current branch track?" for a full sync, and "which files did
//! the latest commit touch?" for the incremental sync fired by hooks. The
//! [`TrackedSource`] trait models exactly those two questions, so the
//! synchronizer stays testable against fixed listings without ever spawning
//! a real repository.
//!
//! [`GitRepo`] is the production implementation on top of libgit2.

use git2::{Delta, DiffOptions, ObjectType, Repository};
use std::{
    collections::VecDeque,
    ffi::OsStr,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Source of tracked path listings.
///
/// Produces the relative paths the synchronizer reduces into root entries.
pub trait TrackedSource {
    /// List every file tracked at the tip of the current branch.
    fn tracked_at_head(&self) -> Result<Vec<String>>;

    /// List the files touched by the most recent commit.
    fn changed_in_latest_commit(&self) -> Result<Vec<String>>;

    /// Absolute path to the working tree the listings are relative to.
    fn work_dir(&self) -> &Path;
}

/// Dotfile repository access through libgit2.
pub struct GitRepo {
    repository: Repository,
    work_dir: PathBuf,
}

impl GitRepo {
    /// Initialize a new non-bare repository at target path.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 operations fail.
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        debug!("initialize new repository at {:?}", path.as_ref().display());
        Self::from_repository(Repository::init(path.as_ref())?)
    }

    /// Open existing repository at target path.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if no repository exists at target path.
    /// - Return [`RepoError::NoWorkTree`] if repository is bare.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_repository(Repository::open(path.as_ref())?)
    }

    /// Open repository containing target path by walking up the tree.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if no repository contains target path.
    /// - Return [`RepoError::NoWorkTree`] if repository is bare.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_repository(Repository::discover(path.as_ref())?)
    }

    /// Check if target path already houses a repository.
    pub fn exists(path: impl AsRef<Path>) -> bool {
        Repository::open(path.as_ref()).is_ok()
    }

    /// Absolute path to the hook directory of this repository.
    pub fn hooks_dir(&self) -> PathBuf {
        self.repository.path().join("hooks")
    }

    fn from_repository(repository: Repository) -> Result<Self> {
        let work_dir = repository
            .workdir()
            .ok_or_else(|| RepoError::NoWorkTree {
                gitdir: repository.path().to_path_buf(),
            })?
            .to_path_buf();

        Ok(Self {
            repository,
            work_dir,
        })
    }

    fn is_empty(&self) -> bool {
        self.repository
            .head()
            .ok()
            .and_then(|head| head.target())
            .and_then(|oid| self.repository.find_commit(oid).ok())
            .is_none()
    }

    // Thank you Eric at https://www.hydrogen18.com/blog/list-all-files-git-repo-pygit2.html.
    fn list_head_paths(&self) -> Result<Vec<String>> {
        let mut entries = Vec::new();
        let commit = self.repository.head()?.peel_to_commit()?;
        let tree = commit.tree()?;
        let mut trees_and_paths = VecDeque::new();
        trees_and_paths.push_front((tree, PathBuf::new()));

        // Use DFS to traverse index tree.
        while let Some((tree, path)) = trees_and_paths.pop_front() {
            for tree_entry in &tree {
                match tree_entry.kind() {
                    // INVARIANT: Hit a tree? Traverse it!
                    Some(ObjectType::Tree) => {
                        let next_tree = self.repository.find_tree(tree_entry.id())?;
                        let next_path = path.join(bytes_to_path(tree_entry.name_bytes()));
                        trees_and_paths.push_front((next_tree, next_path));
                    }
                    // INVARIANT: Hit a blob? Record our current path!
                    Some(ObjectType::Blob) => {
                        let full_path = path.join(bytes_to_path(tree_entry.name_bytes()));
                        entries.push(full_path.to_string_lossy().into_owned());
                    }
                    _ => continue,
                }
            }
        }

        Ok(entries)
    }
}

impl TrackedSource for GitRepo {
    /// List every file tracked at the tip of the current branch.
    ///
    /// An unborn branch has nothing tracked yet, so it yields an empty
    /// listing rather than an error.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 operations fail.
    fn tracked_at_head(&self) -> Result<Vec<String>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        self.list_head_paths()
    }

    /// List the files touched by the most recent commit.
    ///
    /// Diffs the head commit against its first parent. A root commit has no
    /// parent, so every file it introduced counts as touched.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 operations fail.
    fn changed_in_latest_commit(&self) -> Result<Vec<String>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let commit = self.repository.head()?.peel_to_commit()?;
        if commit.parent_count() == 0 {
            return self.list_head_paths();
        }

        let parent_tree = commit.parent(0)?.tree()?;
        let head_tree = commit.tree()?;
        let mut opts = DiffOptions::new();
        opts.context_lines(0);
        let diff = self.repository.diff_tree_to_tree(
            Some(&parent_tree),
            Some(&head_tree),
            Some(&mut opts),
        )?;

        let mut changed = Vec::new();
        diff.foreach(
            &mut |delta, _progress| {
                // INVARIANT: Deletions only carry an old-side path.
                let path = match delta.status() {
                    Delta::Deleted => delta.old_file().path(),
                    _ => delta.new_file().path(),
                };
                if let Some(path) = path {
                    changed.push(path.to_string_lossy().into_owned());
                }
                true
            },
            None,
            None,
            None,
        )?;

        Ok(changed)
    }

    fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

// Thanks from:
//
// https://github.com/rust-lang/git2-rs/blob/5bc3baa9694a94db2ca9cc256b5bce8a215f9013/
// src/util.rs#L85
#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> &Path {
    use std::os::unix::prelude::*;
    Path::new(OsStr::from_bytes(bytes))
}
#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> &Path {
    use std::str;
    Path::new(str::from_utf8(bytes).unwrap())
}

/// Repository access error types.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Repository has no working tree to overlay from.
    #[error("repository at {:?} is bare, so there is nothing to link from", gitdir.display())]
    NoWorkTree { gitdir: PathBuf },

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = RepoError> = std::result::Result<T, E>;
