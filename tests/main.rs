// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use homelink::{
    hook::{Installer, HOOK_INVOCATION, HOOK_NAMES},
    repo::{GitRepo, TrackedSource},
    sync::{OverwriteChoice, OverwritePolicy, OverwritePrompt, Synchronizer},
};

use anyhow::Result;
use git2::{Repository, RepositoryInitOptions};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

pub(crate) struct RepoFixture {
    repo: Repository,
}

impl RepoFixture {
    pub(crate) fn new(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(path.as_ref(), &opts)?;

        // INVARIANT: Always provide valid name and email.
        //   - Git will complain if this is not set in CI/CD environments.
        let mut config = repo.config()?;
        config.set_str("user.name", "John Doe")?;
        config.set_str("user.email", "john@doe.com")?;

        Ok(Self { repo })
    }

    pub(crate) fn commit_file(
        &self,
        filename: impl AsRef<Path>,
        contents: impl AsRef<str>,
    ) -> Result<()> {
        let workdir = self.repo.workdir().expect("fixture repository is not bare");
        let full_path = workdir.join(filename.as_ref());
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, contents.as_ref())?;

        let mut index = self.repo.index()?;
        index.add_path(filename.as_ref())?;
        index.write()?;
        self.commit_index(format!("chore: add {:?}", filename.as_ref()))
    }

    pub(crate) fn commit_removal(&self, filename: impl AsRef<Path>) -> Result<()> {
        let workdir = self.repo.workdir().expect("fixture repository is not bare");
        fs::remove_file(workdir.join(filename.as_ref()))?;

        let mut index = self.repo.index()?;
        index.remove_path(filename.as_ref())?;
        index.write()?;
        self.commit_index(format!("chore: remove {:?}", filename.as_ref()))
    }

    fn commit_index(&self, message: String) -> Result<()> {
        // INVARIANT: Always use new tree produced by index after staging.
        let mut index = self.repo.index()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        // INVARIANT: Always determine latest parent commits to append to.
        let signature = self.repo.signature()?;
        let mut parents = Vec::new();
        if let Some(parent) = self.repo.head().ok().and_then(|head| head.target()) {
            parents.push(self.repo.find_commit(parent)?);
        }
        let parents = parents.iter().collect::<Vec<_>>();

        self.repo
            .commit(Some("HEAD"), &signature, &signature, &message, &tree, &parents)?;

        Ok(())
    }
}

struct ScriptedPrompt(Vec<OverwriteChoice>);

impl OverwritePrompt for ScriptedPrompt {
    fn ask(&mut self, _link: &Path, _target: &Path) -> OverwriteChoice {
        if self.0.is_empty() {
            OverwriteChoice::No
        } else {
            self.0.remove(0)
        }
    }
}

fn to_set(entries: Vec<String>) -> HashSet<String> {
    entries.into_iter().collect()
}

fn expect_set(entries: &[&str]) -> HashSet<String> {
    entries.iter().map(ToString::to_string).collect()
}

fn repo_dir() -> Result<PathBuf> {
    let dir = std::env::current_dir()?.join("dotfiles");
    fs::create_dir_all(&dir)?;

    Ok(dir)
}

#[sealed_test]
fn tracked_at_head_lists_every_committed_file() -> Result<()> {
    let dir = repo_dir()?;
    let fixture = RepoFixture::new(&dir)?;
    fixture.commit_file("config/app.toml", "blah")?;
    fixture.commit_file("config/theme.toml", "blah")?;
    fixture.commit_file(".vimrc", "set nocompatible")?;

    let repo = GitRepo::open(&dir)?;
    let tracked = to_set(repo.tracked_at_head()?);

    assert_eq!(
        tracked,
        expect_set(&["config/app.toml", "config/theme.toml", ".vimrc"])
    );

    Ok(())
}

#[sealed_test]
fn tracked_at_head_of_empty_repository_is_empty() -> Result<()> {
    let dir = repo_dir()?;
    let _fixture = RepoFixture::new(&dir)?;

    let repo = GitRepo::open(&dir)?;

    assert!(repo.tracked_at_head()?.is_empty());
    assert!(repo.changed_in_latest_commit()?.is_empty());

    Ok(())
}

#[sealed_test]
fn changed_in_latest_commit_only_reports_the_tip() -> Result<()> {
    let dir = repo_dir()?;
    let fixture = RepoFixture::new(&dir)?;
    fixture.commit_file("config/app.toml", "blah")?;
    fixture.commit_file(".vimrc", "set nocompatible")?;

    let repo = GitRepo::open(&dir)?;
    let changed = to_set(repo.changed_in_latest_commit()?);

    assert_eq!(changed, expect_set(&[".vimrc"]));

    Ok(())
}

#[sealed_test]
fn changed_in_latest_commit_on_root_commit_reports_everything() -> Result<()> {
    let dir = repo_dir()?;
    let fixture = RepoFixture::new(&dir)?;
    fixture.commit_file("config/app.toml", "blah")?;

    let repo = GitRepo::open(&dir)?;
    let changed = to_set(repo.changed_in_latest_commit()?);

    assert_eq!(changed, expect_set(&["config/app.toml"]));

    Ok(())
}

#[sealed_test]
fn changed_in_latest_commit_reports_deletions() -> Result<()> {
    let dir = repo_dir()?;
    let fixture = RepoFixture::new(&dir)?;
    fixture.commit_file("config/app.toml", "blah")?;
    fixture.commit_file("config/theme.toml", "blah")?;
    fixture.commit_removal("config/theme.toml")?;

    let repo = GitRepo::open(&dir)?;
    let changed = to_set(repo.changed_in_latest_commit()?);

    assert_eq!(changed, expect_set(&["config/theme.toml"]));

    Ok(())
}

#[sealed_test]
fn full_sync_then_incremental_sync_maintains_overlay() -> Result<()> {
    let dir = repo_dir()?;
    let home_dir = std::env::current_dir()?.join("home");
    fs::create_dir_all(&home_dir)?;
    let fixture = RepoFixture::new(&dir)?;
    fixture.commit_file("config/app.toml", "blah")?;
    fixture.commit_file(".vimrc", "set nocompatible")?;
    fixture.commit_file("README", "docs never get linked")?;

    let repo = GitRepo::open(&dir)?;

    // Full sync: adopt everything tracked at the tip.
    let mut sync = Synchronizer::new(
        repo.work_dir(),
        &home_dir,
        OverwritePolicy::new(ScriptedPrompt(Vec::new())),
    );
    let report = sync.link_tracked(repo.tracked_at_head()?);
    assert_eq!(report.created, 2);
    assert_eq!(
        fs::read_link(home_dir.join("config"))?,
        repo.work_dir().join("config")
    );
    assert_eq!(
        fs::read_link(home_dir.join(".vimrc"))?,
        repo.work_dir().join(".vimrc")
    );
    assert!(fs::symlink_metadata(home_dir.join("README")).is_err());

    // Incremental sync after a commit: only the new root entry gets linked.
    fixture.commit_file(".bashrc", "export BLAH=1")?;
    let report = sync.link_tracked(repo.changed_in_latest_commit()?);
    assert_eq!(report.created, 1);
    assert_eq!(report.mutations(), 1);
    assert_eq!(
        fs::read_link(home_dir.join(".bashrc"))?,
        repo.work_dir().join(".bashrc")
    );

    // Re-running the full sync mutates nothing.
    let report = sync.link_tracked(repo.tracked_at_head()?);
    assert_eq!(report.mutations(), 0);

    Ok(())
}

#[sealed_test]
fn install_hooks_into_real_repository_is_idempotent() -> Result<()> {
    let dir = repo_dir()?;
    let _fixture = RepoFixture::new(&dir)?;
    let repo = GitRepo::open(&dir)?;
    let installer = Installer::new(repo.hooks_dir(), "/usr/local/bin/homelink");

    installer.install_hooks()?;
    installer.install_hooks()?;

    for name in HOOK_NAMES {
        let content = fs::read_to_string(repo.hooks_dir().join(name))?;
        let count = content
            .lines()
            .filter(|line| line.trim() == HOOK_INVOCATION)
            .count();
        assert_eq!(count, 1, "{name} must carry exactly one invocation line");
    }

    Ok(())
}
