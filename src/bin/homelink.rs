// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use homelink::{
    clean::clean_home,
    hook::Installer,
    path::{ensure_symlink_support, home_dir},
    repo::{GitRepo, TrackedSource},
    sync::{LinkReport, OverwritePolicy, Synchronizer},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use inquire::Confirm;
use std::{env, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  homelink <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        if let Command::Version = self.command {
            return run_version();
        }

        // INVARIANT: The overlay is symlinks or nothing. Abort before any
        // partial work on hosts without them.
        ensure_symlink_support()?;

        match self.command {
            Command::Init => run_init(),
            Command::Rehash => run_rehash(),
            Command::Sync => run_sync(),
            Command::Clean => run_clean(),
            Command::Version => unreachable!("handled above"),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Set up the dotfile repository and chain the synchronization hooks.
    #[command(override_usage = "homelink init")]
    Init,

    /// Relink every tracked file (manual recovery if a hook failed to fire).
    #[command(override_usage = "homelink rehash")]
    Rehash,

    /// Relink the files touched by the latest commit.
    ///
    /// This is the entry point the generated hooks invoke.
    #[command(hide = true)]
    Sync,

    /// Remove dangling overlay links from the home directory.
    #[command(override_usage = "homelink clean")]
    Clean,

    /// Print homelink and libgit2 versions.
    #[command(override_usage = "homelink version")]
    Version,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_init() -> Result<()> {
    let cwd = env::current_dir()?;
    let exe = env::current_exe()?;

    let repo = if GitRepo::exists(&cwd) {
        let repo = match GitRepo::open(&cwd) {
            Ok(repo) => repo,
            Err(err) => {
                warn!("cannot open repository at {:?}: {err}", cwd.display());
                return Ok(());
            }
        };

        // Adoption is the one sync that happens outside a hook. Declining it
        // only skips the immediate sync, not the hook chaining.
        let adopt = Confirm::new("existing repository found, adopt its tracked files into the overlay?")
            .with_default(true)
            .prompt()
            .unwrap_or(false);
        if adopt {
            if let Err(err) = full_sync(&repo) {
                warn!("adoption sync failed: {err}");
            }
        }

        repo
    } else {
        match GitRepo::init(&cwd) {
            Ok(repo) => repo,
            Err(err) => {
                warn!("cannot initialize repository at {:?}: {err}", cwd.display());
                return Ok(());
            }
        }
    };

    if let Err(err) = Installer::new(repo.hooks_dir(), exe).install_hooks() {
        warn!("hook installation incomplete: {err}");
    }

    Ok(())
}

fn run_rehash() -> Result<()> {
    let repo = match GitRepo::discover(env::current_dir()?) {
        Ok(repo) => repo,
        Err(err) => {
            warn!("no dotfile repository here: {err}");
            return Ok(());
        }
    };

    if let Err(err) = full_sync(&repo) {
        warn!("full sync failed: {err}");
    }

    Ok(())
}

fn run_sync() -> Result<()> {
    let repo = match GitRepo::discover(env::current_dir()?) {
        Ok(repo) => repo,
        Err(err) => {
            warn!("no dotfile repository here: {err}");
            return Ok(());
        }
    };

    let paths = match repo.changed_in_latest_commit() {
        Ok(paths) => paths,
        Err(err) => {
            warn!("cannot list files of latest commit: {err}");
            return Ok(());
        }
    };

    report_sync(link_into_home(&repo, paths)?);

    Ok(())
}

fn run_clean() -> Result<()> {
    match clean_home(&home_dir()?) {
        Ok(removed) => info!("removed {removed} dangling link(s)"),
        Err(err) => warn!("cleanup failed: {err}"),
    }

    Ok(())
}

fn run_version() -> Result<()> {
    let (major, minor, rev) = git2::Version::get().libgit2_version();
    println!("homelink {}", env!("CARGO_PKG_VERSION"));
    println!("libgit2 {major}.{minor}.{rev}");

    Ok(())
}

fn full_sync(repo: &GitRepo) -> Result<()> {
    let paths = repo.tracked_at_head()?;
    report_sync(link_into_home(repo, paths)?);

    Ok(())
}

fn link_into_home(repo: &GitRepo, paths: Vec<String>) -> Result<LinkReport> {
    let mut sync = Synchronizer::new(repo.work_dir(), home_dir()?, OverwritePolicy::interactive());

    Ok(sync.link_tracked(paths))
}

fn report_sync(report: LinkReport) {
    info!(
        "sync done: {} linked, {} already linked, {} replaced, {} declined, {} failed",
        report.created, report.already_linked, report.replaced, report.declined, report.failed
    );
}
