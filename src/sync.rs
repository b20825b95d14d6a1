// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Symlink synchronization engine.
//!
//! The synchronizer exposes tracked files of the dotfile repository at
//! equivalent paths under the home directory through symbolic links.
//!
//! # Root Reduction
//!
//! Linking every tracked leaf file separately would litter the home directory
//! with hundreds of links, and force link maintenance on every file added
//! below an already linked directory. Instead, tracked paths get reduced to
//! their first path segment, called a __root entry__. A root entry is the
//! unit of linking: tracking `config/app.toml` and `config/theme.toml`
//! produces the single link `~/config -> <work tree>/config`. Repository
//! housekeeping files (ignore file, readme variants) never become links.
//!
//! # Conflict Policy
//!
//! A home directory entry that already exists, and is not recognized as one
//! of our own links, belongs to the user. The synchronizer never clobbers it
//! silently. The [`OverwritePolicy`] asks its decision source what to do, and
//! remembers blanket "always" or "skip the rest" answers for the remainder of
//! the run. The policy is a plain value owned by the caller, so scripted
//! decision sources slot in for tests.
//!
//! # Failure Isolation
//!
//! Every planned link stands alone. A link that cannot be created gets logged
//! with both paths and skipped, and the batch carries on. A single bad entry
//! never aborts a sync.

use crate::path::rebase;

use inquire::Select;
use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Root entries that never become links.
pub const EXCLUDED_ROOTS: [&str; 3] = [".gitignore", "README.md", "README"];

/// Reduce tracked paths to their set of root entries.
///
/// Each path is trimmed of surrounding whitespace, and cut at its first path
/// separator. A path with no separator is its own root entry. A path whose
/// first segment is empty (leading separator) falls back to the whole trimmed
/// string. The empty string and [`EXCLUDED_ROOTS`] never appear in the
/// result.
pub fn reduce_roots(paths: impl IntoIterator<Item = impl AsRef<str>>) -> HashSet<String> {
    let mut roots = HashSet::new();
    for path in paths {
        let trimmed = path.as_ref().trim();
        let root = match trimmed.split_once('/') {
            Some(("", _)) => trimmed,
            Some((first, _)) => first,
            None => trimmed,
        };
        roots.insert(root.to_string());
    }

    roots.remove("");
    for excluded in EXCLUDED_ROOTS {
        roots.remove(excluded);
    }

    roots
}

/// One planned symbolic link from the home directory into the working tree.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SymlinkPlan {
    /// Absolute path of the root entry inside the working tree.
    pub target: PathBuf,

    /// Absolute path the link should occupy inside the home directory.
    pub link: PathBuf,
}

/// Construct link plans for a set of root entries.
///
/// The link path is the target path rebased from the working tree onto the
/// home directory through structured prefix comparison. Parent directories of
/// link paths are assumed to exist already.
pub fn plan_links(
    roots: impl IntoIterator<Item = impl AsRef<str>>,
    work_dir: impl AsRef<Path>,
    home_dir: impl AsRef<Path>,
) -> Vec<SymlinkPlan> {
    let mut plans = Vec::new();
    for root in roots {
        let target = work_dir.as_ref().join(root.as_ref());
        match rebase(&target, work_dir.as_ref(), home_dir.as_ref()) {
            Ok(link) => plans.push(SymlinkPlan { target, link }),
            Err(err) => warn!("cannot plan link for {:?}: {err}", target.display()),
        }
    }

    // INVARIANT: Stable plan order for reproducible logs and prompts.
    plans.sort();

    plans
}

/// Operator's answer to one link conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverwriteChoice {
    /// Overwrite this entry only.
    Yes,

    /// Overwrite this entry, and every later conflict in the run.
    Always,

    /// Keep this entry, and every later conflict in the run.
    Skip,

    /// Keep this entry only.
    No,
}

/// Source of conflict decisions.
///
/// Model ways to ask the operator whether an existing home directory entry
/// may be replaced by a link.
pub trait OverwritePrompt {
    /// Ask whether `link` may be replaced by a link to `target`.
    fn ask(&mut self, link: &Path, target: &Path) -> OverwriteChoice;
}

/// Conflict decisions through an interactive terminal.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl ConsolePrompt {
    /// Construct new console prompt.
    pub fn new() -> Self {
        Self
    }
}

impl OverwritePrompt for ConsolePrompt {
    /// Ask the operator on the terminal.
    ///
    /// A cancelled or failed prompt counts as a one-time "no".
    fn ask(&mut self, link: &Path, target: &Path) -> OverwriteChoice {
        let message = format!(
            "{} exists and is not a link into {}. Overwrite it?",
            link.display(),
            target.display()
        );
        match Select::new(message.as_str(), vec!["yes", "always", "skip", "no"]).prompt() {
            Ok("yes") => OverwriteChoice::Yes,
            Ok("always") => OverwriteChoice::Always,
            Ok("skip") => OverwriteChoice::Skip,
            _ => OverwriteChoice::No,
        }
    }
}

/// Sticky conflict policy for one synchronizer run.
///
/// # Invariant
///
/// - Once "always" has been answered, no further prompts are issued, and
///   every later conflict is granted.
/// - Once "skip" has been answered, no further prompts are issued, and every
///   later conflict is denied.
#[derive(Debug)]
pub struct OverwritePolicy<P = ConsolePrompt>
where
    P: OverwritePrompt,
{
    always: bool,
    never: bool,
    prompt: P,
}

impl OverwritePolicy {
    /// Construct new policy backed by the interactive terminal.
    pub fn interactive() -> Self {
        Self::new(ConsolePrompt::new())
    }
}

impl<P> OverwritePolicy<P>
where
    P: OverwritePrompt,
{
    /// Construct new policy backed by the given decision source.
    pub fn new(prompt: P) -> Self {
        Self {
            always: false,
            never: false,
            prompt,
        }
    }

    fn grants(&mut self, link: &Path, target: &Path) -> bool {
        if self.never {
            debug!("skip {:?}: overwrites denied for this run", link.display());
            return false;
        }

        if self.always {
            return true;
        }

        match self.prompt.ask(link, target) {
            OverwriteChoice::Yes => true,
            OverwriteChoice::Always => {
                self.always = true;
                true
            }
            OverwriteChoice::Skip => {
                self.never = true;
                false
            }
            OverwriteChoice::No => false,
        }
    }
}

/// Outcome counts of one synchronization pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Links newly created.
    pub created: usize,

    /// Entries recognized as already linked into the working tree.
    pub already_linked: usize,

    /// Conflicting entries replaced with links after a policy grant.
    pub replaced: usize,

    /// Conflicting entries kept after a policy denial.
    pub declined: usize,

    /// Entries skipped because of filesystem failures.
    pub failed: usize,
}

impl LinkReport {
    /// Number of filesystem mutations performed by the pass.
    pub fn mutations(&self) -> usize {
        self.created + self.replaced
    }
}

enum LinkOutcome {
    Created,
    AlreadyLinked,
    Replaced,
    Declined,
}

/// The symlink synchronization engine.
///
/// Funnel for both entry points: a __full sync__ feeds it every tracked path
/// at the branch tip, an __incremental sync__ feeds it only the paths touched
/// by the latest commit. Either way the pipeline is the same: root reduction,
/// plan construction, then independent per-plan link creation.
#[derive(Debug)]
pub struct Synchronizer<P = ConsolePrompt>
where
    P: OverwritePrompt,
{
    work_dir: PathBuf,
    home_dir: PathBuf,
    policy: OverwritePolicy<P>,
}

impl<P> Synchronizer<P>
where
    P: OverwritePrompt,
{
    /// Construct new synchronizer between a working tree and a home
    /// directory.
    pub fn new(
        work_dir: impl Into<PathBuf>,
        home_dir: impl Into<PathBuf>,
        policy: OverwritePolicy<P>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            home_dir: home_dir.into(),
            policy,
        }
    }

    /// Link the root entries of the given tracked paths into the home
    /// directory.
    ///
    /// Never fails as a batch. Individual link failures are logged with both
    /// paths and counted in the returned report.
    #[instrument(skip(self, paths), level = "debug")]
    pub fn link_tracked(&mut self, paths: impl IntoIterator<Item = impl AsRef<str>>) -> LinkReport {
        let roots = reduce_roots(paths);
        let plans = plan_links(&roots, &self.work_dir, &self.home_dir);

        let mut report = LinkReport::default();
        for plan in plans {
            match self.link_one(&plan) {
                Ok(LinkOutcome::Created) => {
                    info!("linked {:?} -> {:?}", plan.link.display(), plan.target.display());
                    report.created += 1;
                }
                Ok(LinkOutcome::AlreadyLinked) => report.already_linked += 1,
                Ok(LinkOutcome::Replaced) => {
                    info!(
                        "replaced {:?} with link to {:?}",
                        plan.link.display(),
                        plan.target.display()
                    );
                    report.replaced += 1;
                }
                Ok(LinkOutcome::Declined) => report.declined += 1,
                Err(err) => {
                    warn!(
                        "cannot link {:?} -> {:?}: {err}",
                        plan.link.display(),
                        plan.target.display()
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    fn link_one(&mut self, plan: &SymlinkPlan) -> io::Result<LinkOutcome> {
        // INVARIANT: Probe without following, so dangling links still count
        // as existing entries.
        if fs::symlink_metadata(&plan.link).is_err() {
            make_symlink(&plan.target, &plan.link)?;
            return Ok(LinkOutcome::Created);
        }

        if let Ok(existing) = fs::read_link(&plan.link) {
            if existing.starts_with(&self.work_dir) {
                return Ok(LinkOutcome::AlreadyLinked);
            }
        }

        if !self.policy.grants(&plan.link, &plan.target) {
            return Ok(LinkOutcome::Declined);
        }

        remove_entry(&plan.link)?;
        make_symlink(&plan.target, &plan.link)?;

        Ok(LinkOutcome::Replaced)
    }
}

fn remove_entry(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}
#[cfg(not(unix))]
fn make_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::other(
        "symbolic links are unsupported on this operating system",
    ))
}
