//! Repository Harvester: clones one repository and extracts the matching commits.
//!
//! Every failure inside a harvest is absorbed into an empty result: one
//! unreachable repository must not abort a scan of hundreds of others.
//! The scratch checkout is owned by a [`ScratchDir`] guard, so it is
//! removed on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use tracing::{debug, warn};

use crate::models::{AuthorIdentity, CommitRecord, Repository};
use crate::process::{CommandSpec, ProcessRunner, RunOptions};
use crate::scheduler::run_unbounded;

pub const CLONE_TIMEOUT: Duration = Duration::from_secs(120);
pub const LOG_TIMEOUT: Duration = Duration::from_secs(60);
/// Commit history of a busy repository can be large.
pub const LOG_MAX_OUTPUT: usize = 500 * 1024 * 1024;
pub const FIELD_DELIMITER: &str = "<|>";

const LOG_FORMAT: &str = "--format=%H<|>%s<|>%aI";

/// Removes its directory when dropped.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!("failed to remove scratch dir {}: {e}", self.path.display());
        }
    }
}

/// Outcome of harvesting one repository.
#[derive(Debug, Clone)]
pub struct RepoHarvest {
    pub repo: Repository,
    pub commits: Vec<CommitRecord>,
}

pub struct Harvester {
    runner: Arc<dyn ProcessRunner>,
    scratch_root: PathBuf,
    clone_timeout: Duration,
    log_timeout: Duration,
}

impl Harvester {
    pub fn new(runner: Arc<dyn ProcessRunner>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            scratch_root: scratch_root.into(),
            clone_timeout: CLONE_TIMEOUT,
            log_timeout: LOG_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, clone_timeout: Duration, log_timeout: Duration) -> Self {
        self.clone_timeout = clone_timeout;
        self.log_timeout = log_timeout;
        self
    }

    /// Checkout location for the repository in input position `slot`.
    ///
    /// The slot prefix keeps paths distinct even when two names sanitize to
    /// the same string (`.github` and `github`, say).
    pub fn scratch_path(&self, slot: usize, repo: &Repository) -> PathBuf {
        let dir_name: String = repo
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.scratch_root.join(format!("{slot:04}-{dir_name}"))
    }

    /// Harvests the commits in `repo` authored by any of `authors`.
    ///
    /// Concurrent harvests under one scratch root must use distinct slots.
    pub async fn harvest(
        &self,
        slot: usize,
        repo: &Repository,
        authors: &AuthorIdentity,
    ) -> Vec<CommitRecord> {
        let scratch = ScratchDir::new(self.scratch_path(slot, repo));
        let Some(dest) = scratch.path().to_str() else {
            warn!(
                "skipping {}: checkout path {} is not valid UTF-8",
                repo.name,
                scratch.path().display()
            );
            return Vec::new();
        };

        let clone = CommandSpec::new("git")
            .args(["clone", "--quiet", "--filter=blob:none"])
            .arg(repo.clone_url())
            .arg(dest);
        let options = RunOptions::default().with_timeout(self.clone_timeout);
        if let Err(e) = self.runner.run_async(&clone, &options).await {
            warn!("skipping {}: clone failed: {e}", repo.name);
            return Vec::new();
        }

        let log = CommandSpec::new("git")
            .args(["log", "--all", "--fixed-strings"])
            .args(authors.git_log_args())
            .arg(LOG_FORMAT);
        let options = RunOptions::default()
            .in_dir(scratch.path())
            .with_timeout(self.log_timeout)
            .with_max_output(LOG_MAX_OUTPUT);
        let output = match self.runner.run_async(&log, &options).await {
            Ok(output) => output,
            Err(e) => {
                warn!("skipping {}: log extraction failed: {e}", repo.name);
                return Vec::new();
            }
        };

        let commits = parse_log_output(&output, repo);
        debug!("{}: {} matching commits", repo.name, commits.len());
        commits
    }
}

/// Harvests every repository at once and returns the outcomes in `repos` order.
///
/// `on_done` is invoked as each repository finishes, in completion order.
pub async fn harvest_all<F>(
    harvester: Arc<Harvester>,
    repos: &[Repository],
    authors: &AuthorIdentity,
    on_done: F,
) -> Vec<RepoHarvest>
where
    F: Fn(&RepoHarvest) + Send + Sync + 'static,
{
    let on_done = Arc::new(on_done);
    let tasks: Vec<_> = repos
        .iter()
        .cloned()
        .enumerate()
        .map(|(slot, repo)| {
            let harvester = harvester.clone();
            let authors = authors.clone();
            let on_done = on_done.clone();
            move || async move {
                let commits = harvester.harvest(slot, &repo, &authors).await;
                let outcome = RepoHarvest { repo, commits };
                on_done(&outcome);
                outcome
            }
        })
        .collect();

    run_unbounded(tasks).await
}

/// Flattens per-repository outcomes into one collection, in input order.
pub fn merge(results: Vec<RepoHarvest>) -> Vec<CommitRecord> {
    results.into_iter().flat_map(|r| r.commits).collect()
}

/// Parses `git log` output written with [`LOG_FORMAT`].
///
/// The first field is the hash and the last the author date; anything in
/// between is the subject, so a subject containing the delimiter survives.
/// Lines with fewer than three fields or an unreadable date are dropped.
pub fn parse_log_output(output: &str, repo: &Repository) -> Vec<CommitRecord> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(FIELD_DELIMITER).collect();
            if parts.len() < 3 {
                debug!("{}: dropping malformed log line {line:?}", repo.name);
                return None;
            }
            let hash = parts[0];
            let raw_date = parts[parts.len() - 1];
            let message = parts[1..parts.len() - 1].join(FIELD_DELIMITER);

            let date = match DateTime::parse_from_rfc3339(raw_date) {
                Ok(date) => date,
                Err(e) => {
                    debug!("{}: dropping {hash}: bad date {raw_date:?}: {e}", repo.name);
                    return None;
                }
            };

            Some(CommitRecord {
                hash: hash.to_string(),
                message,
                date,
                repo_name: repo.name.clone(),
                repo_url: repo.url.clone(),
            })
        })
        .collect()
}
