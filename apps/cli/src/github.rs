//! Listing calls against the `gh` and `git` CLIs.

use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::Repository;
use crate::process::{CommandSpec, ProcessRunner, RunOptions};

pub const REPO_LIST_LIMIT: u32 = 1000;

pub struct GitHub<'a> {
    runner: &'a dyn ProcessRunner,
}

impl<'a> GitHub<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self { runner }
    }

    fn gh<I, S>(&self, args: I) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner
            .run_sync(&CommandSpec::new("gh").args(args), &RunOptions::default())
    }

    /// Fails fast when `gh` is missing or not logged in.
    pub fn check_cli(&self) -> Result<(), AppError> {
        if self.gh(["--version"]).is_none() {
            return Err(AppError::GhNotInstalled);
        }
        if self.gh(["auth", "status"]).is_none() {
            return Err(AppError::GhNotAuthenticated);
        }
        Ok(())
    }

    pub fn current_login(&self) -> Result<String, AppError> {
        self.gh(["api", "user", "--jq", ".login"])
            .filter(|login| !login.is_empty())
            .ok_or(AppError::UserLookup)
    }

    /// `git config user.email`, when one is set.
    pub fn user_email(&self) -> Option<String> {
        self.runner
            .run_sync(
                &CommandSpec::new("git").args(["config", "user.email"]),
                &RunOptions::default(),
            )
            .filter(|email| !email.is_empty())
    }

    /// Organizations the user belongs to, alphabetically.
    pub fn organizations(&self) -> Vec<String> {
        let Some(output) = self.gh(["api", "user/orgs", "--jq", ".[].login"]) else {
            debug!("organization listing returned nothing");
            return Vec::new();
        };
        let mut orgs: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        orgs.sort_by_key(|o| o.to_lowercase());
        orgs
    }

    /// Repositories owned by `owner` (a user or an organization).
    pub fn list_repositories(&self, owner: &str) -> Vec<Repository> {
        let limit = REPO_LIST_LIMIT.to_string();
        let Some(output) = self.gh([
            "repo", "list", owner, "--limit", limit.as_str(), "--json", "name,url",
        ]) else {
            warn!("repository listing for {owner} failed");
            return Vec::new();
        };

        match serde_json::from_str::<Vec<Repository>>(&output) {
            Ok(repos) => repos,
            Err(e) => {
                warn!("unreadable repository listing for {owner}: {e}");
                Vec::new()
            }
        }
    }
}
