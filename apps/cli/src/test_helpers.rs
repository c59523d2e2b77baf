//! Scripted stand-ins for external processes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::process::{CommandSpec, ProcessError, ProcessRunner, RunOptions};

/// How a fake repository behaves when harvested.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Clone succeeds; log prints `(hash, subject, iso-date)` rows.
    Commits(Vec<(&'static str, &'static str, &'static str)>),
    CloneFails,
    /// Leaves a partial checkout behind, then times out.
    CloneTimesOut,
    LogFails,
}

/// A [`ProcessRunner`] that never spawns anything.
///
/// `git clone` / `git log` are answered from per-repository scripts, with
/// `git log` resolved through the checkout its working directory points at.
/// Any other command is answered from exact-match canned responses.
#[derive(Default)]
pub struct FakeRunner {
    repos: Mutex<HashMap<String, Scripted>>,
    responses: Mutex<HashMap<String, Result<String, String>>>,
    checkouts: Mutex<HashMap<PathBuf, String>>,
    calls: Mutex<Vec<(CommandSpec, RunOptions)>>,
}

impl FakeRunner {
    pub fn script_repo(&self, name: &str, script: Scripted) {
        self.repos.lock().unwrap().insert(name.to_string(), script);
    }

    /// Canned stdout for a command, keyed by its display form.
    pub fn respond(&self, command: &str, stdout: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), Ok(stdout.to_string()));
    }

    /// Canned failure for a command, keyed by its display form.
    pub fn fail(&self, command: &str, stderr: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), Err(stderr.to_string()));
    }

    pub fn calls(&self) -> Vec<(CommandSpec, RunOptions)> {
        self.calls.lock().unwrap().clone()
    }

    fn script_for(&self, name: &str) -> Option<Scripted> {
        self.repos.lock().unwrap().get(name).cloned()
    }

    fn canned(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        match self.responses.lock().unwrap().get(&command.to_string()) {
            Some(Ok(stdout)) => Ok(stdout.clone()),
            Some(Err(stderr)) => Err(failed(command, stderr)),
            None => Err(failed(command, "no canned response")),
        }
    }

    fn clone_repo(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        let url = &command.args[command.args.len() - 2];
        let dest = PathBuf::from(&command.args[command.args.len() - 1]);
        let name = url
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .trim_end_matches(".git");

        let occupied = std::fs::read_dir(&dest)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if occupied {
            return Err(failed(
                command,
                "fatal: destination path already exists and is not an empty directory",
            ));
        }

        match self.script_for(name) {
            Some(Scripted::CloneFails) | None => Err(failed(command, "repository not found")),
            Some(Scripted::CloneTimesOut) => {
                std::fs::create_dir_all(&dest).unwrap();
                Err(ProcessError::TimedOut {
                    command: command.to_string(),
                    timeout: Duration::from_secs(120),
                })
            }
            Some(_) => {
                std::fs::create_dir_all(dest.join(".git")).unwrap();
                self.checkouts
                    .lock()
                    .unwrap()
                    .insert(dest, name.to_string());
                Ok(String::new())
            }
        }
    }

    fn log_repo(
        &self,
        command: &CommandSpec,
        options: &RunOptions,
    ) -> Result<String, ProcessError> {
        let name = options
            .cwd
            .as_ref()
            .filter(|cwd| cwd.join(".git").is_dir())
            .and_then(|cwd| self.checkouts.lock().unwrap().get(cwd).cloned())
            .unwrap_or_default();

        match self.script_for(&name) {
            Some(Scripted::Commits(rows)) => Ok(rows
                .iter()
                .map(|(hash, subject, date)| format!("{hash}<|>{subject}<|>{date}\n"))
                .collect()),
            _ => Err(failed(command, "fatal: bad revision")),
        }
    }
}

fn failed(command: &CommandSpec, stderr: &str) -> ProcessError {
    ProcessError::Failed {
        command: command.to_string(),
        status: "exit status: 1".to_string(),
        stderr: stderr.to_string(),
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    fn run_sync(&self, command: &CommandSpec, options: &RunOptions) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .push((command.clone(), options.clone()));
        self.canned(command).ok().map(|s| s.trim().to_string())
    }

    async fn run_async(
        &self,
        command: &CommandSpec,
        options: &RunOptions,
    ) -> Result<String, ProcessError> {
        self.calls
            .lock()
            .unwrap()
            .push((command.clone(), options.clone()));

        match (command.program.as_str(), command.args.first().map(String::as_str)) {
            ("git", Some("clone")) => self.clone_repo(command),
            ("git", Some("log")) => self.log_repo(command, options),
            _ => self.canned(command),
        }
    }
}
