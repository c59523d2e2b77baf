//! Process Runner: the only place that spawns `git`, `gh` or `claude`.
//!
//! Core logic talks to `dyn ProcessRunner`, never to `std::process` or
//! `tokio::process` directly, so harvesting and listing can be exercised
//! with a scripted runner in tests.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` timed out after {}s", timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },

    #[error("`{command}` produced more than {limit} bytes of output")]
    OutputTooLarge { command: String, limit: usize },

    #[error("I/O error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// A program plus its argument vector. No shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Per-invocation knobs. `timeout`, `max_output_bytes` and `stdin` only
/// apply to [`ProcessRunner::run_async`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
    /// The child is killed as soon as stdout grows past this many bytes.
    pub max_output_bytes: Option<usize>,
    /// Written to the child's stdin, which is then closed.
    pub stdin: Option<String>,
}

impl RunOptions {
    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_output(mut self, bytes: usize) -> Self {
        self.max_output_bytes = Some(bytes);
        self
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs a command to completion and returns its trimmed stdout.
    /// Any spawn failure or non-zero exit yields `None`.
    fn run_sync(&self, command: &CommandSpec, options: &RunOptions) -> Option<String>;

    /// Runs a command without blocking the runtime and returns its raw stdout.
    async fn run_async(
        &self,
        command: &CommandSpec,
        options: &RunOptions,
    ) -> Result<String, ProcessError>;
}

/// Runner backed by real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    fn run_sync(&self, command: &CommandSpec, options: &RunOptions) -> Option<String> {
        let mut cmd = std::process::Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        match cmd.output() {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(output) => {
                debug!("`{command}` exited with {}", output.status);
                None
            }
            Err(e) => {
                debug!("failed to spawn `{command}`: {e}");
                None
            }
        }
    }

    async fn run_async(
        &self,
        command: &CommandSpec,
        options: &RunOptions,
    ) -> Result<String, ProcessError> {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(if options.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        debug!("spawning `{command}`");
        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        // dropping the future on timeout drops the child, which kills it
        let run = supervise(child, command, options);
        match options.timeout {
            Some(timeout) => tokio::time::timeout(timeout, run).await.map_err(|_| {
                ProcessError::TimedOut {
                    command: command.to_string(),
                    timeout,
                }
            })?,
            None => run.await,
        }
    }
}

/// Feeds stdin, drains stderr in the background and reads stdout up to the
/// configured ceiling, then waits for the exit status.
async fn supervise(
    mut child: Child,
    command: &CommandSpec,
    options: &RunOptions,
) -> Result<String, ProcessError> {
    let io_error = |source: std::io::Error| ProcessError::Io {
        command: command.to_string(),
        source,
    };

    if let (Some(mut pipe), Some(input)) = (child.stdin.take(), options.stdin.clone()) {
        tokio::spawn(async move {
            // a child that exits early closes the pipe; that shows up in its status
            if let Err(e) = pipe.write_all(input.as_bytes()).await {
                debug!("stdin write stopped: {e}");
            }
        });
    }

    let stderr = child.stderr.take().map(|mut pipe| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf).await;
            buf
        })
    });

    let mut stdout = Vec::new();
    if let Some(pipe) = child.stdout.take() {
        match options.max_output_bytes {
            Some(limit) => {
                pipe.take(limit as u64 + 1)
                    .read_to_end(&mut stdout)
                    .await
                    .map_err(io_error)?;
                if stdout.len() > limit {
                    if let Err(e) = child.kill().await {
                        debug!("failed to kill `{command}`: {e}");
                    }
                    return Err(ProcessError::OutputTooLarge {
                        command: command.to_string(),
                        limit,
                    });
                }
            }
            None => {
                let mut pipe = pipe;
                pipe.read_to_end(&mut stdout).await.map_err(io_error)?;
            }
        }
    }

    let status = child.wait().await.map_err(io_error)?;
    let stderr = match stderr {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    };

    if !status.success() {
        return Err(ProcessError::Failed {
            command: command.to_string(),
            status: status.to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&stdout).into_owned())
}
