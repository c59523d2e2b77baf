//! `claude` CLI backend.
//!
//! Runs `claude --print --output-format json` once per prompt through the
//! Process Runner and reads the JSON result envelope. The prompt goes in on
//! stdin; a month of commits can exceed the per-argument size limit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{non_empty, LlmError, TextGenerator};
use crate::process::{CommandSpec, ProcessRunner, RunOptions};

const CLI_TIMEOUT: Duration = Duration::from_secs(600);

/// Result envelope printed by `claude --output-format json`.
#[derive(Debug, Deserialize)]
struct CliResult {
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

pub struct ClaudeCli {
    runner: Arc<dyn ProcessRunner>,
    executable: PathBuf,
    timeout: Duration,
}

impl ClaudeCli {
    pub fn new(runner: Arc<dyn ProcessRunner>, executable: PathBuf) -> Self {
        Self {
            runner,
            executable,
            timeout: CLI_TIMEOUT,
        }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(self.executable.to_string_lossy())
            .args(["--print", "--output-format", "json", "--max-turns", "1"])
    }
}

#[async_trait]
impl TextGenerator for ClaudeCli {
    fn name(&self) -> String {
        format!("claude CLI ({})", self.executable.display())
    }

    async fn generate(&self, prompt: &str, cwd: &Path) -> Result<String, LlmError> {
        let options = RunOptions::default()
            .in_dir(cwd)
            .with_timeout(self.timeout)
            .with_stdin(prompt);
        let stdout = self.runner.run_async(&self.command(), &options).await?;
        debug!("claude CLI returned {} bytes", stdout.len());
        parse_cli_output(&stdout)
    }
}

fn parse_cli_output(stdout: &str) -> Result<String, LlmError> {
    let envelope: CliResult = serde_json::from_str(stdout.trim())?;

    if envelope.is_error {
        let detail = if envelope.errors.is_empty() {
            envelope
                .result
                .or(envelope.subtype)
                .unwrap_or_else(|| "unknown error".to_string())
        } else {
            envelope.errors.join("\n")
        };
        return Err(LlmError::Reported(detail));
    }

    non_empty(envelope.result.as_deref().unwrap_or_default())
}

/// Locates the `claude` executable.
///
/// Order: an explicit path, well-known install locations, node version
/// manager installs, then `which claude` (through a login shell on macOS).
pub fn find_claude_path(runner: &dyn ProcessRunner, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        debug!("CLAUDE_PATH {} does not exist", path.display());
    }

    let home = dirs::home_dir().unwrap_or_default();
    if let Some(found) = candidate_paths(&home).into_iter().find(|p| p.is_file()) {
        return Some(found);
    }

    let lookups: Vec<CommandSpec> = if cfg!(target_os = "macos") {
        ["/bin/zsh", "/bin/bash"]
            .into_iter()
            .map(|shell| CommandSpec::new(shell).args(["-lc", "which claude"]))
            .collect()
    } else {
        vec![CommandSpec::new("which").arg("claude")]
    };

    lookups.iter().find_map(|lookup| {
        runner
            .run_sync(lookup, &RunOptions::default())
            .and_then(|out| out.lines().next().map(|l| l.trim().to_string()))
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
    })
}

fn candidate_paths(home: &Path) -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("/usr/local/bin/claude"),
        PathBuf::from("/opt/homebrew/bin/claude"),
        PathBuf::from("/usr/bin/claude"),
        home.join(".npm-global/bin/claude"),
        home.join(".local/bin/claude"),
        home.join(".claude/local/claude"),
        home.join("n/bin/claude"),
    ];

    let version_dirs: [(PathBuf, bool, &str); 8] = [
        (home.join(".nvm/versions/node"), true, "bin/claude"),
        (
            home.join("Library/Application Support/fnm/node-versions"),
            true,
            "installation/bin/claude",
        ),
        (
            home.join(".local/share/fnm/node-versions"),
            true,
            "installation/bin/claude",
        ),
        (
            home.join(".fnm/node-versions"),
            true,
            "installation/bin/claude",
        ),
        (PathBuf::from("/opt/homebrew/Cellar/node"), false, "bin/claude"),
        (PathBuf::from("/usr/local/Cellar/node"), false, "bin/claude"),
        (home.join(".volta/tools/image/node"), false, "bin/claude"),
        (home.join(".asdf/installs/nodejs"), false, "bin/claude"),
    ];

    for (base, v_prefixed, sub_path) in version_dirs {
        let Ok(entries) = std::fs::read_dir(&base) else {
            continue;
        };
        let mut versions: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .filter(|e| !v_prefixed || e.file_name().to_string_lossy().starts_with('v'))
            .map(|e| e.path().join(sub_path))
            .collect();
        versions.sort();
        paths.extend(versions);
    }

    paths
}
