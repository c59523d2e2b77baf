use std::path::PathBuf;

use anyhow::{Context, Result};

/// Runtime configuration loaded from environment variables.
/// Everything else is asked for interactively.
#[derive(Debug, Clone)]
pub struct Config {
    /// `DEBUG=1` turns on debug-level logging.
    pub debug: bool,
    pub rust_log: Option<String>,
    /// Selects the HTTP generation backend when present.
    pub anthropic_api_key: Option<String>,
    pub claude_path: Option<PathBuf>,
    /// Where documents, scratch checkouts and resumes are created.
    pub work_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            debug: std::env::var("DEBUG")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            rust_log: optional_env("RUST_LOG"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            claude_path: optional_env("CLAUDE_PATH").map(PathBuf::from),
            work_dir: std::env::current_dir()
                .context("Current working directory is not accessible")?,
        })
    }

    /// Directive used when `RUST_LOG` is absent or unparsable.
    pub fn default_log_directive(&self) -> String {
        let level = if self.debug { "debug" } else { "warn" };
        format!("commit_resume={level}")
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
