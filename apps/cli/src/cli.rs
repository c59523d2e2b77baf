//! Command-line surface shared by both binaries.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crossterm::{cursor, execute};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::errors::AppError;
use crate::pipeline;
use crate::state::AppState;
use crate::terminal::{select, Choice};
use crate::ui;

#[derive(Debug, Parser)]
#[command(name = "commit-resume", version, about = "Turn your GitHub commits into a resume")]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Mode {
    /// Collect commits into a markdown document
    Collect,
    /// Generate a resume from a commit document
    Generate {
        /// Commit document to use instead of choosing one
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
    /// Collect, then generate from the fresh document
    All,
}

/// Logs go to stderr so they never interleave with the status lines.
pub fn init_tracing(config: &Config) {
    let filter = config
        .rust_log
        .as_deref()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(config.default_log_directive()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn choose_mode() -> Result<Mode, AppError> {
    let choices = [
        Choice::new("Collect commits", Mode::Collect),
        Choice::new("Generate resume", Mode::Generate { file: None }),
        Choice::new("Collect then generate", Mode::All),
    ];
    select("What would you like to do?", &choices)
}

pub async fn run_mode(state: &AppState, mode: Option<Mode>) -> Result<(), AppError> {
    let mode = match mode {
        Some(mode) => mode,
        None => choose_mode()?,
    };
    info!("mode {mode:?}");

    match mode {
        Mode::Collect => pipeline::collect(state).await.map(|_| ()),
        Mode::Generate { file } => pipeline::generate(state, file).await.map(|_| ()),
        Mode::All => pipeline::collect_and_generate(state).await.map(|_| ()),
    }
}

/// Prints `err` with its remediation and returns the exit status.
pub fn report(err: &AppError) -> i32 {
    let _ = execute!(io::stdout(), cursor::Show);
    if matches!(err, AppError::Cancelled) {
        println!();
        ui::hint("Cancelled.");
    } else {
        ui::failure(&err.to_string());
        for line in err.remediation() {
            eprintln!("{line}");
        }
    }
    err.exit_code()
}

/// Loads configuration, sets up logging and runs `mode`. Returns the exit status.
pub async fn main_with(mode: Option<Mode>) -> i32 {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => return report(&AppError::Internal(e)),
    };
    init_tracing(&config);
    info!("commit-resume v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::new(config);
    match run_mode(&state, mode).await {
        Ok(()) => 0,
        Err(e) => report(&e),
    }
}
