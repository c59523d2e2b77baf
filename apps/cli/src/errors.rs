use thiserror::Error;

/// Top-level error taxonomy.
///
/// Per-repository and per-bucket failures never become an `AppError`;
/// they are absorbed by the task that owns them.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("GitHub CLI (gh) is not installed")]
    GhNotInstalled,

    #[error("GitHub CLI is not authenticated")]
    GhNotAuthenticated,

    #[error("Could not look up the GitHub user")]
    UserLookup,

    #[error("No text generator available: {0}")]
    GeneratorUnavailable(String),

    #[error("No repositories found for {0}")]
    NoRepositories(String),

    #[error("No commits-*.md documents found")]
    NoCommitDocuments,

    #[error("No resume sections were generated")]
    NoSections,

    #[error("Final resume generation failed: {0}")]
    Generation(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Process exit status for this error. A user cancelling is not a failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Cancelled => 0,
            _ => 1,
        }
    }

    /// What the user can do about it, one line each.
    pub fn remediation(&self) -> Vec<&'static str> {
        match self {
            AppError::GhNotInstalled => vec![
                "Install it:",
                "  macOS:   brew install gh",
                "  Windows: winget install GitHub.cli",
                "  Linux:   https://github.com/cli/cli/blob/trunk/docs/install_linux.md",
            ],
            AppError::GhNotAuthenticated => vec!["Run:", "  gh auth login"],
            AppError::GeneratorUnavailable(_) => vec![
                "Install Claude Code (https://claude.ai/code) or set CLAUDE_PATH,",
                "or set ANTHROPIC_API_KEY to use the API directly.",
            ],
            AppError::NoCommitDocuments => {
                vec!["Run the collect step first to produce a commit document."]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_exits_zero() {
        assert_eq!(AppError::Cancelled.exit_code(), 0);
    }

    #[test]
    fn test_everything_else_exits_one() {
        assert_eq!(AppError::GhNotInstalled.exit_code(), 1);
        assert_eq!(AppError::NoRepositories("acme".into()).exit_code(), 1);
        assert_eq!(AppError::Generation("boom".into()).exit_code(), 1);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("unexpected")).exit_code(),
            1
        );
    }

    #[test]
    fn test_setup_errors_carry_remediation() {
        assert!(AppError::GhNotInstalled
            .remediation()
            .iter()
            .any(|l| l.contains("brew install gh")));
        assert!(AppError::GhNotAuthenticated
            .remediation()
            .iter()
            .any(|l| l.contains("gh auth login")));
        assert!(AppError::Cancelled.remediation().is_empty());
    }
}
