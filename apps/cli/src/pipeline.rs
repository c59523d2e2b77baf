//! The collect and generate flows composed from the core modules.
//!
//! collect:  gh checks → identities → owner → repositories → harvest (full
//!           fan-out) → commit document
//! generate: generator → document → parse → group → sections (limit 3) →
//!           final resume

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::document::{document_file_name, file_timestamp, list_documents, read_document, CommitDocument};
use crate::errors::AppError;
use crate::generation::sections::{assemble_resume, generate_sections, SectionOutcome};
use crate::github::GitHub;
use crate::grouping::group_by_year_month;
use crate::harvest::{harvest_all, merge, Harvester};
use crate::llm_client::{self, TextGenerator};
use crate::models::AuthorIdentity;
use crate::state::AppState;
use crate::terminal::{prompt, select, Choice};
use crate::ui::{self, Progress};

/// What a collection run produced.
#[derive(Debug, Clone)]
pub struct CollectSummary {
    pub document: PathBuf,
    pub commit_count: usize,
    pub repository_count: usize,
}

pub async fn collect(state: &AppState) -> Result<CollectSummary, AppError> {
    ui::heading("Collect GitHub commits");

    let github = GitHub::new(state.runner.as_ref());
    github.check_cli()?;

    ui::pending("Checking GitHub user...");
    let login = github.current_login()?;
    let email = github.user_email();
    ui::clear_pending();
    match &email {
        Some(email) => ui::success(&format!("User: {login} ({email})")),
        None => ui::success(&format!("User: {login}")),
    }
    println!();

    let mut authors = AuthorIdentity::new(&login, email.as_deref());
    ui::hint("e.g. old-username, old@email.com");
    let extra = prompt("Additional e-mails/handles to search (Enter to skip): ")?;
    authors.extend_from_csv(&extra);
    ui::success(&format!("Searching for: {authors}"));
    println!();

    ui::pending("Fetching organizations...");
    let orgs = github.organizations();
    ui::clear_pending();
    ui::success(&format!("{} organizations found", orgs.len()));
    println!();

    let mut choices = vec![Choice::new(
        format!("{login} (personal repositories)"),
        login.clone(),
    )];
    choices.extend(orgs.into_iter().map(|org| Choice::new(org.clone(), org)));
    let owner = select("Select an owner", &choices)?;

    let summary = collect_for(state, &login, &authors, &owner).await?;

    println!();
    ui::heading("Collection complete");
    println!("{} commits found", summary.commit_count);
    println!("{} repositories searched", summary.repository_count);
    println!("Document: {}\n", summary.document.display());
    Ok(summary)
}

/// The non-interactive half of [`collect`]: lists `owner`'s repositories,
/// harvests them for `authors` and writes the commit document.
pub async fn collect_for(
    state: &AppState,
    login: &str,
    authors: &AuthorIdentity,
    owner: &str,
) -> Result<CollectSummary, AppError> {
    let github = GitHub::new(state.runner.as_ref());
    ui::pending(&format!("Fetching repositories of {owner}..."));
    let repos = github.list_repositories(owner);
    ui::clear_pending();
    if repos.is_empty() {
        return Err(AppError::NoRepositories(owner.to_string()));
    }
    ui::success(&format!("{} repositories found", repos.len()));
    println!();

    let scratch_root = tempfile::Builder::new()
        .prefix(".temp-repos-")
        .tempdir_in(&state.config.work_dir)?;
    info!("scratch root {}", scratch_root.path().display());
    let harvester = Arc::new(Harvester::new(state.runner.clone(), scratch_root.path()));

    let progress = Arc::new(Progress::new(repos.len(), "searching"));
    let ticker = progress.clone();
    let results = harvest_all(harvester, &repos, authors, move |outcome| {
        let line = (!outcome.commits.is_empty()).then(|| {
            format!(
                "{} {} → {} commits",
                ui::repo_mark(),
                outcome.repo.name,
                outcome.commits.len()
            )
        });
        ticker.tick(line);
    })
    .await;
    progress.finish();
    scratch_root.close()?;

    let commits = merge(results);
    let commit_count = commits.len();
    let document = CommitDocument::new(owner, login, commits);
    let path = state
        .config
        .work_dir
        .join(document_file_name(owner, document.generated_at));
    document.write_to(&path)?;

    Ok(CollectSummary {
        document: path,
        commit_count,
        repository_count: repos.len(),
    })
}

pub async fn generate(state: &AppState, document: Option<PathBuf>) -> Result<PathBuf, AppError> {
    ui::heading("Generate resume");

    let generator = llm_client::from_config(&state.config, state.runner.clone())?;
    ui::success(&format!("Generator: {}", generator.name()));
    println!();
    generate_with(state, generator, document).await
}

/// [`generate`] with an already chosen generator.
pub async fn generate_with(
    state: &AppState,
    generator: Arc<dyn TextGenerator>,
    document: Option<PathBuf>,
) -> Result<PathBuf, AppError> {
    let work_dir = state.config.work_dir.clone();
    let document = match document {
        Some(path) => path,
        None => {
            let documents = list_documents(&work_dir)?;
            if documents.is_empty() {
                return Err(AppError::NoCommitDocuments);
            }
            let choices: Vec<Choice<PathBuf>> = documents
                .into_iter()
                .map(|path| {
                    let label = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    Choice::new(label, path)
                })
                .collect();
            select("Select a commit document", &choices)?
        }
    };

    ui::hint("Parsing document...");
    let rows = read_document(&document)?;
    ui::success(&format!("{} commits found", rows.len()));
    let buckets = group_by_year_month(&rows);
    ui::success(&format!("{} year-month groups", buckets.len()));
    println!();

    let timestamp = file_timestamp(Utc::now());
    let parts_dir = work_dir.join(format!(".temp-resume-parts-{timestamp}"));
    tokio::fs::create_dir_all(&parts_dir).await?;

    println!("Generating resume sections...\n");
    let progress = Arc::new(Progress::new(buckets.len(), "processing"));
    let ticker = progress.clone();
    let sections = generate_sections(
        generator.clone(),
        buckets,
        work_dir.clone(),
        parts_dir,
        move |outcome| {
            let line = match outcome {
                SectionOutcome::Generated(_) => {
                    format!("{} {}", ui::ok_mark(), outcome.year_month())
                }
                SectionOutcome::Failed { reason, .. } => {
                    format!("{} {}: {reason}", ui::fail_mark(), outcome.year_month())
                }
            };
            ticker.tick(Some(line));
        },
    )
    .await;
    progress.finish();

    println!("\nGenerating final resume...");
    let resume = assemble_resume(generator.as_ref(), &sections, &work_dir).await?;
    let resume_path = work_dir.join(format!("resume-{timestamp}.md"));
    tokio::fs::write(&resume_path, resume).await?;

    println!();
    ui::heading("Done");
    println!("Resume: {}\n", resume_path.display());
    Ok(resume_path)
}

/// Collects, then generates from the fresh document when it has commits.
pub async fn collect_and_generate(state: &AppState) -> Result<Option<PathBuf>, AppError> {
    let summary = collect(state).await?;
    if summary.commit_count == 0 {
        ui::hint("No commits to summarize; skipping resume generation.");
        return Ok(None);
    }
    ui::hint("Starting resume generation...\n");
    generate(state, Some(summary.document)).await.map(Some)
}
