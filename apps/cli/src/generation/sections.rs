//! Section Generator and Resume Assembler.
//!
//! Flow: bucket → prompt → generate (limit 3 in flight) → `<YYYY-MM>.md`
//!       surviving sections → final prompt → generate → resume text.
//!
//! A bucket whose generation fails is logged and left out; only the final
//! assembly call is fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::prompts::{FINAL_PROMPT_TEMPLATE, SECTION_PROMPT_TEMPLATE};
use crate::grouping::MonthBucket;
use crate::llm_client::TextGenerator;
use crate::models::Section;
use crate::scheduler::{run_bounded, GENERATION_CONCURRENCY};

/// Result of one bucket's generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    Generated(Section),
    Failed { year_month: String, reason: String },
}

impl SectionOutcome {
    pub fn year_month(&self) -> &str {
        match self {
            SectionOutcome::Generated(section) => &section.year_month,
            SectionOutcome::Failed { year_month, .. } => year_month,
        }
    }
}

/// Renders a bucket as the commit listing embedded in the section prompt.
pub fn format_bucket(bucket: &MonthBucket) -> String {
    let mut text = format!("## Activity in {}\n\n", bucket.label());
    for (repo, commits) in bucket.by_repository() {
        text.push_str(&format!("### {repo}\n"));
        for commit in commits {
            text.push_str(&format!("- {}\n", commit.message));
        }
        text.push('\n');
    }
    text
}

pub fn build_section_prompt(bucket: &MonthBucket) -> String {
    SECTION_PROMPT_TEMPLATE.replace("{commits}", &format_bucket(bucket))
}

pub fn build_final_prompt(sections: &[Section]) -> String {
    let joined = sections
        .iter()
        .map(|s| format!("## {}\n{}", s.year_month, s.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    FINAL_PROMPT_TEMPLATE.replace("{sections}", &joined)
}

async fn generate_one(
    generator: &dyn TextGenerator,
    bucket: &MonthBucket,
    cwd: &Path,
    parts_dir: &Path,
) -> Result<Section, String> {
    let content = generator
        .generate(&build_section_prompt(bucket), cwd)
        .await
        .map_err(|e| e.to_string())?;
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err("empty response".to_string());
    }

    let file = parts_dir.join(format!("{}.md", bucket.year_month));
    tokio::fs::write(&file, &content)
        .await
        .map_err(|e| format!("failed to write {}: {e}", file.display()))?;

    Ok(Section {
        year_month: bucket.year_month.clone(),
        content,
    })
}

/// Generates one section per bucket, at most three at a time.
///
/// Each success is also written to `<parts_dir>/<YYYY-MM>.md`. `on_done`
/// sees every outcome as it settles. The returned sections are the
/// survivors, most recent first.
pub async fn generate_sections<F>(
    generator: Arc<dyn TextGenerator>,
    buckets: Vec<MonthBucket>,
    cwd: PathBuf,
    parts_dir: PathBuf,
    on_done: F,
) -> Vec<Section>
where
    F: Fn(&SectionOutcome) + Send + Sync + 'static,
{
    let on_done = Arc::new(on_done);
    let tasks: Vec<_> = buckets
        .into_iter()
        .map(|bucket| {
            let generator = generator.clone();
            let cwd = cwd.clone();
            let parts_dir = parts_dir.clone();
            let on_done = on_done.clone();
            move || async move {
                let outcome =
                    match generate_one(generator.as_ref(), &bucket, &cwd, &parts_dir).await {
                        Ok(section) => SectionOutcome::Generated(section),
                        Err(reason) => {
                            warn!("section {} failed: {reason}", bucket.year_month);
                            SectionOutcome::Failed {
                                year_month: bucket.year_month.clone(),
                                reason,
                            }
                        }
                    };
                on_done(&outcome);
                outcome
            }
        })
        .collect();

    let mut sections: Vec<Section> = run_bounded(tasks, GENERATION_CONCURRENCY)
        .await
        .into_iter()
        .filter_map(|outcome| match outcome {
            SectionOutcome::Generated(section) => Some(section),
            SectionOutcome::Failed { .. } => None,
        })
        .collect();
    sections.sort_by(|a, b| b.year_month.cmp(&a.year_month));
    info!("{} sections generated", sections.len());
    sections
}

/// Restructures the sections into the final resume. Any failure here is fatal.
pub async fn assemble_resume(
    generator: &dyn TextGenerator,
    sections: &[Section],
    cwd: &Path,
) -> Result<String, AppError> {
    if sections.is_empty() {
        return Err(AppError::NoSections);
    }
    generator
        .generate(&build_final_prompt(sections), cwd)
        .await
        .map_err(|e| AppError::Generation(e.to_string()))
}
