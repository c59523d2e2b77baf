//! Temporal Grouper: partitions parsed rows into year-month buckets.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::ParsedCommit;

/// All rows of one `YYYY-MM`, in the order they appeared in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket {
    pub year_month: String,
    pub commits: Vec<ParsedCommit>,
}

impl MonthBucket {
    /// Human label such as `March 2024`. Falls back to the raw key.
    pub fn label(&self) -> String {
        let Some((year, month)) = self.year_month.split_once('-') else {
            return self.year_month.clone();
        };
        match (year.parse::<i32>(), month.parse::<u32>()) {
            (Ok(y), Ok(m)) => NaiveDate::from_ymd_opt(y, m, 1)
                .map(|d| d.format("%B %Y").to_string())
                .unwrap_or_else(|| self.year_month.clone()),
            _ => self.year_month.clone(),
        }
    }

    /// Rows grouped by repository, repositories in first-seen order.
    pub fn by_repository(&self) -> Vec<(&str, Vec<&ParsedCommit>)> {
        let mut groups: Vec<(&str, Vec<&ParsedCommit>)> = Vec::new();
        for commit in &self.commits {
            match groups.iter_mut().find(|(repo, _)| *repo == commit.repo) {
                Some((_, rows)) => rows.push(commit),
                None => groups.push((commit.repo.as_str(), vec![commit])),
            }
        }
        groups
    }
}

/// Returns the `YYYY-MM` prefix of a date string, if it has one.
fn year_month_key(date: &str) -> Option<&str> {
    let prefix = date.get(..7)?;
    let bytes = prefix.as_bytes();
    let shaped = bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..].iter().all(u8::is_ascii_digit);
    shaped.then_some(prefix)
}

/// Buckets `records` by year-month, newest bucket first.
///
/// Rows whose date does not start with `YYYY-MM` are left out.
pub fn group_by_year_month(records: &[ParsedCommit]) -> Vec<MonthBucket> {
    let mut groups: BTreeMap<&str, Vec<ParsedCommit>> = BTreeMap::new();
    for record in records {
        if let Some(key) = year_month_key(&record.date) {
            groups.entry(key).or_default().push(record.clone());
        }
    }

    groups
        .into_iter()
        .rev()
        .map(|(year_month, commits)| MonthBucket {
            year_month: year_month.to_string(),
            commits,
        })
        .collect()
}
