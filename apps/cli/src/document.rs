//! Commit Document Store: the on-disk markdown table of harvested commits.
//!
//! Layout:
//!
//! ```text
//! # <owner> - commit history of <user>
//!
//! Generated: 2024-05-01 18:00:00 (UTC+09:00)
//!
//! | Date | Repository | Commit Message | Link |
//! |------|------------|----------------|------|
//! | 2024-05-01 17:59:12 | api | Escape \| pipes | [link](https://github.com/o/api/commit/<hash>) |
//! ```
//!
//! Dates are rendered in a fixed display timezone at second precision.
//! Rows are always written most recent first.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use tracing::debug;

use crate::models::{CommitRecord, ParsedCommit};

pub const DISPLAY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DISPLAY_OFFSET_SECS: i32 = 9 * 3600;

pub const DOCUMENT_PREFIX: &str = "commits-";
pub const DOCUMENT_EXTENSION: &str = ".md";

const TABLE_HEADER: &str = "| Date | Repository | Commit Message | Link |";
const TABLE_SEPARATOR: &str = "|------|------------|----------------|------|";
const LINK_LABEL: &str = "link";
/// Heading tokens that open the commit table. The second is the heading
/// used by earlier Korean-language documents.
const HEADER_TOKENS: [&str; 2] = ["| Date |", "| 일시 |"];

/// UTC+09:00, the timezone every document date is rendered in.
pub fn display_timezone() -> FixedOffset {
    FixedOffset::east_opt(DISPLAY_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Renders `date` the way it appears in a document.
pub fn display_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    date.with_timezone(&display_timezone())
        .format(DISPLAY_DATE_FORMAT)
        .to_string()
}

/// Everything needed to write one commit document.
#[derive(Debug, Clone)]
pub struct CommitDocument {
    pub owner: String,
    pub user: String,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<CommitRecord>,
}

impl CommitDocument {
    pub fn new(owner: impl Into<String>, user: impl Into<String>, records: Vec<CommitRecord>) -> Self {
        Self {
            owner: owner.into(),
            user: user.into(),
            generated_at: Utc::now(),
            records,
        }
    }

    /// Records in document order: descending timestamp, ties kept in input order.
    pub fn sorted_records(&self) -> Vec<&CommitRecord> {
        let mut sorted: Vec<&CommitRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "# {} - commit history of {}\n\n",
            self.owner, self.user
        ));
        out.push_str(&format!(
            "Generated: {} (UTC+09:00)\n\n",
            display_date(&self.generated_at)
        ));
        out.push_str(TABLE_HEADER);
        out.push('\n');
        out.push_str(TABLE_SEPARATOR);
        out.push('\n');
        for record in self.sorted_records() {
            out.push_str(&render_row(record));
            out.push('\n');
        }
        out
    }

    /// Writes the rendered document to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())
            .with_context(|| format!("Failed to write commit document {}", path.display()))
    }
}

fn render_row(record: &CommitRecord) -> String {
    format!(
        "| {} | {} | {} | [{LINK_LABEL}]({}) |",
        display_date(&record.date),
        record.repo_name,
        escape_cell(&record.message),
        record.commit_url()
    )
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Splits a table row on unescaped `|`, unescaping `\|` inside cells.
/// Cells are trimmed; the empty edges outside the outer pipes are dropped.
fn split_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                chars.next();
                cell.push('|');
            }
            '|' => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);

    cells
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Extracts the target of a `[label](target)` cell.
fn extract_link(cell: &str) -> Option<String> {
    let open = cell.find('[')?;
    let rest = &cell[open..];
    let start = rest.find("](")? + 2;
    let end = rest[start..].find(')')? + start;
    Some(rest[start..end].to_string())
}

/// Parses a commit document back into rows, in document order.
///
/// Lines before the table heading are ignored. Rows with fewer than four
/// non-empty cells are skipped.
pub fn parse_document(content: &str) -> Vec<ParsedCommit> {
    let mut rows = Vec::new();
    let mut in_table = false;

    for line in content.lines() {
        if HEADER_TOKENS.iter().any(|token| line.starts_with(token)) {
            in_table = true;
            continue;
        }
        if line.starts_with("|---") {
            continue;
        }
        if !in_table || !line.starts_with('|') {
            continue;
        }

        let cells = split_row(line);
        if cells.len() < 4 {
            debug!("skipping short row {line:?}");
            continue;
        }
        let mut cells = cells.into_iter();
        let (Some(date), Some(repo), Some(message), Some(link)) =
            (cells.next(), cells.next(), cells.next(), cells.next())
        else {
            continue;
        };

        rows.push(ParsedCommit {
            date,
            repo,
            message,
            link: extract_link(&link),
        });
    }

    rows
}

pub fn read_document(path: &Path) -> Result<Vec<ParsedCommit>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read commit document {}", path.display()))?;
    Ok(parse_document(&content))
}

/// `commits-<owner>-<YYYY-MM-DDTHH-MM-SS>.md`
pub fn document_file_name(owner: &str, now: DateTime<Utc>) -> String {
    format!(
        "{DOCUMENT_PREFIX}{owner}-{}{DOCUMENT_EXTENSION}",
        file_timestamp(now)
    )
}

/// Filesystem-safe UTC timestamp shared by every generated artifact name.
pub fn file_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// Commit documents in `dir`, sorted by file name.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut documents: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(DOCUMENT_PREFIX) && n.ends_with(DOCUMENT_EXTENSION))
        })
        .collect();
    documents.sort();
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str, message: &str, date: &str, repo: &str) -> CommitRecord {
        CommitRecord {
            hash: hash.to_string(),
            message: message.to_string(),
            date: DateTime::parse_from_rfc3339(date).unwrap(),
            repo_name: repo.to_string(),
            repo_url: format!("https://github.com/acme/{repo}"),
        }
    }

    fn document(records: Vec<CommitRecord>) -> CommitDocument {
        CommitDocument {
            owner: "acme".to_string(),
            user: "octocat".to_string(),
            generated_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
            records,
        }
    }

    #[test]
    fn test_render_header_block() {
        let text = document(vec![]).render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# acme - commit history of octocat");
        assert_eq!(lines[2], "Generated: 2024-05-01 18:00:00 (UTC+09:00)");
        assert_eq!(lines[4], TABLE_HEADER);
        assert_eq!(lines[5], TABLE_SEPARATOR);
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_empty_document_parses_to_zero_rows() {
        assert!(parse_document(&document(vec![]).render()).is_empty());
    }

    #[test]
    fn test_render_row_format() {
        let text = document(vec![record(
            "abc",
            "Add login",
            "2024-03-01T00:00:00Z",
            "web",
        )])
        .render();
        let last = text.lines().last().unwrap();
        assert_eq!(
            last,
            "| 2024-03-01 09:00:00 | web | Add login | [link](https://github.com/acme/web/commit/abc) |"
        );
    }

    #[test]
    fn test_rows_are_sorted_most_recent_first() {
        let doc = document(vec![
            record("old", "a", "2023-01-01T00:00:00Z", "r"),
            record("new", "b", "2024-01-01T00:00:00Z", "r"),
            record("mid", "c", "2023-06-01T00:00:00+02:00", "r"),
        ]);
        let hashes: Vec<Option<String>> = parse_document(&doc.render())
            .iter()
            .map(|r| r.hash().map(str::to_string))
            .collect();
        assert_eq!(
            hashes,
            vec![
                Some("new".to_string()),
                Some("mid".to_string()),
                Some("old".to_string())
            ]
        );
    }

    #[test]
    fn test_round_trip_preserves_identity_and_truncates_date() {
        let originals = vec![
            record("h1", "Implement cache", "2024-02-29T23:30:15.987+00:00", "core"),
            record("h2", "Fix | parse | bug", "2024-03-01T08:00:00-05:00", "cli"),
            record("h3", "Trailing backslash \\", "2023-12-31T15:00:00Z", "core"),
        ];
        let doc = document(originals.clone());
        let parsed = parse_document(&doc.render());
        assert_eq!(parsed.len(), originals.len());

        for original in doc.sorted_records() {
            let row = parsed
                .iter()
                .find(|r| r.hash() == Some(original.hash.as_str()))
                .expect("row for every record");
            assert_eq!(row.repo, original.repo_name);
            assert_eq!(row.message, original.message);
            assert_eq!(row.link.as_deref(), Some(original.commit_url().as_str()));
            assert_eq!(row.repo_url(), Some(original.repo_url.as_str()));

            let expected = original
                .date
                .with_timezone(&display_timezone())
                .timestamp();
            assert_eq!(row.timestamp().unwrap().timestamp(), expected);
        }
    }

    #[test]
    fn test_escaping_law_for_pipes() {
        let doc = document(vec![record("p", "a|b \\| c||", "2024-01-01T00:00:00Z", "r")]);
        let text = doc.render();
        assert!(text.contains("a\\|b \\\\| c\\|\\|"));
        assert_eq!(parse_document(&text)[0].message, "a|b \\| c||");
    }

    #[test]
    fn test_parse_skips_short_rows_and_prose() {
        let text = "\
# acme - commit history of octocat

| not a table row before the heading | x | y | z |

| Date | Repository | Commit Message | Link |
|------|------------|----------------|------|
| 2024-01-01 09:00:00 | r |  | [link](u/commit/1) |
| 2024-01-02 09:00:00 | r | ok | [link](u/commit/2) |
trailing prose
";
        let rows = parse_document(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "ok");
        assert_eq!(rows[0].hash(), Some("2"));
    }

    #[test]
    fn test_parse_accepts_legacy_heading_and_label() {
        let text = "\
| 일시 | 레포지토리 | 커밋 메시지 | 링크 |
|------|------------|-------------|------|
| 2023-07-04 12:00:00 | blog | 글 추가 | [링크](https://github.com/me/blog/commit/ff) |
";
        let rows = parse_document(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].repo, "blog");
        assert_eq!(rows[0].link.as_deref(), Some("https://github.com/me/blog/commit/ff"));
    }

    #[test]
    fn test_parse_row_without_link_syntax() {
        let text = format!("{TABLE_HEADER}\n{TABLE_SEPARATOR}\n| 2024-01-01 00:00:00 | r | m | n/a |\n");
        let rows = parse_document(&text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].link, None);
    }

    #[test]
    fn test_extract_link() {
        assert_eq!(extract_link("[x](http://a/b)").as_deref(), Some("http://a/b"));
        assert_eq!(extract_link("no link"), None);
        assert_eq!(extract_link("[x](unterminated"), None);
    }

    #[test]
    fn test_document_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 7, 8, 9).unwrap();
        assert_eq!(document_file_name("acme", now), "commits-acme-2024-05-01T07-08-09.md");
    }

    #[test]
    fn test_write_read_and_list_documents() {
        let dir = tempfile::tempdir().unwrap();
        let doc = document(vec![record("h", "m", "2024-01-01T00:00:00Z", "r")]);
        let path = dir.path().join(document_file_name("acme", doc.generated_at));
        doc.write_to(&path).unwrap();
        std::fs::write(dir.path().join("resume-x.md"), "").unwrap();
        std::fs::write(dir.path().join("commits-notes.txt"), "").unwrap();

        assert_eq!(list_documents(dir.path()).unwrap(), vec![path.clone()]);
        assert_eq!(read_document(&path).unwrap().len(), 1);
    }
}
