use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

use crate::document::{display_timezone, DISPLAY_DATE_FORMAT};

/// One commit authored by a tracked identity, as extracted from `git log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub hash: String,
    pub message: String,
    pub date: DateTime<FixedOffset>,
    pub repo_name: String,
    pub repo_url: String,
}

impl CommitRecord {
    pub fn commit_url(&self) -> String {
        format!("{}/commit/{}", self.repo_url.trim_end_matches('/'), self.hash)
    }
}

/// A row read back from a commit document.
///
/// `date` is the display string exactly as written (`YYYY-MM-DD HH:MM:SS`
/// in the display timezone); sub-second precision and the original offset
/// are not recoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit {
    pub date: String,
    pub repo: String,
    pub message: String,
    pub link: Option<String>,
}

impl ParsedCommit {
    /// Commit hash taken from the `/commit/<hash>` link target.
    pub fn hash(&self) -> Option<&str> {
        let link = self.link.as_deref()?;
        let (_, hash) = link.rsplit_once("/commit/")?;
        (!hash.is_empty()).then_some(hash)
    }

    /// Repository web URL taken from the link target.
    pub fn repo_url(&self) -> Option<&str> {
        let link = self.link.as_deref()?;
        link.rsplit_once("/commit/").map(|(url, _)| url)
    }

    /// The display date re-attached to the display timezone.
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        let naive = NaiveDateTime::parse_from_str(&self.date, DISPLAY_DATE_FORMAT).ok()?;
        display_timezone().from_local_datetime(&naive).single()
    }
}

/// Generated prose for one year-month bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub year_month: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(link: Option<&str>) -> ParsedCommit {
        ParsedCommit {
            date: "2024-03-01 09:30:00".to_string(),
            repo: "api".to_string(),
            message: "Add retries".to_string(),
            link: link.map(str::to_string),
        }
    }

    #[test]
    fn test_commit_url_joins_repo_and_hash() {
        let record = CommitRecord {
            hash: "abc123".to_string(),
            message: "m".to_string(),
            date: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
            repo_name: "api".to_string(),
            repo_url: "https://github.com/acme/api/".to_string(),
        };
        assert_eq!(record.commit_url(), "https://github.com/acme/api/commit/abc123");
    }

    #[test]
    fn test_hash_and_repo_url_from_link() {
        let row = parsed(Some("https://github.com/acme/api/commit/deadbeef"));
        assert_eq!(row.hash(), Some("deadbeef"));
        assert_eq!(row.repo_url(), Some("https://github.com/acme/api"));
    }

    #[test]
    fn test_hash_missing_without_link() {
        assert_eq!(parsed(None).hash(), None);
        assert_eq!(parsed(Some("https://example.com")).hash(), None);
    }

    #[test]
    fn test_timestamp_uses_display_timezone() {
        let ts = parsed(None).timestamp().unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(ts.to_rfc3339(), "2024-03-01T09:30:00+09:00");
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        let mut row = parsed(None);
        row.date = "yesterday".to_string();
        assert!(row.timestamp().is_none());
    }
}
