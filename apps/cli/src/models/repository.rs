use serde::Deserialize;

/// A clonable remote as reported by `gh repo list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub name: String,
    pub url: String,
}

impl Repository {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// HTTPS clone URL derived from the web URL.
    pub fn clone_url(&self) -> String {
        let base = self.url.trim_end_matches('/');
        if base.ends_with(".git") {
            base.to_string()
        } else {
            format!("{base}.git")
        }
    }
}

/// Login handles and e-mail addresses whose commits count as "ours".
/// Matching is an OR over every identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorIdentity {
    identities: Vec<String>,
}

impl AuthorIdentity {
    pub fn new(login: &str, email: Option<&str>) -> Self {
        let mut identity = Self::default();
        identity.push(login);
        if let Some(email) = email {
            identity.push(email);
        }
        identity
    }

    /// Adds one identity. Blank and duplicate values are ignored.
    pub fn push(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() || self.identities.iter().any(|i| i == value) {
            return;
        }
        self.identities.push(value.to_string());
    }

    /// Adds every entry of a comma-separated list such as `old-handle, old@mail.com`.
    pub fn extend_from_csv(&mut self, csv: &str) {
        for value in csv.split(',') {
            self.push(value);
        }
    }

    /// One `--author=` argument per identity; git ORs repeated `--author` filters.
    pub fn git_log_args(&self) -> Vec<String> {
        self.identities
            .iter()
            .map(|identity| format!("--author={identity}"))
            .collect()
    }
}

impl std::fmt::Display for AuthorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identities.join(", "))
    }
}
