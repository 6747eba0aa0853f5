use serde::{Deserialize, Serialize};

/// The organization (or user) and repository an adapter operates on.
///
/// For issue trackers that are not repository based (Jira) `repo` holds the
/// project key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoTarget {
    pub org: String,
    pub repo: String,
}

impl RepoTarget {
    pub fn new(org: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
        }
    }

    /// `org/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }

    /// Parse the org and repository out of a git remote URL.
    ///
    /// Accepts `https://host/org/repo(.git)`, `ssh://git@host[:port]/org/repo.git`
    /// and the scp-like `git@host:org/repo.git`. Nested groups (GitLab) keep
    /// everything before the last segment as the org.
    pub fn from_remote_url(remote: &str) -> Option<Self> {
        let remote = remote.trim();
        let path = if let Some((_, rest)) = remote.split_once("://") {
            // scheme://[user@]host[:port]/path
            rest.split_once('/')?.1
        } else if let Some((host, rest)) = remote.split_once(':') {
            if host.contains('/') {
                return None;
            }
            rest
        } else {
            return None;
        };

        let path = path.trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let (org, repo) = path.rsplit_once('/')?;
        if org.is_empty() || repo.is_empty() {
            return None;
        }
        Some(Self::new(org, repo))
    }
}

impl std::fmt::Display for RepoTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.org, self.repo)
    }
}
