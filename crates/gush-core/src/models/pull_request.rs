use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PullRequestState::Open => write!(f, "open"),
            PullRequestState::Closed => write!(f, "closed"),
            PullRequestState::Merged => write!(f, "merged"),
        }
    }
}

impl std::str::FromStr for PullRequestState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" | "opened" => Ok(PullRequestState::Open),
            "closed" | "declined" | "superseded" => Ok(PullRequestState::Closed),
            "merged" => Ok(PullRequestState::Merged),
            _ => Err(format!("unknown pull request state: {s}")),
        }
    }
}

/// One side of a pull request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchRef {
    pub org: String,
    pub repo: String,
    pub branch: String,
    pub sha: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: PullRequestState,
    pub user: String,
    pub head: BranchRef,
    pub base: BranchRef,
    /// `None` while the service is still computing mergeability.
    pub mergeable: Option<bool>,
    pub merged: bool,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for opening a pull request. `head` is `org:branch`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPullRequest {
    pub base: String,
    pub head: String,
    pub title: String,
    pub body: String,
}

impl NewPullRequest {
    /// Split `head` into its org and branch. A bare branch has no org.
    pub fn head_parts(&self) -> (Option<&str>, &str) {
        match self.head.split_once(':') {
            Some((org, branch)) => (Some(org), branch),
            None => (None, self.head.as_str()),
        }
    }
}

/// Number and link of a freshly opened pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub number: u64,
    pub url: String,
}

/// A fork created on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fork {
    pub org: String,
    pub repo: String,
    pub clone_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_parts() {
        let pr = NewPullRequest {
            base: "master".into(),
            head: "cordoval:feature-x".into(),
            title: String::new(),
            body: String::new(),
        };
        assert_eq!(pr.head_parts(), (Some("cordoval"), "feature-x"));
    }

    #[test]
    fn test_bitbucket_states() {
        assert_eq!(
            "DECLINED".parse::<PullRequestState>().unwrap(),
            PullRequestState::Closed
        );
        assert_eq!(
            "MERGED".parse::<PullRequestState>().unwrap(),
            PullRequestState::Merged
        );
    }
}
