use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an issue is open or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueState::Open => write!(f, "open"),
            IssueState::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for IssueState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" | "opened" => Ok(IssueState::Open),
            "closed" => Ok(IssueState::Closed),
            _ => Err(format!("unknown issue state: {s}")),
        }
    }
}

/// An issue as returned by an issue tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: IssueState,
    pub user: String,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    pub milestone: Option<String>,
    pub comments: u32,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// GitHub reports pull requests through the issues API too.
    pub pull_request: bool,
}

/// Fields for opening a new issue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignee: Option<String>,
    pub milestone: Option<String>,
}

impl NewIssue {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Copy labels, assignee and milestone from an existing issue.
    pub fn with_metadata_of(mut self, issue: &Issue) -> Self {
        self.labels = issue.labels.clone();
        self.assignee = issue.assignee.clone();
        self.milestone = issue.milestone.clone();
        self
    }
}

/// Criteria for listing issues.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub state: Option<IssueState>,
    pub labels: Vec<String>,
    pub assignee: Option<String>,
}

impl IssueFilter {
    pub fn matches(&self, issue: &Issue) -> bool {
        if let Some(state) = self.state {
            if issue.state != state {
                return false;
            }
        }
        if let Some(ref assignee) = self.assignee {
            if issue.assignee.as_deref() != Some(assignee.as_str()) {
                return false;
            }
        }
        self.labels.iter().all(|l| issue.labels.contains(l))
    }
}
