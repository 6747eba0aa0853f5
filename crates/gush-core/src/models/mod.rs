pub mod adapter;
pub mod issue;
pub mod pull_request;
pub mod release;
pub mod target;

pub use adapter::AdapterKind;
pub use issue::{Issue, IssueFilter, IssueState, NewIssue};
pub use pull_request::{BranchRef, Fork, NewPullRequest, PullRequest, PullRequestRef, PullRequestState};
pub use release::{NewRelease, Release};
pub use target::RepoTarget;
