pub mod bitbucket;
pub mod github;
pub mod gitlab;
pub mod http;
pub mod jira;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gush_auth::Credentials;
use gush_core::error::GushError;
use gush_core::models::{
    AdapterKind, Fork, Issue, IssueFilter, NewIssue, NewPullRequest, NewRelease, PullRequest,
    PullRequestRef, PullRequestState, Release, RepoTarget,
};

/// Behaviour shared by every adapter.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The kind of service this adapter talks to.
    fn kind(&self) -> AdapterKind;

    /// The org/repository (or Jira project) calls currently operate on.
    fn target(&self) -> &RepoTarget;

    /// Point subsequent calls at another org/repository.
    fn set_target(&mut self, target: RepoTarget);

    /// Validate the credentials, returning the authenticated login.
    async fn authenticated_user(&self) -> Result<String, GushError>;
}

/// Issue tracker capability.
#[async_trait]
pub trait IssueTracker: Adapter {
    /// Open an issue on the current target, returning its number.
    async fn open_issue(&self, issue: &NewIssue) -> Result<u64, GushError>;

    async fn get_issue(&self, number: u64) -> Result<Issue, GushError>;

    /// List issues matching `filter`. Pull requests are never included.
    async fn get_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, GushError>;

    async fn close_issue(&self, number: u64) -> Result<(), GushError>;

    /// Comment on an issue, returning a link to the comment.
    async fn create_comment(&self, number: u64, body: &str) -> Result<String, GushError>;

    /// Web link to an issue on the current target.
    fn issue_url(&self, number: u64) -> String;
}

/// Pull request and fork capability.
#[async_trait]
pub trait PullRequests: Adapter {
    /// Fork the current target into `org`, or into the authenticated
    /// account when `org` is `None`.
    async fn create_fork(&self, org: Option<&str>) -> Result<Fork, GushError>;

    async fn open_pull_request(&self, pr: &NewPullRequest) -> Result<PullRequestRef, GushError>;

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, GushError>;

    async fn get_pull_requests(
        &self,
        state: Option<PullRequestState>,
    ) -> Result<Vec<PullRequest>, GushError>;

    /// Merge a pull request, returning the resulting commit sha.
    async fn merge_pull_request(
        &self,
        number: u64,
        message: &str,
        squash: bool,
    ) -> Result<String, GushError>;

    async fn close_pull_request(&self, number: u64) -> Result<(), GushError>;

    /// Comment on a pull request, returning a link to the comment.
    async fn comment_pull_request(&self, number: u64, body: &str) -> Result<String, GushError>;

    fn pull_request_url(&self, number: u64) -> String;
}

/// Release capability.
#[async_trait]
pub trait Releases: Adapter {
    async fn create_release(&self, release: &NewRelease) -> Result<Release, GushError>;

    async fn get_releases(&self) -> Result<Vec<Release>, GushError>;

    /// Remove a release by its id (GitHub) or tag (GitLab).
    async fn remove_release(&self, id: &str) -> Result<(), GushError>;
}

/// Everything a repository hosting service offers.
pub trait RepoAdapter: PullRequests + Releases {}

impl<T: PullRequests + Releases> RepoAdapter for T {}

/// What the factory needs to build an adapter.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub kind: AdapterKind,
    pub api_url: url::Url,
    pub web_url: url::Url,
    pub credentials: Credentials,
    pub target: RepoTarget,
}

/// Create the repository adapter for `settings.kind`.
pub fn create_repo_adapter(settings: AdapterSettings) -> Result<Box<dyn RepoAdapter>, GushError> {
    tracing::debug!(adapter = %settings.kind, target = %settings.target, "creating repository adapter");
    match settings.kind {
        AdapterKind::GitHub => Ok(Box::new(github::GitHubAdapter::new(settings)?)),
        AdapterKind::GitLab => Ok(Box::new(gitlab::GitLabAdapter::new(settings)?)),
        AdapterKind::Bitbucket => Ok(Box::new(bitbucket::BitbucketAdapter::new(settings)?)),
        AdapterKind::Jira => Err(GushError::Config {
            message: "jira can only be used as an issue tracker".into(),
        }),
    }
}

/// Create the issue tracker for `settings.kind`.
pub fn create_issue_tracker(settings: AdapterSettings) -> Result<Box<dyn IssueTracker>, GushError> {
    tracing::debug!(adapter = %settings.kind, target = %settings.target, "creating issue tracker");
    match settings.kind {
        AdapterKind::GitHub => Ok(Box::new(github::GitHubAdapter::new(settings)?)),
        AdapterKind::GitLab => Ok(Box::new(gitlab::GitLabAdapter::new(settings)?)),
        AdapterKind::Bitbucket => Ok(Box::new(bitbucket::BitbucketAdapter::new(settings)?)),
        AdapterKind::Jira => Ok(Box::new(jira::JiraAdapter::new(settings)?)),
    }
}

/// Parse the timestamp formats the supported services emit.
///
/// RFC 3339 covers GitHub, GitLab and Bitbucket; Jira uses a numeric offset
/// without a colon (`2014-01-05T10:00:00.000+0000`).
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Web link `<web>/<path>` with no doubled slashes.
pub(crate) fn web_link(web_url: &url::Url, path: &str) -> String {
    let base = web_url.as_str().trim_end_matches('/');
    format!("{base}/{}", path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gush_auth::AuthMethod;

    fn settings(kind: AdapterKind) -> AdapterSettings {
        AdapterSettings {
            kind,
            api_url: kind.default_api_url(),
            web_url: kind.default_web_url(),
            credentials: Credentials::new("cordoval", "secret", AuthMethod::for_adapter(kind)),
            target: RepoTarget::new("gushphp", "gush"),
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2014-01-05T10:00:00Z").unwrap();
        let jira = parse_timestamp("2014-01-05T11:00:00.000+0100").unwrap();
        let bitbucket = parse_timestamp("2014-01-05T10:00:00.123456+00:00").unwrap();
        assert_eq!(rfc, jira);
        assert_eq!(rfc.format("%Y-%m-%d %H:%M").to_string(), "2014-01-05 10:00");
        assert_eq!(bitbucket.format("%H:%M").to_string(), "10:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_web_link_joins_cleanly() {
        let web = url::Url::parse("https://github.com/").unwrap();
        assert_eq!(web_link(&web, "/gushphp/gush/issues/1"), "https://github.com/gushphp/gush/issues/1");
    }

    #[test]
    fn test_factory_rejects_jira_repository_adapter() {
        assert!(create_repo_adapter(settings(AdapterKind::Jira)).is_err());
        assert!(create_issue_tracker(settings(AdapterKind::Jira)).is_ok());
    }

    #[test]
    fn test_factory_builds_every_repository_adapter() {
        for kind in [AdapterKind::GitHub, AdapterKind::GitLab, AdapterKind::Bitbucket] {
            let adapter = create_repo_adapter(settings(kind)).unwrap();
            assert_eq!(adapter.kind(), kind);
            assert_eq!(adapter.target(), &RepoTarget::new("gushphp", "gush"));
        }
    }
}
