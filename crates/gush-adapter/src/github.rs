use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use gush_core::error::GushError;
use gush_core::models::{
    AdapterKind, BranchRef, Fork, Issue, IssueFilter, IssueState, NewIssue, NewPullRequest,
    NewRelease, PullRequest, PullRequestRef, PullRequestState, Release, RepoTarget,
};

use crate::http::RestClient;
use crate::{web_link, Adapter, AdapterSettings, IssueTracker, PullRequests, Releases};

pub struct GitHubAdapter {
    http: RestClient,
    web_url: url::Url,
    target: RepoTarget,
}

impl GitHubAdapter {
    pub fn new(settings: AdapterSettings) -> Result<Self, GushError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::AUTHORIZATION,
            RestClient::header_value(
                AdapterKind::GitHub,
                &format!("Bearer {}", settings.credentials.secret),
            )?,
        );

        Ok(Self {
            http: RestClient::new(AdapterKind::GitHub, settings.api_url, headers)?,
            web_url: settings.web_url,
            target: settings.target,
        })
    }

    fn repo_path(&self, rest: &str) -> String {
        format!("/repos/{}/{}{rest}", self.target.org, self.target.repo)
    }
}

#[derive(Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Deserialize)]
struct GhMilestone {
    title: String,
}

#[derive(Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    user: GhUser,
    assignee: Option<GhUser>,
    #[serde(default)]
    labels: Vec<GhLabel>,
    milestone: Option<GhMilestone>,
    #[serde(default)]
    comments: u32,
    html_url: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    pull_request: Option<serde_json::Value>,
}

impl From<GhIssue> for Issue {
    fn from(i: GhIssue) -> Self {
        Issue {
            number: i.number,
            title: i.title,
            body: i.body.unwrap_or_default(),
            state: i.state.parse().unwrap_or(IssueState::Open),
            user: i.user.login,
            assignee: i.assignee.map(|a| a.login),
            labels: i.labels.into_iter().map(|l| l.name).collect(),
            milestone: i.milestone.map(|m| m.title),
            comments: i.comments,
            url: i.html_url,
            created_at: i.created_at,
            updated_at: i.updated_at,
            pull_request: i.pull_request.is_some(),
        }
    }
}

#[derive(Serialize)]
struct GhNewIssue<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assignees: Vec<&'a str>,
}

#[derive(Deserialize)]
struct GhNumbered {
    number: u64,
    html_url: String,
}

#[derive(Deserialize)]
struct GhComment {
    html_url: String,
}

#[derive(Deserialize)]
struct GhRepoRef {
    name: String,
    owner: GhUser,
}

#[derive(Deserialize)]
struct GhBranch {
    #[serde(rename = "ref")]
    branch: String,
    sha: String,
    repo: Option<GhRepoRef>,
}

impl From<GhBranch> for BranchRef {
    fn from(b: GhBranch) -> Self {
        let (org, repo) = b
            .repo
            .map(|r| (r.owner.login, r.name))
            .unwrap_or_default();
        BranchRef {
            org,
            repo,
            branch: b.branch,
            sha: b.sha,
        }
    }
}

#[derive(Deserialize)]
struct GhPull {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    user: GhUser,
    head: GhBranch,
    base: GhBranch,
    mergeable: Option<bool>,
    #[serde(default)]
    merged: bool,
    merged_at: Option<String>,
    html_url: String,
    created_at: DateTime<Utc>,
}

impl From<GhPull> for PullRequest {
    fn from(p: GhPull) -> Self {
        let merged = p.merged || p.merged_at.is_some();
        let state = if merged {
            PullRequestState::Merged
        } else {
            p.state.parse().unwrap_or(PullRequestState::Open)
        };
        PullRequest {
            number: p.number,
            title: p.title,
            body: p.body.unwrap_or_default(),
            state,
            user: p.user.login,
            head: p.head.into(),
            base: p.base.into(),
            mergeable: p.mergeable,
            merged,
            url: p.html_url,
            created_at: p.created_at,
        }
    }
}

#[derive(Deserialize)]
struct GhMerge {
    sha: String,
}

#[derive(Deserialize)]
struct GhFork {
    name: String,
    owner: GhUser,
    ssh_url: String,
}

#[derive(Deserialize)]
struct GhRelease {
    id: u64,
    name: Option<String>,
    tag_name: String,
    body: Option<String>,
    draft: bool,
    prerelease: bool,
    html_url: String,
    created_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
}

impl From<GhRelease> for Release {
    fn from(r: GhRelease) -> Self {
        Release {
            id: r.id.to_string(),
            name: r.name.filter(|n| !n.is_empty()).unwrap_or_else(|| r.tag_name.clone()),
            tag_name: r.tag_name,
            body: r.body.unwrap_or_default(),
            draft: r.draft,
            prerelease: r.prerelease,
            url: r.html_url,
            created_at: r.created_at,
            published_at: r.published_at,
        }
    }
}

#[async_trait]
impl Adapter for GitHubAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::GitHub
    }

    fn target(&self) -> &RepoTarget {
        &self.target
    }

    fn set_target(&mut self, target: RepoTarget) {
        self.target = target;
    }

    async fn authenticated_user(&self) -> Result<String, GushError> {
        let user: GhUser = self.http.get("/user").await?;
        Ok(user.login)
    }
}

#[async_trait]
impl IssueTracker for GitHubAdapter {
    async fn open_issue(&self, issue: &NewIssue) -> Result<u64, GushError> {
        let body = GhNewIssue {
            title: &issue.title,
            body: &issue.body,
            labels: issue.labels.iter().map(String::as_str).collect(),
            assignees: issue.assignee.iter().map(String::as_str).collect(),
        };
        let created: GhNumbered = self
            .http
            .send_json(Method::POST, &self.repo_path("/issues"), &body)
            .await?;
        tracing::info!("opened issue #{} on {}", created.number, self.target);
        Ok(created.number)
    }

    async fn get_issue(&self, number: u64) -> Result<Issue, GushError> {
        let issue: GhIssue = self
            .http
            .get(&self.repo_path(&format!("/issues/{number}")))
            .await?;
        Ok(issue.into())
    }

    async fn get_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, GushError> {
        let mut query = vec![(
            "state",
            filter
                .state
                .map(|s| s.to_string())
                .unwrap_or_else(|| "all".to_string()),
        )];
        if !filter.labels.is_empty() {
            query.push(("labels", filter.labels.join(",")));
        }
        if let Some(ref assignee) = filter.assignee {
            query.push(("assignee", assignee.clone()));
        }

        let issues: Vec<GhIssue> = self
            .http
            .paginated_get(&self.repo_path("/issues"), &query, 100)
            .await?;
        Ok(issues
            .into_iter()
            .map(Issue::from)
            .filter(|i| !i.pull_request)
            .collect())
    }

    async fn close_issue(&self, number: u64) -> Result<(), GushError> {
        let _: serde_json::Value = self
            .http
            .send_json(
                Method::PATCH,
                &self.repo_path(&format!("/issues/{number}")),
                &json!({ "state": "closed" }),
            )
            .await?;
        tracing::info!("closed issue #{number} on {}", self.target);
        Ok(())
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<String, GushError> {
        let comment: GhComment = self
            .http
            .send_json(
                Method::POST,
                &self.repo_path(&format!("/issues/{number}/comments")),
                &json!({ "body": body }),
            )
            .await?;
        Ok(comment.html_url)
    }

    fn issue_url(&self, number: u64) -> String {
        web_link(
            &self.web_url,
            &format!("{}/{}/issues/{number}", self.target.org, self.target.repo),
        )
    }
}

#[async_trait]
impl PullRequests for GitHubAdapter {
    async fn create_fork(&self, org: Option<&str>) -> Result<Fork, GushError> {
        let body = match org {
            Some(org) => json!({ "organization": org }),
            None => json!({}),
        };
        let fork: GhFork = self
            .http
            .send_json(Method::POST, &self.repo_path("/forks"), &body)
            .await?;
        Ok(Fork {
            org: fork.owner.login,
            repo: fork.name,
            clone_url: fork.ssh_url,
        })
    }

    async fn open_pull_request(&self, pr: &NewPullRequest) -> Result<PullRequestRef, GushError> {
        let created: GhNumbered = self
            .http
            .send_json(
                Method::POST,
                &self.repo_path("/pulls"),
                &json!({
                    "title": pr.title,
                    "body": pr.body,
                    "head": pr.head,
                    "base": pr.base,
                }),
            )
            .await?;
        Ok(PullRequestRef {
            number: created.number,
            url: created.html_url,
        })
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, GushError> {
        let pull: GhPull = self
            .http
            .get(&self.repo_path(&format!("/pulls/{number}")))
            .await?;
        Ok(pull.into())
    }

    async fn get_pull_requests(
        &self,
        state: Option<PullRequestState>,
    ) -> Result<Vec<PullRequest>, GushError> {
        // GitHub has no "merged" filter; merged pulls are closed ones with merged_at set.
        let api_state = match state {
            None => "all",
            Some(PullRequestState::Open) => "open",
            Some(PullRequestState::Closed | PullRequestState::Merged) => "closed",
        };
        let pulls: Vec<GhPull> = self
            .http
            .paginated_get(&self.repo_path("/pulls"), &[("state", api_state.to_string())], 100)
            .await?;
        Ok(pulls
            .into_iter()
            .map(PullRequest::from)
            .filter(|p| state.map_or(true, |s| p.state == s))
            .collect())
    }

    async fn merge_pull_request(
        &self,
        number: u64,
        message: &str,
        squash: bool,
    ) -> Result<String, GushError> {
        let merged: GhMerge = self
            .http
            .send_json(
                Method::PUT,
                &self.repo_path(&format!("/pulls/{number}/merge")),
                &json!({
                    "commit_message": message,
                    "merge_method": if squash { "squash" } else { "merge" },
                }),
            )
            .await?;
        tracing::info!("merged pull request #{number} on {} as {}", self.target, merged.sha);
        Ok(merged.sha)
    }

    async fn close_pull_request(&self, number: u64) -> Result<(), GushError> {
        let _: serde_json::Value = self
            .http
            .send_json(
                Method::PATCH,
                &self.repo_path(&format!("/pulls/{number}")),
                &json!({ "state": "closed" }),
            )
            .await?;
        Ok(())
    }

    async fn comment_pull_request(&self, number: u64, body: &str) -> Result<String, GushError> {
        // Conversation comments on a pull request live on its issue.
        IssueTracker::create_comment(self, number, body).await
    }

    fn pull_request_url(&self, number: u64) -> String {
        web_link(
            &self.web_url,
            &format!("{}/{}/pull/{number}", self.target.org, self.target.repo),
        )
    }
}

#[async_trait]
impl Releases for GitHubAdapter {
    async fn create_release(&self, release: &NewRelease) -> Result<Release, GushError> {
        let mut body = json!({
            "tag_name": release.tag_name,
            "name": release.name,
            "body": release.body,
            "draft": release.draft,
            "prerelease": release.prerelease,
        });
        if let Some(ref target) = release.target {
            body["target_commitish"] = json!(target);
        }
        let created: GhRelease = self
            .http
            .send_json(Method::POST, &self.repo_path("/releases"), &body)
            .await?;
        Ok(created.into())
    }

    async fn get_releases(&self) -> Result<Vec<Release>, GushError> {
        let releases: Vec<GhRelease> = self
            .http
            .paginated_get(&self.repo_path("/releases"), &[], 100)
            .await?;
        Ok(releases.into_iter().map(Release::from).collect())
    }

    async fn remove_release(&self, id: &str) -> Result<(), GushError> {
        let id: u64 = id.parse().map_err(|_| GushError::Other(format!(
            "invalid GitHub release id: {id}"
        )))?;
        self.http
            .delete(&self.repo_path(&format!("/releases/{id}")))
            .await
    }
}
