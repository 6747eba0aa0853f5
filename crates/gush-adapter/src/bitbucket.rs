use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use gush_core::error::GushError;
use gush_core::models::{
    AdapterKind, BranchRef, Fork, Issue, IssueFilter, IssueState, NewIssue, NewPullRequest,
    NewRelease, PullRequest, PullRequestRef, PullRequestState, Release, RepoTarget,
};

use crate::http::RestClient;
use crate::{parse_timestamp, web_link, Adapter, AdapterSettings, IssueTracker, PullRequests, Releases};

/// Issue kinds Bitbucket accepts; the first matching label becomes the kind.
const ISSUE_KINDS: [&str; 4] = ["bug", "enhancement", "proposal", "task"];

/// Bitbucket Cloud adapter (API 2.0, app-password auth). Has no releases.
pub struct BitbucketAdapter {
    http: RestClient,
    web_url: url::Url,
    target: RepoTarget,
}

impl BitbucketAdapter {
    pub fn new(settings: AdapterSettings) -> Result<Self, GushError> {
        let http = RestClient::new(AdapterKind::Bitbucket, settings.api_url, HeaderMap::new())?
            .with_basic_auth(&settings.credentials.username, &settings.credentials.secret);
        Ok(Self {
            http,
            web_url: settings.web_url,
            target: settings.target,
        })
    }

    fn repo_path(&self, rest: &str) -> String {
        format!("/repositories/{}/{}{rest}", self.target.org, self.target.repo)
    }
}

#[derive(Deserialize)]
struct BbUser {
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl BbUser {
    fn name(self) -> String {
        self.nickname
            .or(self.username)
            .or(self.display_name)
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct BbContent {
    #[serde(default)]
    raw: Option<String>,
}

#[derive(Deserialize)]
struct BbHref {
    href: String,
}

#[derive(Deserialize)]
struct BbLinks {
    html: Option<BbHref>,
}

#[derive(Deserialize)]
struct BbNamed {
    name: String,
}

#[derive(Deserialize)]
struct BbIssue {
    id: u64,
    title: String,
    content: Option<BbContent>,
    state: String,
    reporter: Option<BbUser>,
    assignee: Option<BbUser>,
    kind: Option<String>,
    milestone: Option<BbNamed>,
    created_on: String,
    updated_on: Option<String>,
    links: Option<BbLinks>,
}

impl BbIssue {
    fn into_issue(self, fallback_url: String) -> Issue {
        // new, open and on hold are the only states that still need work
        let state = match self.state.as_str() {
            "new" | "open" | "on hold" => IssueState::Open,
            _ => IssueState::Closed,
        };
        Issue {
            number: self.id,
            title: self.title,
            body: self.content.and_then(|c| c.raw).unwrap_or_default(),
            state,
            user: self.reporter.map(BbUser::name).unwrap_or_default(),
            assignee: self.assignee.map(BbUser::name),
            labels: self.kind.into_iter().collect(),
            milestone: self.milestone.map(|m| m.name),
            comments: 0,
            url: self
                .links
                .and_then(|l| l.html)
                .map(|h| h.href)
                .unwrap_or(fallback_url),
            created_at: parse_timestamp(&self.created_on).unwrap_or_default(),
            updated_at: self.updated_on.as_deref().and_then(parse_timestamp),
            pull_request: false,
        }
    }
}

#[derive(Deserialize)]
struct BbCreated {
    id: u64,
    links: Option<BbLinks>,
}

#[derive(Deserialize)]
struct BbCommit {
    hash: String,
}

#[derive(Deserialize)]
struct BbRepository {
    full_name: String,
}

#[derive(Deserialize)]
struct BbEndpoint {
    branch: BbNamed,
    commit: Option<BbCommit>,
    repository: Option<BbRepository>,
}

impl From<BbEndpoint> for BranchRef {
    fn from(e: BbEndpoint) -> Self {
        let (org, repo) = e
            .repository
            .and_then(|r| {
                r.full_name
                    .split_once('/')
                    .map(|(o, n)| (o.to_string(), n.to_string()))
            })
            .unwrap_or_default();
        BranchRef {
            org,
            repo,
            branch: e.branch.name,
            sha: e.commit.map(|c| c.hash).unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct BbPullRequest {
    id: u64,
    title: String,
    description: Option<String>,
    state: String,
    author: Option<BbUser>,
    source: BbEndpoint,
    destination: BbEndpoint,
    created_on: String,
    links: Option<BbLinks>,
}

impl BbPullRequest {
    fn into_pull_request(self, fallback_url: String) -> PullRequest {
        let state = self.state.parse().unwrap_or(PullRequestState::Closed);
        PullRequest {
            number: self.id,
            title: self.title,
            body: self.description.unwrap_or_default(),
            state,
            user: self.author.map(BbUser::name).unwrap_or_default(),
            head: self.source.into(),
            base: self.destination.into(),
            mergeable: None,
            merged: state == PullRequestState::Merged,
            url: self
                .links
                .and_then(|l| l.html)
                .map(|h| h.href)
                .unwrap_or(fallback_url),
            created_at: parse_timestamp(&self.created_on).unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct BbMerged {
    merge_commit: Option<BbCommit>,
}

#[derive(Deserialize)]
struct BbCloneLink {
    name: String,
    href: String,
}

#[derive(Deserialize)]
struct BbForkLinks {
    #[serde(default, rename = "clone")]
    clone_links: Vec<BbCloneLink>,
}

#[derive(Deserialize)]
struct BbFork {
    full_name: String,
    links: BbForkLinks,
}

#[async_trait]
impl Adapter for BitbucketAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Bitbucket
    }

    fn target(&self) -> &RepoTarget {
        &self.target
    }

    fn set_target(&mut self, target: RepoTarget) {
        self.target = target;
    }

    async fn authenticated_user(&self) -> Result<String, GushError> {
        let user: BbUser = self.http.get("/user").await?;
        Ok(user.name())
    }
}

#[async_trait]
impl IssueTracker for BitbucketAdapter {
    async fn open_issue(&self, issue: &NewIssue) -> Result<u64, GushError> {
        let mut body = json!({
            "title": issue.title,
            "content": { "raw": issue.body },
        });
        if let Some(kind) = issue
            .labels
            .iter()
            .find(|l| ISSUE_KINDS.contains(&l.as_str()))
        {
            body["kind"] = json!(kind);
        }
        let created: BbCreated = self
            .http
            .send_json(Method::POST, &self.repo_path("/issues"), &body)
            .await?;
        tracing::info!("opened issue #{} on {}", created.id, self.target);
        Ok(created.id)
    }

    async fn get_issue(&self, number: u64) -> Result<Issue, GushError> {
        let issue: BbIssue = self
            .http
            .get(&self.repo_path(&format!("/issues/{number}")))
            .await?;
        Ok(issue.into_issue(self.issue_url(number)))
    }

    async fn get_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, GushError> {
        let issues: Vec<BbIssue> = self
            .http
            .paginated_values(&self.repo_path("/issues"), &[("pagelen", "50".to_string())])
            .await?;
        Ok(issues
            .into_iter()
            .map(|i| {
                let url = self.issue_url(i.id);
                i.into_issue(url)
            })
            .filter(|i| filter.matches(i))
            .collect())
    }

    async fn close_issue(&self, number: u64) -> Result<(), GushError> {
        let _: serde_json::Value = self
            .http
            .send_json(
                Method::PUT,
                &self.repo_path(&format!("/issues/{number}")),
                &json!({ "state": "closed" }),
            )
            .await?;
        tracing::info!("closed issue #{number} on {}", self.target);
        Ok(())
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<String, GushError> {
        let created: BbCreated = self
            .http
            .send_json(
                Method::POST,
                &self.repo_path(&format!("/issues/{number}/comments")),
                &json!({ "content": { "raw": body } }),
            )
            .await?;
        Ok(created
            .links
            .and_then(|l| l.html)
            .map(|h| h.href)
            .unwrap_or_else(|| format!("{}#comment-{}", self.issue_url(number), created.id)))
    }

    fn issue_url(&self, number: u64) -> String {
        web_link(&self.web_url, &format!("{}/issues/{number}", self.target.full_name()))
    }
}

#[async_trait]
impl PullRequests for BitbucketAdapter {
    async fn create_fork(&self, org: Option<&str>) -> Result<Fork, GushError> {
        let body = match org {
            Some(org) => json!({ "workspace": { "slug": org } }),
            None => json!({}),
        };
        let fork: BbFork = self
            .http
            .send_json(Method::POST, &self.repo_path("/forks"), &body)
            .await?;
        let (fork_org, fork_repo) = fork
            .full_name
            .split_once('/')
            .map(|(o, r)| (o.to_string(), r.to_string()))
            .unwrap_or_else(|| {
                (org.unwrap_or_default().to_string(), self.target.repo.clone())
            });
        let clone_url = fork
            .links
            .clone_links
            .iter()
            .find(|l| l.name == "ssh")
            .or_else(|| fork.links.clone_links.first())
            .map(|l| l.href.clone())
            .unwrap_or_default();
        Ok(Fork {
            org: fork_org,
            repo: fork_repo,
            clone_url,
        })
    }

    async fn open_pull_request(&self, pr: &NewPullRequest) -> Result<PullRequestRef, GushError> {
        let (head_org, branch) = pr.head_parts();
        let source_repo = format!(
            "{}/{}",
            head_org.unwrap_or(&self.target.org),
            self.target.repo
        );
        let created: BbCreated = self
            .http
            .send_json(
                Method::POST,
                &self.repo_path("/pullrequests"),
                &json!({
                    "title": pr.title,
                    "description": pr.body,
                    "source": {
                        "branch": { "name": branch },
                        "repository": { "full_name": source_repo },
                    },
                    "destination": { "branch": { "name": pr.base } },
                }),
            )
            .await?;
        let url = created
            .links
            .and_then(|l| l.html)
            .map(|h| h.href)
            .unwrap_or_else(|| self.pull_request_url(created.id));
        Ok(PullRequestRef {
            number: created.id,
            url,
        })
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, GushError> {
        let pr: BbPullRequest = self
            .http
            .get(&self.repo_path(&format!("/pullrequests/{number}")))
            .await?;
        Ok(pr.into_pull_request(self.pull_request_url(number)))
    }

    async fn get_pull_requests(
        &self,
        state: Option<PullRequestState>,
    ) -> Result<Vec<PullRequest>, GushError> {
        let mut query = vec![("pagelen", "50".to_string())];
        let states: &[&str] = match state {
            None => &["OPEN", "MERGED", "DECLINED"],
            Some(PullRequestState::Open) => &["OPEN"],
            Some(PullRequestState::Merged) => &["MERGED"],
            Some(PullRequestState::Closed) => &["DECLINED"],
        };
        for s in states {
            query.push(("state", s.to_string()));
        }
        let prs: Vec<BbPullRequest> = self
            .http
            .paginated_values(&self.repo_path("/pullrequests"), &query)
            .await?;
        Ok(prs
            .into_iter()
            .map(|pr| {
                let url = self.pull_request_url(pr.id);
                pr.into_pull_request(url)
            })
            .collect())
    }

    async fn merge_pull_request(
        &self,
        number: u64,
        message: &str,
        squash: bool,
    ) -> Result<String, GushError> {
        let merged: BbMerged = self
            .http
            .send_json(
                Method::POST,
                &self.repo_path(&format!("/pullrequests/{number}/merge")),
                &json!({
                    "message": message,
                    "merge_strategy": if squash { "squash" } else { "merge_commit" },
                }),
            )
            .await?;
        Ok(merged.merge_commit.map(|c| c.hash).unwrap_or_default())
    }

    async fn close_pull_request(&self, number: u64) -> Result<(), GushError> {
        self.http
            .send_empty::<()>(
                Method::POST,
                &self.repo_path(&format!("/pullrequests/{number}/decline")),
                None,
            )
            .await
    }

    async fn comment_pull_request(&self, number: u64, body: &str) -> Result<String, GushError> {
        let created: BbCreated = self
            .http
            .send_json(
                Method::POST,
                &self.repo_path(&format!("/pullrequests/{number}/comments")),
                &json!({ "content": { "raw": body } }),
            )
            .await?;
        Ok(created
            .links
            .and_then(|l| l.html)
            .map(|h| h.href)
            .unwrap_or_else(|| format!("{}#comment-{}", self.pull_request_url(number), created.id)))
    }

    fn pull_request_url(&self, number: u64) -> String {
        web_link(
            &self.web_url,
            &format!("{}/pull-requests/{number}", self.target.full_name()),
        )
    }
}

#[async_trait]
impl Releases for BitbucketAdapter {
    async fn create_release(&self, _release: &NewRelease) -> Result<Release, GushError> {
        Err(GushError::unsupported("bitbucket", "releases"))
    }

    async fn get_releases(&self) -> Result<Vec<Release>, GushError> {
        Err(GushError::unsupported("bitbucket", "releases"))
    }

    async fn remove_release(&self, _id: &str) -> Result<(), GushError> {
        Err(GushError::unsupported("bitbucket", "releases"))
    }
}
