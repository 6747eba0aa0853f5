use async_trait::async_trait;
use chrono::{DateTime, Utc};
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
use crate::{web_link, Adapter, AdapterSettings, IssueTracker, PullRequests, Releases};

/// GitLab adapter. Pull requests are merge requests; releases are keyed by tag.
pub struct GitLabAdapter {
    http: RestClient,
    web_url: url::Url,
    target: RepoTarget,
}

impl GitLabAdapter {
    pub fn new(settings: AdapterSettings) -> Result<Self, GushError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "PRIVATE-TOKEN",
            RestClient::header_value(AdapterKind::GitLab, &settings.credentials.secret)?,
        );

        Ok(Self {
            http: RestClient::new(AdapterKind::GitLab, settings.api_url, headers)?,
            web_url: settings.web_url,
            target: settings.target,
        })
    }

    /// `/projects/<url-encoded org/repo><rest>`
    fn project_path(&self, target: &RepoTarget, rest: &str) -> String {
        format!("/projects/{}{rest}", encode(&target.full_name()))
    }

    fn path(&self, rest: &str) -> String {
        self.project_path(&self.target, rest)
    }
}

fn encode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

#[derive(Deserialize)]
struct GlUser {
    username: String,
}

#[derive(Deserialize)]
struct GlMilestone {
    title: String,
}

#[derive(Deserialize)]
struct GlIssue {
    iid: u64,
    title: String,
    description: Option<String>,
    state: String,
    author: GlUser,
    assignee: Option<GlUser>,
    #[serde(default)]
    labels: Vec<String>,
    milestone: Option<GlMilestone>,
    #[serde(default)]
    user_notes_count: u32,
    web_url: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<GlIssue> for Issue {
    fn from(i: GlIssue) -> Self {
        Issue {
            number: i.iid,
            title: i.title,
            body: i.description.unwrap_or_default(),
            state: i.state.parse().unwrap_or(IssueState::Open),
            user: i.author.username,
            assignee: i.assignee.map(|a| a.username),
            labels: i.labels,
            milestone: i.milestone.map(|m| m.title),
            comments: i.user_notes_count,
            url: i.web_url,
            created_at: i.created_at,
            updated_at: i.updated_at,
            pull_request: false,
        }
    }
}

#[derive(Deserialize)]
struct GlCreated {
    iid: u64,
    web_url: String,
}

#[derive(Deserialize)]
struct GlNote {
    id: u64,
}

#[derive(Deserialize)]
struct GlProject {
    id: u64,
    path: String,
    namespace: GlNamespace,
    ssh_url_to_repo: String,
}

#[derive(Deserialize)]
struct GlNamespace {
    full_path: String,
}

#[derive(Deserialize)]
struct GlMergeRequest {
    iid: u64,
    title: String,
    description: Option<String>,
    state: String,
    author: GlUser,
    source_branch: String,
    target_branch: String,
    sha: Option<String>,
    merge_status: Option<String>,
    merge_commit_sha: Option<String>,
    squash_commit_sha: Option<String>,
    web_url: String,
    created_at: DateTime<Utc>,
}

impl GlMergeRequest {
    fn into_pull_request(self, target: &RepoTarget) -> PullRequest {
        let state = self.state.parse().unwrap_or(PullRequestState::Closed);
        let mergeable = match self.merge_status.as_deref() {
            Some("can_be_merged") => Some(true),
            Some("cannot_be_merged") | Some("cannot_be_merged_recheck") => Some(false),
            _ => None,
        };
        PullRequest {
            number: self.iid,
            title: self.title,
            body: self.description.unwrap_or_default(),
            state,
            user: self.author.username,
            head: BranchRef {
                org: target.org.clone(),
                repo: target.repo.clone(),
                branch: self.source_branch,
                sha: self.sha.unwrap_or_default(),
            },
            base: BranchRef {
                org: target.org.clone(),
                repo: target.repo.clone(),
                branch: self.target_branch,
                sha: String::new(),
            },
            mergeable,
            merged: state == PullRequestState::Merged,
            url: self.web_url,
            created_at: self.created_at,
        }
    }
}

#[derive(Deserialize)]
struct GlReleaseLinks {
    #[serde(rename = "self")]
    self_link: Option<String>,
}

#[derive(Deserialize)]
struct GlRelease {
    name: Option<String>,
    tag_name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    released_at: Option<DateTime<Utc>>,
    #[serde(default)]
    upcoming_release: bool,
    #[serde(rename = "_links")]
    links: Option<GlReleaseLinks>,
}

impl From<GlRelease> for Release {
    fn from(r: GlRelease) -> Self {
        Release {
            id: r.tag_name.clone(),
            name: r.name.filter(|n| !n.is_empty()).unwrap_or_else(|| r.tag_name.clone()),
            tag_name: r.tag_name,
            body: r.description.unwrap_or_default(),
            draft: false,
            prerelease: r.upcoming_release,
            url: r.links.and_then(|l| l.self_link).unwrap_or_default(),
            created_at: r.created_at,
            published_at: r.released_at,
        }
    }
}

#[async_trait]
impl Adapter for GitLabAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::GitLab
    }

    fn target(&self) -> &RepoTarget {
        &self.target
    }

    fn set_target(&mut self, target: RepoTarget) {
        self.target = target;
    }

    async fn authenticated_user(&self) -> Result<String, GushError> {
        let user: GlUser = self.http.get("/user").await?;
        Ok(user.username)
    }
}

#[async_trait]
impl IssueTracker for GitLabAdapter {
    async fn open_issue(&self, issue: &NewIssue) -> Result<u64, GushError> {
        let mut body = json!({
            "title": issue.title,
            "description": issue.body,
        });
        if !issue.labels.is_empty() {
            body["labels"] = json!(issue.labels.join(","));
        }
        let created: GlCreated = self
            .http
            .send_json(Method::POST, &self.path("/issues"), &body)
            .await?;
        tracing::info!("opened issue #{} on {}", created.iid, self.target);
        Ok(created.iid)
    }

    async fn get_issue(&self, number: u64) -> Result<Issue, GushError> {
        let issue: GlIssue = self.http.get(&self.path(&format!("/issues/{number}"))).await?;
        Ok(issue.into())
    }

    async fn get_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, GushError> {
        let mut query = Vec::new();
        match filter.state {
            Some(IssueState::Open) => query.push(("state", "opened".to_string())),
            Some(IssueState::Closed) => query.push(("state", "closed".to_string())),
            None => {}
        }
        if !filter.labels.is_empty() {
            query.push(("labels", filter.labels.join(",")));
        }
        if let Some(ref assignee) = filter.assignee {
            query.push(("assignee_username", assignee.clone()));
        }
        let issues: Vec<GlIssue> = self
            .http
            .paginated_get(&self.path("/issues"), &query, 100)
            .await?;
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    async fn close_issue(&self, number: u64) -> Result<(), GushError> {
        let _: serde_json::Value = self
            .http
            .send_json(
                Method::PUT,
                &self.path(&format!("/issues/{number}")),
                &json!({ "state_event": "close" }),
            )
            .await?;
        tracing::info!("closed issue #{number} on {}", self.target);
        Ok(())
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<String, GushError> {
        let note: GlNote = self
            .http
            .send_json(
                Method::POST,
                &self.path(&format!("/issues/{number}/notes")),
                &json!({ "body": body }),
            )
            .await?;
        Ok(format!("{}#note_{}", self.issue_url(number), note.id))
    }

    fn issue_url(&self, number: u64) -> String {
        web_link(&self.web_url, &format!("{}/-/issues/{number}", self.target.full_name()))
    }
}

#[async_trait]
impl PullRequests for GitLabAdapter {
    async fn create_fork(&self, org: Option<&str>) -> Result<Fork, GushError> {
        let body = match org {
            Some(org) => json!({ "namespace_path": org }),
            None => json!({}),
        };
        let project: GlProject = self
            .http
            .send_json(Method::POST, &self.path("/fork"), &body)
            .await?;
        Ok(Fork {
            org: project.namespace.full_path,
            repo: project.path,
            clone_url: project.ssh_url_to_repo,
        })
    }

    async fn open_pull_request(&self, pr: &NewPullRequest) -> Result<PullRequestRef, GushError> {
        let (head_org, source_branch) = pr.head_parts();
        let mut body = json!({
            "source_branch": source_branch,
            "target_branch": pr.base,
            "title": pr.title,
            "description": pr.body,
        });

        // Cross-project merge requests are opened on the fork and point at the target project.
        let source = match head_org {
            Some(org) if org != self.target.org => {
                let target_project: GlProject = self.http.get(&self.path("")).await?;
                body["target_project_id"] = json!(target_project.id);
                RepoTarget::new(org, self.target.repo.clone())
            }
            _ => self.target.clone(),
        };

        let created: GlCreated = self
            .http
            .send_json(
                Method::POST,
                &self.project_path(&source, "/merge_requests"),
                &body,
            )
            .await?;
        Ok(PullRequestRef {
            number: created.iid,
            url: created.web_url,
        })
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, GushError> {
        let mr: GlMergeRequest = self
            .http
            .get(&self.path(&format!("/merge_requests/{number}")))
            .await?;
        Ok(mr.into_pull_request(&self.target))
    }

    async fn get_pull_requests(
        &self,
        state: Option<PullRequestState>,
    ) -> Result<Vec<PullRequest>, GushError> {
        let api_state = match state {
            None => "all",
            Some(PullRequestState::Open) => "opened",
            Some(PullRequestState::Closed) => "closed",
            Some(PullRequestState::Merged) => "merged",
        };
        let mrs: Vec<GlMergeRequest> = self
            .http
            .paginated_get(
                &self.path("/merge_requests"),
                &[("state", api_state.to_string())],
                100,
            )
            .await?;
        Ok(mrs
            .into_iter()
            .map(|mr| mr.into_pull_request(&self.target))
            .collect())
    }

    async fn merge_pull_request(
        &self,
        number: u64,
        message: &str,
        squash: bool,
    ) -> Result<String, GushError> {
        let mut body = json!({ "squash": squash });
        if squash {
            body["squash_commit_message"] = json!(message);
        } else {
            body["merge_commit_message"] = json!(message);
        }
        let mr: GlMergeRequest = self
            .http
            .send_json(
                Method::PUT,
                &self.path(&format!("/merge_requests/{number}/merge")),
                &body,
            )
            .await?;
        let sha = mr
            .squash_commit_sha
            .or(mr.merge_commit_sha)
            .or(mr.sha)
            .unwrap_or_default();
        tracing::info!("merged merge request !{number} on {} as {sha}", self.target);
        Ok(sha)
    }

    async fn close_pull_request(&self, number: u64) -> Result<(), GushError> {
        let _: serde_json::Value = self
            .http
            .send_json(
                Method::PUT,
                &self.path(&format!("/merge_requests/{number}")),
                &json!({ "state_event": "close" }),
            )
            .await?;
        Ok(())
    }

    async fn comment_pull_request(&self, number: u64, body: &str) -> Result<String, GushError> {
        let note: GlNote = self
            .http
            .send_json(
                Method::POST,
                &self.path(&format!("/merge_requests/{number}/notes")),
                &json!({ "body": body }),
            )
            .await?;
        Ok(format!("{}#note_{}", self.pull_request_url(number), note.id))
    }

    fn pull_request_url(&self, number: u64) -> String {
        web_link(
            &self.web_url,
            &format!("{}/-/merge_requests/{number}", self.target.full_name()),
        )
    }
}

#[async_trait]
impl Releases for GitLabAdapter {
    async fn create_release(&self, release: &NewRelease) -> Result<Release, GushError> {
        if release.draft {
            return Err(GushError::unsupported("gitlab", "draft releases"));
        }
        let mut body = json!({
            "tag_name": release.tag_name,
            "name": release.name,
            "description": release.body,
        });
        if let Some(ref target) = release.target {
            body["ref"] = json!(target);
        }
        let created: GlRelease = self
            .http
            .send_json(Method::POST, &self.path("/releases"), &body)
            .await?;
        Ok(created.into())
    }

    async fn get_releases(&self) -> Result<Vec<Release>, GushError> {
        let releases: Vec<GlRelease> = self
            .http
            .paginated_get(&self.path("/releases"), &[], 100)
            .await?;
        Ok(releases.into_iter().map(Release::from).collect())
    }

    async fn remove_release(&self, id: &str) -> Result<(), GushError> {
        self.http
            .delete(&self.path(&format!("/releases/{}", encode(id))))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_status_mapping() {
        let mr: GlMergeRequest = serde_json::from_value(json!({
            "iid": 3,
            "title": "Add gitlab support",
            "description": null,
            "state": "opened",
            "author": { "username": "cordoval" },
            "source_branch": "gitlab",
            "target_branch": "master",
            "sha": "abc",
            "merge_status": "cannot_be_merged",
            "web_url": "https://gitlab.com/gushphp/gush/-/merge_requests/3",
            "created_at": "2014-01-05T10:00:00Z"
        }))
        .unwrap();
        let pr = mr.into_pull_request(&RepoTarget::new("gushphp", "gush"));
        assert_eq!(pr.mergeable, Some(false));
        assert_eq!(pr.state, PullRequestState::Open);
        assert_eq!(pr.head.branch, "gitlab");
        assert!(!pr.merged);
    }

    #[test]
    fn test_project_path_is_url_encoded() {
        assert_eq!(encode("team/tools/gush"), "team%2Ftools%2Fgush");
    }
}
