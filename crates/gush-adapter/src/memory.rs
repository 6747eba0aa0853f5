use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use gush_core::error::GushError;
use gush_core::models::{
    AdapterKind, BranchRef, Fork, Issue, IssueFilter, IssueState, NewIssue, NewPullRequest,
    NewRelease, PullRequest, PullRequestRef, PullRequestState, Release, RepoTarget,
};

use crate::{Adapter, IssueTracker, PullRequests, Releases};

/// Everything a [`MemoryAdapter`] has seen or been seeded with.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub user: String,
    pub issues: HashMap<RepoTarget, BTreeMap<u64, Issue>>,
    pub pull_requests: HashMap<RepoTarget, BTreeMap<u64, PullRequest>>,
    pub releases: HashMap<RepoTarget, Vec<Release>>,
    /// `(target, issue or pull request number, body)`
    pub comments: Vec<(RepoTarget, u64, String)>,
    /// `(forked target, destination org)`
    pub forks: Vec<(RepoTarget, String)>,
    /// `(target, pull request number, message, squash)`
    pub merges: Vec<(RepoTarget, u64, String, bool)>,
}

impl MemoryState {
    fn next_number(&self, target: &RepoTarget) -> u64 {
        let issues = self.issues.get(target).and_then(|m| m.keys().last().copied());
        let prs = self.pull_requests.get(target).and_then(|m| m.keys().last().copied());
        issues.max(prs).unwrap_or(0) + 1
    }
}

/// Adapter that keeps everything in memory.
///
/// Clones share state, so a test can hand one clone to a command and inspect
/// the other afterwards. Issues and pull requests share one numbering per
/// target, as they do on GitHub.
#[derive(Clone)]
pub struct MemoryAdapter {
    kind: AdapterKind,
    target: RepoTarget,
    web_url: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryAdapter {
    pub fn new(kind: AdapterKind, target: RepoTarget) -> Self {
        let state = MemoryState {
            user: "cordoval".to_string(),
            ..Default::default()
        };
        Self {
            kind,
            target,
            web_url: kind.default_web_url().as_str().trim_end_matches('/').to_string(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_user(self, user: &str) -> Self {
        self.lock().user = user.to_string();
        self
    }

    /// Seed an issue on the current target.
    pub fn with_issue(self, issue: Issue) -> Self {
        let target = self.target.clone();
        self.lock()
            .issues
            .entry(target)
            .or_default()
            .insert(issue.number, issue);
        self
    }

    /// Seed a pull request on the current target.
    pub fn with_pull_request(self, pr: PullRequest) -> Self {
        let target = self.target.clone();
        self.lock()
            .pull_requests
            .entry(target)
            .or_default()
            .insert(pr.number, pr);
        self
    }

    /// Seed a release on the current target.
    pub fn with_release(self, release: Release) -> Self {
        let target = self.target.clone();
        self.lock().releases.entry(target).or_default().push(release);
        self
    }

    /// A copy of the shared state.
    pub fn state(&self) -> MemoryState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn not_found(&self, what: &str, number: u64) -> GushError {
        GushError::NotFound {
            what: format!("{what} #{number} in {}", self.target),
        }
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn kind(&self) -> AdapterKind {
        self.kind
    }

    fn target(&self) -> &RepoTarget {
        &self.target
    }

    fn set_target(&mut self, target: RepoTarget) {
        self.target = target;
    }

    async fn authenticated_user(&self) -> Result<String, GushError> {
        Ok(self.lock().user.clone())
    }
}

#[async_trait]
impl IssueTracker for MemoryAdapter {
    async fn open_issue(&self, issue: &NewIssue) -> Result<u64, GushError> {
        let mut state = self.lock();
        let number = state.next_number(&self.target);
        let user = state.user.clone();
        let created = Issue {
            number,
            title: issue.title.clone(),
            body: issue.body.clone(),
            state: IssueState::Open,
            user,
            assignee: issue.assignee.clone(),
            labels: issue.labels.clone(),
            milestone: issue.milestone.clone(),
            comments: 0,
            url: self.issue_url(number),
            created_at: Utc::now(),
            updated_at: None,
            pull_request: false,
        };
        state
            .issues
            .entry(self.target.clone())
            .or_default()
            .insert(number, created);
        Ok(number)
    }

    async fn get_issue(&self, number: u64) -> Result<Issue, GushError> {
        self.lock()
            .issues
            .get(&self.target)
            .and_then(|m| m.get(&number))
            .cloned()
            .ok_or_else(|| self.not_found("issue", number))
    }

    async fn get_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, GushError> {
        Ok(self
            .lock()
            .issues
            .get(&self.target)
            .map(|m| m.values().filter(|i| filter.matches(i)).cloned().collect())
            .unwrap_or_default())
    }

    async fn close_issue(&self, number: u64) -> Result<(), GushError> {
        let mut state = self.lock();
        match state
            .issues
            .get_mut(&self.target)
            .and_then(|m| m.get_mut(&number))
        {
            Some(issue) => {
                issue.state = IssueState::Closed;
                Ok(())
            }
            None => Err(self.not_found("issue", number)),
        }
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<String, GushError> {
        let mut state = self.lock();
        let issue = state
            .issues
            .get_mut(&self.target)
            .and_then(|m| m.get_mut(&number))
            .ok_or_else(|| self.not_found("issue", number))?;
        issue.comments += 1;
        let id = state.comments.len() + 1;
        state
            .comments
            .push((self.target.clone(), number, body.to_string()));
        Ok(format!("{}#issuecomment-{id}", self.issue_url(number)))
    }

    fn issue_url(&self, number: u64) -> String {
        format!("{}/{}/issues/{number}", self.web_url, self.target.full_name())
    }
}

#[async_trait]
impl PullRequests for MemoryAdapter {
    async fn create_fork(&self, org: Option<&str>) -> Result<Fork, GushError> {
        let org = {
            let mut state = self.lock();
            let org = org.map_or_else(|| state.user.clone(), str::to_string);
            state.forks.push((self.target.clone(), org.clone()));
            org
        };
        let web = self.kind.default_web_url();
        let host = web.host_str().unwrap_or("localhost");
        Ok(Fork {
            clone_url: format!("git@{host}:{org}/{}.git", self.target.repo),
            org,
            repo: self.target.repo.clone(),
        })
    }

    async fn open_pull_request(&self, pr: &NewPullRequest) -> Result<PullRequestRef, GushError> {
        let mut state = self.lock();
        let number = state.next_number(&self.target);
        let (head_org, head_branch) = pr.head_parts();
        let url = self.pull_request_url(number);
        let created = PullRequest {
            number,
            title: pr.title.clone(),
            body: pr.body.clone(),
            state: PullRequestState::Open,
            user: state.user.clone(),
            head: BranchRef {
                org: head_org.unwrap_or(&self.target.org).to_string(),
                repo: self.target.repo.clone(),
                branch: head_branch.to_string(),
                sha: String::new(),
            },
            base: BranchRef {
                org: self.target.org.clone(),
                repo: self.target.repo.clone(),
                branch: pr.base.clone(),
                sha: String::new(),
            },
            mergeable: Some(true),
            merged: false,
            url: url.clone(),
            created_at: Utc::now(),
        };
        state
            .pull_requests
            .entry(self.target.clone())
            .or_default()
            .insert(number, created);
        Ok(PullRequestRef { number, url })
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, GushError> {
        self.lock()
            .pull_requests
            .get(&self.target)
            .and_then(|m| m.get(&number))
            .cloned()
            .ok_or_else(|| self.not_found("pull request", number))
    }

    async fn get_pull_requests(
        &self,
        state: Option<PullRequestState>,
    ) -> Result<Vec<PullRequest>, GushError> {
        Ok(self
            .lock()
            .pull_requests
            .get(&self.target)
            .map(|m| {
                m.values()
                    .filter(|pr| state.map_or(true, |s| pr.state == s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn merge_pull_request(
        &self,
        number: u64,
        message: &str,
        squash: bool,
    ) -> Result<String, GushError> {
        let mut state = self.lock();
        let pr = state
            .pull_requests
            .get_mut(&self.target)
            .and_then(|m| m.get_mut(&number))
            .ok_or_else(|| self.not_found("pull request", number))?;
        if pr.state != PullRequestState::Open {
            return Err(GushError::ApiError {
                status: 405,
                message: format!("pull request #{number} is not open"),
            });
        }
        pr.state = PullRequestState::Merged;
        pr.merged = true;
        state
            .merges
            .push((self.target.clone(), number, message.to_string(), squash));
        Ok(format!("{number:0>40}"))
    }

    async fn close_pull_request(&self, number: u64) -> Result<(), GushError> {
        let mut state = self.lock();
        match state
            .pull_requests
            .get_mut(&self.target)
            .and_then(|m| m.get_mut(&number))
        {
            Some(pr) => {
                pr.state = PullRequestState::Closed;
                Ok(())
            }
            None => Err(self.not_found("pull request", number)),
        }
    }

    async fn comment_pull_request(&self, number: u64, body: &str) -> Result<String, GushError> {
        let mut state = self.lock();
        let exists = state
            .pull_requests
            .get(&self.target)
            .is_some_and(|m| m.contains_key(&number));
        if !exists {
            return Err(self.not_found("pull request", number));
        }
        let id = state.comments.len() + 1;
        state
            .comments
            .push((self.target.clone(), number, body.to_string()));
        Ok(format!("{}#issuecomment-{id}", self.pull_request_url(number)))
    }

    fn pull_request_url(&self, number: u64) -> String {
        format!("{}/{}/pull/{number}", self.web_url, self.target.full_name())
    }
}

#[async_trait]
impl Releases for MemoryAdapter {
    async fn create_release(&self, release: &NewRelease) -> Result<Release, GushError> {
        let mut state = self.lock();
        let releases = state.releases.entry(self.target.clone()).or_default();
        let now = Utc::now();
        let created = Release {
            id: (releases.len() + 1).to_string(),
            name: release.name.clone(),
            tag_name: release.tag_name.clone(),
            body: release.body.clone(),
            draft: release.draft,
            prerelease: release.prerelease,
            url: format!(
                "{}/{}/releases/tag/{}",
                self.web_url,
                self.target.full_name(),
                release.tag_name
            ),
            created_at: now,
            published_at: (!release.draft).then_some(now),
        };
        releases.push(created.clone());
        Ok(created)
    }

    async fn get_releases(&self) -> Result<Vec<Release>, GushError> {
        Ok(self
            .lock()
            .releases
            .get(&self.target)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_release(&self, id: &str) -> Result<(), GushError> {
        let mut state = self.lock();
        let releases = state.releases.entry(self.target.clone()).or_default();
        let before = releases.len();
        releases.retain(|r| r.id != id);
        if releases.len() == before {
            return Err(GushError::NotFound {
                what: format!("release {id} in {}", self.target),
            });
        }
        Ok(())
    }
}
