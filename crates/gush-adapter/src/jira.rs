use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use gush_core::error::GushError;
use gush_core::models::{AdapterKind, Issue, IssueFilter, IssueState, NewIssue, RepoTarget};

use crate::http::RestClient;
use crate::{parse_timestamp, web_link, Adapter, AdapterSettings, IssueTracker};

const PAGE_SIZE: u32 = 50;

/// Jira issue tracker (REST API 2).
///
/// The target's `repo` is the project key, so issue `42` of target
/// `acme/GUSH` is `GUSH-42`. The org is not used by the API.
pub struct JiraAdapter {
    http: RestClient,
    web_url: url::Url,
    target: RepoTarget,
    issue_type: String,
}

impl JiraAdapter {
    pub fn new(settings: AdapterSettings) -> Result<Self, GushError> {
        let http = RestClient::new(AdapterKind::Jira, settings.api_url, HeaderMap::new())?
            .with_basic_auth(&settings.credentials.username, &settings.credentials.secret);
        Ok(Self {
            http,
            web_url: settings.web_url,
            target: settings.target,
            issue_type: "Task".to_string(),
        })
    }

    fn project_key(&self) -> String {
        self.target.repo.to_uppercase()
    }

    fn issue_key(&self, number: u64) -> String {
        format!("{}-{number}", self.project_key())
    }

    fn jql(&self, filter: &IssueFilter) -> String {
        let mut clauses = vec![format!("project = {}", jql_string(&self.project_key()))];
        match filter.state {
            Some(IssueState::Open) => clauses.push("statusCategory != Done".to_string()),
            Some(IssueState::Closed) => clauses.push("statusCategory = Done".to_string()),
            None => {}
        }
        for label in &filter.labels {
            clauses.push(format!("labels = {}", jql_string(label)));
        }
        if let Some(ref assignee) = filter.assignee {
            clauses.push(format!("assignee = {}", jql_string(assignee)));
        }
        format!("{} ORDER BY key DESC", clauses.join(" AND "))
    }
}

/// A double-quoted JQL string literal.
fn jql_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Number part of a `PROJECT-123` key.
fn key_number(key: &str) -> Result<u64, GushError> {
    key.rsplit_once('-')
        .and_then(|(_, n)| n.parse().ok())
        .ok_or_else(|| GushError::Other(format!("unexpected Jira issue key: {key}")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email_address: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl JiraUser {
    fn login(self) -> String {
        self.name
            .or(self.email_address)
            .or(self.display_name)
            .unwrap_or_default()
    }

    fn shown(self) -> String {
        self.display_name
            .or(self.name)
            .or(self.email_address)
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct JiraStatusCategory {
    key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraStatus {
    status_category: JiraStatusCategory,
}

#[derive(Deserialize)]
struct JiraVersion {
    name: String,
}

#[derive(Deserialize)]
struct JiraCommentPage {
    #[serde(default)]
    total: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraFields {
    summary: String,
    #[serde(default)]
    description: Option<String>,
    status: JiraStatus,
    #[serde(default)]
    reporter: Option<JiraUser>,
    #[serde(default)]
    assignee: Option<JiraUser>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    fix_versions: Vec<JiraVersion>,
    #[serde(default)]
    comment: Option<JiraCommentPage>,
    created: String,
    #[serde(default)]
    updated: Option<String>,
}

#[derive(Deserialize)]
struct JiraIssue {
    key: String,
    fields: JiraFields,
}

impl JiraIssue {
    fn into_issue(self, url: String) -> Result<Issue, GushError> {
        let f = self.fields;
        Ok(Issue {
            number: key_number(&self.key)?,
            title: f.summary,
            body: f.description.unwrap_or_default(),
            state: if f.status.status_category.key == "done" {
                IssueState::Closed
            } else {
                IssueState::Open
            },
            user: f.reporter.map(JiraUser::shown).unwrap_or_default(),
            assignee: f.assignee.map(JiraUser::shown),
            labels: f.labels,
            milestone: f.fix_versions.into_iter().next().map(|v| v.name),
            comments: f.comment.map(|c| c.total).unwrap_or(0),
            url,
            created_at: parse_timestamp(&f.created).unwrap_or_default(),
            updated_at: f.updated.as_deref().and_then(parse_timestamp),
            pull_request: false,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraSearch {
    issues: Vec<JiraIssue>,
    start_at: u32,
    total: u32,
}

#[derive(Deserialize)]
struct JiraCreated {
    key: String,
}

#[derive(Deserialize)]
struct JiraComment {
    id: String,
}

#[derive(Deserialize)]
struct JiraTransitionTarget {
    #[serde(rename = "statusCategory")]
    status_category: JiraStatusCategory,
}

#[derive(Deserialize)]
struct JiraTransition {
    id: String,
    to: JiraTransitionTarget,
}

#[derive(Deserialize)]
struct JiraTransitions {
    transitions: Vec<JiraTransition>,
}

#[async_trait]
impl Adapter for JiraAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Jira
    }

    fn target(&self) -> &RepoTarget {
        &self.target
    }

    fn set_target(&mut self, target: RepoTarget) {
        self.target = target;
    }

    async fn authenticated_user(&self) -> Result<String, GushError> {
        let me: JiraUser = self.http.get("/myself").await?;
        Ok(me.login())
    }
}

#[async_trait]
impl IssueTracker for JiraAdapter {
    async fn open_issue(&self, issue: &NewIssue) -> Result<u64, GushError> {
        let created: JiraCreated = self
            .http
            .send_json(
                Method::POST,
                "/issue",
                &json!({
                    "fields": {
                        "project": { "key": self.project_key() },
                        "summary": issue.title,
                        "description": issue.body,
                        "issuetype": { "name": self.issue_type },
                        "labels": issue.labels,
                    }
                }),
            )
            .await?;
        tracing::info!("opened issue {}", created.key);
        key_number(&created.key)
    }

    async fn get_issue(&self, number: u64) -> Result<Issue, GushError> {
        let key = self.issue_key(number);
        let issue: JiraIssue = self.http.get(&format!("/issue/{key}")).await?;
        issue.into_issue(self.issue_url(number))
    }

    async fn get_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, GushError> {
        let jql = self.jql(filter);
        let mut all = Vec::new();
        let mut start_at = 0u32;

        loop {
            let page: JiraSearch = self
                .http
                .get_query(
                    "/search",
                    &[
                        ("jql", jql.clone()),
                        ("startAt", start_at.to_string()),
                        ("maxResults", PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let count = page.issues.len() as u32;
            for raw in page.issues {
                let number = key_number(&raw.key)?;
                all.push(raw.into_issue(self.issue_url(number))?);
            }
            start_at = page.start_at + count;
            if count == 0 || start_at >= page.total {
                break;
            }
        }

        Ok(all)
    }

    async fn close_issue(&self, number: u64) -> Result<(), GushError> {
        let key = self.issue_key(number);
        let available: JiraTransitions = self
            .http
            .get(&format!("/issue/{key}/transitions"))
            .await?;
        let done = available
            .transitions
            .into_iter()
            .find(|t| t.to.status_category.key == "done")
            .ok_or_else(|| GushError::Other(format!("{key} has no transition to a done status")))?;
        self.http
            .send_empty(
                Method::POST,
                &format!("/issue/{key}/transitions"),
                Some(&json!({ "transition": { "id": done.id } })),
            )
            .await?;
        tracing::info!("closed issue {key}");
        Ok(())
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<String, GushError> {
        let key = self.issue_key(number);
        let comment: JiraComment = self
            .http
            .send_json(
                Method::POST,
                &format!("/issue/{key}/comment"),
                &json!({ "body": body }),
            )
            .await?;
        Ok(format!(
            "{}?focusedCommentId={}",
            self.issue_url(number),
            comment.id
        ))
    }

    fn issue_url(&self, number: u64) -> String {
        web_link(&self.web_url, &format!("browse/{}", self.issue_key(number)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gush_auth::{AuthMethod, Credentials};

    fn adapter() -> JiraAdapter {
        JiraAdapter::new(AdapterSettings {
            kind: AdapterKind::Jira,
            api_url: url::Url::parse("https://acme.atlassian.net/rest/api/2").unwrap(),
            web_url: url::Url::parse("https://acme.atlassian.net").unwrap(),
            credentials: Credentials::new("dev@acme.test", "token", AuthMethod::Basic),
            target: RepoTarget::new("acme", "gush"),
        })
        .unwrap()
    }

    #[test]
    fn test_issue_key_and_url() {
        let jira = adapter();
        assert_eq!(jira.issue_key(42), "GUSH-42");
        assert_eq!(jira.issue_url(42), "https://acme.atlassian.net/browse/GUSH-42");
    }

    #[test]
    fn test_key_number() {
        assert_eq!(key_number("GUSH-42").unwrap(), 42);
        assert_eq!(key_number("MY-PROJ-7").unwrap(), 7);
        assert!(key_number("GUSH").is_err());
    }

    #[test]
    fn test_jql_from_filter() {
        let jql = adapter().jql(&IssueFilter {
            state: Some(IssueState::Open),
            labels: vec!["backend".into()],
            assignee: None,
        });
        assert_eq!(
            jql,
            "project = \"GUSH\" AND statusCategory != Done AND labels = \"backend\" ORDER BY key DESC"
        );
    }

    #[test]
    fn test_jql_escapes_quotes_and_backslashes() {
        let jql = adapter().jql(&IssueFilter {
            state: None,
            labels: vec![r#"say "hi""#.into()],
            assignee: Some(r"acme\dev".into()),
        });
        assert_eq!(
            jql,
            r#"project = "GUSH" AND labels = "say \"hi\"" AND assignee = "acme\\dev" ORDER BY key DESC"#
        );
    }
}
