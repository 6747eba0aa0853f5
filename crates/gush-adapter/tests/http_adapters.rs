//! HTTP adapter tests against a wiremock server.

use gush_adapter::bitbucket::BitbucketAdapter;
use gush_adapter::github::GitHubAdapter;
use gush_adapter::gitlab::GitLabAdapter;
use gush_adapter::jira::JiraAdapter;
use gush_adapter::{Adapter, AdapterSettings, IssueTracker, PullRequests, Releases};
use gush_auth::{AuthMethod, Credentials};
use gush_core::error::GushError;
use gush_core::models::{
    AdapterKind, IssueFilter, IssueState, NewIssue, NewPullRequest, NewRelease, PullRequestState,
    RepoTarget,
};
use serde_json::json;
use wiremock::matchers::{basic_auth, bearer_token, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, kind: AdapterKind, api_path: &str) -> AdapterSettings {
    let secret = match kind {
        AdapterKind::GitHub => "ghp_test",
        AdapterKind::GitLab => "glpat_test",
        _ => "app-password",
    };
    AdapterSettings {
        kind,
        api_url: url::Url::parse(&format!("{}{api_path}", server.uri())).unwrap(),
        web_url: kind.default_web_url(),
        credentials: Credentials::new("cordoval", secret, AuthMethod::for_adapter(kind)),
        target: RepoTarget::new("gushphp", "gush"),
    }
}

fn github_issue(number: u64, state: &str) -> serde_json::Value {
    json!({
        "number": number,
        "title": "Write a better README",
        "body": "It is too short",
        "state": state,
        "user": { "login": "weaverryan" },
        "assignee": { "login": "cordoval" },
        "labels": [{ "name": "docs" }],
        "milestone": { "title": "v1.0" },
        "comments": 2,
        "html_url": format!("https://github.com/gushphp/gush/issues/{number}"),
        "created_at": "2014-01-05T10:00:00Z",
        "updated_at": null
    })
}

// =============================================================================
// GitHub
// =============================================================================

#[tokio::test]
async fn test_github_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(bearer_token("ghp_test"))
        .and(header("X-GitHub-Api-Version", "2022-11-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "login": "cordoval" })))
        .expect(1)
        .mount(&server)
        .await;

    let github = GitHubAdapter::new(settings(&server, AdapterKind::GitHub, "")).unwrap();
    assert_eq!(github.authenticated_user().await.unwrap(), "cordoval");
}

#[tokio::test]
async fn test_github_get_issue_maps_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/gushphp/gush/issues/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(github_issue(7, "open")))
        .mount(&server)
        .await;

    let github = GitHubAdapter::new(settings(&server, AdapterKind::GitHub, "")).unwrap();
    let issue = github.get_issue(7).await.unwrap();

    assert_eq!(issue.title, "Write a better README");
    assert_eq!(issue.state, IssueState::Open);
    assert_eq!(issue.user, "weaverryan");
    assert_eq!(issue.assignee.as_deref(), Some("cordoval"));
    assert_eq!(issue.labels, vec!["docs"]);
    assert_eq!(issue.milestone.as_deref(), Some("v1.0"));
    assert!(!issue.pull_request);
}

#[tokio::test]
async fn test_github_issue_list_skips_pull_requests() {
    let server = MockServer::start().await;
    let mut pr = github_issue(2, "open");
    pr["pull_request"] = json!({ "url": "https://api.github.com/repos/gushphp/gush/pulls/2" });
    Mock::given(method("GET"))
        .and(path("/repos/gushphp/gush/issues"))
        .and(query_param("state", "open"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([github_issue(1, "open"), pr])))
        .mount(&server)
        .await;

    let github = GitHubAdapter::new(settings(&server, AdapterKind::GitHub, "")).unwrap();
    let issues = github
        .get_issues(&IssueFilter {
            state: Some(IssueState::Open),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].number, 1);
}

#[tokio::test]
async fn test_github_open_issue_posts_labels() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/gushphp/gush/issues"))
        .and(body_json(json!({
            "title": "[gushphp/gush] Crash",
            "body": "trace",
            "labels": ["bug"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 12,
            "html_url": "https://github.com/gushphp/gush/issues/12"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let github = GitHubAdapter::new(settings(&server, AdapterKind::GitHub, "")).unwrap();
    let mut issue = NewIssue::new("[gushphp/gush] Crash", "trace");
    issue.labels = vec!["bug".into()];
    assert_eq!(github.open_issue(&issue).await.unwrap(), 12);
}

#[tokio::test]
async fn test_github_fork_into_own_account_omits_organization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/gushphp/gush/forks"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "name": "gush",
            "owner": { "login": "cordoval" },
            "ssh_url": "git@github.com:cordoval/gush.git"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Token-only setup: no username configured.
    let mut token_only = settings(&server, AdapterKind::GitHub, "");
    token_only.credentials = Credentials::new("", "ghp_test", AuthMethod::Token);
    let github = GitHubAdapter::new(token_only).unwrap();
    let fork = github.create_fork(None).await.unwrap();
    assert_eq!(fork.org, "cordoval");
    assert_eq!(fork.clone_url, "git@github.com:cordoval/gush.git");
}

#[tokio::test]
async fn test_github_fork_into_organization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/gushphp/gush/forks"))
        .and(body_json(json!({ "organization": "gush-sandbox" })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "name": "gush",
            "owner": { "login": "gush-sandbox" },
            "ssh_url": "git@github.com:gush-sandbox/gush.git"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let github = GitHubAdapter::new(settings(&server, AdapterKind::GitHub, "")).unwrap();
    let fork = github.create_fork(Some("gush-sandbox")).await.unwrap();
    assert_eq!(fork.org, "gush-sandbox");
}

#[tokio::test]
async fn test_github_merged_pull_requests_filter() {
    let server = MockServer::start().await;
    let pull = |number: u64, merged_at: Option<&str>| {
        json!({
            "number": number,
            "title": format!("PR {number}"),
            "body": null,
            "state": "closed",
            "user": { "login": "cordoval" },
            "head": { "ref": "feature", "sha": "abc", "repo": { "name": "gush", "owner": { "login": "cordoval" } } },
            "base": { "ref": "master", "sha": "def", "repo": { "name": "gush", "owner": { "login": "gushphp" } } },
            "mergeable": null,
            "merged_at": merged_at,
            "html_url": format!("https://github.com/gushphp/gush/pull/{number}"),
            "created_at": "2014-01-05T10:00:00Z"
        })
    };
    Mock::given(method("GET"))
        .and(path("/repos/gushphp/gush/pulls"))
        .and(query_param("state", "closed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            pull(3, Some("2014-01-06T10:00:00Z")),
            pull(4, None)
        ])))
        .mount(&server)
        .await;

    let github = GitHubAdapter::new(settings(&server, AdapterKind::GitHub, "")).unwrap();
    let merged = github
        .get_pull_requests(Some(PullRequestState::Merged))
        .await
        .unwrap();

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].number, 3);
    assert_eq!(merged[0].head.org, "cordoval");
    assert_eq!(merged[0].base.branch, "master");
}

#[tokio::test]
async fn test_github_releases() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/gushphp/gush/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "name": "v1.0.0",
            "tag_name": "v1.0.0",
            "body": "Initial release",
            "draft": false,
            "prerelease": false,
            "html_url": "https://github.com/gushphp/gush/releases/tag/v1.0.0",
            "created_at": "2014-01-05T10:00:00Z",
            "published_at": "2014-01-05T10:00:00Z"
        }])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/repos/gushphp/gush/releases/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let github = GitHubAdapter::new(settings(&server, AdapterKind::GitHub, "")).unwrap();
    let releases = github.get_releases().await.unwrap();
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].id, "1");
    assert_eq!(
        releases[0].created_at.format("%Y-%m-%d %H:%M").to_string(),
        "2014-01-05 10:00"
    );

    github.remove_release("1").await.unwrap();
    assert!(github.remove_release("v1.0.0").await.is_err());
}

#[tokio::test]
async fn test_github_error_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/gushphp/gush/issues/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/gushphp/gush/issues/1"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .set_body_json(json!({ "message": "API rate limit exceeded" })),
        )
        .mount(&server)
        .await;

    let github = GitHubAdapter::new(settings(&server, AdapterKind::GitHub, "")).unwrap();

    assert!(matches!(
        github.get_issue(404).await.unwrap_err(),
        GushError::NotFound { .. }
    ));
    match github.authenticated_user().await.unwrap_err() {
        GushError::AuthFailed { adapter, message } => {
            assert_eq!(adapter, "github");
            assert_eq!(message, "Bad credentials");
        }
        other => panic!("expected AuthFailed, got {other:?}"),
    }
    assert!(matches!(
        github.get_issue(1).await.unwrap_err(),
        GushError::RateLimited { .. }
    ));
}

// =============================================================================
// GitLab
// =============================================================================

#[tokio::test]
async fn test_gitlab_private_token_and_encoded_project() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/gushphp%2Fgush/issues/3"))
        .and(header("PRIVATE-TOKEN", "glpat_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "iid": 3,
            "title": "Support merge requests",
            "description": "please",
            "state": "opened",
            "author": { "username": "pborreli" },
            "assignee": null,
            "labels": ["feature"],
            "milestone": null,
            "user_notes_count": 4,
            "web_url": "https://gitlab.com/gushphp/gush/-/issues/3",
            "created_at": "2014-01-05T10:00:00Z",
            "updated_at": "2014-01-06T10:00:00Z"
        })))
        .mount(&server)
        .await;

    let gitlab = GitLabAdapter::new(settings(&server, AdapterKind::GitLab, "/api/v4")).unwrap();
    let issue = gitlab.get_issue(3).await.unwrap();
    assert_eq!(issue.state, IssueState::Open);
    assert_eq!(issue.comments, 4);
    assert_eq!(issue.user, "pborreli");
}

#[tokio::test]
async fn test_gitlab_releases_are_keyed_by_tag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/gushphp%2Fgush/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "name": "",
            "tag_name": "v1.0.0",
            "description": "Initial release",
            "created_at": "2014-01-05T10:00:00Z",
            "released_at": "2014-01-05T10:00:00Z",
            "upcoming_release": false
        }])))
        .mount(&server)
        .await;

    let gitlab = GitLabAdapter::new(settings(&server, AdapterKind::GitLab, "/api/v4")).unwrap();
    let releases = gitlab.get_releases().await.unwrap();
    assert_eq!(releases[0].id, "v1.0.0");
    assert_eq!(releases[0].name, "v1.0.0");

    let draft = NewRelease {
        tag_name: "v2.0.0".into(),
        draft: true,
        ..Default::default()
    };
    assert!(matches!(
        gitlab.create_release(&draft).await.unwrap_err(),
        GushError::UnsupportedOperation { .. }
    ));
}

#[tokio::test]
async fn test_gitlab_cross_project_merge_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/gushphp%2Fgush"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "path": "gush",
            "namespace": { "full_path": "gushphp" },
            "ssh_url_to_repo": "git@gitlab.com:gushphp/gush.git"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/projects/cordoval%2Fgush/merge_requests"))
        .and(body_json(json!({
            "source_branch": "feature",
            "target_branch": "master",
            "title": "Feature",
            "description": "",
            "target_project_id": 42
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "iid": 5,
            "web_url": "https://gitlab.com/gushphp/gush/-/merge_requests/5"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gitlab = GitLabAdapter::new(settings(&server, AdapterKind::GitLab, "/api/v4")).unwrap();
    let created = gitlab
        .open_pull_request(&NewPullRequest {
            base: "master".into(),
            head: "cordoval:feature".into(),
            title: "Feature".into(),
            body: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(created.number, 5);
}

// =============================================================================
// Bitbucket
// =============================================================================

#[tokio::test]
async fn test_bitbucket_follows_next_links() {
    let server = MockServer::start().await;
    let issue = |id: u64, state: &str| {
        json!({
            "id": id,
            "title": format!("Issue {id}"),
            "content": { "raw": "" },
            "state": state,
            "reporter": { "nickname": "cordoval" },
            "assignee": null,
            "kind": "bug",
            "milestone": null,
            "created_on": "2014-01-05T10:00:00.000000+00:00",
            "updated_on": null,
            "links": null
        })
    };
    Mock::given(method("GET"))
        .and(path("/2.0/repositories/gushphp/gush/issues"))
        .and(query_param("pagelen", "50"))
        .and(basic_auth("cordoval", "app-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [issue(1, "new"), issue(2, "resolved")],
            "next": format!("{}/2.0/repositories/gushphp/gush/issues?page=2", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2.0/repositories/gushphp/gush/issues"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [issue(3, "on hold")]
        })))
        .mount(&server)
        .await;

    let bitbucket =
        BitbucketAdapter::new(settings(&server, AdapterKind::Bitbucket, "/2.0")).unwrap();
    let open = bitbucket
        .get_issues(&IssueFilter {
            state: Some(IssueState::Open),
            ..Default::default()
        })
        .await
        .unwrap();

    let numbers: Vec<u64> = open.iter().map(|i| i.number).collect();
    assert_eq!(numbers, vec![1, 3]);
    assert_eq!(open[0].labels, vec!["bug"]);
    assert_eq!(open[0].url, "https://bitbucket.org/gushphp/gush/issues/1");
}

#[tokio::test]
async fn test_bitbucket_has_no_releases() {
    let server = MockServer::start().await;
    let bitbucket =
        BitbucketAdapter::new(settings(&server, AdapterKind::Bitbucket, "/2.0")).unwrap();
    match bitbucket.get_releases().await.unwrap_err() {
        GushError::UnsupportedOperation { adapter, .. } => assert_eq!(adapter, "bitbucket"),
        other => panic!("expected UnsupportedOperation, got {other:?}"),
    }
}

// =============================================================================
// Jira
// =============================================================================

fn jira_settings(server: &MockServer) -> AdapterSettings {
    let mut settings = settings(server, AdapterKind::Jira, "/rest/api/2");
    settings.web_url = url::Url::parse("https://acme.atlassian.net").unwrap();
    settings.target = RepoTarget::new("acme", "GUSH");
    settings
}

#[tokio::test]
async fn test_jira_get_issue() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/GUSH-42"))
        .and(basic_auth("cordoval", "app-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "GUSH-42",
            "fields": {
                "summary": "Port to Jira",
                "description": null,
                "status": { "statusCategory": { "key": "done" } },
                "reporter": { "name": "cordoval", "displayName": "Luis Cordova" },
                "assignee": null,
                "labels": ["jira"],
                "fixVersions": [{ "name": "1.0" }],
                "comment": { "total": 3 },
                "created": "2014-01-05T11:00:00.000+0100",
                "updated": null
            }
        })))
        .mount(&server)
        .await;

    let jira = JiraAdapter::new(jira_settings(&server)).unwrap();
    let issue = jira.get_issue(42).await.unwrap();

    assert_eq!(issue.number, 42);
    assert_eq!(issue.state, IssueState::Closed);
    assert_eq!(issue.user, "Luis Cordova");
    assert_eq!(issue.milestone.as_deref(), Some("1.0"));
    assert_eq!(issue.comments, 3);
    assert_eq!(issue.url, "https://acme.atlassian.net/browse/GUSH-42");
    assert_eq!(issue.created_at.format("%H:%M").to_string(), "10:00");
}

#[tokio::test]
async fn test_jira_close_uses_done_transition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/GUSH-7/transitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transitions": [
                { "id": "11", "to": { "statusCategory": { "key": "indeterminate" } } },
                { "id": "31", "to": { "statusCategory": { "key": "done" } } }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/GUSH-7/transitions"))
        .and(body_json(json!({ "transition": { "id": "31" } })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let jira = JiraAdapter::new(jira_settings(&server)).unwrap();
    jira.close_issue(7).await.unwrap();
}

#[tokio::test]
async fn test_jira_open_issue_returns_key_number() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "id": "10001", "key": "GUSH-43", "self": "" })),
        )
        .mount(&server)
        .await;

    let jira = JiraAdapter::new(jira_settings(&server)).unwrap();
    let number = jira.open_issue(&NewIssue::new("New", "body")).await.unwrap();
    assert_eq!(number, 43);
}
