//! Built-in event subscribers, one per [`Feature`].

use clap::{value_parser, Arg, ArgMatches};
use gush_core::error::GushError;
use gush_core::models::{AdapterKind, RepoTarget};

use crate::event::{CommandMeta, EventDispatcher, Feature, Subscriber};
use crate::session::Session;

/// Dispatcher with every built-in subscriber, in the order they must run.
pub fn default_dispatcher() -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.subscribe(GitFolderSubscriber);
    dispatcher.subscribe(GitRepoSubscriber);
    dispatcher.subscribe(IssueTrackerSubscriber);
    dispatcher.subscribe(TemplateSubscriber);
    dispatcher
}

fn string_arg(input: &ArgMatches, id: &str) -> Option<String> {
    input.try_get_one::<String>(id).ok().flatten().cloned()
}

fn adapter_arg(input: &ArgMatches, id: &str) -> Option<AdapterKind> {
    input.try_get_one::<AdapterKind>(id).ok().flatten().copied()
}

/// Pick org and repository from the first source that has them, falling
/// back to the canonical remote's URL.
fn resolve_target(
    session: &Session,
    orgs: [Option<String>; 2],
    repos: [Option<String>; 2],
) -> Result<RepoTarget, GushError> {
    let mut org = orgs.into_iter().flatten().next();
    let mut repo = repos.into_iter().flatten().next();

    if org.is_none() || repo.is_none() {
        if let Some(remote) = session.remote_target() {
            org.get_or_insert(remote.org);
            repo.get_or_insert(remote.repo);
        }
    }

    match (org, repo) {
        (Some(org), Some(repo)) => Ok(RepoTarget::new(org, repo)),
        (None, _) => Err(GushError::UnresolvedRepository {
            what: "the organization (--org)".into(),
        }),
        (_, None) => Err(GushError::UnresolvedRepository {
            what: "the repository (--repo)".into(),
        }),
    }
}

/// Fails early when the command must run inside a git checkout.
pub struct GitFolderSubscriber;

impl Subscriber for GitFolderSubscriber {
    fn initialize(
        &self,
        meta: &CommandMeta,
        _input: &ArgMatches,
        session: &mut Session,
    ) -> anyhow::Result<()> {
        if meta.has(Feature::GitFolder) && !session.git.is_inside_work_tree()? {
            return Err(GushError::NotAGitRepository {
                path: session.git.dir().to_path_buf(),
            }
            .into());
        }
        Ok(())
    }
}

/// `--repo-adapter`, `--org` and `--repo`; builds the repository adapter.
pub struct GitRepoSubscriber;

impl Subscriber for GitRepoSubscriber {
    fn decorate_definition(&self, meta: &CommandMeta, command: clap::Command) -> clap::Command {
        if !meta.has(Feature::GitRepo) {
            return command;
        }
        command
            .arg(
                Arg::new("repo-adapter")
                    .short('a')
                    .long("repo-adapter")
                    .value_name("ADAPTER")
                    .value_parser(value_parser!(AdapterKind))
                    .help("Adapter for the repository (github, gitlab, bitbucket)"),
            )
            .arg(
                Arg::new("org")
                    .short('u')
                    .long("org")
                    .value_name("ORG")
                    .help("Organization or user owning the repository"),
            )
            .arg(
                Arg::new("repo")
                    .short('r')
                    .long("repo")
                    .value_name("REPO")
                    .help("Repository name"),
            )
    }

    fn initialize(
        &self,
        meta: &CommandMeta,
        input: &ArgMatches,
        session: &mut Session,
    ) -> anyhow::Result<()> {
        if !meta.has(Feature::GitRepo) {
            return Ok(());
        }
        let kind = adapter_arg(input, "repo-adapter")
            .or(session.local.repo_adapter)
            .unwrap_or(session.config.repo_adapter);
        let target = resolve_target(
            session,
            [string_arg(input, "org"), session.local.org.clone()],
            [string_arg(input, "repo"), session.local.repo.clone()],
        )?;
        session.init_repo_adapter(kind, target)
    }
}

/// `--issue-adapter`, `--issue-org` and `--issue-project`; builds the issue tracker.
pub struct IssueTrackerSubscriber;

impl Subscriber for IssueTrackerSubscriber {
    fn decorate_definition(&self, meta: &CommandMeta, command: clap::Command) -> clap::Command {
        if !meta.has(Feature::IssueTracker) {
            return command;
        }
        command
            .arg(
                Arg::new("issue-adapter")
                    .short('i')
                    .long("issue-adapter")
                    .value_name("ADAPTER")
                    .value_parser(value_parser!(AdapterKind))
                    .help("Adapter for the issue tracker (github, gitlab, bitbucket, jira)"),
            )
            .arg(
                Arg::new("issue-org")
                    .long("issue-org")
                    .value_name("ORG")
                    .help("Organization owning the issue tracker"),
            )
            .arg(
                Arg::new("issue-project")
                    .long("issue-project")
                    .value_name("PROJECT")
                    .help("Repository or Jira project key of the issue tracker"),
            )
    }

    fn initialize(
        &self,
        meta: &CommandMeta,
        input: &ArgMatches,
        session: &mut Session,
    ) -> anyhow::Result<()> {
        if !meta.has(Feature::IssueTracker) {
            return Ok(());
        }
        let kind = adapter_arg(input, "issue-adapter")
            .or(session.local.issue_tracker)
            .unwrap_or(session.config.issue_tracker);
        let org = string_arg(input, "issue-org")
            .or_else(|| session.local.issue_org.clone())
            .or_else(|| string_arg(input, "org"));
        let project = string_arg(input, "issue-project")
            .or_else(|| session.local.issue_project.clone())
            .or_else(|| string_arg(input, "repo"));
        let target = resolve_target(
            session,
            [org, session.local.org.clone()],
            [project, session.local.repo.clone()],
        )?;
        session.init_issue_tracker(kind, target)
    }
}

/// `--template`; records the requested template name.
pub struct TemplateSubscriber;

impl Subscriber for TemplateSubscriber {
    fn decorate_definition(&self, meta: &CommandMeta, command: clap::Command) -> clap::Command {
        if !meta.has(Feature::Template) {
            return command;
        }
        command.arg(
            Arg::new("template")
                .short('t')
                .long("template")
                .value_name("NAME")
                .help("Template used to render the body"),
        )
    }

    fn initialize(
        &self,
        meta: &CommandMeta,
        input: &ArgMatches,
        session: &mut Session,
    ) -> anyhow::Result<()> {
        if meta.has(Feature::Template) {
            session.template = string_arg(input, "template");
        }
        Ok(())
    }
}
