use clap::Args;
use gush_core::models::{IssueFilter, IssueState, NewIssue, RepoTarget};
use gush_git::slugify;

use crate::event::{CommandMeta, Feature};
use crate::helpers::table::{table, timestamp};
use crate::session::Session;

pub const SHOW: CommandMeta = CommandMeta {
    name: "issue:show",
    features: &[Feature::IssueTracker],
};

pub const LIST: CommandMeta = CommandMeta {
    name: "issue:list",
    features: &[Feature::IssueTracker],
};

pub const CREATE: CommandMeta = CommandMeta {
    name: "issue:create",
    features: &[Feature::IssueTracker],
};

pub const CLOSE: CommandMeta = CommandMeta {
    name: "issue:close",
    features: &[Feature::IssueTracker],
};

pub const COPY: CommandMeta = CommandMeta {
    name: "issue:copy",
    features: &[Feature::IssueTracker],
};

pub const TAKE: CommandMeta = CommandMeta {
    name: "issue:take",
    features: &[Feature::GitFolder, Feature::IssueTracker],
};

#[derive(Args)]
pub struct ShowArgs {
    /// Issue number
    issue_number: u64,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only issues in this state (open, closed)
    #[arg(long)]
    state: Option<IssueState>,
    /// Only issues carrying this label (repeatable)
    #[arg(long = "label")]
    labels: Vec<String>,
    /// Only issues assigned to this user
    #[arg(long)]
    assignee: Option<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    body: String,
    /// Label to apply (repeatable)
    #[arg(long = "label")]
    labels: Vec<String>,
}

#[derive(Args)]
pub struct CloseArgs {
    /// Issue number
    issue_number: u64,
    /// Comment posted before closing
    #[arg(short, long)]
    message: Option<String>,
}

#[derive(Args)]
pub struct CopyArgs {
    /// Issue number to copy
    issue_number: u64,
    /// Target username or organization
    target_username: String,
    /// Target repository
    target_repository: String,
    /// Prefix for the issue title
    #[arg(long)]
    prefix: Option<String>,
    /// Close the original issue
    #[arg(long)]
    close: bool,
}

#[derive(Args)]
pub struct TakeArgs {
    /// Issue number to work on
    issue_number: u64,
    /// Branch to start from (defaults to the configured base branch)
    base_branch: Option<String>,
}

pub async fn show(args: ShowArgs, session: &mut Session) -> anyhow::Result<()> {
    let tracker = session.issue_tracker()?;
    let issue = tracker.get_issue(args.issue_number).await?;

    session.style.title(format!(
        "Issue #{} - {} by {} [{}]",
        issue.number, issue.title, issue.user, issue.state
    ))?;
    session.style.definitions(&[
        ("Org/Repo:", tracker.target().full_name()),
        ("Link:", issue.url.clone()),
        ("Labels:", issue.labels.join(", ")),
        ("Milestone:", issue.milestone.clone().unwrap_or_default()),
        ("Assignee:", issue.assignee.clone().unwrap_or_default()),
        ("Comments:", issue.comments.to_string()),
    ])?;
    if !issue.body.is_empty() {
        session.style.line("")?;
        session.style.line(&issue.body)?;
    }
    Ok(())
}

pub async fn list(args: ListArgs, session: &mut Session) -> anyhow::Result<()> {
    let filter = IssueFilter {
        state: args.state,
        labels: args.labels,
        assignee: args.assignee,
    };
    let tracker = session.issue_tracker()?;
    let pb = session.style.spinner(format!("Fetching issues of {}", tracker.target()));
    let issues = tracker.get_issues(&filter).await;
    pb.finish_and_clear();
    let issues: Vec<_> = issues?.into_iter().filter(|i| !i.pull_request).collect();

    let mut t = table(
        &["#", "State", "Title", "User", "Assignee", "Milestone", "Labels", "Created"],
        session.style.colors(),
    );
    for issue in &issues {
        t.add_row(vec![
            issue.number.to_string(),
            issue.state.to_string(),
            issue.title.clone(),
            issue.user.clone(),
            issue.assignee.clone().unwrap_or_default(),
            issue.milestone.clone().unwrap_or_default(),
            issue.labels.join(", "),
            timestamp(Some(&issue.created_at)),
        ]);
    }
    session.style.line(t.to_string())?;
    session.style.line(format!("{} issues", issues.len()))?;
    Ok(())
}

pub async fn create(args: CreateArgs, session: &mut Session) -> anyhow::Result<()> {
    let tracker = session.issue_tracker()?;
    let mut issue = NewIssue::new(args.title, args.body);
    issue.labels = args.labels;
    let number = tracker.open_issue(&issue).await?;
    session
        .style
        .success(format!("Created issue {}", tracker.issue_url(number)))?;
    Ok(())
}

pub async fn close(args: CloseArgs, session: &mut Session) -> anyhow::Result<()> {
    let tracker = session.issue_tracker()?;
    if let Some(message) = args.message {
        tracker.create_comment(args.issue_number, &message).await?;
    }
    tracker.close_issue(args.issue_number).await?;
    session
        .style
        .success(format!("Closed {}", tracker.issue_url(args.issue_number)))?;
    Ok(())
}

/// Open a copy of an issue on another repository, optionally closing the source.
pub async fn copy(args: CopyArgs, session: &mut Session) -> anyhow::Result<()> {
    let source = session.issue_tracker()?.get_issue(args.issue_number).await?;
    let title = format!("{}{}", args.prefix.unwrap_or_default(), source.title);
    let copy = NewIssue::new(title, source.body.clone()).with_metadata_of(&source);

    let original = session.issue_tracker()?.target().clone();
    session
        .issue_tracker_mut()?
        .set_target(RepoTarget::new(args.target_username, args.target_repository));

    let tracker = session.issue_tracker()?;
    let opened = tracker
        .open_issue(&copy)
        .await
        .map(|number| tracker.issue_url(number));
    session.issue_tracker_mut()?.set_target(original);
    let url = opened?;

    session.style.success(format!("Opened issue: {url}"))?;

    if args.close {
        if source.state == IssueState::Closed {
            session.style.error(format!(
                "Issue #{} was already closed.",
                args.issue_number
            ))?;
        } else {
            let tracker = session.issue_tracker()?;
            tracker.close_issue(args.issue_number).await?;
            session.style.success(format!(
                "Closed issue: {}",
                tracker.issue_url(args.issue_number)
            ))?;
        }
    }
    Ok(())
}

/// Start a branch for an issue from the up-to-date base branch.
pub async fn take(args: TakeArgs, session: &mut Session) -> anyhow::Result<()> {
    let issue = session.issue_tracker()?.get_issue(args.issue_number).await?;
    let base = args.base_branch.unwrap_or_else(|| session.base_branch());
    let remote = session.config.remote.clone();
    let branch = format!("{}-{}", issue.number, slugify(&issue.title));

    session.git.fetch(&remote)?;
    session
        .git
        .checkout_new_branch(&branch, &format!("{remote}/{base}"))?;

    session.style.success(format!(
        "Issue #{} taken, you are now on branch {branch}",
        issue.number
    ))?;
    Ok(())
}
