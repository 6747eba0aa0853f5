use clap::Args;
use gush_core::models::{NewPullRequest, PullRequestState};
use tera::Context;

use crate::event::{CommandMeta, Feature};
use crate::helpers::table::{table, timestamp};
use crate::session::Session;

pub const CREATE: CommandMeta = CommandMeta {
    name: "pull-request:create",
    features: &[Feature::GitFolder, Feature::GitRepo, Feature::Template],
};

pub const LIST: CommandMeta = CommandMeta {
    name: "pull-request:list",
    features: &[Feature::GitRepo],
};

pub const MERGE: CommandMeta = CommandMeta {
    name: "pull-request:merge",
    features: &[Feature::GitRepo, Feature::Template],
};

pub const CLOSE: CommandMeta = CommandMeta {
    name: "pull-request:close",
    features: &[Feature::GitRepo],
};

#[derive(Args)]
pub struct CreateArgs {
    /// Branch to merge into (defaults to the configured base branch)
    #[arg(long)]
    base: Option<String>,
    /// Owner of the branch with the changes (defaults to your username)
    #[arg(long)]
    source_org: Option<String>,
    /// Branch with the changes (defaults to the current branch)
    #[arg(long)]
    source_branch: Option<String>,
    #[arg(long)]
    title: String,
    /// Free text inserted into the template as `description`
    #[arg(long, default_value = "")]
    description: String,
    /// Extra template variable as key=value (repeatable)
    #[arg(long = "meta", value_parser = parse_meta)]
    meta: Vec<(String, String)>,
}

fn parse_meta(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got \"{raw}\"")),
    }
}

#[derive(Args)]
pub struct ListArgs {
    /// Only pull requests in this state (open, closed, merged)
    #[arg(long)]
    state: Option<PullRequestState>,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Pull request number
    pr_number: u64,
    /// Squash the commits into one
    #[arg(long)]
    squash: bool,
    /// Merge commit message (defaults to the rendered template)
    #[arg(short, long)]
    message: Option<String>,
}

#[derive(Args)]
pub struct CloseArgs {
    /// Pull request number
    pr_number: u64,
    /// Comment posted before closing
    #[arg(short, long)]
    message: Option<String>,
}

pub async fn create(args: CreateArgs, session: &mut Session) -> anyhow::Result<()> {
    let adapter = session.repo_adapter()?;
    let base = args.base.unwrap_or_else(|| session.base_branch());
    let source_org = match args.source_org {
        Some(org) => org,
        None => session.username(adapter.kind()).await?,
    };
    let source_branch = match args.source_branch {
        Some(branch) => branch,
        None => session.git.current_branch()?,
    };
    let head = format!("{source_org}:{source_branch}");

    let mut context = Context::new();
    context.insert("title", &args.title);
    context.insert("description", &args.description);
    context.insert("base", &base);
    context.insert("head", &head);
    for (key, value) in &args.meta {
        context.insert(key.as_str(), value);
    }
    let body = session
        .templates
        .render(session.template_or("default"), &context)?;

    let pb = session.style.spinner(format!("Opening pull request on {}", adapter.target()));
    let created = adapter
        .open_pull_request(&NewPullRequest {
            base,
            head,
            title: args.title,
            body,
        })
        .await;
    pb.finish_and_clear();
    let created = created?;

    session.style.success(format!(
        "Opened pull request #{}: {}",
        created.number, created.url
    ))?;
    Ok(())
}

pub async fn list(args: ListArgs, session: &mut Session) -> anyhow::Result<()> {
    let adapter = session.repo_adapter()?;
    let pb = session.style.spinner(format!("Fetching pull requests of {}", adapter.target()));
    let pulls = adapter.get_pull_requests(args.state).await;
    pb.finish_and_clear();
    let pulls = pulls?;

    let mut t = table(
        &["ID", "Title", "State", "Created", "User", "Link"],
        session.style.colors(),
    );
    for pr in &pulls {
        t.add_row(vec![
            pr.number.to_string(),
            pr.title.clone(),
            pr.state.to_string(),
            timestamp(Some(&pr.created_at)),
            pr.user.clone(),
            pr.url.clone(),
        ]);
    }
    session.style.line(t.to_string())?;
    session.style.line(format!("{} pull requests", pulls.len()))?;
    Ok(())
}

pub async fn merge(args: MergeArgs, session: &mut Session) -> anyhow::Result<()> {
    let adapter = session.repo_adapter()?;
    let pr = adapter.get_pull_request(args.pr_number).await?;

    if pr.merged || pr.state == PullRequestState::Merged {
        anyhow::bail!("Pull request #{} is already merged.", pr.number);
    }
    if pr.state != PullRequestState::Open {
        anyhow::bail!("Pull request #{} is {}.", pr.number, pr.state);
    }
    if pr.mergeable == Some(false) {
        anyhow::bail!("Pull request #{} is not mergeable.", pr.number);
    }

    let message = match args.message {
        Some(message) => message,
        None => {
            let mut context = Context::new();
            context.insert("number", &pr.number);
            context.insert("title", &pr.title);
            context.insert("body", &pr.body);
            context.insert("user", &pr.user);
            context.insert("head", &format!("{}/{}", pr.head.org, pr.head.branch));
            context.insert("base", &pr.base.branch);
            session
                .templates
                .render(session.template_or("merge"), &context)?
        }
    };

    let pb = session.style.spinner(format!("Merging #{}", pr.number));
    let sha = adapter
        .merge_pull_request(pr.number, &message, args.squash)
        .await;
    pb.finish_and_clear();
    session
        .style
        .success(format!("Pull request #{} merged ({})", pr.number, sha?))?;
    Ok(())
}

pub async fn close(args: CloseArgs, session: &mut Session) -> anyhow::Result<()> {
    let adapter = session.repo_adapter()?;
    if let Some(message) = args.message {
        adapter.comment_pull_request(args.pr_number, &message).await?;
    }
    adapter.close_pull_request(args.pr_number).await?;
    session
        .style
        .success(format!("Closed {}", adapter.pull_request_url(args.pr_number)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta() {
        assert_eq!(
            parse_meta("bug_fix=yes").unwrap(),
            ("bug_fix".to_string(), "yes".to_string())
        );
        assert_eq!(
            parse_meta("fixed_tickets=#12, #13").unwrap().1,
            "#12, #13"
        );
        assert!(parse_meta("no-separator").is_err());
        assert!(parse_meta("=value").is_err());
    }
}
