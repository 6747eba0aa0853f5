use clap::Args;

use crate::event::{CommandMeta, Feature};
use crate::session::Session;

pub const PUSH: CommandMeta = CommandMeta {
    name: "branch:push",
    features: &[Feature::GitFolder, Feature::GitRepo],
};

pub const DELETE: CommandMeta = CommandMeta {
    name: "branch:delete",
    features: &[Feature::GitFolder, Feature::GitRepo],
};

pub const FORK: CommandMeta = CommandMeta {
    name: "branch:fork",
    features: &[Feature::GitFolder, Feature::GitRepo],
};

#[derive(Args)]
pub struct PushArgs {
    /// Branch to push (defaults to the current branch)
    branch_name: Option<String>,
    /// Remote to push to (defaults to your username, i.e. your fork)
    #[arg(long)]
    remote: Option<String>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Branch to delete (defaults to the current branch)
    branch_name: Option<String>,
    /// Remote to delete from (defaults to your username)
    #[arg(long)]
    remote: Option<String>,
}

#[derive(Args)]
pub struct ForkArgs {
    /// Organization or user to fork into (defaults to your username)
    target_org: Option<String>,
}

async fn remote_or_username(remote: Option<String>, session: &Session) -> anyhow::Result<String> {
    match remote {
        Some(remote) => Ok(remote),
        None => session.username(session.repo_adapter()?.kind()).await,
    }
}

/// Push a branch to the user's fork and track it.
pub async fn push(args: PushArgs, session: &mut Session) -> anyhow::Result<()> {
    let branch = match args.branch_name {
        Some(branch) => branch,
        None => session.git.current_branch()?,
    };
    let remote = remote_or_username(args.remote, session).await?;

    let out = session.git.push_upstream(&remote, &branch)?;
    if out.success {
        session
            .style
            .line(format!("Branch pushed to {remote}/{branch}"))?;
    } else {
        session.style.error(format!(
            "Could not push {branch} to {remote}: {}",
            out.stderr.trim()
        ))?;
    }
    Ok(())
}

pub async fn delete(args: DeleteArgs, session: &mut Session) -> anyhow::Result<()> {
    let branch = match args.branch_name {
        Some(branch) => branch,
        None => session.git.current_branch()?,
    };
    let remote = remote_or_username(args.remote, session).await?;

    session.git.delete_remote_branch(&remote, &branch)?;
    session
        .style
        .line(format!("Branch {remote}/{branch} has been deleted!"))?;
    Ok(())
}

/// Fork the repository (into your own account unless an org is given) and
/// add the fork as a remote named after its owner.
pub async fn fork(args: ForkArgs, session: &mut Session) -> anyhow::Result<()> {
    let adapter = session.repo_adapter()?;
    let source = adapter.target().clone();

    let pb = session.style.spinner(format!("Forking {source}"));
    let fork = adapter.create_fork(args.target_org.as_deref()).await;
    pb.finish_and_clear();
    let fork = fork?;

    session.git.remote_add(&fork.org, &fork.clone_url)?;
    session.style.success(format!(
        "Forked repository {source} into {}/{}",
        fork.org, fork.repo
    ))?;
    session
        .style
        .line(format!("Added remote {} ({})", fork.org, fork.clone_url))?;
    Ok(())
}
