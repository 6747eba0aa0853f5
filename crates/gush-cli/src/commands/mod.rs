pub mod branch;
pub mod configure;
pub mod issue;
pub mod pull_request;
pub mod release;

use clap::Subcommand;

use crate::event::CommandMeta;
use crate::session::Session;

/// Every command's metadata, used to decorate the clap tree before parsing.
pub const COMMANDS: &[CommandMeta] = &[
    configure::CONFIGURE,
    branch::PUSH,
    branch::DELETE,
    branch::FORK,
    issue::SHOW,
    issue::LIST,
    issue::CREATE,
    issue::CLOSE,
    issue::COPY,
    issue::TAKE,
    pull_request::CREATE,
    pull_request::LIST,
    pull_request::MERGE,
    pull_request::CLOSE,
    release::LIST,
    release::CREATE,
    release::REMOVE,
];

#[derive(Subcommand)]
pub enum Command {
    /// Store credentials and adapter settings
    #[command(name = "core:configure")]
    Configure(configure::ConfigureArgs),
    /// Push a branch to your fork
    #[command(name = "branch:push")]
    BranchPush(branch::PushArgs),
    /// Delete a branch from a remote
    #[command(name = "branch:delete")]
    BranchDelete(branch::DeleteArgs),
    /// Fork the repository and add the fork as a remote
    #[command(name = "branch:fork")]
    BranchFork(branch::ForkArgs),
    /// Show one issue
    #[command(name = "issue:show")]
    IssueShow(issue::ShowArgs),
    /// List issues
    #[command(name = "issue:list")]
    IssueList(issue::ListArgs),
    /// Open an issue
    #[command(name = "issue:create")]
    IssueCreate(issue::CreateArgs),
    /// Close an issue
    #[command(name = "issue:close")]
    IssueClose(issue::CloseArgs),
    /// Copy an issue to another repository
    #[command(name = "issue:copy")]
    IssueCopy(issue::CopyArgs),
    /// Start a branch for an issue
    #[command(name = "issue:take")]
    IssueTake(issue::TakeArgs),
    /// Open a pull request
    #[command(name = "pull-request:create")]
    PullRequestCreate(pull_request::CreateArgs),
    /// List pull requests
    #[command(name = "pull-request:list")]
    PullRequestList(pull_request::ListArgs),
    /// Merge a pull request
    #[command(name = "pull-request:merge")]
    PullRequestMerge(pull_request::MergeArgs),
    /// Close a pull request
    #[command(name = "pull-request:close")]
    PullRequestClose(pull_request::CloseArgs),
    /// List releases
    #[command(name = "release:list")]
    ReleaseList(release::ListArgs),
    /// Publish a release
    #[command(name = "release:create")]
    ReleaseCreate(release::CreateArgs),
    /// Remove a release
    #[command(name = "release:remove")]
    ReleaseRemove(release::RemoveArgs),
}

impl Command {
    pub fn meta(&self) -> &'static CommandMeta {
        match self {
            Command::Configure(_) => &configure::CONFIGURE,
            Command::BranchPush(_) => &branch::PUSH,
            Command::BranchDelete(_) => &branch::DELETE,
            Command::BranchFork(_) => &branch::FORK,
            Command::IssueShow(_) => &issue::SHOW,
            Command::IssueList(_) => &issue::LIST,
            Command::IssueCreate(_) => &issue::CREATE,
            Command::IssueClose(_) => &issue::CLOSE,
            Command::IssueCopy(_) => &issue::COPY,
            Command::IssueTake(_) => &issue::TAKE,
            Command::PullRequestCreate(_) => &pull_request::CREATE,
            Command::PullRequestList(_) => &pull_request::LIST,
            Command::PullRequestMerge(_) => &pull_request::MERGE,
            Command::PullRequestClose(_) => &pull_request::CLOSE,
            Command::ReleaseList(_) => &release::LIST,
            Command::ReleaseCreate(_) => &release::CREATE,
            Command::ReleaseRemove(_) => &release::REMOVE,
        }
    }
}

pub async fn run(cmd: Command, session: &mut Session) -> anyhow::Result<()> {
    match cmd {
        Command::Configure(args) => configure::run(args, session).await,
        Command::BranchPush(args) => branch::push(args, session).await,
        Command::BranchDelete(args) => branch::delete(args, session).await,
        Command::BranchFork(args) => branch::fork(args, session).await,
        Command::IssueShow(args) => issue::show(args, session).await,
        Command::IssueList(args) => issue::list(args, session).await,
        Command::IssueCreate(args) => issue::create(args, session).await,
        Command::IssueClose(args) => issue::close(args, session).await,
        Command::IssueCopy(args) => issue::copy(args, session).await,
        Command::IssueTake(args) => issue::take(args, session).await,
        Command::PullRequestCreate(args) => pull_request::create(args, session).await,
        Command::PullRequestList(args) => pull_request::list(args, session).await,
        Command::PullRequestMerge(args) => pull_request::merge(args, session).await,
        Command::PullRequestClose(args) => pull_request::close(args, session).await,
        Command::ReleaseList(args) => release::list(args, session).await,
        Command::ReleaseCreate(args) => release::create(args, session).await,
        Command::ReleaseRemove(args) => release::remove(args, session).await,
    }
}
