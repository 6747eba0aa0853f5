use clap::Args;
use gush_auth::{credential_key, AuthMethod, Credentials};
use gush_core::models::{AdapterKind, RepoTarget};

use crate::event::CommandMeta;
use crate::session::Session;

pub const CONFIGURE: CommandMeta = CommandMeta {
    name: "core:configure",
    features: &[],
};

#[derive(Args)]
pub struct ConfigureArgs {
    /// Adapter to configure (github, gitlab, bitbucket, jira)
    #[arg(long)]
    adapter: AdapterKind,
    /// Login (e-mail address for Jira)
    #[arg(long)]
    username: Option<String>,
    /// Personal access token, app password or API token
    #[arg(long)]
    token: Option<String>,
    /// REST API root of a self-hosted instance
    #[arg(long)]
    base_url: Option<url::Url>,
    /// Web root of a self-hosted instance
    #[arg(long)]
    web_url: Option<url::Url>,
    /// Adapter used for pull requests, releases and forks
    #[arg(long)]
    default_repo_adapter: Option<AdapterKind>,
    /// Adapter used for issues
    #[arg(long)]
    default_issue_tracker: Option<AdapterKind>,
    /// Skip checking the credentials against the service
    #[arg(long)]
    no_verify: bool,
}

pub async fn run(args: ConfigureArgs, session: &mut Session) -> anyhow::Result<()> {
    let kind = args.adapter;
    let method = AuthMethod::for_adapter(kind);

    let mut adapter = session.config.adapter(kind);
    if let Some(username) = args.username {
        adapter.username = username;
    }
    if args.base_url.is_some() {
        adapter.base_url = args.base_url;
    }
    if args.web_url.is_some() {
        adapter.web_url = args.web_url;
    }

    if method == AuthMethod::Basic && adapter.username.is_empty() {
        anyhow::bail!("{kind} uses basic authentication; pass --username");
    }

    let key = credential_key(kind);
    let secret = match args.token {
        Some(token) if token.is_empty() => anyhow::bail!("Token cannot be empty"),
        Some(token) => token,
        None => match session.credentials.get(&key)? {
            Some(existing) => existing.secret,
            None => anyhow::bail!("no credentials stored for {kind}; pass --token"),
        },
    };
    session
        .credentials
        .store(&key, &Credentials::new(adapter.username.clone(), secret, method))?;

    if let Some(default) = args.default_repo_adapter {
        if !default.supports_repository() {
            anyhow::bail!("{default} can only be used as an issue tracker");
        }
        session.config.repo_adapter = default;
    }
    if let Some(default) = args.default_issue_tracker {
        session.config.issue_tracker = default;
    }

    let username = adapter.username.clone();
    session.config.set_adapter(kind, adapter);
    session.config.save_to(&session.config_path)?;
    session.style.success(format!(
        "Configuration saved to {}",
        session.config_path.display()
    ))?;
    session
        .style
        .line(format!("Credentials stored in OS keychain as '{key}'"))?;

    if !args.no_verify {
        verify(session, kind, username).await?;
    }
    Ok(())
}

async fn verify(session: &Session, kind: AdapterKind, username: String) -> anyhow::Result<()> {
    let tracker = session.build_issue_tracker(kind, RepoTarget::new(username, ""))?;
    let pb = session.style.spinner(format!("Checking {kind} credentials"));
    let login = tracker.authenticated_user().await;
    pb.finish_and_clear();
    session
        .style
        .success(format!("Authenticated on {kind} as {}", login?))?;
    Ok(())
}
