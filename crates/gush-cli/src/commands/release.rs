use clap::Args;
use gush_core::models::{NewRelease, Release};
use tera::Context;

use crate::event::{CommandMeta, Feature};
use crate::helpers::table::{table, timestamp, yes_no};
use crate::session::Session;

pub const LIST: CommandMeta = CommandMeta {
    name: "release:list",
    features: &[Feature::GitRepo],
};

pub const CREATE: CommandMeta = CommandMeta {
    name: "release:create",
    features: &[Feature::GitFolder, Feature::GitRepo, Feature::Template],
};

pub const REMOVE: CommandMeta = CommandMeta {
    name: "release:remove",
    features: &[Feature::GitRepo],
};

#[derive(Args)]
pub struct ListArgs {}

#[derive(Args)]
pub struct CreateArgs {
    /// Tag to release
    tag: String,
    /// Release title (defaults to the tag)
    #[arg(long)]
    name: Option<String>,
    /// Release notes (defaults to the rendered commit log)
    #[arg(long)]
    body: Option<String>,
    #[arg(long)]
    draft: bool,
    #[arg(long)]
    prerelease: bool,
    /// Branch or commit to tag when the tag does not exist yet
    #[arg(long)]
    target: Option<String>,
    /// Revision the commit log starts after (defaults to the latest release tag)
    #[arg(long)]
    since: Option<String>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Release id (the tag name on GitLab)
    id: String,
}

pub async fn list(_args: ListArgs, session: &mut Session) -> anyhow::Result<()> {
    let adapter = session.repo_adapter()?;
    let pb = session.style.spinner(format!("Fetching releases of {}", adapter.target()));
    let releases = adapter.get_releases().await;
    pb.finish_and_clear();
    let releases = releases?;

    let mut t = table(
        &["ID", "Name", "Tag", "Draft", "Prerelease", "Created", "Published"],
        session.style.colors(),
    );
    for release in &releases {
        t.add_row(vec![
            release.id.clone(),
            release.name.clone(),
            release.tag_name.clone(),
            yes_no(release.draft).to_string(),
            yes_no(release.prerelease).to_string(),
            timestamp(Some(&release.created_at)),
            timestamp(release.published_at.as_ref()),
        ]);
    }
    session.style.line(t.to_string())?;
    session.style.line(format!("{} releases", releases.len()))?;
    Ok(())
}

pub async fn create(args: CreateArgs, session: &mut Session) -> anyhow::Result<()> {
    let adapter = session.repo_adapter()?;

    let body = match args.body {
        Some(body) => body,
        None => {
            let since = match args.since {
                Some(since) => Some(since),
                None => {
                    let since = latest_tag(adapter.get_releases().await?, &args.tag);
                    if since.is_none() {
                        session
                            .style
                            .note("No previous release found, using the full history")?;
                    }
                    since
                }
            };
            let range = match &since {
                Some(since) => format!("{since}..HEAD"),
                None => "HEAD".to_string(),
            };
            let commits = session.git.log_oneline(&range)?;
            tracing::debug!(%range, commits = commits.len(), "release notes");

            let mut context = Context::new();
            context.insert("tag", &args.tag);
            context.insert("since", &since);
            context.insert("commits", &commits);
            session
                .templates
                .render(session.template_or("release"), &context)?
        }
    };

    let release = NewRelease {
        name: args.name.unwrap_or_else(|| args.tag.clone()),
        tag_name: args.tag,
        body,
        target: args.target,
        draft: args.draft,
        prerelease: args.prerelease,
    };
    let created = adapter.create_release(&release).await?;
    session
        .style
        .success(format!("Created release {}", created.url))?;
    Ok(())
}

/// Tag of the most recently created release other than `tag`.
fn latest_tag(mut releases: Vec<Release>, tag: &str) -> Option<String> {
    releases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    releases
        .into_iter()
        .map(|r| r.tag_name)
        .find(|name| name != tag)
}

pub async fn remove(args: RemoveArgs, session: &mut Session) -> anyhow::Result<()> {
    session.repo_adapter()?.remove_release(&args.id).await?;
    session
        .style
        .success(format!("Release {} removed", args.id))?;
    Ok(())
}
