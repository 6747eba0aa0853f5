use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use gush_adapter::{AdapterSettings, IssueTracker, RepoAdapter};
use gush_auth::CredentialStore;
use gush_core::config::{GushConfig, LocalConfig};
use gush_core::error::GushError;
use gush_core::models::{AdapterKind, RepoTarget};
use gush_git::Git;

use crate::helpers::{Style, Templates};

/// Builds adapters once the subscribers know which service and target to use.
pub trait AdapterFactory: Send + Sync {
    fn repo_adapter(
        &self,
        config: &GushConfig,
        kind: AdapterKind,
        target: RepoTarget,
    ) -> Result<Box<dyn RepoAdapter>, GushError>;

    fn issue_tracker(
        &self,
        config: &GushConfig,
        kind: AdapterKind,
        target: RepoTarget,
    ) -> Result<Box<dyn IssueTracker>, GushError>;
}

/// Factory backed by the config file and a credential store.
pub struct ConfiguredFactory {
    credentials: Arc<dyn CredentialStore>,
}

impl ConfiguredFactory {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    fn settings(
        &self,
        config: &GushConfig,
        kind: AdapterKind,
        target: RepoTarget,
    ) -> Result<AdapterSettings, GushError> {
        let adapter = config.adapter(kind);
        Ok(AdapterSettings {
            kind,
            api_url: adapter.api_url(kind),
            web_url: adapter.web_url(kind),
            credentials: self.credentials.require(kind)?,
            target,
        })
    }
}

impl AdapterFactory for ConfiguredFactory {
    fn repo_adapter(
        &self,
        config: &GushConfig,
        kind: AdapterKind,
        target: RepoTarget,
    ) -> Result<Box<dyn RepoAdapter>, GushError> {
        gush_adapter::create_repo_adapter(self.settings(config, kind, target)?)
    }

    fn issue_tracker(
        &self,
        config: &GushConfig,
        kind: AdapterKind,
        target: RepoTarget,
    ) -> Result<Box<dyn IssueTracker>, GushError> {
        gush_adapter::create_issue_tracker(self.settings(config, kind, target)?)
    }
}

/// Everything a command runs against: configuration, git, output and the
/// adapters prepared by the subscribers.
pub struct Session {
    pub config: GushConfig,
    pub config_path: PathBuf,
    pub local: LocalConfig,
    pub git: Git,
    pub style: Style,
    pub templates: Templates,
    pub credentials: Arc<dyn CredentialStore>,
    /// Template requested with `--template`.
    pub template: Option<String>,
    factory: Box<dyn AdapterFactory>,
    repo_adapter: Option<Box<dyn RepoAdapter>>,
    issue_tracker: Option<Box<dyn IssueTracker>>,
}

impl Session {
    /// Assemble a session. The repository-local `.gush.toml` is read from the
    /// work-tree root (the working directory outside a checkout) and user
    /// templates from `<home>/templates`.
    pub fn new(
        config: GushConfig,
        config_path: PathBuf,
        git: Git,
        style: Style,
        credentials: Arc<dyn CredentialStore>,
        factory: Box<dyn AdapterFactory>,
    ) -> anyhow::Result<Self> {
        let root = git
            .top_level()
            .unwrap_or_else(|_| git.dir().to_path_buf());
        let local = LocalConfig::load_from_dir(&root)?;
        let templates_dir = config_path.parent().map(|home| home.join("templates"));
        let templates = Templates::new(templates_dir.as_deref())?;
        Ok(Self {
            config,
            config_path,
            local,
            git,
            style,
            templates,
            credentials,
            template: None,
            factory,
            repo_adapter: None,
            issue_tracker: None,
        })
    }

    pub fn init_repo_adapter(&mut self, kind: AdapterKind, target: RepoTarget) -> anyhow::Result<()> {
        tracing::debug!(adapter = %kind, %target, "repository adapter");
        let adapter = self.factory.repo_adapter(&self.config, kind, target)?;
        self.repo_adapter = Some(adapter);
        Ok(())
    }

    pub fn init_issue_tracker(&mut self, kind: AdapterKind, target: RepoTarget) -> anyhow::Result<()> {
        tracing::debug!(adapter = %kind, %target, "issue tracker");
        let tracker = self.factory.issue_tracker(&self.config, kind, target)?;
        self.issue_tracker = Some(tracker);
        Ok(())
    }

    /// An issue tracker for an adapter that is not necessarily the configured one.
    pub fn build_issue_tracker(
        &self,
        kind: AdapterKind,
        target: RepoTarget,
    ) -> Result<Box<dyn IssueTracker>, GushError> {
        self.factory.issue_tracker(&self.config, kind, target)
    }

    pub fn repo_adapter(&self) -> anyhow::Result<&dyn RepoAdapter> {
        self.repo_adapter
            .as_deref()
            .context("this command has no repository adapter")
    }

    pub fn issue_tracker(&self) -> anyhow::Result<&dyn IssueTracker> {
        self.issue_tracker
            .as_deref()
            .context("this command has no issue tracker")
    }

    pub fn issue_tracker_mut(&mut self) -> anyhow::Result<&mut (dyn IssueTracker + 'static)> {
        match self.issue_tracker.as_deref_mut() {
            Some(tracker) => Ok(tracker),
            None => anyhow::bail!("this command has no issue tracker"),
        }
    }

    /// Org/repository of the canonical remote, if it points at a hosted repository.
    pub fn remote_target(&self) -> Option<RepoTarget> {
        let url = self.git.remote_url(&self.config.remote).ok().flatten()?;
        RepoTarget::from_remote_url(&url)
    }

    /// Branch new work starts from and pull requests target.
    pub fn base_branch(&self) -> String {
        self.local
            .base_branch
            .clone()
            .unwrap_or_else(|| self.config.base_branch.clone())
    }

    /// The login to use on `kind`: the configured username, otherwise the
    /// account the credentials belong to.
    pub async fn username(&self, kind: AdapterKind) -> anyhow::Result<String> {
        let configured = self.config.adapter(kind).username;
        if !configured.is_empty() {
            return Ok(configured);
        }
        Ok(self.repo_adapter()?.authenticated_user().await?)
    }

    /// The requested template, or `default` when none was given.
    pub fn template_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.template.as_deref().unwrap_or(default)
    }
}
