use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::GushError;
use crate::models::adapter::AdapterKind;

/// Name of the repository-local configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".gush.toml";

/// Environment variable overriding the Gush home directory.
pub const HOME_ENV: &str = "GUSH_HOME";

/// Per-adapter settings. The secret itself lives in the credential store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// REST API root; defaults to the hosted service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<url::Url>,

    /// Web root used to build links shown to the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<url::Url>,

    /// Login (or e-mail for Jira) used to authenticate.
    #[serde(default)]
    pub username: String,
}

impl AdapterConfig {
    pub fn api_url(&self, kind: AdapterKind) -> url::Url {
        self.base_url
            .clone()
            .unwrap_or_else(|| kind.default_api_url())
    }

    pub fn web_url(&self, kind: AdapterKind) -> url::Url {
        self.web_url
            .clone()
            .unwrap_or_else(|| kind.default_web_url())
    }
}

/// Global Gush configuration, stored at `~/.gush/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GushConfig {
    /// Adapter used for pull requests, releases and forks.
    #[serde(default = "default_adapter")]
    pub repo_adapter: AdapterKind,

    /// Adapter used for issues.
    #[serde(default = "default_adapter")]
    pub issue_tracker: AdapterKind,

    /// Branch pull requests target and issue branches start from.
    #[serde(default = "default_base_branch")]
    pub base_branch: String,

    /// Remote that holds the canonical repository.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Keyed by adapter name (`github`, `gitlab`, ...).
    #[serde(default)]
    pub adapters: BTreeMap<String, AdapterConfig>,
}

fn default_adapter() -> AdapterKind {
    AdapterKind::GitHub
}

fn default_base_branch() -> String {
    "master".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

impl Default for GushConfig {
    fn default() -> Self {
        Self {
            repo_adapter: default_adapter(),
            issue_tracker: default_adapter(),
            base_branch: default_base_branch(),
            remote: default_remote(),
            adapters: BTreeMap::new(),
        }
    }
}

impl GushConfig {
    /// Returns the Gush home directory (`$GUSH_HOME` or `~/.gush/`).
    pub fn home_dir() -> Result<PathBuf, GushError> {
        if let Some(dir) = std::env::var_os(HOME_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let base = dirs::home_dir().ok_or_else(|| GushError::Config {
            message: "could not determine home directory".into(),
        })?;
        Ok(base.join(".gush"))
    }

    /// Returns the path to the config file.
    pub fn config_path() -> Result<PathBuf, GushError> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load config from the default location, or return defaults if not found.
    pub fn load() -> Result<Self, GushError> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, GushError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| GushError::Config {
            message: format!("{}: {e}", path.display()),
        })
    }

    pub fn set_adapter(&mut self, kind: AdapterKind, adapter: AdapterConfig) {
        self.adapters.insert(kind.to_string(), adapter);
    }

    pub fn save_to(&self, path: &Path) -> Result<(), GushError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| GushError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Settings for `kind`; defaults (public service, no username) when the
    /// config file has no table for it.
    pub fn adapter(&self, kind: AdapterKind) -> AdapterConfig {
        self.adapters
            .get(&kind.to_string())
            .cloned()
            .unwrap_or_default()
    }
}

/// Repository-local overrides read from `.gush.toml` in the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default)]
    pub repo_adapter: Option<AdapterKind>,
    #[serde(default)]
    pub issue_tracker: Option<AdapterKind>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub issue_org: Option<String>,
    #[serde(default)]
    pub issue_project: Option<String>,
    #[serde(default)]
    pub base_branch: Option<String>,
}

impl LocalConfig {
    /// Load `.gush.toml` from `dir`; a missing file yields empty overrides.
    pub fn load_from_dir(dir: &Path) -> Result<Self, GushError> {
        let path = dir.join(LOCAL_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| GushError::Config {
            message: format!("{}: {e}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roundtrip() {
        let mut config = GushConfig::default();
        config.set_adapter(
            AdapterKind::GitLab,
            AdapterConfig {
                base_url: Some(url::Url::parse("https://git.example.com/api/v4").unwrap()),
                web_url: None,
                username: "cordoval".into(),
            },
        );
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: GushConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.repo_adapter, AdapterKind::GitHub);
        assert_eq!(deserialized.base_branch, "master");
        assert_eq!(
            deserialized.adapter(AdapterKind::GitLab),
            config.adapter(AdapterKind::GitLab)
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: GushConfig = toml::from_str(
            r#"
issue_tracker = "jira"

[adapters.jira]
base_url = "https://acme.atlassian.net/rest/api/2"
username = "dev@acme.test"
"#,
        )
        .unwrap();
        assert_eq!(config.repo_adapter, AdapterKind::GitHub);
        assert_eq!(config.issue_tracker, AdapterKind::Jira);
        assert_eq!(config.remote, "origin");
        let jira = config.adapter(AdapterKind::Jira);
        assert_eq!(
            jira.api_url(AdapterKind::Jira).as_str(),
            "https://acme.atlassian.net/rest/api/2"
        );
        assert_eq!(
            jira.web_url(AdapterKind::Jira),
            AdapterKind::Jira.default_web_url()
        );
    }

    #[test]
    fn test_unconfigured_adapter_uses_defaults() {
        let bitbucket = GushConfig::default().adapter(AdapterKind::Bitbucket);
        assert!(bitbucket.username.is_empty());
        assert_eq!(
            bitbucket.api_url(AdapterKind::Bitbucket),
            AdapterKind::Bitbucket.default_api_url()
        );
    }

    #[test]
    fn test_local_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            LocalConfig::load_from_dir(dir.path()).unwrap(),
            LocalConfig::default()
        );
    }

    #[test]
    fn test_local_config_reads_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(LOCAL_CONFIG_FILE),
            "repo_adapter = \"gitlab\"\norg = \"gushphp\"\nrepo = \"gush\"\n",
        )
        .unwrap();
        let local = LocalConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(local.repo_adapter, Some(AdapterKind::GitLab));
        assert_eq!(local.org.as_deref(), Some("gushphp"));
        assert_eq!(local.issue_tracker, None);
    }
}
