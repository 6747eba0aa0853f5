use serde::{Deserialize, Serialize};
use url::Url;

/// The kind of hosting service or issue tracker an adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    GitHub,
    GitLab,
    Bitbucket,
    Jira,
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterKind::GitHub => write!(f, "github"),
            AdapterKind::GitLab => write!(f, "gitlab"),
            AdapterKind::Bitbucket => write!(f, "bitbucket"),
            AdapterKind::Jira => write!(f, "jira"),
        }
    }
}

impl std::str::FromStr for AdapterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(AdapterKind::GitHub),
            "gitlab" => Ok(AdapterKind::GitLab),
            "bitbucket" => Ok(AdapterKind::Bitbucket),
            "jira" => Ok(AdapterKind::Jira),
            _ => Err(format!("unknown adapter: {s}")),
        }
    }
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 4] = [
        AdapterKind::GitHub,
        AdapterKind::GitLab,
        AdapterKind::Bitbucket,
        AdapterKind::Jira,
    ];

    /// Default REST API root for the hosted flavour of this service.
    ///
    /// Jira has no shared host, so its default is a placeholder that
    /// `core:configure --base-url` is expected to replace.
    pub fn default_api_url(&self) -> Url {
        let raw = match self {
            AdapterKind::GitHub => "https://api.github.com",
            AdapterKind::GitLab => "https://gitlab.com/api/v4",
            AdapterKind::Bitbucket => "https://api.bitbucket.org/2.0",
            AdapterKind::Jira => "https://jira.atlassian.com/rest/api/2",
        };
        Url::parse(raw).expect("static adapter url is valid")
    }

    /// Default web root, used to build human-facing links.
    pub fn default_web_url(&self) -> Url {
        let raw = match self {
            AdapterKind::GitHub => "https://github.com",
            AdapterKind::GitLab => "https://gitlab.com",
            AdapterKind::Bitbucket => "https://bitbucket.org",
            AdapterKind::Jira => "https://jira.atlassian.com",
        };
        Url::parse(raw).expect("static adapter url is valid")
    }

    /// Whether this service hosts repositories (pull requests, releases, forks).
    pub fn supports_repository(&self) -> bool {
        !matches!(self, AdapterKind::Jira)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_kind_parse_is_case_insensitive() {
        assert_eq!("GitHub".parse::<AdapterKind>().unwrap(), AdapterKind::GitHub);
        assert_eq!("JIRA".parse::<AdapterKind>().unwrap(), AdapterKind::Jira);
        assert!("trac".parse::<AdapterKind>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for kind in AdapterKind::ALL {
            assert_eq!(kind.to_string().parse::<AdapterKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_jira_is_issue_tracker_only() {
        assert!(!AdapterKind::Jira.supports_repository());
        assert!(AdapterKind::Bitbucket.supports_repository());
    }
}
