use std::collections::HashMap;
use std::sync::Mutex;

use gush_core::error::GushError;
use gush_core::models::adapter::AdapterKind;
use serde::{Deserialize, Serialize};

/// How a secret is presented to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Personal access token sent as a bearer/private token.
    Token,
    /// Username + password (or app password / API token) via HTTP basic auth.
    Basic,
}

impl AuthMethod {
    /// The method each service expects for personal credentials.
    pub fn for_adapter(kind: AdapterKind) -> Self {
        match kind {
            AdapterKind::GitHub | AdapterKind::GitLab => AuthMethod::Token,
            AdapterKind::Bitbucket | AdapterKind::Jira => AuthMethod::Basic,
        }
    }
}

/// Credentials for one adapter.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
    pub method: AuthMethod,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>, method: AuthMethod) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
            method,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"***")
            .field("method", &self.method)
            .finish()
    }
}

/// Keychain entry name for an adapter's credentials.
pub fn credential_key(kind: AdapterKind) -> String {
    format!("gush:{kind}")
}

/// Trait for credential storage backends.
pub trait CredentialStore: Send + Sync {
    /// Store credentials under the given key, replacing any previous entry.
    fn store(&self, key: &str, credentials: &Credentials) -> Result<(), GushError>;

    /// Retrieve credentials by key.
    fn get(&self, key: &str) -> Result<Option<Credentials>, GushError>;

    /// Credentials for `kind`, failing when none were configured.
    fn require(&self, kind: AdapterKind) -> Result<Credentials, GushError> {
        self.get(&credential_key(kind))?
            .ok_or_else(|| GushError::AdapterNotConfigured {
                adapter: kind.to_string(),
            })
    }
}

fn credential_error(e: impl std::fmt::Display) -> GushError {
    GushError::CredentialError {
        message: e.to_string(),
    }
}

/// OS keychain-backed credential store using the `keyring` crate.
///
/// Entries are JSON-encoded [`Credentials`].
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: "gush".to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, GushError> {
        keyring::Entry::new(&self.service, key).map_err(credential_error)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn store(&self, key: &str, credentials: &Credentials) -> Result<(), GushError> {
        let encoded = serde_json::to_string(credentials)
            .map_err(|e| GushError::Serialization(e.to_string()))?;
        self.entry(key)?
            .set_password(&encoded)
            .map_err(credential_error)?;
        tracing::debug!(key, "stored credentials in keychain");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Credentials>, GushError> {
        match self.entry(key)?.get_password() {
            Ok(encoded) => serde_json::from_str(&encoded)
                .map(Some)
                .map_err(|e| GushError::CredentialError {
                    message: format!("corrupt keychain entry {key}: {e}"),
                }),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(credential_error(e)),
        }
    }
}

/// In-memory credential store for testing.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Credentials>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with credentials for one adapter.
    pub fn with(kind: AdapterKind, credentials: Credentials) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(credential_key(kind), credentials);
        store
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, credentials: &Credentials) -> Result<(), GushError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), credentials.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Credentials>, GushError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }
}
