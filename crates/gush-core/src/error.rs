use std::path::PathBuf;

/// Central error type for Gush.
#[derive(Debug, thiserror::Error)]
pub enum GushError {
    #[error("adapter not configured: {adapter} (run `gush core:configure --adapter {adapter}`)")]
    AdapterNotConfigured { adapter: String },

    #[error("{adapter} does not support {operation}")]
    UnsupportedOperation { adapter: String, operation: String },

    #[error("authentication failed for {adapter}: {message}")]
    AuthFailed { adapter: String, message: String },

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("rate limited by {adapter}")]
    RateLimited { adapter: String },

    #[error("git error: {message}")]
    GitError { message: String },

    #[error("You must be in a Git directory to run this command ({path})")]
    NotAGitRepository { path: PathBuf },

    #[error("unable to determine {what}; pass it explicitly or add it to .gush.toml")]
    UnresolvedRepository { what: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("template error: {message}")]
    Template { message: String },

    #[error("credential error: {message}")]
    CredentialError { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl GushError {
    pub fn unsupported(adapter: impl Into<String>, operation: impl Into<String>) -> Self {
        GushError::UnsupportedOperation {
            adapter: adapter.into(),
            operation: operation.into(),
        }
    }
}

pub type Result<T, E = GushError> = std::result::Result<T, E>;
