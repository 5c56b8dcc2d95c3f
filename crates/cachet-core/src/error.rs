use std::path::PathBuf;

use cachet_store::StoreError;

/// Errors surfaced to the command layer
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache is locked / wrong passphrase")]
    Authentication,

    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("Cache is locked - unlock it first")]
    NotUnlocked,

    #[error("Passphrases did not match")]
    PassphraseMismatch,

    #[error("No cache store at {} - run init first", .0.display())]
    StoreMissing(PathBuf),

    #[error("A refresh is already running")]
    RefreshInProgress,

    #[error("Could not read passphrase: {0}")]
    Credentials(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Authentication => CacheError::Authentication,
            other => CacheError::StoreUnavailable(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Non-fatal problems collected while scanning or setting up
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("skipped {}: {reason}", path.display())]
    Scan { path: PathBuf, reason: String },

    #[error("root directory does not exist: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("max_file_size {configured} is above the {limit}-byte entry limit; using the limit")]
    MaxFileSizeClamped { configured: u64, limit: u64 },
}
