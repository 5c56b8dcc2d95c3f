//! Cachet Store - encrypted single-file record store
//!
//! One table of cached files keyed by absolute path, plus a small metadata
//! map. Everything past the KDF salt is ChaCha20-Poly1305 ciphertext; a disk
//! thief gets garbage, not a database file.

pub mod engine;
pub mod log;
mod record;

use std::path::PathBuf;

use cachet_crypto::CryptoError;

pub use engine::{EntryMeta, StorageEngine, StoredFile};
pub use log::{LogEngine, STORE_FILE_NAME};
pub use record::MAX_ENTRY_SIZE;

/// Errors from store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store key rejected - wrong passphrase")]
    Authentication,

    #[error("Store file corrupted: {0}")]
    Corrupt(String),

    #[error("Store already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Record of {size} bytes exceeds the {limit}-byte frame limit")]
    FrameTooLarge { size: usize, limit: u32 },

    #[error("Store unusable: a failed write could not be rolled back")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
