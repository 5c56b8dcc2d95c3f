//! Cachet Core - encrypted incremental mirror of source trees
//!
//! This crate contains everything between the frontends and the encrypted
//! store: path filtering, directory scanning, the session/key lifecycle,
//! refresh, and content search. Frontends talk to a [`CacheContext`].

pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod filter;
pub mod scanner;
pub mod search;
pub mod session;
pub mod sync;
pub mod tasks;

pub use cachet_store::StoredFile;
pub use config::Config;
pub use context::{CacheContext, CacheStats, ListedEntry};
pub use credentials::{CredentialSource, PassphrasePrompt, StaticCredentials};
pub use error::{CacheError, Result, Warning};
pub use filter::{Matcher, PathFilter};
pub use search::SearchMatch;
pub use session::SessionManager;
pub use sync::{RefreshReport, SyncEngine};
pub use tokio_util::sync::CancellationToken;
