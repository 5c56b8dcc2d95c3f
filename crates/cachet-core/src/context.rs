//! Cache context - the handle frontends hold
//!
//! Built once from a [`Config`] and shared by reference (or `Arc`) with
//! every caller. It owns the compiled filter and the session; there is no
//! process-wide state.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use cachet_store::StoredFile;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::credentials::CredentialSource;
use crate::error::{CacheError, Result, Warning};
use crate::filter::PathFilter;
use crate::search::{self, SearchMatch};
use crate::session::SessionManager;
use crate::sync::{RefreshReport, SyncEngine, LAST_REFRESH_KEY};

/// One row of `list_entries`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub display_path: String,
    pub full_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub cached_files: usize,
    pub total_size: u64,
    pub last_refresh: Option<DateTime<Utc>>,
    pub locked: bool,
}

pub struct CacheContext {
    config: Config,
    filter: PathFilter,
    session: Mutex<SessionManager>,
    refreshing: AtomicBool,
    setup_warnings: Vec<Warning>,
}

impl CacheContext {
    pub fn new(config: Config) -> Result<Self> {
        let filter = PathFilter::from_config(&config)?;
        let setup_warnings = config.validate();
        for warning in &setup_warnings {
            tracing::warn!(%warning, "configuration warning");
        }
        let session = SessionManager::new(config.store_path(), config.session_timeout());

        Ok(Self {
            config,
            filter,
            session: Mutex::new(session),
            refreshing: AtomicBool::new(false),
            setup_warnings,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Warnings found while setting up (missing roots)
    pub fn setup_warnings(&self) -> &[Warning] {
        &self.setup_warnings
    }

    fn session(&self) -> MutexGuard<'_, SessionManager> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn display_root(&self) -> Option<&Path> {
        self.config.roots.first().map(PathBuf::as_path)
    }

    /// Unlock the cache. Creates the store on first use only when
    /// `prompt_on_first_use` is set.
    pub fn unlock(&self, credentials: &dyn CredentialSource) -> Result<()> {
        self.session()
            .unlock(credentials, self.config.prompt_on_first_use)
    }

    /// Unlock, creating the store if it does not exist yet
    pub fn initialize(&self, credentials: &dyn CredentialSource) -> Result<()> {
        self.session().unlock(credentials, true)
    }

    pub fn lock(&self) {
        self.session().lock();
    }

    pub fn is_locked(&self) -> bool {
        self.session().is_locked()
    }

    pub fn store_exists(&self) -> bool {
        self.session().store_exists()
    }

    /// Run one refresh pass. A second concurrent call fails with
    /// [`CacheError::RefreshInProgress`].
    pub fn refresh(&self, cancel: &CancellationToken) -> Result<RefreshReport> {
        let _guard = RefreshGuard::acquire(&self.refreshing)?;
        SyncEngine::new(&self.config, &self.filter, &self.session).refresh(cancel)
    }

    /// Refresh pass started by a timer. It does not count as activity, so an
    /// idle session still locks while auto-refresh runs.
    pub fn background_refresh(&self, cancel: &CancellationToken) -> Result<RefreshReport> {
        let _guard = RefreshGuard::acquire(&self.refreshing)?;
        SyncEngine::new(&self.config, &self.filter, &self.session)
            .in_background()
            .refresh(cancel)
    }

    /// Drop entries whose source file has been deleted
    pub fn prune(&self) -> Result<usize> {
        let _guard = RefreshGuard::acquire(&self.refreshing)?;
        SyncEngine::new(&self.config, &self.filter, &self.session).prune()
    }

    /// Remove every entry and all metadata
    pub fn clear(&self) -> Result<()> {
        let _guard = RefreshGuard::acquire(&self.refreshing)?;
        self.session().with_store(|store| Ok(store.clear_all()?))
    }

    /// Never requires unlocking; a locked cache reports zeros.
    pub fn stats(&self) -> CacheStats {
        let mut session = self.session();
        if session.is_locked() {
            return CacheStats {
                locked: true,
                ..CacheStats::default()
            };
        }

        let stats = session.with_store(|store| {
            let entries = store.list_all();
            let last_refresh = store
                .get_metadata(LAST_REFRESH_KEY)
                .and_then(|raw| raw.parse::<i64>().ok())
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
            Ok(CacheStats {
                cached_files: entries.len(),
                total_size: entries.values().map(|meta| meta.size).sum(),
                last_refresh,
                locked: false,
            })
        });
        stats.unwrap_or(CacheStats {
            locked: true,
            ..CacheStats::default()
        })
    }

    pub fn list_entries(&self) -> Result<Vec<ListedEntry>> {
        let cached = self.session().with_store(|store| Ok(store.list_all()))?;
        Ok(cached
            .into_keys()
            .map(|full_path| ListedEntry {
                display_path: search::display_path(&full_path, self.display_root()),
                full_path,
            })
            .collect())
    }

    /// Cached content for an absolute path, or one relative to the first root
    pub fn fetch(&self, path: &str) -> Result<Option<StoredFile>> {
        let full_path = match self.display_root() {
            Some(root) if Path::new(path).is_relative() => root.join(path).to_string_lossy().into_owned(),
            _ => path.to_string(),
        };
        self.session().with_store(|store| Ok(store.get(&full_path)?))
    }

    /// Content search over a consistent view of the cache
    pub fn search(&self, query: &str) -> Result<Vec<SearchMatch>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let root = self.display_root();
        self.session()
            .with_store(|store| search::search(store, query, root))
    }
}

/// Holds the refresh flag for as long as it lives
struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CacheError::RefreshInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
