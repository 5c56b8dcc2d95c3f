//! Sync engine - one refresh pass
//!
//! Scan every root, compare each candidate's live mtime with the cached one,
//! and re-read only files that are strictly newer or not cached yet.
//! `last_refresh` is written after the last root, so an interrupted pass
//! leaves the previous value in place.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use cachet_store::{StorageEngine, StoreError};
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Result, Warning};
use crate::filter::PathFilter;
use crate::scanner::{self, ScanEvent};
use crate::session::SessionManager;

/// Metadata key holding the unix time of the last completed refresh
pub const LAST_REFRESH_KEY: &str = "last_refresh";

/// Summary of one refresh pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Candidates considered
    pub total: usize,
    /// Entries actually written
    pub updated: usize,
    /// Entries dropped because their file is gone
    pub pruned: usize,
    pub warnings: Vec<Warning>,
    /// Stopped early; `last_refresh` was not touched
    pub cancelled: bool,
}

/// Source mtime in whole unix seconds
pub fn mtime_secs(modified: SystemTime) -> i64 {
    DateTime::<Utc>::from(modified).timestamp()
}

pub struct SyncEngine<'a> {
    config: &'a Config,
    filter: &'a PathFilter,
    session: &'a Mutex<SessionManager>,
    background: bool,
}

impl<'a> SyncEngine<'a> {
    pub fn new(config: &'a Config, filter: &'a PathFilter, session: &'a Mutex<SessionManager>) -> Self {
        Self {
            config,
            filter,
            session,
            background: false,
        }
    }

    /// Timer-driven pass: store access leaves the idle clock alone.
    pub fn in_background(mut self) -> Self {
        self.background = true;
        self
    }

    fn session(&self) -> MutexGuard<'a, SessionManager> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_store<T>(&self, op: impl FnOnce(&mut dyn StorageEngine) -> Result<T>) -> Result<T> {
        let mut session = self.session();
        if self.background {
            session.with_store_passive(op)
        } else {
            session.with_store(op)
        }
    }

    /// Run a full pass. Checks `cancel` before every candidate.
    pub fn refresh(&self, cancel: &CancellationToken) -> Result<RefreshReport> {
        self.with_store(|_| Ok(()))?;

        let mut report = RefreshReport::default();
        for root in &self.config.roots {
            for event in scanner::scan(root, self.filter) {
                let path = match event {
                    ScanEvent::Candidate(path) => path,
                    ScanEvent::Warning(warning) => {
                        tracing::warn!(%warning, "scan warning");
                        report.warnings.push(warning);
                        continue;
                    }
                };
                if cancel.is_cancelled() {
                    return self.finish_cancelled(report);
                }

                report.total += 1;
                if self.sync_file(&path, &mut report.warnings)? {
                    report.updated += 1;
                }
            }
        }

        if cancel.is_cancelled() {
            return self.finish_cancelled(report);
        }
        if self.config.prune_on_refresh {
            report.pruned = self.prune()?;
        }

        let now = Utc::now().timestamp().to_string();
        self.with_store(|store| {
            store.set_metadata(LAST_REFRESH_KEY, &now)?;
            Ok(store.flush()?)
        })?;

        tracing::info!(
            total = report.total,
            updated = report.updated,
            pruned = report.pruned,
            warnings = report.warnings.len(),
            "refresh complete"
        );
        Ok(report)
    }

    fn finish_cancelled(&self, mut report: RefreshReport) -> Result<RefreshReport> {
        report.cancelled = true;
        self.with_store(|store| Ok(store.flush()?))?;
        tracing::info!(
            total = report.total,
            updated = report.updated,
            "refresh cancelled"
        );
        Ok(report)
    }

    /// Bring one candidate up to date. Returns whether it was written.
    fn sync_file(&self, path: &Path, warnings: &mut Vec<Warning>) -> Result<bool> {
        let Some(key) = path.to_str() else {
            warnings.push(Warning::Scan {
                path: path.to_path_buf(),
                reason: "path is not valid UTF-8".into(),
            });
            return Ok(false);
        };

        // Vanished since the scan saw it: not an error.
        let live_mtime = match fs::metadata(path).and_then(|meta| meta.modified()) {
            Ok(modified) => mtime_secs(modified),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "stat failed, skipping");
                return Ok(false);
            }
        };

        let cached_mtime = self.with_store(|store| Ok(store.meta(key).map(|meta| meta.mtime)))?;
        if cached_mtime.is_some_and(|cached| live_mtime <= cached) {
            return Ok(false);
        }

        let content = match fs::read(path) {
            Ok(content) => content,
            Err(err) => {
                warnings.push(Warning::Scan {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
                return Ok(false);
            }
        };

        let written = self.with_store(|store| {
            Ok(store.put(key, &content, content.len() as u64, live_mtime))
        })?;
        match written {
            Ok(()) => {}
            Err(err @ StoreError::FrameTooLarge { .. }) => {
                warnings.push(Warning::Scan {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        }
        tracing::debug!(path = %path.display(), bytes = content.len(), "cached");
        Ok(true)
    }

    /// Delete entries whose source file no longer exists
    pub fn prune(&self) -> Result<usize> {
        let cached = self.with_store(|store| Ok(store.list_all()))?;
        let gone: HashSet<String> = cached
            .into_keys()
            .filter(|path| !Path::new(path).is_file())
            .collect();
        if gone.is_empty() {
            return Ok(0);
        }

        let removed = self.with_store(|store| {
            let mut removed = 0;
            for path in &gone {
                if store.delete(path)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })?;
        tracing::info!(removed, "pruned entries for deleted files");
        Ok(removed)
    }
}
