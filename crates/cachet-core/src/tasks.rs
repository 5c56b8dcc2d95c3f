//! Background execution
//!
//! Refresh and search block on file and store I/O. These helpers move them
//! onto tokio's blocking pool so an interactive caller stays responsive.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::context::CacheContext;
use crate::error::{CacheError, Result};
use crate::search::SearchMatch;
use crate::sync::RefreshReport;

/// Run one refresh pass in the background
pub fn spawn_refresh(
    ctx: Arc<CacheContext>,
    cancel: CancellationToken,
) -> JoinHandle<Result<RefreshReport>> {
    tokio::task::spawn_blocking(move || ctx.refresh(&cancel))
}

/// Run a content search in the background
pub fn spawn_search(ctx: Arc<CacheContext>, query: String) -> JoinHandle<Result<Vec<SearchMatch>>> {
    tokio::task::spawn_blocking(move || ctx.search(&query))
}

/// Refresh on the configured interval until `cancel` fires.
///
/// Returns immediately when auto-refresh is disabled. Ticks are skipped
/// while the cache is locked or another refresh is running. These passes
/// do not keep the session unlocked.
pub async fn run_auto_refresh(ctx: Arc<CacheContext>, cancel: CancellationToken) -> Result<()> {
    if !ctx.config().auto_refresh {
        tracing::debug!("auto-refresh disabled");
        return Ok(());
    }

    let period = ctx.config().auto_refresh_interval();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(interval_secs = period.as_secs(), "auto-refresh started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if ctx.is_locked() {
            tracing::debug!("cache locked, skipping auto-refresh");
            continue;
        }

        let pass = {
            let ctx = ctx.clone();
            let cancel = cancel.child_token();
            tokio::task::spawn_blocking(move || ctx.background_refresh(&cancel))
        };
        match pass.await {
            Ok(Ok(report)) if report.cancelled => break,
            Ok(Ok(report)) => {
                tracing::debug!(updated = report.updated, "auto-refresh pass done");
            }
            Ok(Err(CacheError::RefreshInProgress)) => {
                tracing::debug!("refresh already running, skipping tick");
            }
            Ok(Err(CacheError::NotUnlocked)) => {
                tracing::debug!("session locked during auto-refresh pass");
            }
            Ok(Err(err)) => tracing::warn!(error = %err, "auto-refresh failed"),
            Err(join) => return Err(CacheError::Task(join.to_string())),
        }
    }

    tracing::info!("auto-refresh stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::credentials::StaticCredentials;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn context(dir: &TempDir, auto_refresh: bool) -> Arc<CacheContext> {
        let root = dir.path().join("src");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.lua"), "local x = 1").unwrap();
        let ctx = CacheContext::new(Config {
            cache_dir: dir.path().join("cache"),
            roots: vec![root],
            allow_patterns: vec!["*.lua".into()],
            auto_refresh,
            auto_refresh_interval_secs: 1,
            ..Config::default()
        })
        .unwrap();
        ctx.unlock(&StaticCredentials::new("secret")).unwrap();
        Arc::new(ctx)
    }

    #[tokio::test]
    async fn test_spawned_refresh_and_search() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, false);

        let report = spawn_refresh(ctx.clone(), CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.updated, 1);

        let found = spawn_search(ctx, "LOCAL".into()).await.unwrap().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "a.lua");
    }

    #[tokio::test]
    async fn test_auto_refresh_disabled_returns() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, false);
        run_auto_refresh(ctx.clone(), CancellationToken::new())
            .await
            .unwrap();
        assert!(ctx.stats().last_refresh.is_none());
    }

    #[tokio::test]
    async fn test_auto_refresh_runs_until_cancelled() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, true);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_auto_refresh(ctx.clone(), cancel.clone()));

        let mut waited = Duration::ZERO;
        while ctx.stats().last_refresh.is_none() {
            assert!(waited < Duration::from_secs(10), "auto-refresh never ran");
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += Duration::from_millis(20);
        }
        assert_eq!(ctx.stats().cached_files, 1);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
