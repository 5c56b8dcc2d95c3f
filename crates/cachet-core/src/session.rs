//! Session manager - key lifecycle
//!
//! Locked until a passphrase opens the store. The derived key moves straight
//! into the open store and goes away (zeroized) with it on lock, idle
//! timeout, or drop. Nothing here ever persists or logs key material.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use cachet_crypto::{derive_key, Salt};
use cachet_store::{LogEngine, StorageEngine, StoreError};
use secrecy::ExposeSecret;

use crate::credentials::{CredentialSource, PassphrasePrompt};
use crate::error::{CacheError, Result};

enum State {
    Locked,
    Unlocked {
        store: LogEngine,
        last_activity: Instant,
    },
}

pub struct SessionManager {
    store_path: PathBuf,
    idle_timeout: Option<Duration>,
    state: State,
}

impl SessionManager {
    /// A locked session for the store at `store_path`. `None` never auto-locks.
    pub fn new(store_path: impl Into<PathBuf>, idle_timeout: Option<Duration>) -> Self {
        Self {
            store_path: store_path.into(),
            idle_timeout,
            state: State::Locked,
        }
    }

    pub fn store_exists(&self) -> bool {
        self.store_path.is_file()
    }

    /// Current state, after applying the idle timeout
    pub fn is_locked(&mut self) -> bool {
        self.expire_if_idle();
        matches!(self.state, State::Locked)
    }

    /// Open the store with a passphrase from `credentials`.
    ///
    /// With no store on disk, a new one is created only if `allow_create`,
    /// after the passphrase has been entered twice and both entries match.
    pub fn unlock(&mut self, credentials: &dyn CredentialSource, allow_create: bool) -> Result<()> {
        if !self.is_locked() {
            self.touch();
            return Ok(());
        }

        let store = match LogEngine::peek_salt(&self.store_path)? {
            Some(salt) => {
                let passphrase = credentials.passphrase(PassphrasePrompt::Unlock)?;
                let key = derive_key(&passphrase, &salt);
                LogEngine::open(&self.store_path, key)
            }
            None => {
                if !allow_create {
                    return Err(CacheError::StoreMissing(self.store_path.clone()));
                }
                let passphrase = credentials.passphrase(PassphrasePrompt::NewStore)?;
                let confirmation = credentials.passphrase(PassphrasePrompt::Confirm)?;
                if passphrase.expose_secret().is_empty() {
                    return Err(CacheError::Credentials("empty passphrase".into()));
                }
                if passphrase.expose_secret() != confirmation.expose_secret() {
                    return Err(CacheError::PassphraseMismatch);
                }
                let salt = Salt::generate().map_err(StoreError::from)?;
                let key = derive_key(&passphrase, &salt);
                LogEngine::create(&self.store_path, salt, key)
            }
        };

        match store {
            Ok(store) => {
                self.state = State::Unlocked {
                    store,
                    last_activity: Instant::now(),
                };
                tracing::info!(path = %self.store_path.display(), "cache unlocked");
                Ok(())
            }
            Err(StoreError::Authentication) => {
                tracing::warn!(path = %self.store_path.display(), "unlock failed: wrong passphrase");
                Err(CacheError::Authentication)
            }
            Err(err) => {
                tracing::warn!(path = %self.store_path.display(), error = %err, "unlock failed");
                Err(CacheError::StoreUnavailable(err))
            }
        }
    }

    /// Close the store and discard the key
    pub fn lock(&mut self) {
        if let State::Unlocked { store, .. } = std::mem::replace(&mut self.state, State::Locked) {
            if let Err(err) = store.close() {
                tracing::warn!(error = %err, "error while closing store");
            }
            tracing::info!("cache locked");
        }
    }

    /// Run a store operation, enforcing the lock and the idle timeout.
    ///
    /// A successful operation restarts the idle clock.
    pub fn with_store<T>(
        &mut self,
        op: impl FnOnce(&mut dyn StorageEngine) -> Result<T>,
    ) -> Result<T> {
        self.access(true, op)
    }

    /// Like [`with_store`](Self::with_store), but leaves the idle clock
    /// alone. For work nobody is actively waiting on.
    pub fn with_store_passive<T>(
        &mut self,
        op: impl FnOnce(&mut dyn StorageEngine) -> Result<T>,
    ) -> Result<T> {
        self.access(false, op)
    }

    fn access<T>(
        &mut self,
        is_activity: bool,
        op: impl FnOnce(&mut dyn StorageEngine) -> Result<T>,
    ) -> Result<T> {
        self.expire_if_idle();
        let State::Unlocked {
            store,
            last_activity,
        } = &mut self.state
        else {
            return Err(CacheError::NotUnlocked);
        };

        let out = op(store)?;
        if is_activity {
            *last_activity = Instant::now();
        }
        Ok(out)
    }

    fn touch(&mut self) {
        if let State::Unlocked { last_activity, .. } = &mut self.state {
            *last_activity = Instant::now();
        }
    }

    fn expire_if_idle(&mut self) {
        let (Some(timeout), State::Unlocked { last_activity, .. }) = (self.idle_timeout, &self.state)
        else {
            return;
        };
        if last_activity.elapsed() > timeout {
            tracing::info!(timeout_secs = timeout.as_secs(), "idle timeout reached");
            self.lock();
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.lock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use cachet_store::STORE_FILE_NAME;
    use std::thread::sleep;
    use tempfile::TempDir;

    fn session(dir: &TempDir, timeout: Option<Duration>) -> SessionManager {
        SessionManager::new(dir.path().join(STORE_FILE_NAME), timeout)
    }

    #[test]
    fn test_starts_locked() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, None);
        assert!(s.is_locked());
        assert!(matches!(s.with_store(|_| Ok(())), Err(CacheError::NotUnlocked)));
    }

    #[test]
    fn test_first_unlock_creates_store() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, None);
        assert!(!s.store_exists());

        s.unlock(&StaticCredentials::new("secret"), true).unwrap();
        assert!(!s.is_locked());
        assert!(s.store_exists());
    }

    #[test]
    fn test_confirmation_mismatch_stays_locked() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, None);
        let creds = StaticCredentials::with_confirmation("secret", "secert");

        assert!(matches!(s.unlock(&creds, true), Err(CacheError::PassphraseMismatch)));
        assert!(s.is_locked());
        assert!(!s.store_exists());
    }

    #[test]
    fn test_missing_store_without_create() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, None);
        assert!(matches!(
            s.unlock(&StaticCredentials::new("secret"), false),
            Err(CacheError::StoreMissing(_))
        ));
        assert!(!s.store_exists());
    }

    #[test]
    fn test_wrong_passphrase_is_recoverable() {
        let dir = TempDir::new().unwrap();
        session(&dir, None)
            .unlock(&StaticCredentials::new("secret"), true)
            .unwrap();

        let mut s = session(&dir, None);
        assert!(matches!(
            s.unlock(&StaticCredentials::new("wrong"), false),
            Err(CacheError::Authentication)
        ));
        assert!(s.is_locked());

        s.unlock(&StaticCredentials::new("secret"), false).unwrap();
        assert!(!s.is_locked());
    }

    #[test]
    fn test_corrupt_store_is_not_authentication() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(STORE_FILE_NAME), b"short").unwrap();

        let mut s = session(&dir, None);
        assert!(matches!(
            s.unlock(&StaticCredentials::new("secret"), true),
            Err(CacheError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_lock_discards_access() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, None);
        s.unlock(&StaticCredentials::new("secret"), true).unwrap();
        s.with_store(|store| Ok(store.put("/a", b"x", 1, 1)?)).unwrap();

        s.lock();
        assert!(s.is_locked());
        assert!(matches!(
            s.with_store(|store| Ok(store.list_all())),
            Err(CacheError::NotUnlocked)
        ));
    }

    #[test]
    fn test_idle_timeout_relocks() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, Some(Duration::from_millis(200)));
        s.unlock(&StaticCredentials::new("secret"), true).unwrap();

        sleep(Duration::from_millis(400));
        assert!(matches!(s.with_store(|_| Ok(())), Err(CacheError::NotUnlocked)));
        assert!(s.is_locked());
    }

    #[test]
    fn test_activity_slides_the_timeout() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, Some(Duration::from_millis(300)));
        s.unlock(&StaticCredentials::new("secret"), true).unwrap();

        for _ in 0..4 {
            sleep(Duration::from_millis(100));
            s.with_store(|_| Ok(())).unwrap();
        }
        assert!(!s.is_locked());
    }

    #[test]
    fn test_passive_access_does_not_slide_the_timeout() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, Some(Duration::from_millis(300)));
        s.unlock(&StaticCredentials::new("secret"), true).unwrap();

        for _ in 0..2 {
            sleep(Duration::from_millis(100));
            s.with_store_passive(|_| Ok(())).unwrap();
        }
        sleep(Duration::from_millis(200));
        assert!(matches!(
            s.with_store_passive(|_| Ok(())),
            Err(CacheError::NotUnlocked)
        ));
    }
}
