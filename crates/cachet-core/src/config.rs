//! Cache configuration
//!
//! Loaded once from TOML at setup and never mutated afterwards. Every field
//! has a default, so an empty file is a valid config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cachet_store::{MAX_ENTRY_SIZE, STORE_FILE_NAME};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result, Warning};

const DEFAULT_ALLOW: &[&str] = &[
    "*.rs", "*.toml", "*.md", "*.lua", "*.py", "*.js", "*.ts", "*.go", "*.c", "*.h", "*.json",
    "*.yaml", "*.yml", "*.txt",
];

const DEFAULT_IGNORE: &[&str] = &[".git", "target", "node_modules", ".cache", "build", "dist"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the encrypted store
    pub cache_dir: PathBuf,
    /// Trees to mirror. The first one anchors relative display paths.
    pub roots: Vec<PathBuf>,
    /// Globs (`*.lua`, `src/*.rs`) or anchored suffixes (`%.lua$`) a file
    /// must match. Matched against the path relative to its root.
    pub allow_patterns: Vec<String>,
    /// Substrings (or globs) that exclude a path and everything below it.
    /// Matched against the path relative to its root.
    pub ignore_patterns: Vec<String>,
    /// Largest cacheable file, in bytes. Capped at the store's entry limit.
    pub max_file_size: u64,
    pub auto_refresh: bool,
    pub auto_refresh_interval_secs: u64,
    /// Idle seconds before the session re-locks; 0 disables auto-lock
    pub session_timeout_secs: u64,
    /// Offer to create a store when none exists yet
    pub prompt_on_first_use: bool,
    /// Drop entries for deleted files at the end of every refresh
    pub prune_on_refresh: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("cachet"),
            roots: Vec::new(),
            allow_patterns: DEFAULT_ALLOW.iter().map(|p| p.to_string()).collect(),
            ignore_patterns: DEFAULT_IGNORE.iter().map(|p| p.to_string()).collect(),
            max_file_size: 1024 * 1024,
            auto_refresh: false,
            auto_refresh_interval_secs: 300,
            session_timeout_secs: 900,
            prompt_on_first_use: true,
            prune_on_refresh: false,
        }
    }
}

impl Config {
    /// `~/.config/cachet/config.toml` (platform equivalent)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cachet").join("config.toml"))
    }

    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CacheError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| CacheError::Config(e.to_string()))
    }

    /// Load `explicit` if given (it must exist), else the default file if
    /// present, else built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Location of the encrypted container
    pub fn store_path(&self) -> PathBuf {
        self.cache_dir.join(STORE_FILE_NAME)
    }

    pub fn session_timeout(&self) -> Option<Duration> {
        (self.session_timeout_secs > 0).then(|| Duration::from_secs(self.session_timeout_secs))
    }

    pub fn auto_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_interval_secs.max(1))
    }

    /// Setup-time checks. Missing roots and an oversized `max_file_size`
    /// are reported, not fatal.
    pub fn validate(&self) -> Vec<Warning> {
        let mut warnings: Vec<Warning> = self
            .roots
            .iter()
            .filter(|root| !root.is_dir())
            .map(|root| Warning::MissingRoot(root.clone()))
            .collect();
        if self.max_file_size > MAX_ENTRY_SIZE {
            warnings.push(Warning::MaxFileSizeClamped {
                configured: self.max_file_size,
                limit: MAX_ENTRY_SIZE,
            });
        }
        warnings
    }
}
