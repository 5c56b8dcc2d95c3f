//! Path filter - allowlist model
//!
//! A file is cached only if it matches at least one allow pattern and fits
//! under the size limit. Ignore patterns exclude whole subtrees; the scanner
//! checks them before descending, so ignored directories are never read.
//!
//! Patterns are compiled once into [`Matcher`]s when the filter is built.

use std::path::Path;

use cachet_store::MAX_ENTRY_SIZE;

use crate::config::Config;
use crate::error::{CacheError, Result};

/// A compiled path predicate
#[derive(Debug, Clone)]
pub enum Matcher {
    /// `*.lua`, `src/**/*.rs` - matched against the whole path
    Glob(glob::Pattern),
    /// `%.lua$`, `Makefile` - path must end with the literal
    Suffix(String),
    /// `.git`, `node_modules` - path must contain the literal
    Substring(String),
}

impl Matcher {
    /// Compile an allow pattern.
    ///
    /// Globs contain `*`, `?` or `[`. Anything else is an anchored suffix;
    /// a trailing `$` is optional and `%` escapes the next character.
    pub fn allow(raw: &str) -> Result<Self> {
        if let Some(anchored) = raw.strip_suffix('$') {
            return Ok(Matcher::Suffix(unescape(anchored)));
        }
        if is_glob(raw) {
            return compile_glob(raw);
        }
        Ok(Matcher::Suffix(unescape(raw)))
    }

    /// Compile an ignore pattern: a glob, or else a case-sensitive substring
    pub fn ignore(raw: &str) -> Result<Self> {
        if is_glob(raw) {
            return compile_glob(raw);
        }
        Ok(Matcher::Substring(raw.to_string()))
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Matcher::Glob(pattern) => pattern.matches(path),
            Matcher::Suffix(suffix) => path.ends_with(suffix.as_str()),
            Matcher::Substring(needle) => path.contains(needle.as_str()),
        }
    }
}

fn is_glob(raw: &str) -> bool {
    raw.contains(['*', '?', '['])
}

fn compile_glob(raw: &str) -> Result<Matcher> {
    glob::Pattern::new(raw)
        .map(Matcher::Glob)
        .map_err(|e| CacheError::Config(format!("bad pattern {raw:?}: {e}")))
}

/// Drop `%` escapes: `%.lua` -> `.lua`
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Decides what gets cached
#[derive(Debug, Clone)]
pub struct PathFilter {
    allow: Vec<Matcher>,
    ignore: Vec<Matcher>,
    max_file_size: u64,
}

impl PathFilter {
    /// `max_file_size` is capped at what one store entry can hold.
    pub fn new(allow: &[String], ignore: &[String], max_file_size: u64) -> Result<Self> {
        Ok(Self {
            allow: allow.iter().map(|p| Matcher::allow(p)).collect::<Result<_>>()?,
            ignore: ignore.iter().map(|p| Matcher::ignore(p)).collect::<Result<_>>()?,
            max_file_size: max_file_size.min(MAX_ENTRY_SIZE),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.allow_patterns,
            &config.ignore_patterns,
            config.max_file_size,
        )
    }

    /// True if any ignore pattern matches the path
    pub fn should_ignore(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.ignore.iter().any(|m| m.matches(&path))
    }

    /// True if the file fits the size limit and matches an allow pattern.
    ///
    /// An empty allow list caches nothing.
    pub fn should_cache(&self, path: &Path, file_size: u64) -> bool {
        if file_size > self.max_file_size {
            return false;
        }
        let path = path.to_string_lossy();
        self.allow.iter().any(|m| m.matches(&path))
    }
}
