//! Storage engine interface
//!
//! The capability the session hands out once unlocked. Implementations own
//! the key and the file handle; callers only ever see plaintext records.

use std::collections::BTreeMap;

use crate::Result;

/// Metadata of one cached file, without its content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    /// Byte length at cache time
    pub size: u64,
    /// Source mtime (unix seconds) when the content was captured
    pub mtime: i64,
    /// When this entry was last written (unix seconds)
    pub cached_at: i64,
}

/// Content and mtime of one cached file, as captured together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub content: Vec<u8>,
    pub mtime: i64,
}

pub trait StorageEngine: Send {
    /// Content and mtime for `path`, if cached
    fn get(&mut self, path: &str) -> Result<Option<StoredFile>>;

    /// Metadata for `path` without touching its content
    fn meta(&self, path: &str) -> Option<EntryMeta>;

    /// Insert or replace the entry for `path`; sets `cached_at` to now.
    ///
    /// Content and mtime land together or not at all.
    fn put(&mut self, path: &str, content: &[u8], size: u64, mtime: i64) -> Result<()>;

    /// Remove the entry for `path`. Returns whether it existed.
    fn delete(&mut self, path: &str) -> Result<bool>;

    /// Every entry's metadata, in ascending path order
    fn list_all(&self) -> BTreeMap<String, EntryMeta>;

    fn set_metadata(&mut self, key: &str, value: &str) -> Result<()>;

    fn get_metadata(&self, key: &str) -> Option<String>;

    /// Remove every entry and metadata key
    fn clear_all(&mut self) -> Result<()>;

    /// Make everything written so far durable
    fn flush(&mut self) -> Result<()>;
}
