//! Encrypted append-log engine
//!
//! File layout: 16-byte KDF salt, then sealed frames. The first frame is a
//! known check record; if it does not open, the key is wrong. Every later
//! write appends one frame, so a put is atomic: after a crash the trailing
//! frame is either complete or discarded on the next open.
//!
//! An in-memory index maps each path to the offset of its latest `put` frame,
//! so `get` decrypts exactly one frame.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use cachet_crypto::{DerivedKey, Salt, SALT_SIZE};

use crate::engine::{EntryMeta, StorageEngine, StoredFile};
use crate::record::{self, FrameRead, OpenError, Record, LEN_PREFIX, MAX_FRAME};
use crate::{Result, StoreError};

/// Name of the container inside the cache directory
pub const STORE_FILE_NAME: &str = "cache.store";

const FORMAT_VERSION: u32 = 1;

/// Below this many dead frames the log is never compacted on open
const COMPACT_MIN_DEAD: usize = 256;

#[derive(Debug, Clone, Copy)]
struct Slot {
    offset: u64,
    meta: EntryMeta,
}

pub struct LogEngine {
    path: PathBuf,
    file: File,
    key: DerivedKey,
    salt: Salt,
    index: BTreeMap<String, Slot>,
    metadata: BTreeMap<String, String>,
    /// Offset one past the last complete frame
    end: u64,
    /// Frames superseded by later writes
    dead_frames: usize,
    /// Largest frame `append` will write
    frame_limit: u32,
    /// A failed append left bytes past `end` that could not be removed
    poisoned: bool,
}

impl LogEngine {
    /// Read the KDF salt of an existing container. `None` if there is no file.
    pub fn peek_salt(path: &Path) -> Result<Option<Salt>> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        read_salt(&mut file).map(Some)
    }

    /// Create a new, empty container. Fails if one already exists.
    pub fn create(path: &Path, salt: Salt, key: DerivedKey) -> Result<Self> {
        if path.exists() {
            return Err(StoreError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = temp_path(path);
        ContainerWriter::create(&tmp, &salt, &key)?.finish()?;
        fs::rename(&tmp, path)?;
        tracing::info!(path = %path.display(), "created encrypted store");

        Self::open(path, key)
    }

    /// Open an existing container, verifying `key` against its check frame.
    pub fn open(path: &Path, key: DerivedKey) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut reader = BufReader::new(&file);
        let salt = read_salt(&mut reader)?;
        let mut offset = SALT_SIZE as u64;

        let check = match record::read_frame(&mut reader)? {
            FrameRead::Frame(sealed) => sealed,
            FrameRead::End | FrameRead::Torn | FrameRead::BadLength(_) => {
                return Err(StoreError::Corrupt("missing verification frame".into()));
            }
        };
        match record::open(&key, &check) {
            Ok(Record::Check { format }) if format == FORMAT_VERSION => {}
            Ok(Record::Check { format }) => {
                return Err(StoreError::Corrupt(format!("unsupported format version {format}")));
            }
            Ok(_) | Err(OpenError::Decode(_)) => {
                return Err(StoreError::Corrupt("malformed verification frame".into()));
            }
            Err(OpenError::Crypto(_)) => return Err(StoreError::Authentication),
        }
        offset += LEN_PREFIX + check.len() as u64;

        let mut index = BTreeMap::new();
        let mut metadata = BTreeMap::new();
        let mut dead_frames = 0;
        let mut torn = false;

        loop {
            let sealed = match record::read_frame(&mut reader)? {
                FrameRead::Frame(sealed) => sealed,
                FrameRead::End => break,
                FrameRead::Torn => {
                    torn = true;
                    break;
                }
                FrameRead::BadLength(len) => {
                    return Err(StoreError::Corrupt(format!(
                        "frame at offset {offset} has impossible length {len}"
                    )));
                }
            };
            let record = record::open(&key, &sealed).map_err(|_| {
                StoreError::Corrupt(format!("frame at offset {offset} failed authentication"))
            })?;

            match record {
                Record::Put {
                    path,
                    size,
                    mtime,
                    cached_at,
                    ..
                } => {
                    let slot = Slot {
                        offset,
                        meta: EntryMeta {
                            size,
                            mtime,
                            cached_at,
                        },
                    };
                    if index.insert(path, slot).is_some() {
                        dead_frames += 1;
                    }
                }
                Record::Delete { path } => {
                    if index.remove(&path).is_some() {
                        dead_frames += 1;
                    }
                    dead_frames += 1;
                }
                Record::Meta { key, value } => {
                    if metadata.insert(key, value).is_some() {
                        dead_frames += 1;
                    }
                }
                Record::Check { .. } => {
                    return Err(StoreError::Corrupt(format!(
                        "unexpected check frame at offset {offset}"
                    )));
                }
            }
            offset += LEN_PREFIX + sealed.len() as u64;
        }
        drop(reader);

        if torn {
            tracing::warn!(
                path = %path.display(),
                offset,
                "discarding incomplete trailing frame"
            );
            file.set_len(offset)?;
        }

        let mut engine = Self {
            path: path.to_path_buf(),
            file,
            key,
            salt,
            index,
            metadata,
            end: offset,
            dead_frames,
            frame_limit: MAX_FRAME,
            poisoned: false,
        };
        tracing::debug!(
            entries = engine.index.len(),
            dead = engine.dead_frames,
            "opened encrypted store"
        );

        if engine.dead_frames >= COMPACT_MIN_DEAD && engine.dead_frames > engine.index.len() {
            engine.compact()?;
        }
        Ok(engine)
    }

    /// Flush and release the file handle. The key is zeroized on drop.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    /// Rewrite the log with only live frames, atomically replacing the file
    pub fn compact(&mut self) -> Result<()> {
        let tmp = temp_path(&self.path);
        let mut out = ContainerWriter::create(&tmp, &self.salt, &self.key)?;

        let mut index = BTreeMap::new();
        for (path, slot) in &self.index {
            let sealed = read_sealed_at(&mut self.file, slot.offset)?;
            let offset = out.append_sealed(&sealed)?;
            index.insert(path.clone(), Slot { offset, ..*slot });
        }
        for (key, value) in &self.metadata {
            out.append(
                &self.key,
                &Record::Meta {
                    key: key.clone(),
                    value: value.clone(),
                },
            )?;
        }
        let end = out.finish()?;

        fs::rename(&tmp, &self.path)?;
        self.file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        tracing::info!(
            removed = self.dead_frames,
            live = index.len(),
            "compacted encrypted store"
        );
        self.index = index;
        self.end = end;
        self.dead_frames = 0;
        self.poisoned = false;
        Ok(())
    }

    fn append(&mut self, record: &Record) -> Result<u64> {
        if self.poisoned {
            return Err(StoreError::Poisoned);
        }
        let frame = record::seal(&self.key, record, self.frame_limit)?;
        let offset = self.end;

        let written = self
            .file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(&frame));
        if let Err(e) = written {
            // Never leave a half frame in front of the next append.
            if let Err(rollback) = self.file.set_len(offset) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "could not roll back failed write, refusing further writes"
                );
                self.poisoned = true;
            }
            return Err(e.into());
        }

        self.end += frame.len() as u64;
        Ok(offset)
    }
}

impl StorageEngine for LogEngine {
    fn get(&mut self, path: &str) -> Result<Option<StoredFile>> {
        let Some(slot) = self.index.get(path).copied() else {
            return Ok(None);
        };

        let sealed = read_sealed_at(&mut self.file, slot.offset)?;
        match record::open(&self.key, &sealed) {
            Ok(Record::Put { content, mtime, .. }) => Ok(Some(StoredFile { content, mtime })),
            _ => Err(StoreError::Corrupt(format!(
                "entry frame at offset {} is unreadable",
                slot.offset
            ))),
        }
    }

    fn meta(&self, path: &str) -> Option<EntryMeta> {
        self.index.get(path).map(|slot| slot.meta)
    }

    fn put(&mut self, path: &str, content: &[u8], size: u64, mtime: i64) -> Result<()> {
        let cached_at = chrono::Utc::now().timestamp();
        let offset = self.append(&Record::Put {
            path: path.to_string(),
            size,
            mtime,
            cached_at,
            content: content.to_vec(),
        })?;

        let slot = Slot {
            offset,
            meta: EntryMeta {
                size,
                mtime,
                cached_at,
            },
        };
        if self.index.insert(path.to_string(), slot).is_some() {
            self.dead_frames += 1;
        }
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<bool> {
        if !self.index.contains_key(path) {
            return Ok(false);
        }
        self.append(&Record::Delete {
            path: path.to_string(),
        })?;
        self.index.remove(path);
        self.dead_frames += 2;
        Ok(true)
    }

    fn list_all(&self) -> BTreeMap<String, EntryMeta> {
        self.index
            .iter()
            .map(|(path, slot)| (path.clone(), slot.meta))
            .collect()
    }

    fn set_metadata(&mut self, key: &str, value: &str) -> Result<()> {
        self.append(&Record::Meta {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        if self
            .metadata
            .insert(key.to_string(), value.to_string())
            .is_some()
        {
            self.dead_frames += 1;
        }
        Ok(())
    }

    fn get_metadata(&self, key: &str) -> Option<String> {
        self.metadata.get(key).cloned()
    }

    fn clear_all(&mut self) -> Result<()> {
        let tmp = temp_path(&self.path);
        let end = ContainerWriter::create(&tmp, &self.salt, &self.key)?.finish()?;
        fs::rename(&tmp, &self.path)?;
        self.file = OpenOptions::new().read(true).write(true).open(&self.path)?;

        self.index.clear();
        self.metadata.clear();
        self.end = end;
        self.dead_frames = 0;
        self.poisoned = false;
        tracing::info!(path = %self.path.display(), "cleared encrypted store");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

/// Sequential writer for a fresh container
struct ContainerWriter {
    out: BufWriter<File>,
    offset: u64,
}

impl ContainerWriter {
    /// Write the salt and check frame to a new file at `path`
    fn create(path: &Path, salt: &Salt, key: &DerivedKey) -> Result<Self> {
        let file = create_private(path)?;
        let mut writer = Self {
            out: BufWriter::new(file),
            offset: 0,
        };
        writer.out.write_all(salt.as_bytes())?;
        writer.offset = SALT_SIZE as u64;
        writer.append(
            key,
            &Record::Check {
                format: FORMAT_VERSION,
            },
        )?;
        Ok(writer)
    }

    fn append(&mut self, key: &DerivedKey, record: &Record) -> Result<u64> {
        let frame = record::seal(key, record, MAX_FRAME)?;
        let offset = self.offset;
        self.out.write_all(&frame)?;
        self.offset += frame.len() as u64;
        Ok(offset)
    }

    /// Copy an already sealed frame body, re-adding its length prefix
    fn append_sealed(&mut self, sealed: &[u8]) -> Result<u64> {
        let offset = self.offset;
        self.out.write_all(&(sealed.len() as u32).to_le_bytes())?;
        self.out.write_all(sealed)?;
        self.offset += LEN_PREFIX + sealed.len() as u64;
        Ok(offset)
    }

    /// Flush to disk and return the final length
    fn finish(self) -> Result<u64> {
        let file = self.out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(self.offset)
    }
}

fn read_salt(reader: &mut impl Read) -> Result<Salt> {
    let mut bytes = [0u8; SALT_SIZE];
    reader.read_exact(&mut bytes).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            StoreError::Corrupt("file shorter than its salt header".into())
        }
        _ => StoreError::Io(e),
    })?;
    Ok(Salt::from_bytes(bytes))
}

fn read_sealed_at(file: &mut File, offset: u64) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    match record::read_frame(file)? {
        FrameRead::Frame(sealed) => Ok(sealed),
        FrameRead::End | FrameRead::Torn | FrameRead::BadLength(_) => Err(StoreError::Corrupt(
            format!("no complete frame at offset {offset}"),
        )),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(unix)]
fn create_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachet_crypto::KEY_SIZE;
    use proptest::prelude::*;
    use tempfile::TempDir;
    use zeroize::Zeroizing;

    fn key(byte: u8) -> DerivedKey {
        DerivedKey::from_raw(Zeroizing::new([byte; KEY_SIZE]))
    }

    fn fresh() -> (TempDir, PathBuf, LogEngine) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(STORE_FILE_NAME);
        let engine = LogEngine::create(&path, Salt::generate().unwrap(), key(1)).unwrap();
        (dir, path, engine)
    }

    #[test]
    fn test_put_get_and_reopen() {
        let (_dir, path, mut engine) = fresh();
        engine.put("/src/a.lua", b"print(1)", 8, 100).unwrap();
        engine.put("/src/b.lua", b"print(2)", 8, 200).unwrap();
        engine.set_metadata("last_refresh", "1700000000").unwrap();

        let got = engine.get("/src/a.lua").unwrap().unwrap();
        assert_eq!(got.content, b"print(1)");
        assert_eq!(got.mtime, 100);
        engine.close().unwrap();

        let mut engine = LogEngine::open(&path, key(1)).unwrap();
        assert_eq!(engine.list_all().len(), 2);
        assert_eq!(engine.get("/src/b.lua").unwrap().unwrap().mtime, 200);
        assert_eq!(engine.get_metadata("last_refresh").as_deref(), Some("1700000000"));
        assert!(engine.get("/src/missing.lua").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces_content_and_mtime_together() {
        let (_dir, path, mut engine) = fresh();
        engine.put("/a", b"old", 3, 1).unwrap();
        engine.put("/a", b"newer", 5, 2).unwrap();

        let meta = engine.meta("/a").unwrap();
        assert_eq!((meta.size, meta.mtime), (5, 2));
        assert_eq!(engine.get("/a").unwrap().unwrap().content, b"newer");
        engine.close().unwrap();

        let mut engine = LogEngine::open(&path, key(1)).unwrap();
        assert_eq!(engine.get("/a").unwrap().unwrap().content, b"newer");
        assert_eq!(engine.list_all().len(), 1);
    }

    #[test]
    fn test_wrong_key_is_authentication_error() {
        let (_dir, path, engine) = fresh();
        engine.close().unwrap();
        assert!(matches!(
            LogEngine::open(&path, key(2)),
            Err(StoreError::Authentication)
        ));
    }

    #[test]
    fn test_create_refuses_existing_store() {
        let (_dir, path, engine) = fresh();
        engine.close().unwrap();
        assert!(matches!(
            LogEngine::create(&path, Salt::generate().unwrap(), key(1)),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_peek_salt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(STORE_FILE_NAME);
        assert!(LogEngine::peek_salt(&path).unwrap().is_none());

        let salt = Salt::generate().unwrap();
        LogEngine::create(&path, salt, key(1)).unwrap().close().unwrap();
        assert_eq!(LogEngine::peek_salt(&path).unwrap(), Some(salt));

        fs::write(&path, b"short").unwrap();
        assert!(matches!(LogEngine::peek_salt(&path), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_delete() {
        let (_dir, path, mut engine) = fresh();
        engine.put("/a", b"x", 1, 1).unwrap();
        assert!(engine.delete("/a").unwrap());
        assert!(!engine.delete("/a").unwrap());
        assert!(engine.get("/a").unwrap().is_none());
        engine.close().unwrap();

        let engine = LogEngine::open(&path, key(1)).unwrap();
        assert!(engine.list_all().is_empty());
    }

    #[test]
    fn test_torn_tail_is_discarded() {
        let (_dir, path, mut engine) = fresh();
        engine.put("/a", b"kept", 4, 1).unwrap();
        engine.close().unwrap();
        let intact_len = fs::metadata(&path).unwrap().len();

        // A frame that claims 1000 bytes but stops after 10.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&1000u32.to_le_bytes()).unwrap();
        file.write_all(&[0xAB; 10]).unwrap();
        drop(file);

        let mut engine = LogEngine::open(&path, key(1)).unwrap();
        assert_eq!(engine.get("/a").unwrap().unwrap().content, b"kept");
        assert_eq!(fs::metadata(&path).unwrap().len(), intact_len);

        engine.put("/b", b"after", 5, 2).unwrap();
        engine.close().unwrap();
        let mut engine = LogEngine::open(&path, key(1)).unwrap();
        assert_eq!(engine.get("/b").unwrap().unwrap().content, b"after");
    }

    #[test]
    fn test_corrupt_frame_is_not_authentication() {
        let (_dir, path, mut engine) = fresh();
        engine.put("/a", b"one", 3, 1).unwrap();
        engine.put("/b", b"two", 3, 1).unwrap();
        engine.close().unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        assert!(matches!(LogEngine::open(&path, key(1)), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_raw_file_is_opaque() {
        let (_dir, path, mut engine) = fresh();
        let content = b"local SECRET_TOKEN = 'hunter2'";
        engine
            .put("/home/me/project/init.lua", content, content.len() as u64, 1)
            .unwrap();
        engine.set_metadata("last_refresh", "1700000000").unwrap();
        engine.close().unwrap();

        let raw = fs::read(&path).unwrap();
        let contains = |needle: &[u8]| raw.windows(needle.len()).any(|w| w == needle);
        assert!(!contains(content));
        assert!(!contains(b"SECRET_TOKEN"));
        assert!(!contains(b"init.lua"));
        assert!(!contains(b"last_refresh"));
        assert!(!contains(b"SQLite format"));
    }

    #[test]
    fn test_clear_all() {
        let (_dir, path, mut engine) = fresh();
        engine.put("/a", b"x", 1, 1).unwrap();
        engine.set_metadata("last_refresh", "1").unwrap();
        engine.clear_all().unwrap();
        assert!(engine.list_all().is_empty());
        assert!(engine.get_metadata("last_refresh").is_none());

        engine.put("/b", b"y", 1, 1).unwrap();
        engine.close().unwrap();
        let engine = LogEngine::open(&path, key(1)).unwrap();
        assert_eq!(engine.list_all().keys().collect::<Vec<_>>(), vec!["/b"]);
    }

    #[test]
    fn test_compact_keeps_live_records() {
        let (_dir, path, mut engine) = fresh();
        for i in 0..50 {
            let body = format!("version {i}");
            engine.put("/hot", body.as_bytes(), body.len() as u64, i).unwrap();
        }
        engine.put("/cold", b"steady", 6, 1).unwrap();
        engine.set_metadata("last_refresh", "42").unwrap();
        let before = fs::metadata(&path).unwrap().len();

        engine.compact().unwrap();
        assert!(fs::metadata(&path).unwrap().len() < before);
        assert_eq!(engine.get("/hot").unwrap().unwrap().content, b"version 49");
        engine.close().unwrap();

        let mut engine = LogEngine::open(&path, key(1)).unwrap();
        assert_eq!(engine.get("/cold").unwrap().unwrap().content, b"steady");
        assert_eq!(engine.get_metadata("last_refresh").as_deref(), Some("42"));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_list_all_is_path_ordered() {
        let (_dir, _path, mut engine) = fresh();
        for p in ["/c", "/a", "/b"] {
            engine.put(p, b"", 0, 0).unwrap();
        }
        let paths: Vec<_> = engine.list_all().into_keys().collect();
        assert_eq!(paths, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn test_oversized_put_fails_without_touching_the_log() {
        let (_dir, path, mut engine) = fresh();
        engine.frame_limit = 1024;
        engine.put("/before", b"one", 3, 1).unwrap();
        let len_before = fs::metadata(&path).unwrap().len();

        let big = vec![b'x'; 4096];
        assert!(matches!(
            engine.put("/big", &big, big.len() as u64, 2),
            Err(StoreError::FrameTooLarge { .. })
        ));
        assert_eq!(fs::metadata(&path).unwrap().len(), len_before);
        assert!(engine.meta("/big").is_none());

        engine.put("/after", b"two", 3, 3).unwrap();
        engine.set_metadata("last_refresh", "7").unwrap();
        engine.close().unwrap();

        let engine = LogEngine::open(&path, key(1)).unwrap();
        assert_eq!(
            engine.list_all().keys().collect::<Vec<_>>(),
            vec!["/after", "/before"]
        );
        assert_eq!(engine.get_metadata("last_refresh").as_deref(), Some("7"));
    }

    #[test]
    fn test_bad_length_mid_log_is_corrupt_not_truncated() {
        let (_dir, path, mut engine) = fresh();
        engine.put("/a", b"one", 3, 1).unwrap();
        engine.put("/b", b"two", 3, 1).unwrap();
        engine.put("/c", b"three", 5, 1).unwrap();
        let offset = engine.index["/b"].offset as usize;
        engine.close().unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes[offset..offset + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(LogEngine::open(&path, key(1)), Err(StoreError::Corrupt(_))));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[cfg(unix)]
    #[test]
    fn test_unrecoverable_write_failure_poisons_engine() {
        let (_dir, path, mut engine) = fresh();
        engine.put("/a", b"kept", 4, 1).unwrap();

        // Read-only handle: the write fails and so does the rollback.
        engine.file = File::open(&path).unwrap();
        assert!(matches!(engine.put("/b", b"x", 1, 1), Err(StoreError::Io(_))));

        engine.file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        assert!(matches!(engine.put("/b", b"x", 1, 1), Err(StoreError::Poisoned)));
        assert!(matches!(
            engine.set_metadata("last_refresh", "1"),
            Err(StoreError::Poisoned)
        ));
        drop(engine);

        let mut engine = LogEngine::open(&path, key(1)).unwrap();
        assert_eq!(engine.get("/a").unwrap().unwrap().content, b"kept");
        assert!(engine.meta("/b").is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_put_then_get_returns_exact_content(
            content in proptest::collection::vec(any::<u8>(), 0..4096),
            mtime in any::<i64>(),
        ) {
            let (_dir, _path, mut engine) = fresh();
            engine.put("/p", &content, content.len() as u64, mtime).unwrap();
            let got = engine.get("/p").unwrap().unwrap();
            prop_assert_eq!(got.content, content);
            prop_assert_eq!(got.mtime, mtime);
        }
    }
}
