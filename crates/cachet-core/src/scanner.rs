//! Directory scanner
//!
//! Lazy depth-first walk of one root. Ignored directories are pruned before
//! they are read. Symlinks are skipped. Unreadable subtrees become warnings
//! in the stream; they never end the walk.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Warning;
use crate::filter::PathFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A regular file that passed the filter
    Candidate(PathBuf),
    Warning(Warning),
}

/// One pass over one root. Not restartable; call [`scan`] again.
pub struct Scan<'a> {
    filter: &'a PathFilter,
    root: PathBuf,
    walker: Option<walkdir::IntoIter>,
    pending: Option<Warning>,
}

/// Start scanning `root`. A missing root yields a single warning.
pub fn scan<'a>(root: &Path, filter: &'a PathFilter) -> Scan<'a> {
    let (walker, pending) = if root.is_dir() {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        (Some(walker), None)
    } else {
        (None, Some(Warning::MissingRoot(root.to_path_buf())))
    };

    Scan {
        filter,
        root: root.to_path_buf(),
        walker,
        pending,
    }
}

impl Iterator for Scan<'_> {
    type Item = ScanEvent;

    fn next(&mut self) -> Option<ScanEvent> {
        if let Some(warning) = self.pending.take() {
            return Some(ScanEvent::Warning(warning));
        }
        let walker = self.walker.as_mut()?;

        loop {
            let entry = match walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(&self.root).to_path_buf();
                    tracing::debug!(path = %path.display(), error = %err, "scan error");
                    return Some(ScanEvent::Warning(Warning::Scan {
                        path,
                        reason: err.to_string(),
                    }));
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            // Patterns see the path below the root, never the root itself.
            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                if self.filter.should_ignore(relative) {
                    tracing::trace!(path = %entry.path().display(), "pruning ignored directory");
                    walker.skip_current_dir();
                }
                continue;
            }
            if !file_type.is_file() || self.filter.should_ignore(relative) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(err) => {
                    return Some(ScanEvent::Warning(Warning::Scan {
                        path: entry.path().to_path_buf(),
                        reason: err.to_string(),
                    }));
                }
            };
            if self.filter.should_cache(relative, size) {
                return Some(ScanEvent::Candidate(entry.into_path()));
            }
        }
    }
}
