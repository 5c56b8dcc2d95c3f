//! Linear content search over cached entries

use std::path::Path;

use cachet_store::StorageEngine;

use crate::error::Result;

/// One matching line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// Relative to the first root when inside it, else absolute
    pub path: String,
    pub full_path: String,
    /// 1-based
    pub line_number: usize,
    pub line_text: String,
}

/// Path as shown to the user
pub fn display_path(full_path: &str, display_root: Option<&Path>) -> String {
    display_root
        .and_then(|root| Path::new(full_path).strip_prefix(root).ok())
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(|relative| relative.to_string_lossy().into_owned())
        .unwrap_or_else(|| full_path.to_string())
}

/// Case-insensitive substring search across every cached entry.
///
/// Entries are visited in store order; matches within a file come out in
/// line order. An empty query returns nothing without reading the store.
pub fn search(
    store: &mut dyn StorageEngine,
    query: &str,
    display_root: Option<&Path>,
) -> Result<Vec<SearchMatch>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let needle = query.to_lowercase();

    let mut matches = Vec::new();
    for full_path in store.list_all().into_keys() {
        let Some(file) = store.get(&full_path)? else {
            continue;
        };
        let text = String::from_utf8_lossy(&file.content);
        let shown = display_path(&full_path, display_root);

        for (idx, line) in text.lines().enumerate() {
            if line.to_lowercase().contains(&needle) {
                matches.push(SearchMatch {
                    path: shown.clone(),
                    full_path: full_path.clone(),
                    line_number: idx + 1,
                    line_text: line.to_string(),
                });
            }
        }
    }
    Ok(matches)
}
