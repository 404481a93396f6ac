//! Discovery and loading of the single-file test corpus.
//!
//! The corpus is a directory of `.ves` sources. Discovery returns files
//! sorted by name so every run visits them in the same order, which keeps
//! batch summaries deterministic.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::errors::HarnessError;

/// Extension a corpus entry must carry.
pub const CORPUS_EXTENSION: &str = "ves";

/// A single corpus entry. Read-only once loaded; a run never re-reads the
/// file from disk.
#[derive(Clone, Debug)]
pub struct TestFile {
    /// The file name, including extension, relative to nothing.
    pub name: String,
    pub path: PathBuf,
    /// SHA-256 of the source bytes, hex-encoded.
    pub hash: String,
    pub source: String,
}

/// Hex-encoded SHA-256 of a byte slice.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Filter semantics: `^p` matches name prefixes, `s$` suffixes, `^x$`
/// requires an exact match, anything else matches by substring.
pub fn matches_filter(name: &str, filter: &str) -> bool {
    match filter {
        _ if filter.len() >= 2 && filter.starts_with('^') && filter.ends_with('$') => {
            name == &filter[1..filter.len() - 1]
        }
        _ if filter.starts_with('^') => name.starts_with(&filter[1..]),
        _ if filter.ends_with('$') => name.ends_with(&filter[..filter.len() - 1]),
        _ => name.contains(filter),
    }
}

/// Walks `root` for `.ves` files, applies the filter, reads and hashes each
/// survivor, and returns them sorted by name.
///
/// Zero matching files is a hard abort: an empty run would report success
/// while testing nothing.
pub fn load_corpus(root: &Path, filter: Option<&str>) -> Result<Vec<TestFile>, HarnessError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            HarnessError::io(
                format!("failed to walk corpus at `{}`", root.display()),
                e.into(),
            )
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !path
            .extension()
            .is_some_and(|ext| ext == CORPUS_EXTENSION)
        {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(filter) = filter {
            if !matches_filter(&name, filter) {
                continue;
            }
        }

        let source = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::io(format!("failed to read test file `{}`", path.display()), e)
        })?;

        files.push(TestFile {
            name,
            path: path.to_path_buf(),
            hash: content_hash(source.as_bytes()),
            source,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));

    if files.is_empty() {
        return Err(match filter {
            Some(filter) => HarnessError::FilterUnmatched {
                filter: filter.to_string(),
            },
            None => HarnessError::EmptyCorpus {
                root: root.display().to_string(),
            },
        });
    }
    Ok(files)
}
