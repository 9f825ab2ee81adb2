// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! File fingerprints: the unit of change detection for a monitored folder.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// `(relativePath, size, mtimeNs, contentHash)` — spec.md §3.
///
/// A file is *indexed* iff its stored fingerprint equals the live one and
/// its chunks exist in the vector store; `FolderLifecycleManager::scan`
/// is the only code that compares the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub relative_path: PathBuf,
    pub size: u64,
    pub mtime_ns: u128,
    pub content_hash: String,
}

impl FileFingerprint {
    pub fn new(relative_path: PathBuf, size: u64, mtime_ns: u128, content_hash: String) -> Self {
        Self { relative_path, size, mtime_ns, content_hash }
    }

    /// Fingerprints are considered unchanged when size+mtime agree — the
    /// content hash is only recomputed (and compared) when either of the
    /// cheap fields disagree, avoiding a full re-read of unchanged files.
    pub fn cheaply_equal(&self, other: &FileFingerprint) -> bool {
        self.size == other.size && self.mtime_ns == other.mtime_ns
    }
}

/// SHA-256 content hash of a byte slice, hex-encoded.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Build a fingerprint for a file already read into memory.
pub fn fingerprint_of(relative_path: &Path, bytes: &[u8], size: u64, mtime_ns: u128) -> FileFingerprint {
    FileFingerprint::new(relative_path.to_path_buf(), size, mtime_ns, content_hash(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cheaply_equal_ignores_content_hash() {
        let a = FileFingerprint::new(PathBuf::from("a.md"), 10, 1, "aaa".into());
        let b = FileFingerprint::new(PathBuf::from("a.md"), 10, 1, "bbb".into());
        assert!(a.cheaply_equal(&b));
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }
}
