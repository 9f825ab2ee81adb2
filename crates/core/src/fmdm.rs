// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! The Folder MCP Data Model snapshot — the single observable view of
//! every monitored folder plus the installed-model catalogue.

use crate::folder::FolderRecord;
use crate::model::ModelDescriptor;
use serde::{Deserialize, Serialize};

/// A versioned, immutable snapshot of all monitored folders.
///
/// `version` increases by exactly one on every publication from
/// `FmdmService`; consumers use it to detect that they missed an update
/// rather than to order concurrent writers (there is only ever one
/// writer, `FmdmService`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fmdm {
    pub version: u64,
    pub folders: Vec<FolderRecord>,
    pub installed_models: Vec<ModelDescriptor>,
}

impl Fmdm {
    pub fn empty() -> Self {
        Self { version: 0, folders: Vec::new(), installed_models: Vec::new() }
    }

    pub fn folder(&self, path: &std::path::Path) -> Option<&FolderRecord> {
        self.folders.iter().find(|f| f.path == path)
    }

    /// Structural equality ignoring `version`, used by `FmdmService` to
    /// decide whether a write is actually a change worth publishing.
    pub fn content_eq(&self, other: &Fmdm) -> bool {
        self.folders == other.folders && self.installed_models == other.installed_models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folder::FolderRecord;
    use std::path::PathBuf;

    #[test]
    fn content_eq_ignores_version() {
        let mut a = Fmdm::empty();
        a.folders.push(FolderRecord::pending(PathBuf::from("/x"), "m"));
        let mut b = a.clone();
        b.version = 7;
        assert!(a.content_eq(&b));

        b.folders[0].progress = 5;
        assert!(!a.content_eq(&b));
    }

    #[test]
    fn folder_lookup_by_path() {
        let mut snap = Fmdm::empty();
        snap.folders.push(FolderRecord::pending(PathBuf::from("/data/a"), "m"));
        assert!(snap.folder(&PathBuf::from("/data/a")).is_some());
        assert!(snap.folder(&PathBuf::from("/data/b")).is_none());
    }
}
