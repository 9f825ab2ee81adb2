// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! The canonical set of file suffixes the pipeline accepts.
//!
//! This is the *only* authoritative source of supported extensions. An
//! earlier revision of this daemon kept a second, hardcoded list inside
//! the file watcher; this type closes that duplication — the watcher,
//! the scanner, and anything else that needs to know "is this file
//! supported" all call [`SupportedExtensions::is_supported`] against the
//! same registry-derived set.

use std::collections::HashSet;
use std::path::Path;

/// Canonical set of supported file suffixes, lowercase, without the dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedExtensions {
    extensions: HashSet<String>,
}

impl Default for SupportedExtensions {
    fn default() -> Self {
        Self::canonical()
    }
}

impl SupportedExtensions {
    /// The built-in registry-derived set.
    pub fn canonical() -> Self {
        const DEFAULTS: &[&str] = &[
            "txt", "md", "markdown", "pdf", "docx", "xlsx", "pptx", "csv", "json", "html", "htm",
            "rtf", "odt",
        ];
        Self { extensions: DEFAULTS.iter().map(|s| s.to_string()).collect() }
    }

    pub fn from_iter(extensions: impl IntoIterator<Item = String>) -> Self {
        Self { extensions: extensions.into_iter().map(|e| e.trim_start_matches('.').to_lowercase()).collect() }
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_set_accepts_documented_suffixes() {
        let exts = SupportedExtensions::canonical();
        assert!(exts.is_supported(Path::new("readme.md")));
        assert!(exts.is_supported(Path::new("report.PDF")));
        assert!(!exts.is_supported(Path::new("binary.exe")));
        assert!(!exts.is_supported(Path::new("no_extension")));
    }

    #[test]
    fn custom_set_normalizes_case_and_leading_dot() {
        let exts = SupportedExtensions::from_iter(vec![".RS".to_string(), "Toml".to_string()]);
        assert!(exts.is_supported(Path::new("main.rs")));
        assert!(exts.is_supported(Path::new("Cargo.toml")));
        assert!(!exts.is_supported(Path::new("readme.md")));
    }
}
