use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::paths::{has_traversal_segment, is_safe_segment, resolve_parent_dir, ROOT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

impl Entry {
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
// Always `/` or `/a/b/`, with no `.` or `..` segments.
pub struct StoreLocation(String);

impl StoreLocation {
    pub fn root() -> Self {
        Self(ROOT.to_string())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if has_traversal_segment(raw) {
            return None;
        }
        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        if !parts.iter().all(|p| is_safe_segment(p)) {
            return None;
        }
        if parts.is_empty() {
            return Some(Self::root());
        }
        Some(Self(format!("/{}/", parts.join("/"))))
    }

    pub fn join_dir(&self, name: &str) -> Option<Self> {
        if !is_safe_segment(name) {
            return None;
        }
        Some(Self(format!("{}{}/", self.0, name)))
    }

    pub fn parent(&self) -> Self {
        Self(resolve_parent_dir(&self.0))
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn relative(&self) -> &str {
        self.0.trim_start_matches('/')
    }
}

impl Default for StoreLocation {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("directory unreadable: {path}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct PasswordStore {
    root: PathBuf,
}

impl PasswordStore {
    pub fn open(root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("failed to open password store {}", root.display()))?;
        if !root.is_dir() {
            anyhow::bail!("failed to open password store {}: not a directory", root.display());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, location: &StoreLocation) -> PathBuf {
        self.root.join(location.relative())
    }

    pub fn is_directory(&self, location: &StoreLocation) -> bool {
        self.resolve(location).is_dir()
    }

    pub fn list_entries(&self, location: &StoreLocation) -> Vec<Entry> {
        match self.try_list_entries(location) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(location = %location, "{err}");
                Vec::new()
            }
        }
    }

    pub fn try_list_entries(&self, location: &StoreLocation) -> Result<Vec<Entry>, StoreError> {
        let path = self.resolve(location);
        let iter = fs::read_dir(&path)
            .map_err(|source| StoreError::DirectoryUnreadable { path, source })?;

        let mut entries = Vec::new();
        for item in iter {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    tracing::warn!(location = %location, "skipping unreadable entry: {err}");
                    continue;
                }
            };
            let name = match item.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::debug!(location = %location, name = ?raw, "skipping non-UTF-8 entry");
                    continue;
                }
            };
            if name.starts_with('.') {
                continue;
            }
            // Follow symlinks so linked folders inside the store browse as folders.
            let is_dir = fs::metadata(item.path())
                .map(|m| m.is_dir())
                .or_else(|_| item.file_type().map(|t| t.is_dir()))
                .unwrap_or(false);
            entries.push(Entry { name, is_dir });
        }
        sort_entries(&mut entries);
        Ok(entries)
    }
}

// Directories first, then case-insensitive names with a raw tie break.
pub fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

pub fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(compare_entries);
}
