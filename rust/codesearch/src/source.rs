//! File sources: the seam between a repository locator and its files.
//!
//! A source turns a locator into a flat listing of `(relative path, bytes)`.
//! Failing to open the repository root is an error of the whole listing;
//! a file that cannot be read is reported per entry and skipped by the
//! caller.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use parking_lot::RwLock;

use codesearch_core::key::normalize_path;

/// Names skipped by `LocalSource` unless configured otherwise.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git"];

/// One entry of a repository listing.
#[derive(Debug)]
pub struct SourceFile {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    pub content: io::Result<Vec<u8>>,
}

/// Lazily produced listing of a repository.
pub type SourceFiles<'a> = Box<dyn Iterator<Item = SourceFile> + Send + 'a>;

/// Enumerates the files of a repository.
pub trait RepositorySource: Send + Sync {
    /// List every file of the repository at `locator`.
    ///
    /// Errors only if the repository root itself is unavailable.
    fn files<'a>(&'a self, locator: &str) -> io::Result<SourceFiles<'a>>;
}

// ---------------------------------------------------------------------------
// Local directories
// ---------------------------------------------------------------------------

/// Build a `GlobSet` from a list of glob patterns.
fn build_globset(patterns: &[&str]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

/// Filesystem path of a local locator: a plain path or a `file://` URL.
pub fn local_root(locator: &str) -> PathBuf {
    PathBuf::from(locator.strip_prefix("file://").unwrap_or(locator))
}

/// Walks a local directory tree with `ignore::WalkBuilder`.
///
/// Entries whose file name matches an exclude glob are skipped along with
/// everything below them. Symlinks are not followed, and ignore files and
/// hidden-file rules are not applied: every regular file is listed unless
/// excluded.
#[derive(Debug, Clone)]
pub struct LocalSource {
    exclude: GlobSet,
}

impl LocalSource {
    /// A source skipping `DEFAULT_EXCLUDES`.
    pub fn new() -> Self {
        // The default patterns are fixed literals and always compile.
        let exclude = build_globset(DEFAULT_EXCLUDES).unwrap_or_else(|_| GlobSet::empty());
        LocalSource { exclude }
    }

    /// A source skipping names matching any of `patterns`.
    pub fn with_excludes(patterns: &[&str]) -> Result<Self, globset::Error> {
        Ok(LocalSource {
            exclude: build_globset(patterns)?,
        })
    }

    /// Collect every regular file below `root` in file-name order.
    ///
    /// Walker errors and non-UTF-8 names become failed entries.
    fn walk(&self, root: &Path) -> io::Result<Vec<(String, io::Result<PathBuf>)>> {
        // Root failure is fatal to the listing.
        if !fs::metadata(root)?.is_dir() {
            return Err(io::Error::other(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let exclude = self.exclude.clone();
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| entry.depth() == 0 || !exclude.is_match(entry.file_name()))
            .build();

        let mut found = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let rel = error_path(&err)
                        .and_then(|p| relative_path(root, p))
                        .unwrap_or_default();
                    found.push((rel, Err(into_io_error(err))));
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            match rel.to_str() {
                Some(rel) => found.push((rel.to_string(), Ok(entry.path().to_path_buf()))),
                None => found.push((
                    rel.to_string_lossy().into_owned(),
                    Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "file name is not valid UTF-8",
                    )),
                )),
            }
        }

        Ok(found)
    }
}

impl Default for LocalSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Path an `ignore` error refers to, if it carries one.
fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().into_owned())
}

fn into_io_error(err: ignore::Error) -> io::Error {
    let kind = err.io_error().map(io::Error::kind);
    match kind {
        Some(kind) => io::Error::new(kind, err),
        None => io::Error::other(err),
    }
}

impl RepositorySource for LocalSource {
    fn files<'a>(&'a self, locator: &str) -> io::Result<SourceFiles<'a>> {
        let root = local_root(locator);
        let listing = self.walk(&root)?;
        Ok(Box::new(listing.into_iter().map(|(path, entry)| {
            let content = entry.and_then(fs::read);
            SourceFile {
                path: normalize_path(&path),
                content,
            }
        })))
    }
}

// ---------------------------------------------------------------------------
// In-memory repositories
// ---------------------------------------------------------------------------

/// Repositories held in memory, keyed by locator. For tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySource {
    repositories: RwLock<HashMap<String, Vec<(String, Vec<u8>)>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file of repository `locator`.
    pub fn insert(&self, locator: &str, path: &str, content: impl Into<Vec<u8>>) {
        let path = normalize_path(path);
        let content = content.into();
        let mut repos = self.repositories.write();
        let files = repos.entry(locator.to_string()).or_default();
        match files.iter_mut().find(|(p, _)| *p == path) {
            Some(existing) => existing.1 = content,
            None => files.push((path, content)),
        }
    }

    /// Remove a file of repository `locator`. Returns true if it existed.
    pub fn remove(&self, locator: &str, path: &str) -> bool {
        let mut repos = self.repositories.write();
        let Some(files) = repos.get_mut(locator) else {
            return false;
        };
        let before = files.len();
        files.retain(|(p, _)| p != path);
        files.len() != before
    }
}

impl RepositorySource for MemorySource {
    fn files<'a>(&'a self, locator: &str) -> io::Result<SourceFiles<'a>> {
        let repos = self.repositories.read();
        let files = repos.get(locator).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no repository at {}", locator),
            )
        })?;
        Ok(Box::new(files.into_iter().map(|(path, content)| SourceFile {
            path,
            content: Ok(content),
        })))
    }
}
