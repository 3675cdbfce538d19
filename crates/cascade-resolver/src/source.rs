//! Where spec text comes from.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::path::normalize;

/// Read access to spec documents.
///
/// Implementations must be thread-safe so independent leaves can be
/// resolved in parallel.
pub trait SpecSource: Send + Sync {
    /// Read the full text of the spec at `path`.
    ///
    /// A missing file must be reported as [`io::ErrorKind::NotFound`].
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Returns `true` if a spec exists at `path`.
    fn is_file(&self, path: &Path) -> bool;
}

/// Reads specs from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsSource;

impl SpecSource for FsSource {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Map-backed source for tests and embedding.
///
/// Paths are normalized on insert and lookup, so `a/./b.spec.md` and
/// `a/b.spec.md` name the same document.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    files: HashMap<PathBuf, String>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a document.
    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files.insert(normalize(path.as_ref()), content.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SpecSource for InMemorySource {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such spec: {}", path.display()),
            )
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize(path))
    }
}
