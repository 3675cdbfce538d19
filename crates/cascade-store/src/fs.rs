//! Objects on the local filesystem, fanned out by the first hash byte
//! (`objects/ab/cdef…`), the way git lays out loose objects.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cascade_crypto::{normalize_line_endings, ContentHasher};
use cascade_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};

/// Loose-object store rooted at one directory.
///
/// The same bytes always produce the same ID and are kept once. An object
/// is never visible under its ID before it is completely written, and is
/// never modified or deleted afterwards.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    dir: PathBuf,
    hasher: ContentHasher,
    normalize_line_endings: bool,
}

impl FsObjectStore {
    /// Store objects under `dir`, which is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            hasher: ContentHasher::OBJECT,
            normalize_line_endings: false,
        }
    }

    /// Rewrite CRLF/CR to LF before hashing and storing.
    pub fn with_line_ending_normalization(mut self, enabled: bool) -> Self {
        self.normalize_line_endings = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// On-disk location of an object.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (fan, rest) = id.fan_out();
        self.dir.join(fan).join(rest)
    }

    fn prepare<'a>(&self, data: &'a [u8]) -> std::borrow::Cow<'a, [u8]> {
        if self.normalize_line_endings {
            normalize_line_endings(data)
        } else {
            std::borrow::Cow::Borrowed(data)
        }
    }

    /// The ID `data` would be stored under, without writing it.
    pub fn id_for(&self, data: &[u8]) -> ObjectId {
        self.hasher.hash(&self.prepare(data))
    }

    /// Store `data` and return its ID. Writing an existing object is a no-op.
    pub fn write(&self, data: &[u8]) -> StoreResult<ObjectId> {
        let bytes = self.prepare(data);
        let id = self.hasher.hash(&bytes);
        let path = self.object_path(&id);
        if path.is_file() {
            trace!(id = %id.short_hex(), "object already stored");
            return Ok(id);
        }

        let parent = path.parent().unwrap_or(&self.dir);
        fs::create_dir_all(parent).map_err(StoreError::io(parent))?;

        // Publish only a fully synced file under the final name.
        let mut tmp = NamedTempFile::new_in(parent).map_err(StoreError::io(parent))?;
        tmp.write_all(&bytes).map_err(StoreError::io(tmp.path()))?;
        tmp.as_file().sync_all().map_err(StoreError::io(tmp.path()))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path)(e.error))?;

        debug!(id = %id.short_hex(), size = bytes.len(), "object written");
        Ok(id)
    }

    /// Read an object, verifying its bytes against the ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    pub fn read(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        let path = self.object_path(id);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path)(e)),
        };
        if !self.hasher.verify(&data, id) {
            return Err(StoreError::ObjectCorrupt { id: *id });
        }
        Ok(Some(data))
    }

    pub fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }

    /// All stored IDs, sorted.
    pub fn ids(&self) -> StoreResult<Vec<ObjectId>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| self.dir.clone(), Path::to_path_buf);
                StoreError::Io {
                    path,
                    source: io::Error::from(e),
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let fan = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str());
            let rest = entry.file_name().to_str();
            // Leftover temp files and strays do not parse as IDs.
            if let (Some(fan), Some(rest)) = (fan, rest) {
                if let Ok(id) = ObjectId::from_hex(&format!("{fan}{rest}")) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().join("objects"));
        (dir, store)
    }

    #[test]
    fn write_then_read() {
        let (_dir, store) = store();
        let id = store.write(b"fn main() {}\n").unwrap();
        assert_eq!(store.read(&id).unwrap().unwrap(), b"fn main() {}\n");
        assert!(store.exists(&id).unwrap());
        assert_eq!(id, store.id_for(b"fn main() {}\n"));
    }

    #[test]
    fn write_is_idempotent() {
        let (_dir, store) = store();
        let a = store.write(b"same").unwrap();
        let b = store.write(b"same").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.ids().unwrap(), vec![a]);
    }

    #[test]
    fn fan_out_layout() {
        let (_dir, store) = store();
        let id = store.write(b"x").unwrap();
        let hex = id.to_hex();
        let expected = store.dir().join(&hex[..2]).join(&hex[2..]);
        assert_eq!(store.object_path(&id), expected);
        assert!(expected.is_file());
    }

    #[test]
    fn missing_object_reads_none() {
        let (_dir, store) = store();
        let id = store.id_for(b"never written");
        assert_eq!(store.read(&id).unwrap(), None);
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn tampered_object_is_detected() {
        let (_dir, store) = store();
        let id = store.write(b"original").unwrap();
        fs::write(store.object_path(&id), b"tampered").unwrap();
        assert!(matches!(
            store.read(&id),
            Err(StoreError::ObjectCorrupt { id: bad }) if bad == id
        ));
    }

    #[test]
    fn ids_skip_stray_files() {
        let (_dir, store) = store();
        let id = store.write(b"real").unwrap();
        let fan = store.object_path(&id).parent().unwrap().to_path_buf();
        fs::write(fan.join(".tmpXYZ"), b"partial").unwrap();
        assert_eq!(store.ids().unwrap(), vec![id]);
    }

    #[test]
    fn line_endings_normalized_when_enabled() {
        let (_dir, store) = store();
        let store = store.with_line_ending_normalization(true);
        let crlf = store.write(b"a\r\nb\r\n").unwrap();
        let lf = store.write(b"a\nb\n").unwrap();
        assert_eq!(crlf, lf);
        assert_eq!(store.read(&lf).unwrap().unwrap(), b"a\nb\n");
    }

    #[test]
    fn exact_bytes_by_default() {
        let (_dir, store) = store();
        assert_ne!(store.id_for(b"a\r\n"), store.id_for(b"a\n"));
    }
}
