use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cascade_diff::{diff_blobs, BlobDiff};
use cascade_parser::SPEC_SUFFIX;
use cascade_types::ObjectId;
use tracing::debug;

use crate::config::{StoreConfig, CONFIG_FILE, LOG_FILE, OBJECTS_DIR, STORE_DIR};
use crate::error::{StoreError, StoreResult};
use crate::fs::FsObjectStore;
use crate::log::{LogEntry, ProvenanceLog};
use crate::status::{DanglingRef, SpecStatus, VerifyReport};

/// Label used in diffs for a side that does not exist.
const NO_FILE: &str = "/dev/null";

/// An initialized artifact store under an explicit workspace root.
///
/// Relative spec and output paths are resolved against the root. The store
/// does no locking of its own: callers must serialize `write_object` +
/// `append_log` pairs (see `cascade-sdk`).
#[derive(Clone, Debug)]
pub struct Store {
    root: PathBuf,
    config: StoreConfig,
    objects: FsObjectStore,
    log: ProvenanceLog,
}

impl Store {
    /// Initialize a store under `root`.
    ///
    /// Initializing an already-initialized root is a no-op that opens the
    /// existing store; `config` is then ignored in favour of the persisted one.
    /// A store directory whose log is gone is corrupt, not reinitialized.
    pub fn init(root: impl Into<PathBuf>, config: StoreConfig) -> StoreResult<Self> {
        let root = root.into();
        if Self::probe(&root)? {
            debug!(root = %root.display(), "store already initialized");
            return Self::open(root);
        }

        let dir = root.join(STORE_DIR);
        let objects = dir.join(OBJECTS_DIR);
        fs::create_dir_all(&objects).map_err(StoreError::io(&objects))?;
        let config_path = dir.join(CONFIG_FILE);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&config_path)
            .map_err(StoreError::io(&config_path))?;
        file.write_all(config.to_toml_string()?.as_bytes())
            .map_err(StoreError::io(&config_path))?;

        let store = Self::assemble(root, config);
        // The log file is created last; its presence marks the store initialized.
        store.log.create()?;
        debug!(root = %store.root.display(), "store initialized");
        Ok(store)
    }

    /// Open an existing store.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        if !Self::probe(&root)? {
            return Err(StoreError::NotInitialized { root });
        }
        let config = StoreConfig::load_or_default(&root.join(STORE_DIR).join(CONFIG_FILE))?;
        Ok(Self::assemble(root, config))
    }

    /// Returns `true` if a store with a log exists under `root`.
    pub fn is_initialized(root: &Path) -> bool {
        root.join(STORE_DIR).join(LOG_FILE).is_file()
    }

    /// Like [`Store::is_initialized`], but a store directory that still holds
    /// a config or objects without a log is an error.
    fn probe(root: &Path) -> StoreResult<bool> {
        if Self::is_initialized(root) {
            return Ok(true);
        }
        let dir = root.join(STORE_DIR);
        if dir.join(CONFIG_FILE).exists() || dir.join(OBJECTS_DIR).exists() {
            return Err(StoreError::Corrupt {
                path: dir.join(LOG_FILE),
                line: 0,
                reason: "log file is missing".to_string(),
            });
        }
        Ok(false)
    }

    fn assemble(root: PathBuf, config: StoreConfig) -> Self {
        let dir = root.join(STORE_DIR);
        let objects = FsObjectStore::new(dir.join(OBJECTS_DIR))
            .with_line_ending_normalization(config.normalize_line_endings);
        let log = ProvenanceLog::new(dir.join(LOG_FILE), config.sync_log);
        Self {
            root,
            config,
            objects,
            log,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn objects(&self) -> &FsObjectStore {
        &self.objects
    }

    // ---- Objects ----

    /// Store `data`, returning its content hash. Idempotent.
    pub fn write_object(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.objects.write(data)
    }

    /// Read an object, verifying it against its hash.
    pub fn read_object(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        self.read_referenced("object", id)
    }

    pub fn has_object(&self, id: &ObjectId) -> StoreResult<bool> {
        self.objects.exists(id)
    }

    fn read_referenced(&self, field: &'static str, id: &ObjectId) -> StoreResult<Vec<u8>> {
        self.objects
            .read(id)?
            .ok_or(StoreError::MissingObject { field, id: *id })
    }

    // ---- Log ----

    /// Append `entry` and return its position.
    ///
    /// Both referenced objects must already be stored; otherwise nothing is
    /// written. A corrupt log is reported before anything is appended.
    pub fn append_log(&self, entry: &LogEntry) -> StoreResult<u64> {
        let position = self.log.entry_count()?;
        for (field, id) in [("hash", &entry.hash), ("content_hash", &entry.content_hash)] {
            if !self.objects.exists(id)? {
                return Err(StoreError::MissingObject { field, id: *id });
            }
        }
        self.log.append(entry)?;
        debug!(position, spec = %entry.spec_path.display(), "generation recorded");
        Ok(position)
    }

    /// Every entry, oldest first.
    pub fn read_log(&self) -> StoreResult<Vec<LogEntry>> {
        self.log.read_all()
    }

    /// Entries for one spec, oldest first. Paths are compared as given.
    pub fn history(&self, spec_path: impl AsRef<Path>) -> StoreResult<Vec<LogEntry>> {
        let spec_path = spec_path.as_ref();
        Ok(self
            .read_log()?
            .into_iter()
            .filter(|e| e.spec_path == spec_path)
            .collect())
    }

    pub fn latest_entry(&self, spec_path: impl AsRef<Path>) -> StoreResult<Option<LogEntry>> {
        Ok(self.history(spec_path)?.pop())
    }

    // ---- Working tree comparisons ----

    /// Compare a spec's current output file with its last recorded output.
    ///
    /// The output path comes from the latest log entry, or from the spec
    /// name (`x.rs.spec.md` → `x.rs`) when the spec was never generated.
    pub fn status(&self, spec_path: impl AsRef<Path>) -> StoreResult<SpecStatus> {
        let spec_path = spec_path.as_ref();
        let latest = self.latest_entry(spec_path)?;
        let output_path = output_path_for(spec_path, latest.as_ref());
        let current = match &output_path {
            Some(path) => self.read_output(path)?,
            None => None,
        };

        let last_hash = latest.map(|e| e.content_hash);
        let current_hash = current.as_deref().map(|data| self.objects.id_for(data));
        Ok(SpecStatus {
            spec_path: spec_path.to_path_buf(),
            output_path,
            last_hash,
            current_hash,
            current_output_exists: current.is_some(),
            has_changes: last_hash != current_hash,
        })
    }

    /// Line diff from the last recorded output of a spec to the file on disk.
    ///
    /// A side that does not exist diffs as empty.
    pub fn diff(&self, spec_path: impl AsRef<Path>) -> StoreResult<BlobDiff> {
        let spec_path = spec_path.as_ref();
        let latest = self.latest_entry(spec_path)?;
        let output_path = output_path_for(spec_path, latest.as_ref());

        let (old, old_label) = match &latest {
            Some(entry) => (
                self.read_referenced("content_hash", &entry.content_hash)?,
                format!(
                    "{}@{}",
                    entry.output_path.display(),
                    entry.content_hash.short_hex()
                ),
            ),
            None => (Vec::new(), NO_FILE.to_string()),
        };
        let (new, new_label) = match &output_path {
            Some(path) => match self.read_output(path)? {
                Some(data) => (data, path.display().to_string()),
                None => (Vec::new(), NO_FILE.to_string()),
            },
            None => (Vec::new(), NO_FILE.to_string()),
        };
        Ok(diff_blobs(&old, &new).with_labels(old_label, new_label))
    }

    /// Line diff between two stored objects.
    pub fn diff_objects(&self, old: &ObjectId, new: &ObjectId) -> StoreResult<BlobDiff> {
        let old_data = self.read_referenced("old", old)?;
        let new_data = self.read_referenced("new", new)?;
        Ok(diff_blobs(&old_data, &new_data).with_labels(old.short_hex(), new.short_hex()))
    }

    /// Check every object against its hash and every log reference against
    /// the object table.
    pub fn verify(&self) -> StoreResult<VerifyReport> {
        let entries = self.read_log()?;
        let ids = self.objects.ids()?;

        let mut report = VerifyReport {
            entries: entries.len(),
            objects: ids.len(),
            ..VerifyReport::default()
        };
        for id in &ids {
            match self.objects.read(id) {
                Ok(_) => {}
                Err(StoreError::ObjectCorrupt { id }) => report.corrupt.push(id),
                Err(e) => return Err(e),
            }
        }
        for (position, entry) in entries.iter().enumerate() {
            for (field, id) in [("hash", entry.hash), ("content_hash", entry.content_hash)] {
                if ids.binary_search(&id).is_err() {
                    report.dangling.push(DanglingRef {
                        position: position as u64,
                        field,
                        id,
                    });
                }
            }
        }
        debug!(
            entries = report.entries,
            objects = report.objects,
            ok = report.is_ok(),
            "store verified"
        );
        Ok(report)
    }

    fn read_output(&self, path: &Path) -> StoreResult<Option<Vec<u8>>> {
        let full = self.root.join(path);
        match fs::read(&full) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&full)(e)),
        }
    }
}

fn output_path_for(spec_path: &Path, latest: Option<&LogEntry>) -> Option<PathBuf> {
    match latest {
        Some(entry) => Some(entry.output_path.clone()),
        None => default_output_path(spec_path),
    }
}

/// Output path implied by a spec's file name: the spec path without its
/// `.spec.md` suffix.
pub fn default_output_path(spec_path: &Path) -> Option<PathBuf> {
    let name = spec_path.file_name()?.to_str()?;
    let stem = name.strip_suffix(SPEC_SUFFIX).filter(|s| !s.is_empty())?;
    Some(spec_path.with_file_name(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::TokenUsage;
    use tempfile::TempDir;

    fn store() -> (TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::init(dir.path(), StoreConfig::default()).unwrap();
        (dir, store)
    }

    /// Write a spec and its output to disk, store both, and log the pair.
    fn generate(store: &Store, spec: &str, output: &str, body: &str) -> LogEntry {
        let out_path = default_output_path(Path::new(spec)).unwrap();
        let full = store.root().join(&out_path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, body).unwrap();
        let entry = LogEntry::new(
            store.write_object(spec.as_bytes()).unwrap(),
            store.write_object(output.as_bytes()).unwrap(),
            spec,
            out_path,
        )
        .with_message("generate")
        .with_model("large")
        .with_tokens(TokenUsage::new(10, 20));
        store.append_log(&entry).unwrap();
        entry
    }

    #[test]
    fn init_creates_layout() {
        let (dir, _store) = store();
        let root = dir.path().join(STORE_DIR);
        assert!(root.join(OBJECTS_DIR).is_dir());
        assert!(root.join(LOG_FILE).is_file());
        assert!(root.join(CONFIG_FILE).is_file());
    }

    #[test]
    fn reinit_is_a_noop() {
        let (dir, store) = store();
        generate(&store, "a.rs.spec.md", "fn a() {}", "fn a() {}");
        let again = Store::init(
            dir.path(),
            StoreConfig {
                normalize_line_endings: true,
                sync_log: false,
            },
        )
        .unwrap();
        assert_eq!(again.read_log().unwrap().len(), 1);
        assert_eq!(again.config(), &StoreConfig::default());
    }

    #[test]
    fn open_requires_init() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Store::open(dir.path()),
            Err(StoreError::NotInitialized { .. })
        ));
    }

    #[test]
    fn lost_log_is_corrupt_not_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            normalize_line_endings: true,
            sync_log: true,
        };
        let store = Store::init(dir.path(), config.clone()).unwrap();
        generate(&store, "a.rs.spec.md", "one\n", "one\n");
        let log_path = dir.path().join(STORE_DIR).join(LOG_FILE);
        fs::remove_file(&log_path).unwrap();

        assert!(matches!(
            Store::open(dir.path()),
            Err(StoreError::Corrupt { line: 0, .. })
        ));
        assert!(matches!(
            Store::init(dir.path(), StoreConfig::default()),
            Err(StoreError::Corrupt { line: 0, .. })
        ));
        assert!(!log_path.exists());
        let persisted =
            StoreConfig::load_or_default(&dir.path().join(STORE_DIR).join(CONFIG_FILE)).unwrap();
        assert_eq!(persisted, config);
    }

    #[test]
    fn empty_store_dir_initializes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(STORE_DIR)).unwrap();
        let store = Store::init(dir.path(), StoreConfig::default()).unwrap();
        assert!(store.read_log().unwrap().is_empty());
    }

    #[test]
    fn open_uses_persisted_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            normalize_line_endings: true,
            sync_log: true,
        };
        Store::init(dir.path(), config.clone()).unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.config(), &config);
        assert_eq!(
            store.write_object(b"x\r\n").unwrap(),
            store.write_object(b"x\n").unwrap()
        );
    }

    #[test]
    fn write_object_twice_keeps_one_copy() {
        let (_dir, store) = store();
        let a = store.write_object(b"payload").unwrap();
        let b = store.write_object(b"payload").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.objects().ids().unwrap(), vec![a]);
        assert_eq!(store.read_object(&a).unwrap(), b"payload");
    }

    #[test]
    fn read_missing_object() {
        let (_dir, store) = store();
        let id = store.objects().id_for(b"absent");
        assert!(matches!(
            store.read_object(&id),
            Err(StoreError::MissingObject { field: "object", .. })
        ));
    }

    #[test]
    fn append_rejects_missing_reference_and_leaves_log_alone() {
        let (_dir, store) = store();
        generate(&store, "a.rs.spec.md", "one", "one");
        let before = store.read_log().unwrap();

        let spec = store.write_object(b"spec").unwrap();
        let absent = store.objects().id_for(b"never stored");
        let entry = LogEntry::new(spec, absent, "b.rs.spec.md", "b.rs");
        match store.append_log(&entry) {
            Err(StoreError::MissingObject { field, id }) => {
                assert_eq!(field, "content_hash");
                assert_eq!(id, absent);
            }
            other => panic!("expected missing object, got {other:?}"),
        }
        assert_eq!(store.read_log().unwrap(), before);
    }

    #[test]
    fn positions_increase_and_order_is_kept() {
        let (_dir, store) = store();
        let first = generate(&store, "a.rs.spec.md", "1", "1");
        let second = generate(&store, "b.rs.spec.md", "2", "2");
        let spec = store.write_object(b"s").unwrap();
        let position = store
            .append_log(&LogEntry::new(spec, spec, "c.spec.md", "c"))
            .unwrap();
        assert_eq!(position, 2);
        let log = store.read_log().unwrap();
        assert_eq!(log[0], first);
        assert_eq!(log[1], second);
    }

    #[test]
    fn corrupt_log_fails_fast() {
        let (dir, store) = store();
        generate(&store, "a.rs.spec.md", "1", "1");
        let log_path = dir.path().join(STORE_DIR).join(LOG_FILE);
        let mut text = fs::read_to_string(&log_path).unwrap();
        text.push_str("{\"hash\": \"trunc");
        fs::write(&log_path, &text).unwrap();

        assert!(matches!(store.read_log(), Err(StoreError::Corrupt { .. })));
        let spec = store.write_object(b"s").unwrap();
        assert!(matches!(
            store.append_log(&LogEntry::new(spec, spec, "x.spec.md", "x")),
            Err(StoreError::Corrupt { .. })
        ));
        assert_eq!(fs::read_to_string(&log_path).unwrap(), text);
    }

    #[test]
    fn history_filters_by_spec() {
        let (_dir, store) = store();
        generate(&store, "a.rs.spec.md", "1", "1");
        generate(&store, "b.rs.spec.md", "2", "2");
        let latest = generate(&store, "a.rs.spec.md", "3", "3");
        assert_eq!(store.history("a.rs.spec.md").unwrap().len(), 2);
        assert_eq!(store.latest_entry("a.rs.spec.md").unwrap(), Some(latest));
        assert_eq!(store.latest_entry("z.spec.md").unwrap(), None);
    }

    #[test]
    fn status_clean_after_generation() {
        let (_dir, store) = store();
        let entry = generate(&store, "src/main.rs.spec.md", "fn main() {}\n", "fn main() {}\n");
        let status = store.status("src/main.rs.spec.md").unwrap();
        assert!(!status.has_changes);
        assert!(status.current_output_exists);
        assert_eq!(status.last_hash, Some(entry.content_hash));
        assert_eq!(status.output_path, Some(PathBuf::from("src/main.rs")));
    }

    #[test]
    fn status_sees_edited_output() {
        let (dir, store) = store();
        generate(&store, "main.rs.spec.md", "v1\n", "v1\n");
        fs::write(dir.path().join("main.rs"), "v2\n").unwrap();
        let status = store.status("main.rs.spec.md").unwrap();
        assert!(status.has_changes);
        assert_ne!(status.current_hash, status.last_hash);
    }

    #[test]
    fn status_sees_deleted_output() {
        let (dir, store) = store();
        generate(&store, "main.rs.spec.md", "v1\n", "v1\n");
        fs::remove_file(dir.path().join("main.rs")).unwrap();
        let status = store.status("main.rs.spec.md").unwrap();
        assert!(status.has_changes);
        assert!(!status.current_output_exists);
    }

    #[test]
    fn status_of_never_generated_spec() {
        let (dir, store) = store();
        let status = store.status("new.rs.spec.md").unwrap();
        assert!(status.is_untracked());
        assert!(!status.has_changes);

        fs::write(dir.path().join("new.rs"), "hand written").unwrap();
        let status = store.status("new.rs.spec.md").unwrap();
        assert!(status.has_changes);
        assert!(status.current_output_exists);
    }

    #[test]
    fn diff_against_working_file() {
        let (dir, store) = store();
        let entry = generate(&store, "lib.rs.spec.md", "a\nb\nc\n", "a\nb\nc\n");
        assert!(store.diff("lib.rs.spec.md").unwrap().is_empty());

        fs::write(dir.path().join("lib.rs"), "a\nB\nc\n").unwrap();
        let diff = store.diff("lib.rs.spec.md").unwrap();
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.deletions(), 1);
        assert_eq!(diff.old_label, format!("lib.rs@{}", entry.content_hash.short_hex()));
        assert_eq!(diff.new_label, "lib.rs");
    }

    #[test]
    fn diff_between_objects() {
        let (_dir, store) = store();
        let old = store.write_object(b"x\ny\n").unwrap();
        let new = store.write_object(b"x\nz\n").unwrap();
        let diff = store.diff_objects(&old, &new).unwrap();
        assert!(diff.to_string().contains("-y\n+z\n"));

        let absent = store.objects().id_for(b"nope");
        assert!(matches!(
            store.diff_objects(&old, &absent),
            Err(StoreError::MissingObject { field: "new", .. })
        ));
    }

    #[test]
    fn verify_reports_problems() {
        let (dir, store) = store();
        let entry = generate(&store, "a.rs.spec.md", "out", "out");
        assert!(store.verify().unwrap().is_ok());

        // A reference written around append_log's validation.
        let ghost = store.objects().id_for(b"ghost");
        ProvenanceLog::new(dir.path().join(STORE_DIR).join(LOG_FILE), false)
            .append(&LogEntry::new(entry.hash, ghost, "b.spec.md", "b"))
            .unwrap();
        fs::write(store.objects().object_path(&entry.hash), b"bit rot").unwrap();

        let report = store.verify().unwrap();
        assert_eq!(report.entries, 2);
        assert_eq!(report.corrupt, vec![entry.hash]);
        assert_eq!(
            report.dangling,
            vec![DanglingRef {
                position: 1,
                field: "content_hash",
                id: ghost
            }]
        );
    }

    #[test]
    fn default_output_strips_suffix() {
        assert_eq!(
            default_output_path(Path::new("a/b/main.rs.spec.md")),
            Some(PathBuf::from("a/b/main.rs"))
        );
        assert_eq!(default_output_path(Path::new("README.md")), None);
        assert_eq!(default_output_path(Path::new(".spec.md")), None);
    }
}
