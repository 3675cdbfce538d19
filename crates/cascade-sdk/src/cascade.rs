use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cascade_diff::BlobDiff;
use cascade_parser::SpecFile;
use cascade_resolver::{ResolvedConfig, Resolver, ResolverConfig};
use cascade_store::{LogEntry, SpecStatus, Store, StoreConfig, StoreResult, VerifyReport};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{SdkError, SdkResult};
use crate::generation::{GenerationRecord, GenerationResult};

/// Optional resolver settings file at the workspace root.
pub const CONFIG_FILE: &str = "cascade.toml";

/// High-level Cascade workspace API.
///
/// Owns a resolver and the artifact store for one workspace root. Store
/// writes go through a single lock, so one `Cascade` can be shared between
/// threads that record generations concurrently.
pub struct Cascade {
    root: PathBuf,
    resolver: Resolver,
    store: Mutex<Store>,
}

impl Cascade {
    /// Initialize (or reopen) the workspace at `root`.
    pub fn init(root: impl Into<PathBuf>) -> SdkResult<Self> {
        Self::init_with(root, StoreConfig::default())
    }

    /// Initialize with explicit store settings. They are ignored if the
    /// store already exists.
    pub fn init_with(root: impl Into<PathBuf>, store_config: StoreConfig) -> SdkResult<Self> {
        let root = root.into();
        let store = Store::init(&root, store_config)?;
        Self::assemble(root, store)
    }

    /// Open an initialized workspace.
    pub fn open(root: impl Into<PathBuf>) -> SdkResult<Self> {
        let root = root.into();
        let store = Store::open(&root)?;
        Self::assemble(root, store)
    }

    fn assemble(root: PathBuf, store: Store) -> SdkResult<Self> {
        let config_path = root.join(CONFIG_FILE);
        let config = if config_path.is_file() {
            ResolverConfig::load(&config_path)?
        } else {
            ResolverConfig::default()
        };
        let resolver = Resolver::new(anchor_config(config, &root));
        debug!(root = %root.display(), "workspace opened");
        Ok(Self {
            root,
            resolver,
            store: Mutex::new(store),
        })
    }

    /// Replace the resolver settings loaded from [`CONFIG_FILE`].
    pub fn with_resolver_config(mut self, config: ResolverConfig) -> Self {
        self.resolver = Resolver::new(anchor_config(config, &self.root));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    // ---- Resolution ----

    /// Resolve one spec. Relative paths are taken from the workspace root.
    pub fn resolve(&self, spec: impl AsRef<Path>) -> SdkResult<ResolvedConfig> {
        Ok(self.resolver.resolve(self.root.join(spec))?)
    }

    /// Resolve every leaf spec in the workspace, each independently.
    pub fn resolve_all(&self) -> SdkResult<Vec<(PathBuf, SdkResult<ResolvedConfig>)>> {
        let leaves = self.resolver.discover_leaves(&self.root)?;
        let results = self.resolver.resolve_many(&leaves);
        Ok(leaves
            .into_iter()
            .zip(results)
            .map(|(leaf, result)| (self.relative(&leaf), result.map_err(SdkError::from)))
            .collect())
    }

    // ---- Recording ----

    /// Snapshot a spec and its generated output, append the provenance
    /// entry, and write the output to disk.
    ///
    /// The object writes and the append happen under the store lock, so
    /// concurrent calls get distinct, increasing positions. The output is
    /// staged beside its destination first and replaces the working file
    /// only after the entry is in the log; a failed append leaves the
    /// working file untouched.
    pub fn record_generation(&self, record: GenerationRecord) -> SdkResult<GenerationResult> {
        let spec_path = self.relative(&record.spec_path);
        let spec_full = self.root.join(&spec_path);
        let spec_bytes = fs::read(&spec_full).map_err(SdkError::io(&spec_full))?;
        let output_path = match &record.output_path {
            Some(path) => self.relative(path),
            None => output_path_of(&spec_path, &spec_bytes)?,
        };
        let output_full = self.root.join(&output_path);

        let store = self.store.lock().map_err(|_| SdkError::LockPoisoned)?;
        let hash = store.write_object(&spec_bytes)?;
        let content_hash = store.write_object(&record.output)?;
        let staged = stage(&output_full, &record.output)?;

        let entry = LogEntry::new(hash, content_hash, spec_path, output_path)
            .with_message(record.effective_message())
            .with_model(record.model)
            .with_tokens(record.tokens);
        let position = store.append_log(&entry)?;
        staged
            .persist(&output_full)
            .map_err(|e| SdkError::io(&output_full)(e.error))?;
        debug!(
            position,
            spec = %entry.spec_path.display(),
            output = %entry.output_path.display(),
            "generation recorded"
        );
        Ok(GenerationResult { position, entry })
    }

    // ---- Inspection ----

    pub fn status(&self, spec: impl AsRef<Path>) -> SdkResult<SpecStatus> {
        let spec = self.relative(spec.as_ref());
        self.with_store(|store| store.status(&spec))
    }

    pub fn diff(&self, spec: impl AsRef<Path>) -> SdkResult<BlobDiff> {
        let spec = self.relative(spec.as_ref());
        self.with_store(|store| store.diff(&spec))
    }

    pub fn history(&self, spec: impl AsRef<Path>) -> SdkResult<Vec<LogEntry>> {
        let spec = self.relative(spec.as_ref());
        self.with_store(|store| store.history(&spec))
    }

    pub fn read_log(&self) -> SdkResult<Vec<LogEntry>> {
        self.with_store(Store::read_log)
    }

    pub fn verify(&self) -> SdkResult<VerifyReport> {
        self.with_store(Store::verify)
    }

    fn with_store<T>(&self, f: impl FnOnce(&Store) -> StoreResult<T>) -> SdkResult<T> {
        let store = self.store.lock().map_err(|_| SdkError::LockPoisoned)?;
        Ok(f(&store)?)
    }

    /// Workspace-relative form of `path` when it lies under the root.
    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Bound the resolver to the workspace root.
fn anchor_config(mut config: ResolverConfig, root: &Path) -> ResolverConfig {
    config.workspace_root = Some(match config.workspace_root.take() {
        Some(configured) => root.join(configured),
        None => root.to_path_buf(),
    });
    config
}

/// Write `data` to a synced temp file in `dest`'s directory.
///
/// An existing destination's permissions carry over to the replacement.
fn stage(dest: &Path, data: &[u8]) -> SdkResult<NamedTempFile> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(SdkError::io(parent))?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(SdkError::io(parent))?;
    tmp.write_all(data).map_err(SdkError::io(tmp.path()))?;

    match fs::metadata(dest) {
        Ok(meta) => fs::set_permissions(tmp.path(), meta.permissions())
            .map_err(SdkError::io(tmp.path()))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => set_new_file_mode(tmp.path())?,
        Err(e) => return Err(SdkError::io(dest)(e)),
    }
    tmp.as_file().sync_all().map_err(SdkError::io(tmp.path()))?;
    Ok(tmp)
}

/// Temp files are created owner-only; a new output gets the usual mode.
#[cfg(unix)]
fn set_new_file_mode(path: &Path) -> SdkResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644)).map_err(SdkError::io(path))
}

#[cfg(not(unix))]
fn set_new_file_mode(_path: &Path) -> SdkResult<()> {
    Ok(())
}

fn output_path_of(spec_path: &Path, spec_bytes: &[u8]) -> SdkResult<PathBuf> {
    let text = String::from_utf8_lossy(spec_bytes);
    SpecFile::parse(spec_path, &text)?
        .output_path()
        .ok_or_else(|| SdkError::NoOutputPath {
            spec: spec_path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_resolver::ChainError;
    use cascade_store::StoreError;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Cascade) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("_base.spec.md"), "---\ncontext: [README.md]\n---\nUse Rust 2021.").unwrap();
        fs::write(root.join("src/main.rs.spec.md"), "Print hello.").unwrap();
        let cascade = Cascade::init(root).unwrap();
        (dir, cascade)
    }

    #[test]
    fn resolves_through_base_file() {
        let (_dir, cascade) = workspace();
        let resolved = cascade.resolve("src/main.rs.spec.md").unwrap();
        assert_eq!(resolved.body, "Use Rust 2021.\n\nPrint hello.");
        assert_eq!(resolved.frontmatter.context, Some(vec!["README.md".to_string()]));
    }

    #[test]
    fn resolve_all_reports_each_leaf() {
        let (dir, cascade) = workspace();
        fs::write(
            dir.path().join("broken.spec.md"),
            "---\nextends: nowhere.spec.md\n---\n",
        )
        .unwrap();
        let results = cascade.resolve_all().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, PathBuf::from("broken.spec.md"));
        assert!(matches!(
            results[0].1,
            Err(SdkError::Chain(ChainError::MissingAncestor { .. }))
        ));
        assert_eq!(results[1].0, PathBuf::from("src/main.rs.spec.md"));
        assert!(results[1].1.is_ok());
    }

    #[test]
    fn record_then_status_is_clean() {
        let (dir, cascade) = workspace();
        let result = cascade
            .record_generation(
                GenerationRecord::new("src/main.rs.spec.md", "fn main() {}\n")
                    .with_model("large")
                    .with_tokens(100, 12),
            )
            .unwrap();
        assert_eq!(result.position, 0);
        assert_eq!(result.entry.output_path, PathBuf::from("src/main.rs"));
        assert_eq!(result.entry.message, "generate src/main.rs.spec.md");
        assert_eq!(
            fs::read_to_string(dir.path().join("src/main.rs")).unwrap(),
            "fn main() {}\n"
        );

        let status = cascade.status("src/main.rs.spec.md").unwrap();
        assert!(!status.has_changes);
        assert_eq!(status.last_hash, Some(result.entry.content_hash));
    }

    #[test]
    fn hand_edit_shows_in_status_and_diff() {
        let (dir, cascade) = workspace();
        cascade
            .record_generation(GenerationRecord::new("src/main.rs.spec.md", "a\nb\n"))
            .unwrap();
        fs::write(dir.path().join("src/main.rs"), "a\nc\n").unwrap();

        assert!(cascade.status("src/main.rs.spec.md").unwrap().has_changes);
        let diff = cascade.diff("src/main.rs.spec.md").unwrap();
        assert_eq!((diff.additions(), diff.deletions()), (1, 1));
    }

    #[test]
    fn explicit_output_path_and_absolute_spec() {
        let (dir, cascade) = workspace();
        let result = cascade
            .record_generation(
                GenerationRecord::new(dir.path().join("src/main.rs.spec.md"), "x")
                    .with_output_path("out/bin.rs"),
            )
            .unwrap();
        assert_eq!(result.entry.spec_path, PathBuf::from("src/main.rs.spec.md"));
        assert!(dir.path().join("out/bin.rs").is_file());
        assert_eq!(cascade.history("src/main.rs.spec.md").unwrap().len(), 1);
    }

    #[test]
    fn spec_without_output_convention_is_rejected() {
        let (dir, cascade) = workspace();
        fs::write(dir.path().join("notes.md"), "just notes").unwrap();
        let err = cascade
            .record_generation(GenerationRecord::new("notes.md", "x"))
            .unwrap_err();
        assert!(matches!(err, SdkError::NoOutputPath { .. }));
        assert!(cascade.read_log().unwrap().is_empty());
    }

    #[test]
    fn missing_spec_is_io_error() {
        let (_dir, cascade) = workspace();
        let err = cascade
            .record_generation(GenerationRecord::new("ghost.rs.spec.md", "x"))
            .unwrap_err();
        assert!(matches!(err, SdkError::Io { .. }));
    }

    #[test]
    fn concurrent_records_get_distinct_positions() {
        let (dir, cascade) = workspace();
        for i in 0..8 {
            fs::write(dir.path().join(format!("f{i}.rs.spec.md")), format!("file {i}")).unwrap();
        }
        let mut positions: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let cascade = &cascade;
                    scope.spawn(move || {
                        cascade
                            .record_generation(GenerationRecord::new(
                                format!("f{i}.rs.spec.md"),
                                format!("// {i}\n"),
                            ))
                            .unwrap()
                            .position
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        positions.sort_unstable();
        assert_eq!(positions, (0..8).collect::<Vec<u64>>());
        assert_eq!(cascade.read_log().unwrap().len(), 8);
        assert!(cascade.verify().unwrap().is_ok());
    }

    #[test]
    fn failed_append_keeps_working_file() {
        let (dir, cascade) = workspace();
        cascade
            .record_generation(GenerationRecord::new("src/main.rs.spec.md", "v1\n"))
            .unwrap();
        let output = dir.path().join("src/main.rs");
        fs::write(&output, "HAND EDITED\n").unwrap();
        let log = dir.path().join(".cascade/log.jsonl");
        let mut text = fs::read_to_string(&log).unwrap();
        text.truncate(text.len() - 5);
        fs::write(&log, &text).unwrap();

        let err = cascade
            .record_generation(GenerationRecord::new("src/main.rs.spec.md", "GENERATED\n"))
            .unwrap_err();
        assert!(matches!(err, SdkError::Store(StoreError::Corrupt { .. })));
        assert_eq!(fs::read_to_string(&output).unwrap(), "HAND EDITED\n");
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("src"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 2, "{leftovers:?}");
    }

    #[cfg(unix)]
    #[test]
    fn regenerated_output_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, cascade) = workspace();
        let output = dir.path().join("src/main.rs");
        cascade
            .record_generation(GenerationRecord::new("src/main.rs.spec.md", "v1\n"))
            .unwrap();
        assert_eq!(fs::metadata(&output).unwrap().permissions().mode() & 0o777, 0o644);

        fs::set_permissions(&output, fs::Permissions::from_mode(0o755)).unwrap();
        cascade
            .record_generation(GenerationRecord::new("src/main.rs.spec.md", "v2\n"))
            .unwrap();
        assert_eq!(fs::metadata(&output).unwrap().permissions().mode() & 0o777, 0o755);
        assert_eq!(fs::read_to_string(&output).unwrap(), "v2\n");
    }

    #[test]
    fn open_requires_init() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Cascade::open(dir.path()),
            Err(SdkError::Store(StoreError::NotInitialized { .. }))
        ));
    }

    #[test]
    fn reads_resolver_config_from_workspace() {
        let (dir, _) = workspace();
        fs::write(dir.path().join(CONFIG_FILE), "body_strategy = \"replace\"\n").unwrap();
        let cascade = Cascade::open(dir.path()).unwrap();
        let resolved = cascade.resolve("src/main.rs.spec.md").unwrap();
        assert_eq!(resolved.body, "Print hello.");
        assert_eq!(cascade.resolver().config().workspace_root.as_deref(), Some(dir.path()));
    }
}
