//! The provenance log: one JSON object per line, append-only.
//!
//! ```text
//! {"hash":"9f2c…","message":"generate main.rs","spec_path":"src/main.rs.spec.md",…}
//! {"hash":"41be…","message":"regenerate","spec_path":"src/main.rs.spec.md",…}
//! ```
//!
//! A line's position (0-based) is the entry's implicit sequence number.
//! Reading is strict: an unparseable line, or a final line missing its
//! newline (a torn append), fails the read instead of being skipped.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cascade_types::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Tokens spent on one generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        Self { input, output }
    }

    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

/// One generation event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Snapshot of the spec that was generated from.
    pub hash: ObjectId,
    pub message: String,
    pub spec_path: PathBuf,
    pub output_path: PathBuf,
    /// Snapshot of the generated output.
    pub content_hash: ObjectId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub tokens: TokenUsage,
}

impl LogEntry {
    /// Entry stamped with the current time.
    pub fn new(
        hash: ObjectId,
        content_hash: ObjectId,
        spec_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            hash,
            message: String::new(),
            spec_path: spec_path.into(),
            output_path: output_path.into(),
            content_hash,
            timestamp: Utc::now(),
            model: String::new(),
            tokens: TokenUsage::default(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_tokens(mut self, tokens: TokenUsage) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Size and entry count of the log as this handle last read or wrote it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cursor {
    bytes: u64,
    entries: u64,
}

/// Handle on the log file.
///
/// Clones share one cursor.
#[derive(Clone, Debug)]
pub struct ProvenanceLog {
    path: PathBuf,
    sync: bool,
    cursor: Arc<Mutex<Option<Cursor>>>,
}

impl ProvenanceLog {
    /// `sync` controls whether every append is flushed to stable storage.
    pub fn new(path: impl Into<PathBuf>, sync: bool) -> Self {
        Self {
            path: path.into(),
            sync,
            cursor: Arc::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the empty log file if it does not exist yet.
    pub fn create(&self) -> StoreResult<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(StoreError::io(&self.path))?;
        Ok(())
    }

    /// All entries, oldest first.
    pub fn read_all(&self) -> StoreResult<Vec<LogEntry>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(self.corrupt(0, "log is not valid UTF-8"));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(self.corrupt(0, "log file is missing"));
            }
            Err(e) => return Err(StoreError::io(&self.path)(e)),
        };
        if !text.is_empty() && !text.ends_with('\n') {
            return Err(self.corrupt(text.lines().count(), "final entry is truncated"));
        }

        let entries = text
            .lines()
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| self.corrupt(i + 1, e.to_string()))
            })
            .collect::<StoreResult<Vec<LogEntry>>>()?;
        self.set_cursor(Some(Cursor {
            bytes: text.len() as u64,
            entries: entries.len() as u64,
        }));
        Ok(entries)
    }

    /// Number of entries, which is also the position the next append gets.
    ///
    /// The file is read back in full only when its size differs from what
    /// this handle last saw, so a torn tail or a foreign append is still
    /// caught.
    pub fn entry_count(&self) -> StoreResult<u64> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(self.corrupt(0, "log file is missing"));
            }
            Err(e) => return Err(StoreError::io(&self.path)(e)),
        };
        match self.cursor() {
            Some(cursor) if cursor.bytes == size => Ok(cursor.entries),
            _ => Ok(self.read_all()?.len() as u64),
        }
    }

    /// Append one entry as a single line.
    ///
    /// Callers are responsible for validating the entry first and for
    /// serializing concurrent appends.
    pub fn append(&self, entry: &LogEntry) -> StoreResult<()> {
        let mut line =
            serde_json::to_string(entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(StoreError::io(&self.path))?;
        file.write_all(line.as_bytes())
            .map_err(StoreError::io(&self.path))?;
        if self.sync {
            file.sync_data().map_err(StoreError::io(&self.path))?;
        }

        // Advance only when nothing else grew the file in between.
        let size = file.metadata().map_err(StoreError::io(&self.path))?.len();
        let advanced = self.cursor().and_then(|cursor| {
            (cursor.bytes + line.len() as u64 == size).then_some(Cursor {
                bytes: size,
                entries: cursor.entries + 1,
            })
        });
        self.set_cursor(advanced);
        debug!(
            spec = %entry.spec_path.display(),
            content = %entry.content_hash.short_hex(),
            "log entry appended"
        );
        Ok(())
    }

    fn cursor(&self) -> Option<Cursor> {
        self.cursor.lock().ok().and_then(|cursor| *cursor)
    }

    fn set_cursor(&self, value: Option<Cursor>) {
        if let Ok(mut cursor) = self.cursor.lock() {
            *cursor = value;
        }
    }

    fn corrupt(&self, line: usize, reason: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            line,
            reason: reason.into(),
        }
    }
}
