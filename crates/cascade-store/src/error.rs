use std::io;
use std::path::PathBuf;

use cascade_types::ObjectId;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying read or write failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A log entry (or a diff request) names an object the store does not hold.
    #[error("{field} references missing object {id}")]
    MissingObject { field: &'static str, id: ObjectId },

    /// The provenance log cannot be read back. Nothing is repaired.
    #[error("corrupt log {} at line {line}: {reason}", path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A stored object's bytes no longer hash to its address.
    #[error("object {id} does not match its content hash")]
    ObjectCorrupt { id: ObjectId },

    /// No store has been initialized under this root.
    #[error("no store initialized at {}", root.display())]
    NotInitialized { root: PathBuf },

    /// The store's config file is present but invalid.
    #[error("invalid store config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
