//! Content-addressed artifact store for Cascade.
//!
//! Every generated artifact, and the spec it was generated from, is stored as
//! an immutable object addressed by its BLAKE3 digest. Each generation event
//! is recorded as one line of an append-only provenance log.
//!
//! ```text
//! <root>/.cascade/
//!     config.toml       per-store settings, fixed at init
//!     log.jsonl         provenance log, one JSON entry per line
//!     objects/ab/cdef…  loose objects, fanned out by the first hash byte
//! ```
//!
//! # Design Rules
//!
//! 1. Objects are immutable; writing existing content is a no-op.
//! 2. Objects are published by atomic rename, never partially visible.
//! 3. A log entry is appended only after both objects it names exist.
//! 4. The log is never rewritten. A log that cannot be read back is an
//!    error, not something to repair.
//! 5. The store does not lock. Writers must be serialized by the caller.

pub mod config;
pub mod error;
pub mod fs;
pub mod log;
pub mod status;
pub mod store;

pub use config::{StoreConfig, STORE_DIR};
pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use log::{LogEntry, ProvenanceLog, TokenUsage};
pub use status::{DanglingRef, SpecStatus, VerifyReport};
pub use store::{default_output_path, Store};
