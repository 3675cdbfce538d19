//! Line-based text diffs for Cascade.
//!
//! Compares two versions of a generated artifact (a stored object against the
//! file on disk, or two stored objects) and renders the result as a unified
//! diff. Diffing is a pure read: nothing here touches the store.
//!
//! # Key Types
//!
//! - [`BlobDiff`] / [`DiffHunk`] / [`DiffLine`] -- structured line diff
//! - [`diff_blobs`] -- compare raw bytes (binary content is summarized)

pub mod text;

pub use text::{diff_blobs, diff_text, BlobDiff, DiffHunk, DiffLine, CONTEXT_LINES};
