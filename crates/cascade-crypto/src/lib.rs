//! Content hashing for Cascade.
//!
//! Wraps BLAKE3 with a domain tag so that object addresses are stable across
//! releases and cannot collide with digests computed for other purposes.
//! No custom cryptography lives here.

pub mod hasher;

pub use hasher::{normalize_line_endings, ContentHasher};
