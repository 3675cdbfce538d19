//! Merge engine for Cascade.
//!
//! Pure, deterministic functions that fold a child spec's data onto its
//! parent's. Nothing here performs I/O or fails at merge time: strategy names
//! are validated once, when they are parsed into [`SequenceStrategy`] or
//! [`BodyStrategy`].
//!
//! - [`merge_sequence`] — ordered lists (examples, context references, ...)
//! - [`merge_body`] — free-text instruction bodies
//! - [`merge_mapping`] — frontmatter mappings, recursing into nested maps

pub mod body;
pub mod error;
pub mod mapping;
pub mod sequence;
pub mod strategy;

pub use body::merge_body;
pub use error::{MergeError, MergeResult};
pub use mapping::merge_mapping;
pub use sequence::{merge_sequence, merge_sequence_by_name};
pub use strategy::{BodyStrategy, SequenceStrategy};
