//! Spec document parser for Cascade.
//!
//! A spec document is UTF-8 text with an optional leading YAML frontmatter
//! block delimited by `---` lines, followed by free-text instructions that
//! may contain one `<input>` … `</input>` region.
//!
//! ```text
//! ---
//! extends: ../_base.spec.md
//! context: src/lib.rs
//! examples:
//!   - input: "2 + 2"
//!     output: "4"
//! ---
//! Write a calculator.
//! ```
//!
//! # Key Types
//!
//! - [`ParsedContent`] — `{frontmatter, body}` produced by [`parse_content`]
//! - [`Frontmatter`] — strongly typed known fields plus opaque extras
//! - [`Example`] — one entry of an `examples` list
//! - [`SpecFile`] — a parsed document bound to its path

pub mod document;
pub mod error;
pub mod frontmatter;
pub mod spec_file;

pub use document::{parse_content, serialize_content, ParsedContent};
pub use error::{ParseError, ParseResult};
pub use frontmatter::{Example, Frontmatter};
pub use spec_file::{SpecFile, SPEC_SUFFIX};
