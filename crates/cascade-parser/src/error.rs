//! Error types for the parser crate.

/// Errors produced while parsing or serializing spec documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The frontmatter block was opened but never closed.
    #[error("{identifier}: frontmatter opened at line {opened_at_line} is never closed")]
    UnterminatedFrontmatter {
        identifier: String,
        opened_at_line: usize,
    },

    /// The frontmatter could not be encoded back to YAML.
    #[error("failed to encode frontmatter: {0}")]
    Encode(String),
}

/// Convenience alias for parser results.
pub type ParseResult<T> = Result<T, ParseError>;
