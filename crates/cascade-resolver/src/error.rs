//! Error types for the resolver crate.

use std::io;
use std::path::PathBuf;

use cascade_merge::MergeError;
use cascade_parser::ParseError;

/// Errors raised while building or folding one spec chain.
///
/// A `ChainError` is scoped to the leaf being resolved; it never affects
/// other leaves.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// A spec is reachable from itself through ancestor references.
    #[error("ancestor cycle at {}: {}", path.display(), render_chain(chain))]
    Cycle { path: PathBuf, chain: Vec<PathBuf> },

    /// A referenced ancestor does not exist.
    #[error("{} references missing ancestor {}", referenced_by.display(), path.display())]
    MissingAncestor { path: PathBuf, referenced_by: PathBuf },

    /// A spec in the chain could not be read.
    #[error("cannot read spec {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A spec in the chain could not be parsed.
    #[error("cannot parse spec {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// A spec declares an unknown merge strategy for one of its fields.
    #[error("{}: invalid merge strategy for field {field:?}: {source}", path.display())]
    InvalidStrategy {
        path: PathBuf,
        field: String,
        #[source]
        source: MergeError,
    },

    /// A spec's `merge` value is not a mapping of field names to strategy
    /// names.
    #[error("{}: malformed merge declaration: {reason}", path.display())]
    MalformedMerge { path: PathBuf, reason: String },
}

fn render_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Convenience alias for resolver results.
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors loading a [`ResolverConfig`](crate::ResolverConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid resolver config: {0}")]
    Parse(#[from] toml::de::Error),
}
