//! Error types for the merge crate.

/// Errors raised while loading merge configuration.
///
/// Merging itself never fails; only turning a name into a strategy can.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("unknown merge strategy {name:?} (expected one of: {expected})")]
    UnknownStrategy { name: String, expected: &'static str },
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
