//! High-level SDK for Cascade.
//!
//! Ties the resolver and the artifact store to one workspace root. This is
//! the entry point for tools that build prompts from resolved specs and
//! record what was generated.

pub mod cascade;
pub mod error;
pub mod generation;

pub use cascade::{Cascade, CONFIG_FILE};
pub use error::{SdkError, SdkResult};
pub use generation::{GenerationRecord, GenerationResult};

// Re-export key types
pub use cascade_resolver::{ResolvedConfig, ResolverConfig};
pub use cascade_store::{LogEntry, SpecStatus, StoreConfig, TokenUsage, VerifyReport};
pub use cascade_types::ObjectId;
