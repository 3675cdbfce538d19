//! Cascading resolver for Cascade.
//!
//! Starting from a leaf spec, the resolver follows ancestor references
//! upward (an `extends:` field, or a conventional base file per directory),
//! reverses what it found into a root-first [`SpecChain`](ResolvedConfig::chain),
//! and folds the chain left to right through `cascade-merge`.
//!
//! # Modules
//!
//! - [`source`] — where spec text comes from ([`FsSource`], [`InMemorySource`])
//! - [`discovery`] — how an ancestor is found ([`AncestorDiscovery`])
//! - [`config`] — [`ResolverConfig`], loadable from TOML
//! - [`resolver`] — [`Resolver`] and the fold
//! - [`resolved`] — the [`ResolvedConfig`] output

pub mod config;
pub mod discovery;
pub mod error;
pub mod path;
pub mod resolved;
pub mod resolver;
pub mod source;

pub use config::{DiscoveryConfig, ResolverConfig, DEFAULT_BASE_FILE};
pub use discovery::{
    AncestorDiscovery, BaseFileDiscovery, ChainedDiscovery, ExtendsDiscovery, MappedDiscovery,
};
pub use error::{ChainError, ChainResult, ConfigError};
pub use resolved::ResolvedConfig;
pub use resolver::Resolver;
pub use source::{FsSource, InMemorySource, SpecSource};
