use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cascade_merge::{BodyStrategy, SequenceStrategy};
use serde::{Deserialize, Serialize};

use crate::discovery::{AncestorDiscovery, BaseFileDiscovery, ChainedDiscovery, ExtendsDiscovery};
use crate::error::ConfigError;

/// Conventional per-directory base spec name.
pub const DEFAULT_BASE_FILE: &str = "_base.spec.md";

/// Resolver-wide settings.
///
/// Strategy names are checked while the config is deserialized, so a loaded
/// config can never carry an unknown strategy.
///
/// ```toml
/// body_strategy = "append"
/// examples_strategy = "dedupe"
/// sequence_strategy = "dedupe"
/// workspace_root = "."
///
/// [field_strategies]
/// skills = "replace"
///
/// [discovery]
/// kind = "extends-then-base-file"
/// file_name = "_base.spec.md"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Default body strategy.
    pub body_strategy: BodyStrategy,
    /// Default strategy for the `examples` list.
    pub examples_strategy: SequenceStrategy,
    /// Default strategy for any other list-valued frontmatter field.
    pub sequence_strategy: SequenceStrategy,
    /// Per-field defaults keyed by dotted path (`context`, `tools.allowed`).
    pub field_strategies: BTreeMap<String, SequenceStrategy>,
    /// How ancestors are found.
    pub discovery: DiscoveryConfig,
    /// Ancestors outside this directory end the chain.
    pub workspace_root: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            body_strategy: BodyStrategy::Append,
            examples_strategy: SequenceStrategy::Dedupe,
            sequence_strategy: SequenceStrategy::Dedupe,
            field_strategies: BTreeMap::new(),
            discovery: DiscoveryConfig::default(),
            workspace_root: None,
        }
    }
}

impl ResolverConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Builder-style setter for the workspace boundary.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Default strategy for a list field before per-file declarations apply.
    pub fn strategy_for_field(&self, path: &str) -> SequenceStrategy {
        self.field_strategies
            .get(path)
            .copied()
            .unwrap_or(self.sequence_strategy)
    }
}

/// Which ancestor discovery rule the resolver uses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DiscoveryConfig {
    /// Only explicit `extends:` references.
    Extends,
    /// Only per-directory base files.
    BaseFile { file_name: String },
    /// `extends:` when present, otherwise the nearest base file.
    ExtendsThenBaseFile { file_name: String },
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::ExtendsThenBaseFile {
            file_name: DEFAULT_BASE_FILE.to_string(),
        }
    }
}

impl DiscoveryConfig {
    /// Build the configured rule.
    pub fn build(&self) -> Box<dyn AncestorDiscovery> {
        match self {
            Self::Extends => Box::new(ExtendsDiscovery),
            Self::BaseFile { file_name } => Box::new(BaseFileDiscovery::new(file_name.clone())),
            Self::ExtendsThenBaseFile { file_name } => Box::new(ChainedDiscovery::new(vec![
                Box::new(ExtendsDiscovery),
                Box::new(BaseFileDiscovery::new(file_name.clone())),
            ])),
        }
    }

    /// The base file name, if this rule uses one.
    pub fn base_file_name(&self) -> Option<&str> {
        match self {
            Self::Extends => None,
            Self::BaseFile { file_name } | Self::ExtendsThenBaseFile { file_name } => {
                Some(file_name.as_str())
            }
        }
    }
}
