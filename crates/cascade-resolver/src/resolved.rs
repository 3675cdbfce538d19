use std::path::Path;

use cascade_parser::{Example, Frontmatter, SpecFile};

/// The result of folding one spec chain.
///
/// Built fresh by the resolver; the [`SpecFile`]s in `chain` are the parsed
/// inputs, untouched by the fold.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    /// Merged frontmatter. Chain directives (`extends`, `merge`) and the
    /// `examples` list are not carried here.
    pub frontmatter: Frontmatter,
    /// Merged body.
    pub body: String,
    /// Merged examples.
    pub examples: Vec<Example>,
    /// Root ancestor first, leaf last. Never empty when built by the resolver.
    pub chain: Vec<SpecFile>,
}

impl ResolvedConfig {
    /// The spec that was resolved.
    pub fn leaf(&self) -> Option<&SpecFile> {
        self.chain.last()
    }

    /// The outermost ancestor (the leaf itself for a one-file chain).
    pub fn root(&self) -> Option<&SpecFile> {
        self.chain.first()
    }

    /// Chain paths, root first.
    pub fn chain_paths(&self) -> Vec<&Path> {
        self.chain.iter().map(SpecFile::path).collect()
    }
}
