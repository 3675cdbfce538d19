//! Ancestor discovery rules.
//!
//! A rule answers one question: which spec does this spec cascade from?
//! Returning `None` ends the chain. Rules never fail; a returned path that
//! does not exist is reported by the resolver as a missing ancestor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cascade_parser::SpecFile;

use crate::path::normalize;
use crate::source::SpecSource;

/// Capability for locating a spec's ancestor.
pub trait AncestorDiscovery: Send + Sync {
    fn ancestor_of(&self, spec: &SpecFile, source: &dyn SpecSource) -> Option<PathBuf>;
}

/// Follows the `extends:` field, resolved relative to the spec's directory.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExtendsDiscovery;

impl AncestorDiscovery for ExtendsDiscovery {
    fn ancestor_of(&self, spec: &SpecFile, _source: &dyn SpecSource) -> Option<PathBuf> {
        let extends = spec.frontmatter().extends.as_deref()?;
        Some(normalize(&spec.dir().join(extends)))
    }
}

/// Uses a conventional base file name per directory.
///
/// A regular spec cascades from the base file in its own directory. A base
/// file cascades from the nearest base file in an enclosing directory. Only
/// existing files are returned.
#[derive(Clone, Debug)]
pub struct BaseFileDiscovery {
    file_name: String,
}

impl BaseFileDiscovery {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    fn is_base(&self, path: &Path) -> bool {
        path.file_name().and_then(|n| n.to_str()) == Some(self.file_name.as_str())
    }
}

impl AncestorDiscovery for BaseFileDiscovery {
    fn ancestor_of(&self, spec: &SpecFile, source: &dyn SpecSource) -> Option<PathBuf> {
        let dir = normalize(spec.dir());
        let mut search: Option<&Path> = if self.is_base(spec.path()) {
            dir.parent()
        } else {
            Some(dir.as_path())
        };
        while let Some(current) = search {
            let candidate = current.join(&self.file_name);
            if source.is_file(&candidate) {
                return Some(candidate);
            }
            search = current.parent();
        }
        None
    }
}

/// Tries each rule in order and returns the first answer.
pub struct ChainedDiscovery {
    rules: Vec<Box<dyn AncestorDiscovery>>,
}

impl ChainedDiscovery {
    pub fn new(rules: Vec<Box<dyn AncestorDiscovery>>) -> Self {
        Self { rules }
    }
}

impl AncestorDiscovery for ChainedDiscovery {
    fn ancestor_of(&self, spec: &SpecFile, source: &dyn SpecSource) -> Option<PathBuf> {
        self.rules
            .iter()
            .find_map(|rule| rule.ancestor_of(spec, source))
    }
}

/// Explicit child → ancestor table, for tests and callers that compute
/// ancestry elsewhere.
#[derive(Clone, Debug, Default)]
pub struct MappedDiscovery {
    parents: HashMap<PathBuf, PathBuf>,
}

impl MappedDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(mut self, child: impl AsRef<Path>, parent: impl AsRef<Path>) -> Self {
        self.parents
            .insert(normalize(child.as_ref()), normalize(parent.as_ref()));
        self
    }
}

impl AncestorDiscovery for MappedDiscovery {
    fn ancestor_of(&self, spec: &SpecFile, _source: &dyn SpecSource) -> Option<PathBuf> {
        self.parents.get(&normalize(spec.path())).cloned()
    }
}
