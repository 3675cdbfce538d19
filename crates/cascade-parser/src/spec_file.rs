//! Spec documents bound to their paths.

use std::path::{Path, PathBuf};

use crate::document::{parse_content, ParsedContent};
use crate::error::ParseResult;
use crate::frontmatter::{Example, Frontmatter};

/// File-name suffix that marks a spec document.
pub const SPEC_SUFFIX: &str = ".spec.md";

/// A parsed spec document bound to its path.
///
/// Immutable once constructed: fields are only reachable through accessors.
#[derive(Clone, Debug, PartialEq)]
pub struct SpecFile {
    path: PathBuf,
    frontmatter: Frontmatter,
    body: String,
    examples: Vec<Example>,
}

impl SpecFile {
    /// Parse `raw` as the content of the spec at `path`.
    pub fn parse(path: impl Into<PathBuf>, raw: &str) -> ParseResult<Self> {
        let path = path.into();
        let ParsedContent { frontmatter, body } = parse_content(raw, &path.to_string_lossy())?;
        let examples = frontmatter.examples.clone().unwrap_or_default();
        Ok(Self {
            path,
            frontmatter,
            body,
            examples,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the spec. Empty for bare file names.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn frontmatter(&self) -> &Frontmatter {
        &self.frontmatter
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    /// Path of the artifact generated from this spec.
    ///
    /// An explicit `output` field is resolved against the spec's directory.
    /// Otherwise the `.spec.md` suffix is stripped (`main.rs.spec.md` →
    /// `main.rs`). Returns `None` when neither applies.
    pub fn output_path(&self) -> Option<PathBuf> {
        if let Some(output) = &self.frontmatter.output {
            return Some(self.dir().join(output));
        }
        let name = self.path.file_name()?.to_str()?;
        let stem = name.strip_suffix(SPEC_SUFFIX)?;
        if stem.is_empty() {
            return None;
        }
        Some(self.dir().join(stem))
    }
}
