//! Line diffs built on `similar` (Myers), grouped into hunks with context.

use std::fmt;

use similar::{ChangeTag, TextDiff};

/// Unchanged lines kept around each change.
pub const CONTEXT_LINES: usize = 3;

/// The result of diffing two versions of an artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobDiff {
    /// Header name of the old side (`---` line).
    pub old_label: String,
    /// Header name of the new side (`+++` line).
    pub new_label: String,
    pub hunks: Vec<DiffHunk>,
    /// Total number of lines in the old content.
    pub old_lines: usize,
    /// Total number of lines in the new content.
    pub new_lines: usize,
    /// Set when either side is not UTF-8; hunks then hold a size summary.
    pub binary: bool,
}

impl BlobDiff {
    /// Returns `true` if the two sides are identical.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Replace the header labels.
    pub fn with_labels(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.old_label = old.into();
        self.new_label = new.into();
        self
    }

    pub fn additions(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Added(_)))
    }

    pub fn deletions(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Removed(_)))
    }

    fn count(&self, pred: impl Fn(&DiffLine) -> bool) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| pred(l))
            .count()
    }
}

/// Renders the diff in unified format. Identical sides render as nothing.
impl fmt::Display for BlobDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        if self.binary {
            return writeln!(f, "Binary files {} and {} differ", self.old_label, self.new_label);
        }
        writeln!(f, "--- {}", self.old_label)?;
        writeln!(f, "+++ {}", self.new_label)?;
        for hunk in &self.hunks {
            write!(f, "{hunk}")?;
        }
        Ok(())
    }
}

/// A contiguous region of changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffHunk {
    /// First old line covered (1-based).
    pub old_start: usize,
    pub old_count: usize,
    /// First new line covered (1-based).
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

impl fmt::Display for DiffHunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{} +{} @@",
            unified_range(self.old_start, self.old_count),
            unified_range(self.new_start, self.new_count)
        )?;
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

// An empty range is anchored on the line before it, as in `diff -u`.
fn unified_range(start: usize, count: usize) -> String {
    match count {
        0 => format!("{},0", start.saturating_sub(1)),
        1 => start.to_string(),
        n => format!("{start},{n}"),
    }
}

/// One line of a hunk, without its line terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Added(String),
    Removed(String),
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context(text) => write!(f, " {text}"),
            Self::Added(text) => write!(f, "+{text}"),
            Self::Removed(text) => write!(f, "-{text}"),
        }
    }
}

/// Diff two byte slices.
///
/// Content that is not UTF-8 on either side yields a single summary hunk
/// with `binary` set.
pub fn diff_blobs(old: &[u8], new: &[u8]) -> BlobDiff {
    match (std::str::from_utf8(old), std::str::from_utf8(new)) {
        (Ok(old), Ok(new)) => diff_text(old, new),
        _ if old == new => BlobDiff {
            binary: true,
            ..empty_diff(0, 0)
        },
        _ => binary_diff(old, new),
    }
}

/// Diff two texts line by line.
pub fn diff_text(old: &str, new: &str) -> BlobDiff {
    let old_lines = old.lines().count();
    let new_lines = new.lines().count();
    if old == new {
        return empty_diff(old_lines, new_lines);
    }

    let text_diff = TextDiff::from_lines(old, new);
    let hunks = text_diff
        .grouped_ops(CONTEXT_LINES)
        .iter()
        .filter_map(|group| {
            let first = group.first()?;
            let mut hunk = DiffHunk {
                old_start: first.old_range().start + 1,
                old_count: 0,
                new_start: first.new_range().start + 1,
                new_count: 0,
                lines: Vec::new(),
            };
            for op in group {
                for change in text_diff.iter_changes(op) {
                    let text = change.value().trim_end_matches('\n').to_string();
                    match change.tag() {
                        ChangeTag::Equal => {
                            hunk.old_count += 1;
                            hunk.new_count += 1;
                            hunk.lines.push(DiffLine::Context(text));
                        }
                        ChangeTag::Delete => {
                            hunk.old_count += 1;
                            hunk.lines.push(DiffLine::Removed(text));
                        }
                        ChangeTag::Insert => {
                            hunk.new_count += 1;
                            hunk.lines.push(DiffLine::Added(text));
                        }
                    }
                }
            }
            Some(hunk)
        })
        .collect();

    BlobDiff {
        hunks,
        ..empty_diff(old_lines, new_lines)
    }
}

fn empty_diff(old_lines: usize, new_lines: usize) -> BlobDiff {
    BlobDiff {
        old_label: "a".to_string(),
        new_label: "b".to_string(),
        hunks: Vec::new(),
        old_lines,
        new_lines,
        binary: false,
    }
}

fn binary_diff(old: &[u8], new: &[u8]) -> BlobDiff {
    let mut lines = Vec::new();
    if !old.is_empty() {
        lines.push(DiffLine::Removed(format!("(binary content, {} bytes)", old.len())));
    }
    if !new.is_empty() {
        lines.push(DiffLine::Added(format!("(binary content, {} bytes)", new.len())));
    }
    BlobDiff {
        hunks: vec![DiffHunk {
            old_start: 1,
            old_count: usize::from(!old.is_empty()),
            new_start: 1,
            new_count: usize::from(!new.is_empty()),
            lines,
        }],
        binary: true,
        ..empty_diff(0, 0)
    }
}
