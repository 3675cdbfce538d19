//! Lexical path handling shared by sources and discovery rules.

use std::path::{Component, Path, PathBuf};

/// Normalize a path without touching the filesystem.
///
/// Removes `.` components and folds `name/..` pairs. Leading `..` components
/// of a relative path are kept. Two spellings of the same file normalize to
/// the same value, which is what cycle detection keys on.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Returns `true` if `path` lies inside `root` (both normalized first).
pub fn is_within(path: &Path, root: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}
