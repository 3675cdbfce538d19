//! Body text merging.

use crate::strategy::BodyStrategy;

const SEPARATOR: &str = "\n\n";

/// Merge a child body onto its parent under `strategy`.
///
/// If either side is blank after trimming, the other side is returned
/// unchanged whatever the strategy.
pub fn merge_body(parent: &str, child: &str, strategy: BodyStrategy) -> String {
    if child.trim().is_empty() {
        return parent.to_string();
    }
    if parent.trim().is_empty() {
        return child.to_string();
    }
    match strategy {
        BodyStrategy::Replace => child.to_string(),
        BodyStrategy::Prepend => format!("{child}{SEPARATOR}{parent}"),
        BodyStrategy::Append => format!("{parent}{SEPARATOR}{child}"),
    }
}
