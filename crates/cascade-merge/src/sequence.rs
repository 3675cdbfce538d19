//! Ordered-sequence merging.

use crate::strategy::SequenceStrategy;

/// Merge a child sequence onto its parent under `strategy`.
///
/// Equality is `PartialEq`, so values without a hash (floats, nested
/// mappings) dedupe correctly. Sequences in spec chains are short; the
/// quadratic scan is not a concern.
pub fn merge_sequence<T: Clone + PartialEq>(
    parent: &[T],
    child: &[T],
    strategy: SequenceStrategy,
) -> Vec<T> {
    match strategy {
        SequenceStrategy::Replace => child.to_vec(),
        SequenceStrategy::Prepend => child.iter().chain(parent).cloned().collect(),
        SequenceStrategy::Concatenate => parent.iter().chain(child).cloned().collect(),
        SequenceStrategy::Dedupe => first_occurrences(parent.iter().chain(child)),
        SequenceStrategy::DedupeLast => {
            let mut kept = first_occurrences(parent.iter().chain(child).rev());
            kept.reverse();
            kept
        }
    }
}

/// String-keyed entry point for callers that have not validated a strategy.
///
/// Unrecognized names fall back to [`SequenceStrategy::Concatenate`].
/// Configuration loaders should parse names up front instead of relying on
/// this.
pub fn merge_sequence_by_name<T: Clone + PartialEq>(parent: &[T], child: &[T], name: &str) -> Vec<T> {
    let strategy = name.parse().unwrap_or(SequenceStrategy::Concatenate);
    merge_sequence(parent, child, strategy)
}

fn first_occurrences<'a, T, I>(items: I) -> Vec<T>
where
    T: Clone + PartialEq + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
