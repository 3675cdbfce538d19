//! Frontmatter mapping merging.

use cascade_types::{Mapping, Value};

use crate::sequence::merge_sequence;
use crate::strategy::SequenceStrategy;

/// Deep-merge a child mapping onto its parent.
///
/// - keys only in the parent are kept;
/// - mapping on both sides: merged recursively;
/// - sequence on both sides: merged with the strategy `strategy_for` returns
///   for the key's dotted path (`"context"`, `"tools.allowed"`);
/// - anything else: the child's value wins.
pub fn merge_mapping<F>(parent: &Mapping, child: &Mapping, strategy_for: F) -> Mapping
where
    F: Fn(&str) -> SequenceStrategy,
{
    merge_at(parent, child, "", &strategy_for)
}

fn merge_at<F>(parent: &Mapping, child: &Mapping, prefix: &str, strategy_for: &F) -> Mapping
where
    F: Fn(&str) -> SequenceStrategy,
{
    let mut out = parent.clone();
    for (key, child_value) in child {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let merged = match (parent.get(key), child_value) {
            (Some(Value::Mapping(p)), Value::Mapping(c)) => {
                Value::Mapping(merge_at(p, c, &path, strategy_for))
            }
            (Some(Value::Sequence(p)), Value::Sequence(c)) => {
                Value::Sequence(merge_sequence(p, c, strategy_for(&path)))
            }
            _ => child_value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, Value)]) -> Mapping {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn seq(items: &[&str]) -> Value {
        Value::Sequence(items.iter().map(|i| Value::from(*i)).collect())
    }

    #[test]
    fn child_scalar_wins() {
        let parent = map(&[("model", "small".into()), ("temp", Value::Integer(1))]);
        let child = map(&[("model", "large".into())]);
        let out = merge_mapping(&parent, &child, |_| SequenceStrategy::Concatenate);
        assert_eq!(out["model"], Value::from("large"));
        assert_eq!(out["temp"], Value::Integer(1));
    }

    #[test]
    fn sequences_use_field_strategy() {
        let parent = map(&[("context", seq(&["a", "b"])), ("skills", seq(&["x"]))]);
        let child = map(&[("context", seq(&["b", "c"])), ("skills", seq(&["y"]))]);
        let out = merge_mapping(&parent, &child, |path| match path {
            "context" => SequenceStrategy::Dedupe,
            _ => SequenceStrategy::Replace,
        });
        assert_eq!(out["context"], seq(&["a", "b", "c"]));
        assert_eq!(out["skills"], seq(&["y"]));
    }

    #[test]
    fn nested_mappings_merge_with_dotted_paths() {
        let parent = map(&[(
            "tools",
            Value::Mapping(map(&[("allowed", seq(&["read"])), ("mode", "safe".into())])),
        )]);
        let child = map(&[(
            "tools",
            Value::Mapping(map(&[("allowed", seq(&["write"]))])),
        )]);
        let out = merge_mapping(&parent, &child, |path| {
            assert_eq!(path, "tools.allowed");
            SequenceStrategy::Concatenate
        });
        let tools = out["tools"].as_mapping().unwrap();
        assert_eq!(tools["allowed"], seq(&["read", "write"]));
        assert_eq!(tools["mode"], Value::from("safe"));
    }

    #[test]
    fn type_change_takes_child_value() {
        let parent = map(&[("context", seq(&["a"]))]);
        let child = map(&[("context", "b".into())]);
        let out = merge_mapping(&parent, &child, |_| SequenceStrategy::Concatenate);
        assert_eq!(out["context"], Value::from("b"));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let parent = map(&[("a", seq(&["1"]))]);
        let child = map(&[("a", seq(&["2"]))]);
        let before = parent.clone();
        let _ = merge_mapping(&parent, &child, |_| SequenceStrategy::Concatenate);
        assert_eq!(parent, before);
    }
}
