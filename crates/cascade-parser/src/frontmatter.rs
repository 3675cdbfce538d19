//! Frontmatter model: strongly typed known fields plus opaque extras.

use std::collections::BTreeMap;

use cascade_types::{Mapping, Value};

/// Field holding the path of the spec this one extends.
pub const EXTENDS: &str = "extends";
/// Field holding context file references (one or many).
pub const CONTEXT: &str = "context";
/// Field holding skill references (one or many).
pub const SKILLS: &str = "skills";
/// Field holding input/output examples.
pub const EXAMPLES: &str = "examples";
/// Field holding per-field merge strategy names for this file.
pub const MERGE: &str = "merge";
/// Field holding an explicit output path.
pub const OUTPUT: &str = "output";

/// One entry of an `examples` list.
#[derive(Clone, Debug, PartialEq)]
pub enum Example {
    /// An input/output pair.
    Pair { input: String, output: String },
    /// A bare reference (an example name or file path).
    Reference(String),
    /// Anything else, kept verbatim.
    Other(Value),
}

impl Example {
    /// Classify a raw value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Reference(s),
            Value::Mapping(map) => match pair_fields(&map) {
                Some((input, output)) => Self::Pair { input, output },
                None => Self::Other(Value::Mapping(map)),
            },
            other => Self::Other(other),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Pair { input, output } => {
                let mut map = Mapping::new();
                map.insert("input".into(), Value::from(input.as_str()));
                map.insert("output".into(), Value::from(output.as_str()));
                Value::Mapping(map)
            }
            Self::Reference(s) => Value::from(s.as_str()),
            Self::Other(v) => v.clone(),
        }
    }
}

fn pair_fields(map: &Mapping) -> Option<(String, String)> {
    if map.len() != 2 {
        return None;
    }
    let input = map.get("input")?.as_str()?;
    let output = map.get("output")?.as_str()?;
    Some((input.to_string(), output.to_string()))
}

/// Parsed frontmatter of a spec document.
///
/// Known fields get strong types. A known field holding a value of the wrong
/// shape (for example `extends: 3`) is not an error: it stays in `extra`
/// untouched, like any unknown field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frontmatter {
    pub extends: Option<String>,
    /// Normalized: a bare string becomes a one-element list.
    pub context: Option<Vec<String>>,
    /// Normalized: a bare string becomes a one-element list.
    pub skills: Option<Vec<String>>,
    /// Normalized: a single item becomes a one-element list.
    pub examples: Option<Vec<Example>>,
    /// Field name to strategy name. Names are validated by the resolver.
    pub merge: Option<BTreeMap<String, String>>,
    pub output: Option<String>,
    /// Every other field, preserved for round-tripping.
    pub extra: Mapping,
    /// Raw block text when the block is not a YAML mapping.
    pub unparsed: Option<String>,
}

impl Frontmatter {
    /// Returns `true` if there is nothing to serialize.
    pub fn is_empty(&self) -> bool {
        self.unparsed.is_none() && self.to_mapping().is_empty()
    }

    /// Split a mapping into known fields and extras.
    pub fn from_mapping(mut map: Mapping) -> Self {
        let mut fm = Self::default();

        if let Some(Value::String(_)) = map.get(EXTENDS) {
            fm.extends = map.remove(EXTENDS).and_then(|v| v.as_str().map(str::to_string));
        }
        fm.context = take_string_list(&mut map, CONTEXT);
        fm.skills = take_string_list(&mut map, SKILLS);

        if matches!(map.get(EXAMPLES), Some(v) if !v.is_null()) {
            fm.examples = map
                .remove(EXAMPLES)
                .map(|v| v.into_sequence().into_iter().map(Example::from_value).collect());
        }

        if let Some(Value::Mapping(m)) = map.get(MERGE) {
            if m.values().all(|v| v.as_str().is_some()) {
                fm.merge = Some(
                    m.iter()
                        .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                        .collect(),
                );
                map.remove(MERGE);
            }
        }

        if let Some(Value::String(_)) = map.get(OUTPUT) {
            fm.output = map.remove(OUTPUT).and_then(|v| v.as_str().map(str::to_string));
        }

        fm.extra = map;
        fm
    }

    /// Rebuild the full mapping (known fields plus extras).
    pub fn to_mapping(&self) -> Mapping {
        let mut map = self.extra.clone();
        if let Some(extends) = &self.extends {
            map.insert(EXTENDS.into(), Value::from(extends.as_str()));
        }
        if let Some(context) = &self.context {
            map.insert(CONTEXT.into(), string_list(context));
        }
        if let Some(skills) = &self.skills {
            map.insert(SKILLS.into(), string_list(skills));
        }
        if let Some(examples) = &self.examples {
            map.insert(
                EXAMPLES.into(),
                Value::Sequence(examples.iter().map(Example::to_value).collect()),
            );
        }
        if let Some(merge) = &self.merge {
            map.insert(
                MERGE.into(),
                Value::Mapping(
                    merge
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                        .collect(),
                ),
            );
        }
        if let Some(output) = &self.output {
            map.insert(OUTPUT.into(), Value::from(output.as_str()));
        }
        map
    }

    /// Look up any field by name, known or extra.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.to_mapping().remove(key)
    }
}

fn take_string_list(map: &mut Mapping, key: &str) -> Option<Vec<String>> {
    let list: Vec<String> = match map.get(key)? {
        Value::String(s) => vec![s.clone()],
        Value::Sequence(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()?,
        _ => return None,
    };
    map.remove(key);
    Some(list)
}

fn string_list(items: &[String]) -> Value {
    Value::Sequence(items.iter().map(|s| Value::from(s.as_str())).collect())
}

/// Convert a YAML document into a [`Value`].
///
/// Non-string mapping keys are stringified; YAML tags are dropped and their
/// inner value kept.
pub(crate) fn from_yaml(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Y;
    match value {
        Y::Null => Value::Null,
        Y::Bool(b) => Value::Bool(b),
        Y::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Y::String(s) => Value::String(s),
        Y::Sequence(items) => Value::Sequence(items.into_iter().map(from_yaml).collect()),
        Y::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (yaml_key(k), from_yaml(v)))
                .collect(),
        ),
        Y::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match from_yaml(key) {
        Value::String(s) => s,
        other => other.to_string(),
    }
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

    #[test]
    fn scalar_context_becomes_list() {
        let fm = Frontmatter::from_mapping(map(&[(CONTEXT, "src/lib.rs".into())]));
        assert_eq!(fm.context, Some(vec!["src/lib.rs".to_string()]));
        assert!(fm.extra.is_empty());
    }

    #[test]
    fn absent_list_fields_stay_absent() {
        let fm = Frontmatter::from_mapping(Mapping::new());
        assert_eq!(fm.context, None);
        assert_eq!(fm.skills, None);
        assert_eq!(fm.examples, None);
    }

    #[test]
    fn wrong_typed_known_field_is_kept_as_extra() {
        let fm = Frontmatter::from_mapping(map(&[
            (EXTENDS, Value::Integer(3)),
            (SKILLS, Value::Sequence(vec!["a".into(), Value::Integer(1)])),
        ]));
        assert_eq!(fm.extends, None);
        assert_eq!(fm.skills, None);
        assert_eq!(fm.extra[EXTENDS], Value::Integer(3));
        assert!(fm.extra.contains_key(SKILLS));
    }

    #[test]
    fn examples_are_classified() {
        let pair = Value::Mapping(map(&[("input", "1".into()), ("output", "2".into())]));
        let odd = Value::Mapping(map(&[("input", "1".into())]));
        let fm = Frontmatter::from_mapping(map(&[(
            EXAMPLES,
            Value::Sequence(vec!["e1".into(), pair, odd.clone(), Value::Integer(7)]),
        )]));
        let examples = fm.examples.unwrap();
        assert_eq!(examples[0], Example::Reference("e1".into()));
        assert_eq!(
            examples[1],
            Example::Pair {
                input: "1".into(),
                output: "2".into()
            }
        );
        assert_eq!(examples[2], Example::Other(odd));
        assert_eq!(examples[3], Example::Other(Value::Integer(7)));
    }

    #[test]
    fn single_example_is_normalized() {
        let fm = Frontmatter::from_mapping(map(&[(EXAMPLES, "only".into())]));
        assert_eq!(fm.examples, Some(vec![Example::Reference("only".into())]));
    }

    #[test]
    fn merge_declarations_are_read_as_names() {
        let decl = Value::Mapping(map(&[("body", "replace".into()), ("examples", "dedupe".into())]));
        let fm = Frontmatter::from_mapping(map(&[(MERGE, decl)]));
        let merge = fm.merge.unwrap();
        assert_eq!(merge["body"], "replace");
        assert_eq!(merge["examples"], "dedupe");
    }

    #[test]
    fn to_mapping_restores_fields() {
        let original = map(&[
            (EXTENDS, "../base.spec.md".into()),
            (CONTEXT, Value::Sequence(vec!["a".into(), "b".into()])),
            (OUTPUT, "out.rs".into()),
            ("model", "large".into()),
        ]);
        let fm = Frontmatter::from_mapping(original.clone());
        assert_eq!(fm.to_mapping(), original);
        assert_eq!(fm.get("model"), Some(Value::from("large")));
    }

    #[test]
    fn yaml_numbers_and_keys_convert() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("1: one\nratio: 0.25\nn: 4\n").unwrap();
        let value = from_yaml(yaml);
        let m = value.as_mapping().unwrap();
        assert_eq!(m["1"], Value::from("one"));
        assert_eq!(m["ratio"], Value::Float(0.25));
        assert_eq!(m["n"], Value::Integer(4));
    }
}
