use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// How a child's sequence is combined with its parent's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SequenceStrategy {
    /// Child only.
    Replace,
    /// Child, then parent.
    Prepend,
    /// Parent, then child.
    #[default]
    Concatenate,
    /// Union in first-seen order, scanning parent then child.
    Dedupe,
    /// Concatenation keeping only the last occurrence of each value.
    DedupeLast,
}

impl SequenceStrategy {
    const NAMES: &'static str = "replace, prepend, concatenate, dedupe, dedupe-last";

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Prepend => "prepend",
            Self::Concatenate => "concatenate",
            Self::Dedupe => "dedupe",
            Self::DedupeLast => "dedupe-last",
        }
    }
}

impl FromStr for SequenceStrategy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "replace" => Ok(Self::Replace),
            "prepend" => Ok(Self::Prepend),
            "concatenate" => Ok(Self::Concatenate),
            "dedupe" => Ok(Self::Dedupe),
            "dedupe-last" => Ok(Self::DedupeLast),
            other => Err(MergeError::UnknownStrategy {
                name: other.to_string(),
                expected: Self::NAMES,
            }),
        }
    }
}

impl TryFrom<String> for SequenceStrategy {
    type Error = MergeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SequenceStrategy> for String {
    fn from(s: SequenceStrategy) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for SequenceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a child's body text is combined with its parent's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BodyStrategy {
    /// Child only.
    Replace,
    /// Child, blank line, parent.
    Prepend,
    /// Parent, blank line, child.
    #[default]
    Append,
}

impl BodyStrategy {
    const NAMES: &'static str = "replace, prepend, append";

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Prepend => "prepend",
            Self::Append => "append",
        }
    }
}

impl FromStr for BodyStrategy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "replace" => Ok(Self::Replace),
            "prepend" => Ok(Self::Prepend),
            "append" => Ok(Self::Append),
            other => Err(MergeError::UnknownStrategy {
                name: other.to_string(),
                expected: Self::NAMES,
            }),
        }
    }
}

impl TryFrom<String> for BodyStrategy {
    type Error = MergeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BodyStrategy> for String {
    fn from(s: BodyStrategy) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for BodyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
