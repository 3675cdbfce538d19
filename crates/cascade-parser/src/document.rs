//! Splitting raw spec text into frontmatter and body, and back.

use cascade_types::{Mapping, Value};
use tracing::{debug, warn};

use crate::error::{ParseError, ParseResult};
use crate::frontmatter::{from_yaml, Frontmatter};

const DELIMITER: &str = "---";
const INPUT_OPEN: &str = "<input>";
const INPUT_CLOSE: &str = "</input>";

/// The two halves of a spec document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedContent {
    pub frontmatter: Frontmatter,
    pub body: String,
}

/// Parse raw spec text.
///
/// `identifier` (usually the file path) is only used in error messages.
/// A missing frontmatter block yields an empty [`Frontmatter`]. The only
/// failure is a block that is opened and never closed.
pub fn parse_content(raw: &str, identifier: &str) -> ParseResult<ParsedContent> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let (block, rest) = split_frontmatter(raw, identifier)?;

    let frontmatter = match block {
        Some(text) => parse_block(&text, identifier),
        None => Frontmatter::default(),
    };
    let body = extract_body(&rest);

    debug!(
        identifier,
        fields = frontmatter.to_mapping().len(),
        body_len = body.len(),
        "parsed spec content"
    );
    Ok(ParsedContent { frontmatter, body })
}

/// Serialize frontmatter and body back into spec text.
///
/// The frontmatter block is omitted when there is nothing in it, so
/// `parse_content(serialize_content(fm, body))` reproduces an equivalent
/// `(fm, body)` pair. A body whose first line is itself `---` always gets a
/// block, empty if need be, so it is not read back as an opening delimiter.
pub fn serialize_content(frontmatter: &Frontmatter, body: &str) -> ParseResult<String> {
    let body = body.trim();
    let mut out = String::new();
    if let Some(raw) = &frontmatter.unparsed {
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(raw.trim_end());
        out.push('\n');
        out.push_str(DELIMITER);
        out.push_str("\n\n");
    } else {
        let map = frontmatter.to_mapping();
        if !map.is_empty() {
            let yaml = serde_yaml::to_string(&Value::Mapping(map))
                .map_err(|e| ParseError::Encode(e.to_string()))?;
            out.push_str(DELIMITER);
            out.push('\n');
            out.push_str(&yaml);
            if !yaml.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(DELIMITER);
            out.push_str("\n\n");
        } else if starts_with_delimiter(body) {
            out.push_str(DELIMITER);
            out.push('\n');
            out.push_str(DELIMITER);
            out.push_str("\n\n");
        }
    }
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }
    Ok(out)
}

fn starts_with_delimiter(text: &str) -> bool {
    text.lines()
        .next()
        .is_some_and(|first| first.trim_end() == DELIMITER)
}

/// Returns the frontmatter block text (if any) and the remaining text.
fn split_frontmatter(raw: &str, identifier: &str) -> ParseResult<(Option<String>, String)> {
    if !starts_with_delimiter(raw) {
        return Ok((None, raw.to_string()));
    }
    let mut lines = raw.lines().skip(1);

    let mut block = Vec::new();
    for line in lines.by_ref() {
        if line.trim_end() == DELIMITER {
            let rest: Vec<&str> = lines.collect();
            return Ok((Some(block.join("\n")), rest.join("\n")));
        }
        block.push(line);
    }

    Err(ParseError::UnterminatedFrontmatter {
        identifier: identifier.to_string(),
        opened_at_line: 1,
    })
}

fn parse_block(text: &str, identifier: &str) -> Frontmatter {
    if text.trim().is_empty() {
        return Frontmatter::default();
    }
    match serde_yaml::from_str::<serde_yaml::Value>(text).map(from_yaml) {
        Ok(Value::Mapping(map)) => Frontmatter::from_mapping(map),
        Ok(Value::Null) => Frontmatter::from_mapping(Mapping::new()),
        Ok(other) => {
            warn!(identifier, kind = other.type_name(), "frontmatter is not a mapping; kept verbatim");
            Frontmatter {
                unparsed: Some(text.to_string()),
                ..Frontmatter::default()
            }
        }
        Err(e) => {
            warn!(identifier, error = %e, "frontmatter is not valid YAML; kept verbatim");
            Frontmatter {
                unparsed: Some(text.to_string()),
                ..Frontmatter::default()
            }
        }
    }
}

/// The body is the `<input>` region when one is present and closed,
/// otherwise the whole text. Either way it is trimmed.
fn extract_body(text: &str) -> String {
    if let Some(start) = text.find(INPUT_OPEN) {
        let inner_start = start + INPUT_OPEN.len();
        if let Some(len) = text[inner_start..].find(INPUT_CLOSE) {
            return text[inner_start..inner_start + len].trim().to_string();
        }
    }
    text.trim().to_string()
}
