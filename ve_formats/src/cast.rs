//! Text-to-value coercion for `.ve.xml` element content.
//!
//! The editor stores every scalar as element text with no type annotation, so
//! values are coerced best-effort: integer, then float, then the literal
//! booleans, falling back to the raw string.

use std::fmt;

use roxmltree::Node;
use serde::Serialize;

use crate::error::{EventError, Result};

/// Tag wrapping a single id inside link containers (`<OutputIDs>`, `<VariableIDs>`).
pub const LINKED_ID_TAG: &str = "unsignedInt";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Interprets the value as a flag; `1`/`0` are accepted next to the booleans.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }
}

/// Renders the value the way it should appear inside generated Python.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            // Debug keeps the trailing `.0` on integral floats, like Python's repr.
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

pub fn coerce_text(text: &str) -> Value {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int(i);
    }
    // Integers beyond i64 stay textual rather than losing precision as floats.
    if is_integer_literal(trimmed) {
        return Value::Str(trimmed.to_string());
    }
    if let Ok(x) = trimmed.parse::<f64>() {
        return Value::Float(x);
    }
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Str(text.to_string()),
    }
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// First element child of `elem` named `tag`.
pub fn child<'a, 'input>(elem: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    elem.children()
        .find(|node| node.is_element() && node.has_tag_name(tag))
}

pub fn element_children<'a, 'input>(
    elem: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    elem.children().filter(|node| node.is_element())
}

/// Coerced text of `elem`; an element without text yields `default` or fails.
pub fn element_text(elem: Node<'_, '_>, default: Option<Value>) -> Result<Value> {
    match elem.text() {
        Some(text) => Ok(coerce_text(text)),
        None => default.ok_or_else(|| {
            EventError::MissingContent(format!("<{}> has no text", elem.tag_name().name()))
        }),
    }
}

pub fn read_child_text(elem: Node<'_, '_>, tag: &str, default: Option<Value>) -> Result<Value> {
    match child(elem, tag) {
        Some(node) => element_text(node, default),
        None => default.ok_or_else(|| {
            EventError::MissingContent(format!(
                "<{}> has no <{tag}> child",
                elem.tag_name().name()
            ))
        }),
    }
}

/// Coerced texts of all children carrying one of `tags`, grouped by tag order.
pub fn read_children_texts(elem: Node<'_, '_>, tags: &[&str]) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    for tag in tags {
        for node in element_children(elem).filter(|node| node.has_tag_name(*tag)) {
            values.push(element_text(node, None)?);
        }
    }
    Ok(values)
}

/// Reads `<Min>`/`<Max>` children.
pub fn extract_range(elem: Node<'_, '_>) -> Result<(Value, Value)> {
    let min = read_child_text(elem, "Min", None)?;
    let max = read_child_text(elem, "Max", None)?;
    Ok((min, max))
}

/// Reads `<Coords><X/><Y/></Coords>`.
pub fn extract_coords(elem: Node<'_, '_>) -> Result<(Value, Value)> {
    let coords = child(elem, "Coords").ok_or_else(|| {
        EventError::MissingContent(format!("<{}> has no <Coords>", elem.tag_name().name()))
    })?;
    let x = read_child_text(coords, "X", None)?;
    let y = read_child_text(coords, "Y", None)?;
    Ok((x, y))
}

/// Reads the id nested in `<container_tag><unsignedInt>n</unsignedInt></container_tag>`.
///
/// An absent or empty container means "not linked".
pub fn extract_linked_id(elem: Node<'_, '_>, container_tag: &str) -> Result<Option<u32>> {
    let Some(container) = child(elem, container_tag) else {
        return Ok(None);
    };
    let Some(id_elem) = child(container, LINKED_ID_TAG) else {
        return Ok(None);
    };
    element_text(id_elem, None)
        .and_then(|value| to_id(&value))
        .map(Some)
}

pub fn to_id(value: &Value) -> Result<u32> {
    value
        .as_int()
        .and_then(|i| u32::try_from(i).ok())
        .ok_or_else(|| EventError::MissingContent(format!("'{value}' is not a valid id")))
}
