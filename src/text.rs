//! Text extraction from loosely shaped content values.
//!
//! Producers disagree on where a block keeps its text (`text`, `text.value`,
//! `value`, `content`). Each place is one strategy; strategies are tried in
//! order and the first string found wins.

use serde_json::Value;

use crate::trace::Content;

type Strategy = fn(&Value) -> Option<&str>;

fn nested_text_value(v: &Value) -> Option<&str> {
    v.get("text")?.get("value")?.as_str()
}

fn text_field(v: &Value) -> Option<&str> {
    v.get("text")?.as_str()
}

fn content_field(v: &Value) -> Option<&str> {
    v.get("content")?.as_str()
}

fn value_field(v: &Value) -> Option<&str> {
    v.get("value")?.as_str()
}

fn bare_string(v: &Value) -> Option<&str> {
    v.as_str()
}

/// Order used for text blocks inside assistant content
const BLOCK_TEXT: &[Strategy] = &[nested_text_value, text_field, content_field, value_field];

/// Order used when flattening arbitrary content arrays
const ITEM_TEXT: &[Strategy] = &[bare_string, text_field, nested_text_value, value_field, content_field];

/// Order used when the whole content is a single object
const OBJECT_TEXT: &[Strategy] = &[text_field, nested_text_value];

fn first_match<'a>(strategies: &[Strategy], value: &'a Value) -> Option<&'a str> {
    strategies.iter().find_map(|strategy| strategy(value))
}

/// Text carried by a `text` block, if any
pub fn block_text(block: &Value) -> Option<&str> {
    first_match(BLOCK_TEXT, block)
}

/// Flatten message content to display text.
///
/// Strings pass through untouched. Arrays contribute one line per item (empty
/// for items without text) and the joined result is trimmed.
pub fn text_from_content(content: &Content) -> String {
    match content {
        Content::Text(s) => s.clone(),
        Content::Blocks(items) => join_lines(items.iter().map(|item| first_match(ITEM_TEXT, item).unwrap_or(""))),
        Content::Other(v @ Value::Object(_)) => first_match(OBJECT_TEXT, v).unwrap_or("").to_string(),
        Content::Other(_) => String::new(),
    }
}

/// Flatten the output of a tool-result block: each item becomes its text, or
/// its JSON form when it has none.
pub fn tool_result_output(content: &Value) -> Value {
    match content {
        Value::Array(items) => {
            let lines: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    _ => match text_field(item) {
                        Some(text) if !text.is_empty() => text.to_string(),
                        _ => item.to_string(),
                    },
                })
                .collect();
            Value::String(lines.join("\n"))
        }
        Value::Null => Value::String(String::new()),
        other => other.clone(),
    }
}

fn join_lines<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join("\n").trim().to_string()
}

/// Truncate to at most `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
