//! Typed view over one content block.
//!
//! Blocks stay as raw JSON inside `Content::Blocks` so nothing is lost; this
//! borrows into them and classifies by `type` (or `role`, which some SDKs use
//! instead).

use serde_json::Value;

/// Inline placeholders Claude Code leaves in text when an image was pasted
const IMAGE_PLACEHOLDERS: &[&str] = &["[Image #", "[Image:"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Block<'a> {
    Text(&'a Value),
    Thinking(&'a Value),
    ToolUse(&'a Value),
    ToolResult(&'a Value),
    Image(&'a Value),
    Unknown(&'a Value),
}

impl<'a> Block<'a> {
    pub fn classify(value: &'a Value) -> Self {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .or_else(|| value.get("role").and_then(Value::as_str));

        match tag {
            Some("text") => Block::Text(value),
            Some("thinking") => Block::Thinking(value),
            Some("tool_use") => Block::ToolUse(value),
            Some("tool_result") => Block::ToolResult(value),
            Some("image") => Block::Image(value),
            _ => Block::Unknown(value),
        }
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, Block::ToolResult(_))
    }

    /// Image block, or a text block that points at an inlined image
    pub fn carries_image(&self) -> bool {
        match self {
            Block::Image(_) => true,
            Block::Text(v) => v
                .get("text")
                .and_then(Value::as_str)
                .is_some_and(|t| IMAGE_PLACEHOLDERS.iter().any(|p| t.contains(p))),
            _ => false,
        }
    }
}

/// Non-empty string field of a block
pub fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Field that is present and not null
pub fn present_field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_by_type_or_role() {
        let text = json!({"type": "text", "text": "hi"});
        assert!(matches!(Block::classify(&text), Block::Text(_)));

        let by_role = json!({"role": "text", "content": "hi"});
        assert!(matches!(Block::classify(&by_role), Block::Text(_)));

        let odd = json!({"type": "server_tool_use"});
        assert!(matches!(Block::classify(&odd), Block::Unknown(_)));

        let scalar = json!("loose string");
        assert!(matches!(Block::classify(&scalar), Block::Unknown(_)));
    }

    #[test]
    fn test_carries_image() {
        let image = json!({"type": "image", "source": {"type": "base64", "data": "AAAA"}});
        assert!(Block::classify(&image).carries_image());

        let placeholder = json!({"type": "text", "text": "look at [Image #1] please"});
        assert!(Block::classify(&placeholder).carries_image());

        let plain = json!({"type": "text", "text": "no pictures"});
        assert!(!Block::classify(&plain).carries_image());
    }

    #[test]
    fn test_field_helpers() {
        let v = json!({"id": "", "name": "Read", "input": null});
        assert_eq!(str_field(&v, "id"), None);
        assert_eq!(str_field(&v, "name"), Some("Read"));
        assert_eq!(present_field(&v, "input"), None);
    }
}
