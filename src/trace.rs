//! Normalized trace types shared by the pipeline and everything that consumes it.
//!
//! The thread store, the renderer registry and the HTTP shell only ever see
//! `TraceData`; raw records never leave the pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// `object` marker carried by OpenAI streaming deltas
pub const STREAMING_CHUNK_OBJECT: &str = "chat.completion.chunk";

/// Speaker of a message. Unknown roles are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            _ => Role::Other(s),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Role::from(s.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// Message content: a plain string, a sequence of blocks, or whatever else
/// the producer put there (null when absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Blocks(Vec<Value>),
    Other(Value),
}

impl Default for Content {
    fn default() -> Self {
        Content::Other(Value::Null)
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Content::Text(s),
            Value::Array(items) => Content::Blocks(items),
            other => Content::Other(other),
        }
    }
}

impl Content {
    pub fn blocks(&self) -> Option<&[Value]> {
        match self {
            Content::Blocks(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Content::Other(Value::Null))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Content::Text(s) => Value::String(s.clone()),
            Content::Blocks(items) => Value::Array(items.clone()),
            Content::Other(v) => v.clone(),
        }
    }
}

/// A message after reconstruction, regardless of which schema it came from.
///
/// Known fields are lifted out when they have the expected JSON type. Anything
/// else (unknown keys, or known keys holding an unexpected type) stays in
/// `extra` so the message serializes back without loss.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniformMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Content::is_absent")]
    pub content: Content,
    /// Pre-block-model tool invocations: `{id, function: {name, arguments}}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Raw session record this message was first seen in (session schema only)
    #[serde(skip)]
    pub origin: Option<Box<Value>>,
}

impl UniformMessage {
    /// Lift a JSON object into a message. Non-objects have no message in them.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };

        let id = take_string(&mut map, "id");
        let role = take_string(&mut map, "role").map(Role::from);
        let content = map.remove("content").map(Content::from).unwrap_or_default();
        let tool_calls = match map.remove("tool_calls") {
            Some(Value::Array(calls)) => Some(calls),
            Some(other) => {
                map.insert("tool_calls".to_string(), other);
                None
            }
            None => None,
        };
        let tool_call_id = take_string(&mut map, "tool_call_id");
        let name = take_string(&mut map, "name");
        let tool_name = take_string(&mut map, "tool_name");
        let output = map.remove("output");
        let stop_reason = take_string(&mut map, "stop_reason");
        let metadata = map.remove("metadata");
        let object = take_string(&mut map, "object");

        Some(Self {
            id,
            role,
            content,
            tool_calls,
            tool_call_id,
            name,
            tool_name,
            output,
            stop_reason,
            metadata,
            object,
            extra: map,
            origin: None,
        })
    }

    pub fn is_streaming_chunk(&self) -> bool {
        self.object.as_deref() == Some(STREAMING_CHUNK_OBJECT)
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.role.as_ref() == Some(role)
    }

    /// `metadata.title`, when it is a non-empty string
    pub fn metadata_title(&self) -> Option<&str> {
        self.metadata
            .as_ref()?
            .get("title")?
            .as_str()
            .filter(|t| !t.is_empty())
    }
}

impl<'de> Deserialize<'de> for UniformMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        UniformMessage::from_value(value)
            .ok_or_else(|| serde::de::Error::custom("message must be a JSON object"))
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => {
            map.insert(key.to_string(), other);
            None
        }
    }
}

/// One displayable unit of a normalized trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TraceEvent {
    System {
        text: String,
    },
    User {
        text: String,
        /// Original blocks of an image-bearing turn; `text` is empty then
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Vec<Value>>,
    },
    Assistant {
        text: String,
    },
    Thinking {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_call_id: String,
        /// Empty when the name has to come from the paired tool-use
        name: String,
        output: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl TraceEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TraceEvent::System { .. } => "system",
            TraceEvent::User { .. } => "user",
            TraceEvent::Assistant { .. } => "assistant",
            TraceEvent::Thinking { .. } => "thinking",
            TraceEvent::ToolUse { .. } => "tool-use",
            TraceEvent::ToolResult { .. } => "tool-result",
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            TraceEvent::System { text }
            | TraceEvent::User { text, .. }
            | TraceEvent::Assistant { text }
            | TraceEvent::Thinking { text } => Some(text),
            _ => None,
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            TraceEvent::ToolUse { name, .. } | TraceEvent::ToolResult { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Result of normalizing one trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceData {
    pub title: String,
    pub events: Vec<TraceEvent>,
    pub original_messages: Vec<UniformMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::from("tool"), Role::Tool);
        assert_eq!(Role::from("developer"), Role::Other("developer".to_string()));
        assert_eq!(String::from(Role::Other("developer".to_string())), "developer");
    }

    #[test]
    fn test_from_value_keeps_mistyped_fields() {
        let msg = UniformMessage::from_value(json!({
            "role": "tool",
            "tool_call_id": 42,
            "content": "ok",
            "custom": true
        }))
        .unwrap();

        assert!(msg.has_role(&Role::Tool));
        assert_eq!(msg.tool_call_id, None);
        assert_eq!(msg.extra.get("tool_call_id"), Some(&json!(42)));

        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back, json!({"role": "tool", "tool_call_id": 42, "content": "ok", "custom": true}));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(UniformMessage::from_value(json!([1, 2])).is_none());
        assert!(UniformMessage::from_value(json!("user")).is_none());
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = TraceEvent::ToolUse {
            id: "t1".to_string(),
            name: "Read".to_string(),
            input: json!({"file_path": "/a"}),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"kind": "tool-use", "id": "t1", "name": "Read", "input": {"file_path": "/a"}})
        );
    }

    #[test]
    fn test_trace_data_uses_camel_case() {
        let data = TraceData {
            title: "Trace".to_string(),
            events: vec![],
            original_messages: vec![UniformMessage::from_value(json!({"role": "user"})).unwrap()],
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["originalMessages"][0]["role"], "user");

        let parsed: TraceData = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, data);
    }

    #[test]
    fn test_metadata_title() {
        let msg = UniformMessage::from_value(json!({"metadata": {"title": "Run 7"}})).unwrap();
        assert_eq!(msg.metadata_title(), Some("Run 7"));
        let msg = UniformMessage::from_value(json!({"metadata": {"title": ""}})).unwrap();
        assert_eq!(msg.metadata_title(), None);
    }
}
