//! Turn reconstructed messages into the flat event stream.
//!
//! Each message yields zero or more events, in order. Rules are tried top to
//! bottom and the first one that fits the message handles it.

use serde_json::{Map, Value};
use tracing::debug;

use crate::block::{present_field, str_field, Block};
use crate::pairing::synthetic_id;
use crate::text::{block_text, text_from_content, tool_result_output};
use crate::trace::{Content, Role, TraceEvent, UniformMessage};

const DEFAULT_TOOL_NAME: &str = "tool";

/// Extract events from every message, preserving order.
pub fn extract(messages: &[UniformMessage]) -> Vec<TraceEvent> {
    let mut events = Vec::new();
    for message in messages {
        extract_message(message, &mut events);
    }
    events
}

fn extract_message(m: &UniformMessage, events: &mut Vec<TraceEvent>) {
    if m.is_streaming_chunk() {
        debug!("Skipping streaming chunk");
        return;
    }

    match (m.role.as_ref(), &m.content) {
        (Some(Role::Assistant), Content::Blocks(blocks)) => assistant_blocks(m, blocks, events),
        (Some(Role::Tool), _) => events.push(tool_message_result(m)),
        (Some(Role::Assistant), _) if has_legacy_calls(m) => legacy_tool_calls(m, events),
        (Some(Role::User), Content::Blocks(blocks))
            if blocks.iter().any(|b| Block::classify(b).is_tool_result()) =>
        {
            user_tool_results(blocks, events)
        }
        (Some(Role::User), content) => user_turn(content, events),
        (Some(Role::System), content) => {
            push_text(events, text_from_content(content), |text| TraceEvent::System { text })
        }
        (Some(Role::Assistant), content) => {
            push_text(events, text_from_content(content), |text| TraceEvent::Assistant { text })
        }
        _ => {}
    }
}

fn push_text(events: &mut Vec<TraceEvent>, text: String, make: impl FnOnce(String) -> TraceEvent) {
    if !text.is_empty() {
        events.push(make(text));
    }
}

/// Assistant text seen since the last non-text block of the current message
#[derive(Default)]
struct PendingText {
    buf: String,
}

impl PendingText {
    fn push(&mut self, text: &str) {
        if !self.buf.is_empty() {
            self.buf.push('\n');
        }
        self.buf.push_str(text);
    }

    fn flush(&mut self, events: &mut Vec<TraceEvent>) {
        let text = self.buf.trim();
        if !text.is_empty() {
            events.push(TraceEvent::Assistant { text: text.to_string() });
        }
        self.buf.clear();
    }
}

fn assistant_blocks(m: &UniformMessage, blocks: &[Value], events: &mut Vec<TraceEvent>) {
    let mut pending = PendingText::default();

    for block in blocks {
        match Block::classify(block) {
            Block::Text(v) => pending.push(block_text(v).unwrap_or("")),
            Block::Thinking(v) => {
                pending.flush(events);
                let text = str_field(v, "thinking").or_else(|| str_field(v, "text"));
                if let Some(text) = text {
                    events.push(TraceEvent::Thinking { text: text.to_string() });
                }
            }
            Block::ToolUse(v) => {
                pending.flush(events);
                events.push(block_tool_use(m, v));
            }
            _ => {}
        }
    }

    pending.flush(events);
}

fn block_tool_use(m: &UniformMessage, block: &Value) -> TraceEvent {
    let id = str_field(block, "id")
        .or_else(|| str_field(block, "tool_call_id"))
        .map(str::to_string)
        .unwrap_or_else(synthetic_id);
    let name = str_field(block, "name")
        .or_else(|| str_field(block, "tool_name"))
        .or_else(|| m.tool_name.as_deref().filter(|n| !n.is_empty()))
        .unwrap_or(DEFAULT_TOOL_NAME)
        .to_string();
    let input = present_field(block, "input")
        .or_else(|| present_field(block, "arguments"))
        .cloned()
        .unwrap_or_else(empty_object);

    TraceEvent::ToolUse { id, name, input }
}

fn tool_message_result(m: &UniformMessage) -> TraceEvent {
    let name = non_empty(&m.name)
        .or_else(|| non_empty(&m.tool_name))
        .unwrap_or(DEFAULT_TOOL_NAME)
        .to_string();
    let tool_call_id = non_empty(&m.tool_call_id)
        .or_else(|| non_empty(&m.id))
        .unwrap_or("")
        .to_string();
    let output = match m.output.as_ref().filter(|o| !o.is_null()) {
        Some(output) => output.clone(),
        None if m.content.is_absent() => Value::String(String::new()),
        None => m.content.to_value(),
    };

    TraceEvent::ToolResult {
        tool_call_id,
        name,
        output,
        is_error: None,
    }
}

fn has_legacy_calls(m: &UniformMessage) -> bool {
    m.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
}

fn legacy_tool_calls(m: &UniformMessage, events: &mut Vec<TraceEvent>) {
    push_text(events, text_from_content(&m.content), |text| TraceEvent::Assistant { text });

    for call in m.tool_calls.iter().flatten() {
        let id = str_field(call, "id").map(str::to_string).unwrap_or_else(synthetic_id);
        let function = call.get("function");
        let name = function
            .and_then(|f| str_field(f, "name"))
            .unwrap_or(DEFAULT_TOOL_NAME)
            .to_string();
        let input = function
            .and_then(|f| f.get("arguments"))
            .and_then(Value::as_str)
            .map(parse_arguments)
            .unwrap_or_else(empty_object);

        events.push(TraceEvent::ToolUse { id, name, input });
    }
}

/// Best-effort parse of a JSON-encoded argument string
fn parse_arguments(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Null) => empty_object(),
        Ok(v) => v,
        Err(e) => {
            debug!("Unparseable tool arguments: {}", e);
            empty_object()
        }
    }
}

fn user_tool_results(blocks: &[Value], events: &mut Vec<TraceEvent>) {
    for block in blocks {
        let Block::ToolResult(v) = Block::classify(block) else {
            continue;
        };
        let tool_call_id = str_field(v, "tool_use_id").unwrap_or("").to_string();
        let output = v.get("content").map(tool_result_output).unwrap_or_else(|| Value::String(String::new()));
        let is_error = v.get("is_error").and_then(Value::as_bool);

        events.push(TraceEvent::ToolResult {
            tool_call_id,
            name: String::new(),
            output,
            is_error,
        });
    }
}

fn user_turn(content: &Content, events: &mut Vec<TraceEvent>) {
    if let Content::Blocks(blocks) = content {
        if blocks.iter().any(|b| Block::classify(b).carries_image()) {
            events.push(TraceEvent::User {
                text: String::new(),
                content: Some(blocks.clone()),
            });
            return;
        }
    }
    push_text(events, text_from_content(content), |text| TraceEvent::User { text, content: None });
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
