//! Claude Code session logs.
//!
//! Record shape: `{type, message, uuid, timestamp, parentUuid, ...}`
//!
//! Record types:
//! - user / assistant / system: carry a `message`
//! - summary, file-history-snapshot: metadata, skipped
//! - anything else (progress, queue-operation, ...): skipped
//!
//! One assistant turn is often written as several records that share the same
//! `message.id`, each holding a slice of the content (text, then a tool_use,
//! ...). Those fragments are merged back into one message here.

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::detect::{is_metadata_record, is_session_message_type};
use crate::trace::{Content, Role, UniformMessage};

/// Merge key for a record: the message id when present, else `type:uuid`.
/// Records without a uuid get a positional key and never merge.
fn merge_key(record_type: &str, record: &Value, message: &UniformMessage, position: usize) -> String {
    if let Some(id) = message.id.as_deref().filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    match record.get("uuid") {
        Some(Value::String(uuid)) if !uuid.is_empty() => format!("{}:{}", record_type, uuid),
        Some(uuid) if !uuid.is_null() => format!("{}:{}", record_type, uuid),
        _ => format!("{}:#{}", record_type, position),
    }
}

/// Rebuild messages from session records, in first-seen order of their keys.
pub fn reconstruct(records: Vec<Value>) -> Vec<UniformMessage> {
    let mut messages: Vec<UniformMessage> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (position, record) in records.into_iter().enumerate() {
        if is_metadata_record(&record) {
            continue;
        }
        let record_type = match record.get("type").and_then(Value::as_str) {
            Some(t) if is_session_message_type(t) => t.to_string(),
            _ => continue,
        };
        let Some(message) = record
            .get("message")
            .filter(|m| m.is_object())
            .cloned()
            .and_then(UniformMessage::from_value)
        else {
            continue;
        };

        let key = merge_key(&record_type, &record, &message, position);

        if let Some(&slot) = index.get(&key) {
            merge_fragment(&mut messages[slot], message, &key);
            continue;
        }

        let mut message = message;
        if message.role.is_none() && !message.extra.contains_key("role") {
            message.role = Some(Role::from(record_type.as_str()));
        }
        message.origin = Some(Box::new(record));
        index.insert(key, messages.len());
        messages.push(message);
    }

    messages
}

/// Fold a later fragment into the stored message.
///
/// Block sequences are appended. A string/sequence mismatch keeps the stored
/// content. A later `stop_reason` always replaces the stored one.
fn merge_fragment(stored: &mut UniformMessage, incoming: UniformMessage, key: &str) {
    match (&mut stored.content, incoming.content) {
        (Content::Blocks(existing), Content::Blocks(more)) => {
            debug!("Merging {} blocks into message {}", more.len(), key);
            existing.extend(more);
        }
        (_, other) if !other.is_absent() => {
            debug!("Incompatible content for message {}, keeping first fragment", key);
        }
        _ => {}
    }

    if let Some(stop_reason) = incoming.stop_reason {
        stored.extra.remove("stop_reason");
        stored.stop_reason = Some(stop_reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(kind: &str, uuid: &str, message: Value) -> Value {
        json!({
            "type": kind,
            "uuid": uuid,
            "timestamp": "2025-01-01T00:00:00Z",
            "message": message
        })
    }

    #[test]
    fn test_merge_fragments_with_same_id() {
        let messages = reconstruct(vec![
            record("assistant", "u1", json!({
                "id": "msg_1", "role": "assistant",
                "content": [{"type": "text", "text": "Let me look"}],
                "stop_reason": null
            })),
            record("assistant", "u2", json!({
                "id": "msg_1", "role": "assistant",
                "content": [{"type": "tool_use", "id": "t1", "name": "Read", "input": {}}],
                "stop_reason": "tool_use"
            })),
        ]);

        assert_eq!(messages.len(), 1);
        let blocks = messages[0].content.blocks().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "text");
        assert_eq!(blocks[1]["type"], "tool_use");
        assert_eq!(messages[0].stop_reason.as_deref(), Some("tool_use"));
    }

    #[test]
    fn test_later_stop_reason_wins() {
        let messages = reconstruct(vec![
            record("assistant", "u1", json!({"id": "m", "content": [], "stop_reason": "max_tokens"})),
            record("assistant", "u2", json!({"id": "m", "content": [], "stop_reason": "end_turn"})),
            record("assistant", "u3", json!({"id": "m", "content": []})),
        ]);
        assert_eq!(messages[0].stop_reason.as_deref(), Some("end_turn"));
    }

    #[test]
    fn test_incompatible_content_keeps_first() {
        let messages = reconstruct(vec![
            record("assistant", "u1", json!({"id": "m", "content": "first"})),
            record("assistant", "u2", json!({"id": "m", "content": [{"type": "text", "text": "second"}]})),
        ]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, Content::Text("first".to_string()));
    }

    #[test]
    fn test_key_falls_back_to_type_and_uuid() {
        let messages = reconstruct(vec![
            record("user", "same", json!({"role": "user", "content": [{"type": "text", "text": "a"}]})),
            record("assistant", "same", json!({"role": "assistant", "content": [{"type": "text", "text": "b"}]})),
            record("user", "same", json!({"role": "user", "content": [{"type": "text", "text": "c"}]})),
        ]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content.blocks().unwrap().len(), 2);
    }

    #[test]
    fn test_first_seen_order_with_interleaving() {
        let messages = reconstruct(vec![
            record("assistant", "1", json!({"id": "a", "content": [{"type": "text", "text": "a1"}]})),
            record("assistant", "2", json!({"id": "b", "content": [{"type": "text", "text": "b1"}]})),
            record("assistant", "3", json!({"id": "a", "content": [{"type": "text", "text": "a2"}]})),
        ]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id.as_deref(), Some("a"));
        assert_eq!(messages[0].content.blocks().unwrap().len(), 2);
        assert_eq!(messages[1].id.as_deref(), Some("b"));
    }

    #[test]
    fn test_skips_metadata_and_unknown_records() {
        let messages = reconstruct(vec![
            json!({"type": "file-history-snapshot", "messageId": "abc", "snapshot": {}}),
            json!({"type": "summary", "summary": "Test summary", "leafUuid": "x"}),
            record("progress", "p", json!({"role": "user", "content": "tick"})),
            json!({"type": "user", "uuid": "1", "timestamp": "t"}),
            record("unknown", "2", json!({"role": "user", "content": "Message 1"})),
            record("system", "3", json!({"role": "system", "content": "System message"})),
        ]);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].has_role(&Role::System));
    }

    #[test]
    fn test_role_filled_from_record_type_and_origin_kept() {
        let messages = reconstruct(vec![record("user", "u1", json!({"content": "hello"}))]);
        assert!(messages[0].has_role(&Role::User));
        let origin = messages[0].origin.as_ref().unwrap();
        assert_eq!(origin["uuid"], "u1");
    }

    #[test]
    fn test_missing_uuid_never_merges() {
        let no_uuid = |text: &str| json!({"type": "user", "message": {"role": "user", "content": [text]}});
        let messages = reconstruct(vec![no_uuid("a"), no_uuid("b")]);
        assert_eq!(messages.len(), 2);
    }
}
