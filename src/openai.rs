//! Flat chat-message traces (OpenAI style).
//!
//! Each record already is one complete message. The only unwrapping done is
//! for envelopes of the form `{type: "message", message: {...}}`. Streaming
//! deltas (`object: "chat.completion.chunk"`) are passed through as-is; the
//! event extractor skips them.
//!
//! Metadata records (`summary`, `file-history-snapshot`) are not messages and
//! are dropped. So are records that are not JSON objects (numbers, strings,
//! arrays): a `UniformMessage` is always an object, so there is no message to
//! keep in their place. A trace made only of those reports "no messages".

use serde_json::Value;

use crate::detect::{is_metadata_record, is_truthy};
use crate::trace::UniformMessage;

/// Map records 1:1 to messages, dropping falsy, metadata and non-object records.
pub fn reconstruct(records: Vec<Value>) -> Vec<UniformMessage> {
    records
        .into_iter()
        .filter(|record| is_truthy(Some(record)) && !is_metadata_record(record))
        .map(unwrap_envelope)
        .filter_map(UniformMessage::from_value)
        .collect()
}

fn unwrap_envelope(mut record: Value) -> Value {
    let is_envelope = record.get("type").and_then(Value::as_str) == Some("message")
        && is_truthy(record.get("message"));
    if is_envelope {
        if let Some(inner) = record.get_mut("message") {
            return inner.take();
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Role;
    use serde_json::json;

    #[test]
    fn test_reconstruct_unwraps_envelopes() {
        let messages = reconstruct(vec![
            json!({"type": "message", "message": {"role": "user", "content": "wrapped"}}),
            json!({"role": "assistant", "content": "bare"}),
        ]);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].has_role(&Role::User));
        assert!(messages[1].has_role(&Role::Assistant));
    }

    #[test]
    fn test_reconstruct_keeps_streaming_chunks() {
        let messages = reconstruct(vec![json!({
            "object": "chat.completion.chunk",
            "choices": [{"delta": {"content": "Hel"}}]
        })]);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_streaming_chunk());
    }

    #[test]
    fn test_reconstruct_skips_metadata_records() {
        let messages = reconstruct(vec![
            json!({"type": "summary", "summary": "Earlier work", "leafUuid": "x"}),
            json!({"role": "user", "content": "first"}),
            json!({"type": "summary", "summary": "More", "leafUuid": "y"}),
            json!({"type": "file-history-snapshot", "messageId": "abc", "snapshot": {}}),
            json!({"role": "assistant", "content": "second"}),
        ]);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].has_role(&Role::User));
        assert!(messages[1].has_role(&Role::Assistant));
    }

    #[test]
    fn test_reconstruct_drops_falsy_and_scalars() {
        let messages = reconstruct(vec![
            Value::Null,
            json!(false),
            json!(0),
            json!(""),
            json!("text"),
            json!({"content": "No role field"}),
        ]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, None);
    }
}
