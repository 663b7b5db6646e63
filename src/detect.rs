//! Decide which schema a trace uses from a short prefix of its records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Non-metadata records inspected before falling back to the flat schema
pub const DETECTION_BUDGET: usize = 10;

/// Record types that carry no message and never count toward the budget
const METADATA_TYPES: &[&str] = &["summary", "file-history-snapshot"];

const SESSION_MESSAGE_TYPES: &[&str] = &["user", "assistant", "system"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceFormat {
    /// One complete chat message per record
    #[serde(rename = "openai")]
    OpenAi,
    /// Claude Code session log: `{type, message, uuid, timestamp, ...}`
    #[serde(rename = "claude-code")]
    ClaudeCode,
}

/// `type` of a record when it names a metadata-only entry
pub fn is_metadata_record(record: &Value) -> bool {
    record
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| METADATA_TYPES.contains(&t))
}

pub fn is_session_message_type(record_type: &str) -> bool {
    SESSION_MESSAGE_TYPES.contains(&record_type)
}

/// Single forward pass over at most `DETECTION_BUDGET` non-metadata records.
pub fn detect(records: &[Value]) -> TraceFormat {
    let found = records
        .iter()
        .filter(|r| !is_metadata_record(r))
        .take(DETECTION_BUDGET)
        .any(looks_like_session_record);

    if found {
        TraceFormat::ClaudeCode
    } else {
        TraceFormat::OpenAi
    }
}

fn looks_like_session_record(record: &Value) -> bool {
    let Some(record_type) = record.get("type").and_then(Value::as_str) else {
        return false;
    };
    let has_message = record.get("message").is_some_and(Value::is_object);
    has_message
        && is_truthy(record.get("uuid"))
        && is_truthy(record.get("timestamp"))
        && is_session_message_type(record_type)
}

/// JavaScript-style truthiness, which is what producers of these logs assume
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(kind: &str, uuid: &str) -> Value {
        json!({
            "type": kind,
            "message": {"role": kind, "content": "x"},
            "uuid": uuid,
            "timestamp": "2025-01-01T00:00:00Z"
        })
    }

    fn flat(text: &str) -> Value {
        json!({"role": "user", "content": text})
    }

    #[test]
    fn test_detect_session_schema() {
        assert_eq!(detect(&[session("user", "1")]), TraceFormat::ClaudeCode);
    }

    #[test]
    fn test_detect_defaults_to_flat() {
        assert_eq!(detect(&[flat("hi")]), TraceFormat::OpenAi);
        assert_eq!(detect(&[]), TraceFormat::OpenAi);
    }

    #[test]
    fn test_detect_within_budget() {
        let mut records: Vec<Value> = (0..5).map(|i| flat(&format!("m{}", i))).collect();
        records.push(session("user", "1"));
        assert_eq!(detect(&records), TraceFormat::ClaudeCode);

        let mut records: Vec<Value> = (0..5).map(|i| session("assistant", &i.to_string())).collect();
        records.push(flat("late"));
        assert_eq!(detect(&records), TraceFormat::ClaudeCode);
    }

    #[test]
    fn test_detect_budget_exhausted() {
        let mut records: Vec<Value> = (0..DETECTION_BUDGET).map(|i| flat(&i.to_string())).collect();
        records.push(session("user", "1"));
        assert_eq!(detect(&records), TraceFormat::OpenAi);
    }

    #[test]
    fn test_metadata_does_not_consume_budget() {
        let mut records: Vec<Value> = (0..20)
            .map(|_| json!({"type": "file-history-snapshot", "messageId": "a", "snapshot": {}}))
            .collect();
        records.push(session("user", "1"));
        assert_eq!(detect(&records), TraceFormat::ClaudeCode);
    }

    #[test]
    fn test_detect_requires_all_markers() {
        let mut missing_uuid = session("user", "1");
        missing_uuid.as_object_mut().unwrap().remove("uuid");
        assert_eq!(detect(&[missing_uuid]), TraceFormat::OpenAi);

        let wrong_type = session("progress", "1");
        assert_eq!(detect(&[wrong_type]), TraceFormat::OpenAi);

        let empty_timestamp = json!({"type": "user", "message": {}, "uuid": "1", "timestamp": ""});
        assert_eq!(detect(&[empty_timestamp]), TraceFormat::OpenAi);
    }

    #[test]
    fn test_detect_is_deterministic() {
        let records = vec![flat("a"), session("system", "9")];
        assert_eq!(detect(&records), detect(&records));
    }
}
