//! Split raw trace text into JSON records.
//!
//! Accepts JSON Lines (with `\n` or `\r\n` breaks). Lines that are blank, do
//! not start with `{`, or fail to parse are skipped. When nothing decodes that
//! way, the whole input is tried once as a single JSON array. A leading UTF-8
//! byte order mark is ignored.

use serde_json::Value;
use tracing::debug;

/// Decode every usable record. Never fails; worst case is an empty vector.
pub fn decode(text: &str) -> Vec<Value> {
    // str::trim leaves U+FEFF alone, which would cost the first record
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = Vec::new();
    let mut skipped = 0usize;

    // str::lines strips a trailing '\r' as well as '\n'
    for line in text.lines() {
        match parse_line(line) {
            Some(record) => records.push(record),
            None if !line.trim().is_empty() => skipped += 1,
            None => {}
        }
    }

    if skipped > 0 {
        debug!("Skipped {} non-record lines", skipped);
    }

    if records.is_empty() {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text) {
            debug!("Input decoded as a single JSON array of {} records", items.len());
            records = items;
        }
    }

    records
}

fn parse_line(line: &str) -> Option<Value> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_jsonl_with_crlf() {
        let records = decode("{\"a\":1}\r\n{\"b\":2}\r\n");
        assert_eq!(records, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn test_decode_skips_blank_and_invalid_lines() {
        let text = "\n{\"role\":\"user\"}\nnot json\n{broken\n   \n[1,2]\n{\"role\":\"assistant\"}";
        let records = decode(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["role"], "assistant");
    }

    #[test]
    fn test_decode_whole_array_fallback() {
        let text = r#"[{"role": "user", "content": "Hello"}, {"role": "assistant", "content": "Hi!"}]"#;
        let records = decode(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["content"], "Hello");

        // Multi-line, but no element line parses on its own
        let text = "[\n  {\"role\": \"user\"},\n  {\"role\": \"assistant\"}]";
        let records = decode(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["role"], "assistant");
    }

    #[test]
    fn test_pretty_array_last_element_is_a_line_record() {
        // The last element has no trailing comma, so it decodes as a record
        // of its own and the array fallback never runs.
        let text = r#"[
            {"role": "user", "content": "Hello"},
            {"role": "assistant", "content": "Hi!"}
        ]"#;
        let records = decode(text);
        assert_eq!(records, vec![json!({"role": "assistant", "content": "Hi!"})]);
    }

    #[test]
    fn test_decode_ignores_byte_order_mark() {
        let text = "\u{feff}{\"role\":\"user\",\"content\":\"Hello\"}\n{\"role\":\"assistant\",\"content\":\"Hi\"}";
        let records = decode(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["content"], "Hello");

        let array = "\u{feff}[{\"role\":\"user\"}]";
        assert_eq!(decode(array).len(), 1);
    }

    #[test]
    fn test_decode_array_fallback_only_when_nothing_decoded() {
        // The first line is a valid record, so the array on line two is not considered
        let records = decode("{\"x\":1}\n[{\"y\":2}]");
        assert_eq!(records, vec![json!({"x": 1})]);
    }

    #[test]
    fn test_decode_garbage_yields_nothing() {
        assert!(decode("").is_empty());
        assert!(decode("   \n\n \t ").is_empty());
        assert!(decode("not json at all\n{this is also bad}\n[incomplete array").is_empty());
        assert!(decode("{\"a\":1}{").is_empty());
        assert!(decode("42").is_empty());
    }
}
