//! Trace normalizer - turns raw trace text into a `TraceData`.
//!
//! Pipeline (single pass, no I/O):
//! 1. decode: text -> JSON records
//! 2. detect: records -> schema (OpenAI chat or Claude Code session)
//! 3. reconstruct: records -> messages (session fragments merged by id)
//! 4. extract: messages -> events; title from messages
//!
//! Malformed input is skipped at every stage, so `normalize` never fails.
//! An empty `events` list is for the caller to report.

use tracing::debug;

use crate::decode::decode;
use crate::detect::{detect, TraceFormat};
use crate::trace::{TraceData, UniformMessage};
use crate::{claude, events, openai, titles};

/// Normalize a whole trace.
pub fn normalize(text: &str) -> TraceData {
    let records = decode(text);
    let format = detect(&records);
    let record_count = records.len();

    let messages = reconstruct(format, records);
    let events = events::extract(&messages);
    let title = titles::guess_title(&messages);

    debug!(
        "Normalized {:?} trace: {} records, {} messages, {} events",
        format,
        record_count,
        messages.len(),
        events.len()
    );

    TraceData {
        title,
        events,
        original_messages: messages,
    }
}

/// Run the reconstruction strategy for a detected schema.
pub fn reconstruct(format: TraceFormat, records: Vec<serde_json::Value>) -> Vec<UniformMessage> {
    match format {
        TraceFormat::ClaudeCode => claude::reconstruct(records),
        TraceFormat::OpenAi => openai::reconstruct(records),
    }
}
