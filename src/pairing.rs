//! Associate tool-result events with the tool-use that requested them.
//!
//! Matching is by call id: exact first, then containment, since some
//! producers embed the tool-use id inside a longer composite call id.

use serde::Serialize;

use crate::trace::TraceEvent;

/// Join key for a tool-use that arrived without an id. Not unique in any
/// strong sense; only meant to pair events inside one trace.
pub fn synthetic_id() -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    format!("evt_{}", &token[..8])
}

/// Does a result's call id refer to this tool-use id?
pub fn ids_match(use_id: &str, call_id: &str) -> bool {
    !use_id.is_empty() && call_id.contains(use_id)
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolPair<'a> {
    pub tool_use: &'a TraceEvent,
    pub result: Option<&'a TraceEvent>,
}

fn result_call_id(event: &TraceEvent) -> Option<&str> {
    match event {
        TraceEvent::ToolResult { tool_call_id, .. } => Some(tool_call_id),
        _ => None,
    }
}

fn use_id(event: &TraceEvent) -> Option<&str> {
    match event {
        TraceEvent::ToolUse { id, .. } => Some(id),
        _ => None,
    }
}

/// Result event for a tool-use id
pub fn find_result<'a>(id: &str, events: &'a [TraceEvent]) -> Option<&'a TraceEvent> {
    let results = || events.iter().filter_map(|e| result_call_id(e).map(|call_id| (call_id, e)));
    results()
        .find(|(call_id, _)| !id.is_empty() && *call_id == id)
        .or_else(|| results().find(|(call_id, _)| ids_match(id, call_id)))
        .map(|(_, e)| e)
}

/// Tool-use event a result's call id refers to
pub fn find_use<'a>(call_id: &str, events: &'a [TraceEvent]) -> Option<&'a TraceEvent> {
    let uses = || events.iter().filter_map(|e| use_id(e).map(|id| (id, e)));
    uses()
        .find(|(id, _)| !id.is_empty() && *id == call_id)
        .or_else(|| uses().find(|(id, _)| ids_match(id, call_id)))
        .map(|(_, e)| e)
}

/// Every tool-use in order, with its result when one exists
pub fn pair_tools(events: &[TraceEvent]) -> Vec<ToolPair<'_>> {
    events
        .iter()
        .filter_map(|e| use_id(e).map(|id| (id, e)))
        .map(|(id, tool_use)| ToolPair {
            tool_use,
            result: find_result(id, events),
        })
        .collect()
}
