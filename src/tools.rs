//! Which view a frontend should use for each event.
//!
//! Tool events are looked up by tool name in a registry of renderers; every
//! producer spells its tools differently, so the built-ins register the common
//! aliases under one adapter and label.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::pairing::find_use;
use crate::trace::TraceEvent;

/// Frontend component family that renders a tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Adapter {
    Bash,
    FileOperations,
    Search,
    Todo,
    Terminal,
    FileCard,
    Diff,
    TaxiEstimate,
    TaxiSearch,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolRenderer {
    pub adapter: Adapter,
    /// Header shown instead of the raw tool name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ToolRenderer {
    pub fn new(adapter: Adapter, label: &str) -> Self {
        Self {
            adapter,
            label: Some(label.to_string()),
        }
    }

    pub fn unlabeled(adapter: Adapter) -> Self {
        Self { adapter, label: None }
    }

    pub fn unknown() -> Self {
        Self::unlabeled(Adapter::Unknown)
    }
}

/// View chosen for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "kebab-case")]
pub enum RenderTarget {
    System,
    User,
    Assistant,
    Thinking,
    Tool {
        /// Resolved name; a result without one takes its tool-use's name
        name: String,
        renderer: ToolRenderer,
    },
}

const BUILTINS: &[(Adapter, Option<&str>, &[&str])] = &[
    (
        Adapter::Bash,
        Some("Bash"),
        &["Bash", "bash", "shell", "sh", "terminal", "cmd", "execute_command"],
    ),
    (Adapter::Bash, Some("BashOutput"), &["BashOutput"]),
    (Adapter::Bash, Some("KillShell"), &["KillShell"]),
    (
        Adapter::FileOperations,
        Some("Read"),
        &["Read", "read", "file.read", "fs.read", "file_read", "open_file"],
    ),
    (
        Adapter::FileOperations,
        Some("Write"),
        &["Write", "write", "file.write", "fs.write", "file_write", "create_file"],
    ),
    (
        Adapter::FileOperations,
        Some("Edit"),
        &["Edit", "edit", "file.edit", "fs.edit", "file_edit", "modify_file"],
    ),
    (
        Adapter::Search,
        Some("Grep"),
        &["Grep", "grep", "search", "find_in_files", "search_content"],
    ),
    (
        Adapter::Search,
        Some("Glob"),
        &["Glob", "glob", "find", "find_files", "search_files"],
    ),
    (
        Adapter::Todo,
        Some("TodoWrite"),
        &["TodoWrite", "todowrite", "todo", "checklist"],
    ),
    (Adapter::Unknown, Some("Task"), &["Task"]),
    (Adapter::Unknown, Some("WebFetch"), &["WebFetch", "webfetch"]),
    (Adapter::Unknown, Some("WebSearch"), &["WebSearch", "websearch"]),
    (
        Adapter::FileOperations,
        Some("NotebookEdit"),
        &["NotebookEdit", "notebookedit"],
    ),
    (
        Adapter::Unknown,
        Some("AskUserQuestion"),
        &["AskUserQuestion", "askuserquestion"],
    ),
    (Adapter::Unknown, Some("Skill"), &["Skill", "skill"]),
    (
        Adapter::Unknown,
        Some("SlashCommand"),
        &["SlashCommand", "slashcommand"],
    ),
    // Legacy renderers, no label
    (Adapter::Terminal, None, &["process.run", "run_command"]),
    (Adapter::FileCard, None, &["file.show"]),
    (
        Adapter::Diff,
        None,
        &["file.diff", "git.diff", "patch.apply", "code_diff"],
    ),
    (
        Adapter::TaxiEstimate,
        Some("Get Taxi Estimate"),
        &["get_taxi_estimate", "getTaxiEstimate", "taxi_estimate"],
    ),
    (
        Adapter::TaxiSearch,
        Some("Search Taxis"),
        &["search_taxis", "searchTaxis", "find_taxis", "taxi_search"],
    ),
];

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    renderers: BTreeMap<String, ToolRenderer>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (adapter, label, names) in BUILTINS {
            let renderer = ToolRenderer {
                adapter: *adapter,
                label: label.map(str::to_string),
            };
            for name in names.iter() {
                registry.register(name, renderer.clone());
            }
        }
        registry
    }

    /// Register (or replace) the renderer for a tool name. Names are case-sensitive.
    pub fn register(&mut self, name: &str, renderer: ToolRenderer) {
        self.renderers.insert(name.to_string(), renderer);
    }

    pub fn get(&self, name: &str) -> ToolRenderer {
        self.renderers
            .get(name)
            .cloned()
            .unwrap_or_else(ToolRenderer::unknown)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.renderers.keys().map(String::as_str).collect()
    }

    /// Pick the view for `event`. `events` is the whole trace, needed to name
    /// tool results through their tool-use.
    pub fn resolve(&self, event: &TraceEvent, events: &[TraceEvent]) -> RenderTarget {
        match event {
            TraceEvent::System { .. } => RenderTarget::System,
            TraceEvent::User { .. } => RenderTarget::User,
            TraceEvent::Assistant { .. } => RenderTarget::Assistant,
            TraceEvent::Thinking { .. } => RenderTarget::Thinking,
            TraceEvent::ToolUse { name, .. } => self.tool_target(name),
            TraceEvent::ToolResult { name, tool_call_id, .. } => {
                let name = if name.is_empty() {
                    find_use(tool_call_id, events)
                        .and_then(TraceEvent::tool_name)
                        .unwrap_or_default()
                } else {
                    name.as_str()
                };
                self.tool_target(name)
            }
        }
    }

    fn tool_target(&self, name: &str) -> RenderTarget {
        RenderTarget::Tool {
            name: name.to_string(),
            renderer: self.get(name),
        }
    }
}
