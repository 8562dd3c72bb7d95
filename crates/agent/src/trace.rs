//! Per-invocation reasoning trace.
//!
//! The trace is diagnostic output only: it is returned with the answer
//! and never fed back to the model or persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of reasoning trace entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Thought,
    ToolCall,
    Observation,
    Answer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    #[serde(rename = "type")]
    pub kind: TraceKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only trace owned by one agent run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasoningTrace {
    entries: Vec<TraceEntry>,
}

impl ReasoningTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: TraceKind, content: impl Into<String>) {
        self.entries.push(TraceEntry {
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Contents of every `tool_call` entry, in order.
    pub fn tool_calls(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.kind == TraceKind::ToolCall)
            .map(|e| e.content.clone())
            .collect()
    }

    pub fn count(&self, kind: TraceKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}

/// First `limit` characters of `text`, or `None` if it already fits.
fn cut(text: &str, limit: usize) -> Option<&str> {
    text.char_indices().nth(limit).map(|(idx, _)| &text[..idx])
}

/// Short preview for trace entries: `limit` chars plus `...` when cut.
pub fn preview(text: &str, limit: usize) -> String {
    match cut(text, limit) {
        Some(head) => format!("{head}..."),
        None => text.to_string(),
    }
}

/// Bound an observation fed back to the model.
pub fn clip_observation(text: String, limit: usize) -> String {
    match cut(&text, limit) {
        Some(head) => format!("{head}\n... (truncated)"),
        None => text,
    }
}
