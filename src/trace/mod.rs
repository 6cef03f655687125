//! The record of a dry run: one entry per operation reached, in visit order.
mod formatter;

pub use formatter::TraceFormatter;

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Ok,
    Skipped,
    Error,
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceStatus::Ok => f.write_str("ok"),
            TraceStatus::Skipped => f.write_str("skipped"),
            TraceStatus::Error => f.write_str("error"),
        }
    }
}

/// A value written to the data space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathWrite {
    pub path: String,
    pub value: JsonValue,
}

/// A side effect that a real run would perform, with its declared parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Effect {
    pub kind: String,
    pub parameters: JsonValue,
}

/// Which way a branch went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchOutcome {
    pub condition_held: bool,
    /// The targets visited; empty when the condition failed and there is no `else`.
    pub targets: Vec<String>,
}

/// One pass over a loop body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Iteration {
    pub index: usize,
    pub item: JsonValue,
    pub entries: Vec<TraceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub id: String,
    pub kind: String,
    pub status: TraceStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub produced: Vec<PathWrite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<Effect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub iterations: Vec<Iteration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TraceEntry {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, status: TraceStatus) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            status,
            produced: Vec::new(),
            effect: None,
            branch: None,
            iterations: Vec::new(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The value this entry wrote to `path`, if any.
    pub fn produced_at(&self, path: &str) -> Option<&JsonValue> {
        self.produced
            .iter()
            .find(|w| w.path == path)
            .map(|w| &w.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionTrace {
    pub workflow: String,
    pub entries: Vec<TraceEntry>,
    /// The data space after the run.
    pub data: JsonValue,
}

impl ExecutionTrace {
    /// The first top-level entry for `id`.
    pub fn entry(&self, id: &str) -> Option<&TraceEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Ids of the top-level entries in visit order.
    pub fn visited(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    /// Every entry, loop iterations included, depth first.
    pub fn all_entries(&self) -> Vec<&TraceEntry> {
        fn walk<'a>(entries: &'a [TraceEntry], out: &mut Vec<&'a TraceEntry>) {
            for entry in entries {
                out.push(entry);
                for iteration in &entry.iterations {
                    walk(&iteration.entries, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.entries, &mut out);
        out
    }

    pub fn count(&self, status: TraceStatus) -> usize {
        self.all_entries()
            .iter()
            .filter(|e| e.status == status)
            .count()
    }

    pub fn summary(&self) -> String {
        TraceFormatter::format_trace(self)
    }
}
