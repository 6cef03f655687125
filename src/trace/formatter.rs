use super::{ExecutionTrace, TraceEntry, TraceStatus};
use serde_json::Value as JsonValue;

/// Longest rendering of a value before it is elided.
const VALUE_WIDTH: usize = 60;

/// Formats execution traces into human-readable strings
pub struct TraceFormatter;

impl TraceFormatter {
    /// One line per entry, nested iterations indented, then a status tally.
    pub fn format_trace(trace: &ExecutionTrace) -> String {
        let mut out = String::new();
        out.push_str(&format!("Simulation of '{}'\n", trace.workflow));
        for entry in &trace.entries {
            Self::format_entry(&mut out, entry, 1);
        }
        out.push_str(&format!(
            "{} ok, {} skipped, {} error\n",
            trace.count(TraceStatus::Ok),
            trace.count(TraceStatus::Skipped),
            trace.count(TraceStatus::Error)
        ));
        out
    }

    fn format_entry(out: &mut String, entry: &TraceEntry, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&format!(
            "{}[{}] {} ({})",
            indent, entry.status, entry.id, entry.kind
        ));
        if let Some(note) = &entry.note {
            out.push_str(&format!(": {}", note));
        }
        out.push('\n');

        if let Some(effect) = &entry.effect {
            out.push_str(&format!(
                "{}  effect {} {}\n",
                indent,
                effect.kind,
                Self::format_value(&effect.parameters)
            ));
        }
        if let Some(branch) = &entry.branch {
            let targets = if branch.targets.is_empty() {
                "nothing".to_string()
            } else {
                branch.targets.join(", ")
            };
            out.push_str(&format!(
                "{}  condition {} -> {}\n",
                indent,
                if branch.condition_held { "held" } else { "failed" },
                targets
            ));
        }
        for write in &entry.produced {
            out.push_str(&format!(
                "{}  {} = {}\n",
                indent,
                write.path,
                Self::format_value(&write.value)
            ));
        }
        for iteration in &entry.iterations {
            out.push_str(&format!("{}  #{}\n", indent, iteration.index));
            for nested in &iteration.entries {
                Self::format_entry(out, nested, depth + 2);
            }
        }
    }

    /// Compact JSON, elided past a fixed width.
    fn format_value(value: &JsonValue) -> String {
        let text = value.to_string();
        if text.chars().count() <= VALUE_WIDTH {
            text
        } else {
            let head: String = text.chars().take(VALUE_WIDTH - 3).collect();
            format!("{}...", head)
        }
    }
}
