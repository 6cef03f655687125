use super::condition;
use crate::ast::{Operation, OperationKind, Reference, Value, Workflow};
use crate::compiler::lowering::{TargetShape, lower_operation};
use crate::data::DataSpace;
use crate::trace::{BranchOutcome, Effect, Iteration, PathWrite, TraceEntry, TraceStatus};
use crate::validator::Limits;
use ahash::AHashMap;
use serde_json::{Map, Value as JsonValue};

/// Branch and loop nesting bound when the limits leave depth open.
const DEFAULT_MAX_DEPTH: usize = 128;

/// Walks one workflow over one data space. Never fails: a misbehaving
/// operation gets an `error` or `skipped` entry and the walk continues.
pub(super) struct SimulationEngine<'a> {
    workflow: &'a Workflow,
    index: AHashMap<&'a str, &'a Operation>,
    limits: &'a Limits,
    /// Operations currently being visited, outermost first.
    active: Vec<&'a str>,
}

impl<'a> SimulationEngine<'a> {
    pub(super) fn new(workflow: &'a Workflow, limits: &'a Limits) -> Self {
        Self {
            workflow,
            index: workflow.index(),
            limits,
            active: Vec::new(),
        }
    }

    /// Visits the run order in sequence.
    pub(super) fn run(&mut self, data: &mut DataSpace) -> Vec<TraceEntry> {
        let mut entries = Vec::new();
        let workflow = self.workflow;
        for reference in &workflow.run.order {
            self.visit(&reference.id, 0, data, &mut entries);
        }
        entries
    }

    fn visit(&mut self, id: &'a str, depth: usize, data: &mut DataSpace, out: &mut Vec<TraceEntry>) {
        let Some(op) = self.index.get(id).copied() else {
            out.push(
                TraceEntry::new(id, "unknown", TraceStatus::Error)
                    .with_note("operation is not defined"),
            );
            return;
        };
        if self.active.contains(&id) {
            tracing::warn!(operation = id, "operation re-entered during simulation");
            out.push(
                TraceEntry::new(id, op.kind.name(), TraceStatus::Error)
                    .with_note("operation re-entered while still active (cycle)"),
            );
            return;
        }
        let max = self.limits.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
        if depth > max {
            tracing::warn!(operation = id, depth, "simulation nesting limit reached");
            out.push(
                TraceEntry::new(id, op.kind.name(), TraceStatus::Error).with_note(format!(
                    "nesting depth {} exceeds maximum allowed {}",
                    depth, max
                )),
            );
            return;
        }

        tracing::trace!(operation = id, kind = %op.kind, depth, "simulating operation");
        self.active.push(id);
        if let Some(branch) = &op.branch {
            let held = condition::evaluate(&branch.condition, None, data);
            let targets: &'a [Reference] = if held {
                &branch.if_true
            } else {
                branch.if_false.as_deref().unwrap_or(&[])
            };
            let mut entry = TraceEntry::new(&op.id, op.kind.name(), TraceStatus::Ok);
            entry.branch = Some(BranchOutcome {
                condition_held: held,
                targets: targets.iter().map(|t| t.id.clone()).collect(),
            });
            out.push(entry);
            for target in targets {
                self.visit(&target.id, depth + 1, data, out);
            }
        } else if let Some(body) = &op.body {
            let entry = self.run_loop(op, body, depth, data);
            out.push(entry);
        } else {
            out.push(self.step(op, data));
        }
        self.active.pop();
    }

    /// Runs the body once per element of the input array. Inside an iteration
    /// the input path holds the current element; writes made by the body stay
    /// in that iteration. The loop's output is the last value each iteration
    /// produced, or the element itself.
    fn run_loop(
        &mut self,
        op: &'a Operation,
        body: &'a [Reference],
        depth: usize,
        data: &mut DataSpace,
    ) -> TraceEntry {
        let mut entry = TraceEntry::new(&op.id, op.kind.name(), TraceStatus::Ok);
        let Some(input) = &op.input_path else {
            return skipped(entry, "no input path");
        };
        let items = match data.get(input.as_str()) {
            None => return skipped(entry, format!("no data at {}", input)),
            Some(JsonValue::Array(items)) => items.clone(),
            Some(other) => {
                entry.status = TraceStatus::Error;
                return entry.with_note(format!(
                    "input at {} is {}, not an array",
                    input,
                    json_type(other)
                ));
            }
        };

        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let mut scoped = data.clone();
            scoped.set(input.as_str(), item.clone());
            let mut entries = Vec::new();
            for reference in body {
                self.visit(&reference.id, depth + 1, &mut scoped, &mut entries);
            }
            let result = entries
                .iter()
                .rev()
                .find_map(|e| e.produced.last())
                .map(|w| w.value.clone())
                .unwrap_or_else(|| item.clone());
            results.push(result);
            entry.iterations.push(Iteration {
                index,
                item,
                entries,
            });
        }

        let count = entry.iterations.len();
        if let Some(output) = &op.output_path {
            write(&mut entry, data, output.as_str(), JsonValue::Array(results));
        }
        entry.with_note(format!("{} iteration{}", count, if count == 1 { "" } else { "s" }))
    }

    /// Every non-control operation.
    fn step(&self, op: &'a Operation, data: &mut DataSpace) -> TraceEntry {
        match &op.kind {
            OperationKind::FilterData => filter(op, data),
            OperationKind::ApiCall => api_call(op, data),
            OperationKind::StoreData | OperationKind::Wait => effect_only(op, data),
            OperationKind::MergeData => self.merge(op, data),
            _ => pass_through(op, data),
        }
    }

    fn merge(&self, op: &Operation, data: &mut DataSpace) -> TraceEntry {
        let mut entry = TraceEntry::new(&op.id, op.kind.name(), TraceStatus::Ok);
        let sources = op.property("sources").and_then(Value::as_array).unwrap_or(&[]);

        let mut found = Vec::new();
        let mut missing = Vec::new();
        for source in sources {
            let path = match source {
                Value::Path(path) => Some(path.as_str()),
                Value::String(id) => self
                    .index
                    .get(id.as_str())
                    .and_then(|o| o.output_path.as_ref())
                    .map(|p| p.as_str()),
                _ => None,
            };
            match path.and_then(|p| data.get(p)) {
                Some(value) => found.push(value.clone()),
                None => missing.push(source.to_string()),
            }
        }

        let strategy = op.property("strategy").and_then(Value::as_str).unwrap_or("");
        let merged = merge_values(strategy, found);
        if let Some(output) = &op.output_path {
            write(&mut entry, data, output.as_str(), merged);
        }
        if !missing.is_empty() {
            entry.note = Some(format!("no data for sources: {}", missing.join(", ")));
        }
        entry
    }
}

/// Keeps array items that satisfy every condition. A single value either
/// passes through unchanged or is filtered out.
fn filter(op: &Operation, data: &mut DataSpace) -> TraceEntry {
    let mut entry = TraceEntry::new(&op.id, op.kind.name(), TraceStatus::Ok);
    let Some(input) = &op.input_path else {
        return skipped(entry, "no input path");
    };
    let Some(value) = data.get(input.as_str()).cloned() else {
        return skipped(entry, format!("no data at {}", input));
    };
    let passes = |record: &JsonValue, data: &DataSpace| {
        op.conditions
            .iter()
            .all(|c| condition::evaluate(c, Some(record), data))
    };

    match value {
        JsonValue::Array(items) => {
            let total = items.len();
            let kept: Vec<JsonValue> = items.into_iter().filter(|item| passes(item, &*data)).collect();
            entry.note = Some(format!("kept {} of {}", kept.len(), total));
            if let Some(output) = &op.output_path {
                write(&mut entry, data, output.as_str(), JsonValue::Array(kept));
            }
            entry
        }
        single if passes(&single, &*data) => {
            if let Some(output) = &op.output_path {
                write(&mut entry, data, output.as_str(), single);
            }
            entry.with_note("passed")
        }
        _ => skipped(entry, "filtered out"),
    }
}

/// Uses a mock response already present at the output path, otherwise writes a placeholder.
fn api_call(op: &Operation, data: &mut DataSpace) -> TraceEntry {
    let mut entry = effect_only(op, data);
    if entry.status != TraceStatus::Ok {
        return entry;
    }
    if let Some(output) = &op.output_path {
        match data.get(output.as_str()).cloned() {
            Some(mock) => {
                entry.produced.push(PathWrite {
                    path: output.to_string(),
                    value: mock,
                });
                entry.note = Some("effect recorded; using mock response".to_string());
            }
            None => {
                let mut placeholder = Map::new();
                placeholder.insert("_simulated".into(), JsonValue::Bool(true));
                placeholder.insert("operation".into(), JsonValue::from(op.kind.name()));
                for key in ["method", "url"] {
                    if let Some(Value::String(s)) = op.property(key) {
                        placeholder.insert(key.into(), JsonValue::from(s.as_str()));
                    }
                }
                write(&mut entry, data, output.as_str(), JsonValue::Object(placeholder));
            }
        }
    }
    entry
}

/// Records the effect with the operation's declared parameters and performs nothing.
fn effect_only(op: &Operation, data: &DataSpace) -> TraceEntry {
    let entry = TraceEntry::new(&op.id, op.kind.name(), TraceStatus::Ok);
    let mut parameters = match declared_parameters(op) {
        Ok(parameters) => parameters,
        Err(note) => return error(entry, note),
    };
    if let Some(input) = &op.input_path {
        if let Some(value) = data.get(input.as_str()) {
            parameters.insert("value".into(), value.clone());
        }
    }

    let note = match (&op.kind, op.property("duration")) {
        (OperationKind::Wait, Some(Value::Number(ms))) => format!("would wait {}ms", ms),
        (OperationKind::Wait, Some(duration)) => format!("would wait {}", duration),
        _ => "effect recorded".to_string(),
    };
    let mut entry = entry.with_note(note);
    entry.effect = Some(Effect {
        kind: op.kind.name().to_string(),
        parameters: JsonValue::Object(parameters),
    });
    entry
}

/// Data operations without a real implementation pass their input through
/// unchanged, or write a placeholder when they take no input.
fn pass_through(op: &Operation, data: &mut DataSpace) -> TraceEntry {
    let mut entry = TraceEntry::new(&op.id, op.kind.name(), TraceStatus::Ok);
    let value = match &op.input_path {
        Some(input) => match data.get(input.as_str()) {
            Some(value) => value.clone(),
            None => return skipped(entry, format!("no data at {}", input)),
        },
        None => {
            let mut placeholder = Map::new();
            placeholder.insert("_simulated".into(), JsonValue::Bool(true));
            placeholder.insert("operation".into(), JsonValue::from(op.kind.name()));
            JsonValue::Object(placeholder)
        }
    };
    if let Some(output) = &op.output_path {
        write(&mut entry, data, output.as_str(), value);
    }
    entry.with_note("simulated without transformation")
}

fn declared_parameters(op: &Operation) -> Result<Map<String, JsonValue>, String> {
    let body = lower_operation(op, TargetShape::List).map_err(|e| e.to_string())?;
    match body.into_iter().next() {
        Some((_, JsonValue::Object(config))) => Ok(config),
        _ => Ok(Map::new()),
    }
}

/// `concat` flattens arrays, `deepMerge` merges objects recursively, any
/// other strategy merges objects shallowly or collects the values in order.
fn merge_values(strategy: &str, values: Vec<JsonValue>) -> JsonValue {
    match strategy {
        "concat" => JsonValue::Array(
            values
                .into_iter()
                .flat_map(|v| match v {
                    JsonValue::Array(items) => items,
                    other => vec![other],
                })
                .collect(),
        ),
        _ if values.iter().all(JsonValue::is_object) && !values.is_empty() => {
            let deep = strategy == "deepMerge";
            let mut merged = JsonValue::Object(Map::new());
            for value in values {
                merge_into(&mut merged, value, deep);
            }
            merged
        }
        _ => JsonValue::Array(values),
    }
}

fn merge_into(target: &mut JsonValue, source: JsonValue, deep: bool) {
    match (target, source) {
        (JsonValue::Object(into), JsonValue::Object(from)) => {
            for (key, value) in from {
                match into.get_mut(&key) {
                    Some(existing) if deep && existing.is_object() && value.is_object() => {
                        merge_into(existing, value, deep)
                    }
                    _ => {
                        into.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

fn write(entry: &mut TraceEntry, data: &mut DataSpace, path: &str, value: JsonValue) {
    data.set(path, value.clone());
    entry.produced.push(PathWrite {
        path: path.to_string(),
        value,
    });
}

fn skipped(entry: TraceEntry, note: impl Into<String>) -> TraceEntry {
    let mut entry = entry.with_note(note);
    entry.status = TraceStatus::Skipped;
    entry
}

fn error(entry: TraceEntry, note: impl Into<String>) -> TraceEntry {
    tracing::warn!(operation = %entry.id, "simulation error");
    let mut entry = entry.with_note(note);
    entry.status = TraceStatus::Error;
    entry
}

fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
