//! Wire messages back to a [`Workflow`] and to source text.
//!
//! Reconstruction reverses the compilers' structural mapping; rendering is a
//! fixed pretty-printer over the rebuilt AST. Comments and layout of any
//! original source are not recoverable, and the legacy format only carries the
//! run root, so a legacy stream decompiles to `run: <root>`. Re-parsing and
//! recompiling the output reproduces the same operations, properties and run
//! order in the same format.
mod printer;

pub use printer::render;

use crate::ast::{
    Branch, Condition, FieldRef, Operation, OperationKind, Operator, Path, Property, Reference,
    ReferenceRole, RunSpec, Span, Value, Workflow, is_identifier,
};
use crate::compiler::{LegacyMessage, OperationBody, SpecMessage, WireFormat};
use crate::error::DecompileError;
use ahash::AHashSet;
use serde_json::Value as JsonValue;

/// Decompiles compact or pretty JSONL to source text.
pub fn decompile(text: &str) -> Result<String, DecompileError> {
    let workflow = reconstruct(text)?;
    Ok(render(&workflow))
}

/// Rebuilds the workflow described by a JSONL message stream.
pub fn reconstruct(text: &str) -> Result<Workflow, DecompileError> {
    let messages = read_messages(text)?;
    let format = detect_format(&messages)?;
    let (name, declared, order) = match format {
        WireFormat::Legacy => read_legacy(&messages)?,
        WireFormat::Spec => read_spec(&messages)?,
    };

    let operations = declared
        .into_iter()
        .map(|(message, id, body)| rebuild_operation(message, id, &body))
        .collect::<Result<Vec<_>, _>>()?;

    let run = RunSpec {
        order: order
            .into_iter()
            .map(|id| Reference::new(id, Span::synthetic()))
            .collect(),
        span: Span::synthetic(),
    };
    let workflow = Workflow {
        name,
        operations,
        run,
        span: Span::synthetic(),
    };
    check_references(&workflow)?;

    tracing::debug!(
        workflow = %workflow.name,
        format = %format,
        operations = workflow.operations.len(),
        "reconstructed workflow"
    );
    Ok(workflow)
}

/// `(message number, operation id, body)` for each declared operation.
type Declared = Vec<(usize, String, OperationBody)>;

/// Messages are numbered from 1.
fn read_messages(text: &str) -> Result<Vec<JsonValue>, DecompileError> {
    let mut messages = Vec::new();
    for (i, item) in serde_json::Deserializer::from_str(text)
        .into_iter::<JsonValue>()
        .enumerate()
    {
        let value = item.map_err(|e| unrecognized(i + 1, format!("invalid JSON: {}", e)))?;
        messages.push(value);
    }
    if messages.is_empty() {
        return Err(unrecognized(0, "no messages"));
    }
    Ok(messages)
}

fn detect_format(messages: &[JsonValue]) -> Result<WireFormat, DecompileError> {
    let mut seen_legacy = false;
    let mut seen_spec = false;
    for (i, message) in messages.iter().enumerate() {
        let Some(object) = message.as_object() else {
            return Err(unrecognized(i + 1, "not a JSON object"));
        };
        let legacy = object.contains_key("operationUpdate") || object.contains_key("beginExecution");
        let spec = object.contains_key("type");
        match (legacy, spec) {
            (true, true) => return Err(DecompileError::AmbiguousFormat),
            (true, false) => seen_legacy = true,
            (false, true) => seen_spec = true,
            (false, false) => {
                return Err(unrecognized(
                    i + 1,
                    "neither a legacy nor a protocol message",
                ));
            }
        }
    }
    match (seen_legacy, seen_spec) {
        (true, true) => Err(DecompileError::AmbiguousFormat),
        (true, false) => Ok(WireFormat::Legacy),
        _ => Ok(WireFormat::Spec),
    }
}

fn read_legacy(messages: &[JsonValue]) -> Result<(String, Declared, Vec<String>), DecompileError> {
    let mut name: Option<String> = None;
    let mut declared = Vec::new();
    let mut root: Option<String> = None;

    for (i, message) in messages.iter().enumerate() {
        let number = i + 1;
        let parsed: LegacyMessage = serde_json::from_value(message.clone())
            .map_err(|e| unrecognized(number, e.to_string()))?;
        match parsed {
            LegacyMessage::OperationUpdate(update) => {
                name.get_or_insert(update.workflow_id);
                for op in update.operations {
                    declared.push((number, op.id, op.operation));
                }
            }
            LegacyMessage::BeginExecution(begin) => {
                if root.is_some() {
                    return Err(unrecognized(number, "second beginExecution message"));
                }
                name.get_or_insert(begin.workflow_id);
                root = Some(begin.root);
            }
        }
    }

    let root = root.ok_or_else(|| unrecognized(messages.len(), "missing beginExecution message"))?;
    Ok((name.unwrap_or_default(), declared, vec![root]))
}

fn read_spec(messages: &[JsonValue]) -> Result<(String, Declared, Vec<String>), DecompileError> {
    let mut declared = Vec::new();
    let mut begin: Option<(String, Vec<String>)> = None;

    for (i, message) in messages.iter().enumerate() {
        let number = i + 1;
        let parsed: SpecMessage = serde_json::from_value(message.clone())
            .map_err(|e| unrecognized(number, e.to_string()))?;
        match parsed {
            SpecMessage::OperationUpdate {
                operation_id,
                operation,
            } => declared.push((number, operation_id, operation)),
            SpecMessage::BeginExecution {
                execution_id,
                operation_order,
            } => {
                if begin.is_some() {
                    return Err(unrecognized(number, "second beginExecution message"));
                }
                if operation_order.is_empty() {
                    return Err(unrecognized(number, "empty operationOrder"));
                }
                begin = Some((execution_id, operation_order));
            }
        }
    }

    let (name, order) =
        begin.ok_or_else(|| unrecognized(messages.len(), "missing beginExecution message"))?;
    Ok((name, declared, order))
}

fn rebuild_operation(
    message: usize,
    id: String,
    body: &OperationBody,
) -> Result<Operation, DecompileError> {
    if !is_identifier(&id) {
        return Err(unrecognized(
            message,
            format!("operation id '{}' is not an identifier", id),
        ));
    }
    let mut entries = body.iter();
    let (kind, config) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(unrecognized(
                message,
                format!("operation '{}' must name exactly one kind", id),
            ));
        }
    };
    if !is_identifier(kind) {
        return Err(unrecognized(
            message,
            format!("operation kind '{}' is not an identifier", kind),
        ));
    }
    let Some(config) = config.as_object() else {
        return Err(unrecognized(
            message,
            format!("configuration of '{}' is not an object", id),
        ));
    };

    let mut op = Operation::new(id, OperationKind::from_name(kind));
    let mut condition = None;
    let mut if_true = None;
    let mut if_false = None;

    for (key, value) in config {
        match key.as_str() {
            "inputPath" => op.input_path = Some(path_of(message, key, value)?),
            "outputPath" => op.output_path = Some(path_of(message, key, value)?),
            "conditions" => {
                let items = value
                    .as_array()
                    .ok_or_else(|| unrecognized(message, "'conditions' is not an array"))?;
                op.conditions = items
                    .iter()
                    .map(|c| condition_of(message, c, "field"))
                    .collect::<Result<_, _>>()?;
            }
            "condition" => condition = Some(condition_of(message, value, "path")?),
            "ifTrue" => if_true = Some(targets_of(message, key, value)?),
            "ifFalse" => if_false = Some(targets_of(message, key, value)?),
            "operations" if op.kind == OperationKind::Loop && lists_identifiers(value) => {
                op.body = Some(targets_of(message, key, value)?)
            }
            _ => op.properties.push(Property {
                key: key.clone(),
                value: value_from_json(value),
                span: Span::synthetic(),
            }),
        }
    }

    match (condition, if_true) {
        (Some(condition), Some(if_true)) => {
            op.branch = Some(Branch {
                condition,
                if_true,
                if_false,
                span: Span::synthetic(),
            });
        }
        (None, None) if if_false.is_none() => {}
        _ => {
            return Err(unrecognized(
                message,
                format!("'{}' needs both 'condition' and 'ifTrue'", op.id),
            ));
        }
    }
    Ok(op)
}

fn path_of(message: usize, key: &str, value: &JsonValue) -> Result<Path, DecompileError> {
    match value.as_str() {
        Some(raw) if reads_as_path(raw) => Ok(Path::new(raw)),
        _ => Err(unrecognized(message, format!("'{}' is not a path", key))),
    }
}

fn condition_of(
    message: usize,
    value: &JsonValue,
    field_key: &str,
) -> Result<Condition, DecompileError> {
    let object = value
        .as_object()
        .ok_or_else(|| unrecognized(message, "condition is not an object"))?;
    let field = object
        .get(field_key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| unrecognized(message, format!("condition has no '{}'", field_key)))?;
    let symbol = object
        .get("operator")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| unrecognized(message, "condition has no 'operator'"))?;
    let operator = Operator::from_symbol(symbol)
        .ok_or_else(|| unrecognized(message, format!("unknown operator '{}'", symbol)))?;

    let field = FieldRef::from_wire(field);
    let readable = match &field {
        FieldRef::Path(path) => reads_as_path(path.as_str()),
        FieldRef::Field(name) => is_identifier(name),
    };
    if !readable {
        return Err(unrecognized(
            message,
            format!("condition field '{}' is neither a path nor a name", field),
        ));
    }

    Ok(Condition {
        field,
        operator,
        value: object.get("value").map(value_from_json),
        span: Span::synthetic(),
    })
}

/// A bare string or an array of strings.
fn targets_of(message: usize, key: &str, value: &JsonValue) -> Result<Vec<Reference>, DecompileError> {
    let ids: Vec<&str> = match value {
        JsonValue::String(id) => vec![id.as_str()],
        JsonValue::Array(items) => items
            .iter()
            .map(JsonValue::as_str)
            .collect::<Option<_>>()
            .ok_or_else(|| unrecognized(message, format!("'{}' must list identifiers", key)))?,
        _ => return Err(unrecognized(message, format!("'{}' must list identifiers", key))),
    };
    ids.into_iter()
        .map(|id| {
            if is_identifier(id) {
                Ok(Reference::new(id, Span::synthetic()))
            } else {
                Err(unrecognized(
                    message,
                    format!("'{}' in '{}' is not an identifier", id, key),
                ))
            }
        })
        .collect()
}

fn lists_identifiers(value: &JsonValue) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().all(|item| item.as_str().is_some_and(is_identifier)))
}

/// Strings that read back as paths become paths; `{"credentialRef": {"id": ..}}`
/// becomes a credential.
pub fn value_from_json(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
        JsonValue::String(s) if reads_as_path(s) => Value::Path(Path::new(s.as_str())),
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::Array(items.iter().map(value_from_json).collect()),
        JsonValue::Object(map) => {
            if let Some(id) = credential_id(value) {
                return Value::Credential(id.to_string());
            }
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), value_from_json(v)))
                    .collect(),
            )
        }
    }
}

fn credential_id(value: &JsonValue) -> Option<&str> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    let reference = object.get("credentialRef")?.as_object()?;
    if reference.len() != 1 {
        return None;
    }
    reference.get("id")?.as_str()
}

/// Only strings the parser would read back as one path.
fn reads_as_path(s: &str) -> bool {
    Path::new(s).is_well_formed()
        && !s.contains("->")
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '.' | '-'))
}

fn check_references(workflow: &Workflow) -> Result<(), DecompileError> {
    let declared: AHashSet<&str> = workflow.operations.iter().map(|op| op.id.as_str()).collect();
    for id in workflow.run.ids() {
        if !declared.contains(id) {
            return Err(DecompileError::DanglingReference {
                id: id.to_string(),
                referrer: "the run order".to_string(),
            });
        }
    }
    for op in &workflow.operations {
        for (role, id, _) in op.references() {
            if role != ReferenceRole::MergeSource && !declared.contains(id) {
                return Err(DecompileError::DanglingReference {
                    id: id.to_string(),
                    referrer: format!("the {} of '{}'", role, op.id),
                });
            }
        }
    }
    Ok(())
}

fn unrecognized(message: usize, reason: impl Into<String>) -> DecompileError {
    DecompileError::UnrecognizedMessageShape {
        message,
        reason: reason.into(),
    }
}
