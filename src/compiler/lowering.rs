use crate::ast::{Condition, Operation, Reference, Value};
use crate::error::CompileError;
use serde_json::{Map, Value as JsonValue};

use super::message::OperationBody;

/// How branch targets are written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetShape {
    /// A bare string for one target, an array otherwise.
    Collapsed,
    /// Always an array.
    List,
}

/// Integers up to 2^53 are written without a fraction.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Builds `{ "<Kind>": { ...config... } }` for one operation.
///
/// Config keys are written in a fixed order: `inputPath`, `outputPath`,
/// `conditions`, `condition`, `ifTrue`, `ifFalse`, `operations` (loop body),
/// then the declared properties in declaration order.
pub(crate) fn lower_operation(
    op: &Operation,
    shape: TargetShape,
) -> Result<OperationBody, CompileError> {
    let mut config = Map::new();

    if let Some(path) = &op.input_path {
        config.insert("inputPath".into(), JsonValue::from(path.as_str()));
    }
    if let Some(path) = &op.output_path {
        config.insert("outputPath".into(), JsonValue::from(path.as_str()));
    }
    if !op.conditions.is_empty() {
        let conditions = op
            .conditions
            .iter()
            .map(|c| lower_condition(c, "field", &op.id))
            .collect::<Result<Vec<_>, _>>()?;
        config.insert("conditions".into(), JsonValue::Array(conditions));
    }
    if let Some(branch) = &op.branch {
        config.insert(
            "condition".into(),
            lower_condition(&branch.condition, "path", &op.id)?,
        );
        config.insert("ifTrue".into(), lower_targets(&branch.if_true, shape));
        if let Some(if_false) = &branch.if_false {
            config.insert("ifFalse".into(), lower_targets(if_false, shape));
        }
    }
    if let Some(body) = &op.body {
        let ids = body.iter().map(|r| JsonValue::from(r.id.as_str())).collect();
        config.insert("operations".into(), JsonValue::Array(ids));
    }
    for prop in &op.properties {
        config.insert(prop.key.clone(), lower_value(&prop.value, &op.id, &prop.key)?);
    }

    let mut body = Map::new();
    body.insert(op.kind.name().to_string(), JsonValue::Object(config));
    Ok(body)
}

fn lower_condition(
    condition: &Condition,
    field_key: &str,
    operation: &str,
) -> Result<JsonValue, CompileError> {
    let mut out = Map::new();
    out.insert(field_key.into(), JsonValue::from(condition.field.as_str()));
    out.insert("operator".into(), JsonValue::from(condition.operator.symbol()));
    if let Some(value) = &condition.value {
        out.insert("value".into(), lower_value(value, operation, "condition")?);
    }
    Ok(JsonValue::Object(out))
}

fn lower_targets(targets: &[Reference], shape: TargetShape) -> JsonValue {
    match (shape, targets) {
        (TargetShape::Collapsed, [single]) => JsonValue::from(single.id.as_str()),
        _ => targets.iter().map(|r| JsonValue::from(r.id.as_str())).collect(),
    }
}

/// Lowers a value to JSON. Paths become raw strings and credentials become
/// `{"credentialRef": {"id": ...}}`.
pub fn lower_value(value: &Value, operation: &str, key: &str) -> Result<JsonValue, CompileError> {
    Ok(match value {
        Value::String(s) => JsonValue::from(s.as_str()),
        Value::Number(n) => lower_number(*n).ok_or_else(|| CompileError::NonFiniteNumber {
            operation: operation.to_string(),
            key: key.to_string(),
        })?,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Null => JsonValue::Null,
        Value::Path(p) => JsonValue::from(p.as_str()),
        Value::Credential(id) => {
            let mut reference = Map::new();
            reference.insert("id".into(), JsonValue::from(id.as_str()));
            let mut out = Map::new();
            out.insert("credentialRef".into(), JsonValue::Object(reference));
            JsonValue::Object(out)
        }
        Value::Object(entries) => {
            let mut out = Map::new();
            for (k, v) in entries {
                out.insert(k.clone(), lower_value(v, operation, key)?);
            }
            JsonValue::Object(out)
        }
        Value::Array(items) => JsonValue::Array(
            items
                .iter()
                .map(|v| lower_value(v, operation, key))
                .collect::<Result<_, _>>()?,
        ),
    })
}

fn lower_number(n: f64) -> Option<JsonValue> {
    if !n.is_finite() {
        None
    } else if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        Some(JsonValue::from(n as i64))
    } else {
        serde_json::Number::from_f64(n).map(JsonValue::Number)
    }
}
