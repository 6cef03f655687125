use crate::ast::{Condition, FieldRef, Operator};
use crate::compiler::lower_value;
use crate::data::DataSpace;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// Evaluates one condition. Total over every operator and every input.
///
/// Bare field names are read from `record` (the item under test) or, without
/// one, from the top of the data space. Right-hand values, paths included,
/// are literals: `url == /home` compares against the text `/home`. An absent
/// left-hand side makes `exists` false, `empty` true, and every other
/// operator false.
pub fn evaluate(condition: &Condition, record: Option<&JsonValue>, data: &DataSpace) -> bool {
    let actual = match &condition.field {
        FieldRef::Path(path) => data.get(path.as_str()),
        FieldRef::Field(name) => lookup_field(record.unwrap_or(data.document()), name),
    };
    let expected = match &condition.value {
        None => None,
        Some(value) => lower_value(value, "", "condition").ok(),
    };
    apply(condition.operator, actual, expected.as_ref())
}

/// `a.b.0` walks objects and arrays.
pub fn lookup_field<'a>(value: &'a JsonValue, name: &str) -> Option<&'a JsonValue> {
    name.split('.').try_fold(value, |current, segment| match current {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

pub fn apply(operator: Operator, actual: Option<&JsonValue>, expected: Option<&JsonValue>) -> bool {
    match operator {
        Operator::Exists => actual.is_some_and(|v| !v.is_null()),
        Operator::Empty => actual.is_none_or(is_empty),
        _ => match (actual, expected) {
            (Some(a), Some(e)) => compare(operator, a, e),
            _ => false,
        },
    }
}

fn compare(operator: Operator, actual: &JsonValue, expected: &JsonValue) -> bool {
    match operator {
        Operator::Eq => loose_eq(actual, expected),
        Operator::Ne => !loose_eq(actual, expected),
        Operator::Gt => ordering(actual, expected) == Some(Ordering::Greater),
        Operator::Lt => ordering(actual, expected) == Some(Ordering::Less),
        Operator::Ge => matches!(
            ordering(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Le => matches!(
            ordering(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::StartsWith => match (actual.as_str(), expected.as_str()) {
            (Some(a), Some(e)) => a.starts_with(e),
            _ => false,
        },
        Operator::EndsWith => match (actual.as_str(), expected.as_str()) {
            (Some(a), Some(e)) => a.ends_with(e),
            _ => false,
        },
        Operator::Contains => match actual {
            JsonValue::String(s) => expected.as_str().is_some_and(|e| s.contains(e)),
            JsonValue::Array(items) => items.iter().any(|item| loose_eq(item, expected)),
            JsonValue::Object(map) => expected.as_str().is_some_and(|k| map.contains_key(k)),
            _ => false,
        },
        Operator::In => match expected {
            JsonValue::Array(items) => items.iter().any(|item| loose_eq(actual, item)),
            JsonValue::String(s) => actual.as_str().is_some_and(|a| s.contains(a)),
            _ => false,
        },
        Operator::Exists | Operator::Empty => apply(operator, Some(actual), Some(expected)),
    }
}

/// Numbers compare by value, so `1` equals `1.0`.
fn loose_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn ordering(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(_), JsonValue::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn is_empty(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
        JsonValue::Bool(_) | JsonValue::Number(_) => false,
    }
}
