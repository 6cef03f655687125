use crate::ast::{Condition, Operator, Value};
use crate::validator::{Finding, FindingKind, ValidationContext, ValidationRule};

/// Condition operators are applied only to value kinds they can compare.
///
/// Path operands compare as their literal text, which every binary operator
/// accepts. Credentials are opaque and never comparable.
pub struct OperatorRule;

impl ValidationRule for OperatorRule {
    fn id(&self) -> &'static str {
        "incompatible-operator"
    }

    fn description(&self) -> &'static str {
        "Condition operators must suit the kind of value they compare against"
    }

    fn check(&self, cx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        for op in &cx.workflow.operations {
            let branch_condition = op.branch.as_ref().map(|b| &b.condition);
            for condition in op.conditions.iter().chain(branch_condition) {
                if let Some(reason) = incompatibility(condition) {
                    findings.push(
                        Finding::new(
                            FindingKind::IncompatibleOperator,
                            format!("Condition '{}' in '{}': {}", condition, op.id, reason),
                        )
                        .at(condition.span)
                        .in_operation(op),
                    );
                }
            }
        }
    }
}

/// Why `condition` cannot be evaluated, if it cannot.
pub fn incompatibility(condition: &Condition) -> Option<String> {
    let operator = condition.operator;
    let value = match (&condition.value, operator.is_unary()) {
        (None, true) => return None,
        (Some(_), true) => return Some(format!("'{}' takes no value", operator)),
        (None, false) => return Some(format!("'{}' requires a value", operator)),
        (Some(value), false) => value,
    };

    if value.contains_credential() {
        return Some("credentials cannot be compared".to_string());
    }

    let compatible = match (operator, value) {
        (_, Value::Path(_)) => true,
        (Operator::Eq | Operator::Ne, _) => true,
        (op, Value::Number(_) | Value::String(_)) if op.is_ordering() => true,
        (Operator::StartsWith | Operator::EndsWith, Value::String(_)) => true,
        (Operator::Contains, v) => v.is_scalar(),
        (Operator::In, Value::Array(_) | Value::String(_)) => true,
        _ => false,
    };

    (!compatible).then(|| {
        format!(
            "'{}' cannot be applied to a {} value",
            operator,
            value.type_name()
        )
    })
}
