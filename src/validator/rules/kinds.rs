use crate::ast::{Operation, OperationKind};
use crate::validator::{Finding, FindingKind, ValidationContext, ValidationRule};

/// Each operation's kind is known and carries the properties, paths and
/// clauses that kind requires.
pub struct KindRule;

impl ValidationRule for KindRule {
    fn id(&self) -> &'static str {
        "required-fields"
    }

    fn description(&self) -> &'static str {
        "Operation kinds must be registered and carry their required fields"
    }

    fn check(&self, cx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        for op in &cx.workflow.operations {
            let Some(spec) = cx.registry.get(op.kind.name()) else {
                findings.push(
                    Finding::new(
                        FindingKind::UnknownKind,
                        format!("Unknown operation kind '{}' for '{}'", op.kind, op.id),
                    )
                    .at(op.span)
                    .in_operation(op),
                );
                continue;
            };

            for key in &spec.required_properties {
                if op.property(key).is_none() {
                    findings.push(missing(op, format!("required property '{}'", key)));
                }
            }
            if spec.requires_input && op.input_path.is_none() {
                findings.push(missing(op, "an input path ('from')".to_string()));
            }
            if spec.requires_output && op.output_path.is_none() {
                findings.push(missing(op, "an output path ('->')".to_string()));
            }

            let clause = match op.kind {
                OperationKind::FilterData if op.conditions.is_empty() => {
                    Some("filter conditions ('where')")
                }
                OperationKind::Conditional if op.branch.is_none() => Some("a condition ('if')"),
                OperationKind::Loop if op.body.as_ref().is_none_or(|body| body.is_empty()) => {
                    Some("a loop body ('operations: [...]')")
                }
                _ => None,
            };
            if let Some(clause) = clause {
                findings.push(missing(op, clause.to_string()));
            }
        }
    }
}

fn missing(op: &Operation, what: String) -> Finding {
    Finding::new(
        FindingKind::MissingRequiredField,
        format!("{} '{}' is missing {}", op.kind, op.id, what),
    )
    .at(op.span)
    .in_operation(op)
}
