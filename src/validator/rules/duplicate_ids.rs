use crate::ast::Span;
use crate::validator::{Finding, FindingKind, ValidationContext, ValidationRule};
use ahash::AHashMap;

/// Operation identifiers are unique within a workflow.
pub struct DuplicateIdRule;

impl ValidationRule for DuplicateIdRule {
    fn id(&self) -> &'static str {
        "duplicate-id"
    }

    fn description(&self) -> &'static str {
        "Operation identifiers must be unique"
    }

    fn check(&self, cx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        let mut first_seen: AHashMap<&str, Span> = AHashMap::new();
        for op in &cx.workflow.operations {
            match first_seen.get(op.id.as_str()) {
                Some(first) => {
                    let message = if first.is_synthetic() {
                        format!("Duplicate operation id '{}'", op.id)
                    } else {
                        format!("Duplicate operation id '{}' (first declared at {})", op.id, first)
                    };
                    findings.push(
                        Finding::new(FindingKind::DuplicateId, message)
                            .at(op.span)
                            .in_operation(op)
                            .naming([op.id.as_str()]),
                    );
                }
                None => {
                    first_seen.insert(&op.id, op.span);
                }
            }
        }
    }
}
