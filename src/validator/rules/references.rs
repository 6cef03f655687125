use crate::validator::{Finding, FindingKind, ValidationContext, ValidationRule};

/// Every referenced identifier resolves to a declared operation.
pub struct ReferenceRule;

impl ValidationRule for ReferenceRule {
    fn id(&self) -> &'static str {
        "unresolved-reference"
    }

    fn description(&self) -> &'static str {
        "Run order, branch targets, loop bodies and merge sources must name declared operations"
    }

    fn check(&self, cx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        for op in &cx.workflow.operations {
            for (role, id, span) in op.references() {
                if !cx.is_defined(id) {
                    findings.push(
                        Finding::new(
                            FindingKind::UnresolvedReference,
                            format!(
                                "Operation '{}' referenced in the {} of '{}' is not defined",
                                id, role, op.id
                            ),
                        )
                        .at(span)
                        .in_operation(op)
                        .naming([id]),
                    );
                }
            }
        }

        for reference in &cx.workflow.run.order {
            if !cx.is_defined(&reference.id) {
                findings.push(
                    Finding::new(
                        FindingKind::UnresolvedReference,
                        format!("Operation '{}' in the run order is not defined", reference.id),
                    )
                    .at(reference.span)
                    .naming([reference.id.as_str()]),
                );
            }
        }
    }
}
