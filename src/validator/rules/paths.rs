use crate::ast::{Condition, FieldRef, Operation, Path, Span};
use crate::validator::{Finding, FindingKind, ValidationContext, ValidationRule};

/// Paths are non-empty, start at the root and contain no empty segment.
pub struct PathRule;

impl ValidationRule for PathRule {
    fn id(&self) -> &'static str {
        "invalid-path"
    }

    fn description(&self) -> &'static str {
        "Paths must be absolute and slash-delimited with non-empty segments"
    }

    fn check(&self, cx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        for op in &cx.workflow.operations {
            let mut report = |path: &Path, location: &str, span: Span| {
                if !path.is_well_formed() {
                    findings.push(invalid(op, path, location, span));
                }
            };

            if let Some(path) = &op.input_path {
                report(path, "input path", op.span);
            }
            if let Some(path) = &op.output_path {
                report(path, "output path", op.span);
            }
            for condition in &op.conditions {
                check_condition(condition, "condition", &mut report);
            }
            if let Some(branch) = &op.branch {
                check_condition(&branch.condition, "if condition", &mut report);
            }
            for prop in &op.properties {
                let location = format!("property '{}'", prop.key);
                prop.value
                    .for_each_path(&mut |path| report(path, &location, prop.span));
            }
        }
    }
}

fn check_condition(
    condition: &Condition,
    location: &str,
    report: &mut impl FnMut(&Path, &str, Span),
) {
    if let FieldRef::Path(path) = &condition.field {
        report(path, location, condition.span);
    }
    if let Some(value) = &condition.value {
        value.for_each_path(&mut |path| report(path, location, condition.span));
    }
}

fn invalid(op: &Operation, path: &Path, location: &str, span: Span) -> Finding {
    Finding::new(
        FindingKind::InvalidPath,
        format!(
            "Invalid path '{}' in {} of '{}': paths start with '/' and have no empty segments",
            path, location, op.id
        ),
    )
    .at(span)
    .in_operation(op)
}
