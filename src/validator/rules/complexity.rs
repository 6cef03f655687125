use crate::ast::Operation;
use crate::validator::{Finding, FindingKind, ValidationContext, ValidationRule};
use ahash::{AHashMap, AHashSet};

/// Size bounds for generated input. Only limits that are set are checked.
pub struct ComplexityRule;

impl ValidationRule for ComplexityRule {
    fn id(&self) -> &'static str {
        "complexity"
    }

    fn description(&self) -> &'static str {
        "Operation count, nesting depth and conditions per operation stay within limits"
    }

    fn check(&self, cx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        let limits = cx.limits;

        if let Some(max) = limits.max_operations {
            let count = cx.workflow.operations.len();
            if count > max {
                findings.push(Finding::new(
                    FindingKind::ComplexityExceeded,
                    format!("Workflow has {} operations; maximum allowed is {}", count, max),
                ));
            }
        }

        if let Some(max) = limits.max_conditions_per_operation {
            for op in &cx.workflow.operations {
                let count = condition_count(op);
                if count > max {
                    findings.push(
                        Finding::new(
                            FindingKind::ComplexityExceeded,
                            format!(
                                "Operation '{}' has {} conditions; maximum allowed is {}",
                                op.id, count, max
                            ),
                        )
                        .at(op.span)
                        .in_operation(op),
                    );
                }
            }
        }

        if let Some(max) = limits.max_depth {
            let mut memo = AHashMap::new();
            let mut deepest: Option<(&Operation, usize)> = None;
            for op in &cx.workflow.operations {
                let depth = nesting_depth(&op.id, cx, &mut memo);
                if deepest.is_none_or(|(_, d)| depth > d) {
                    deepest = Some((op, depth));
                }
            }
            if let Some((op, depth)) = deepest.filter(|(_, depth)| *depth > max) {
                findings.push(
                    Finding::new(
                        FindingKind::ComplexityExceeded,
                        format!(
                            "Workflow reaches nesting depth {} at '{}'; maximum allowed is {}",
                            depth, op.id, max
                        ),
                    )
                    .at(op.span)
                    .in_operation(op),
                );
            }
        }
    }
}

/// `where` conditions plus the branch condition.
fn condition_count(op: &Operation) -> usize {
    op.conditions.len() + usize::from(op.branch.is_some())
}

/// Operations nested directly under a control operation.
fn nested<'a>(op: &'a Operation) -> impl Iterator<Item = &'a str> {
    op.branch
        .iter()
        .flat_map(|b| b.if_true.iter().chain(b.if_false.iter().flatten()))
        .chain(op.body.iter().flatten())
        .map(|r| r.id.as_str())
}

/// A control operation is one level deeper than the deepest operation it nests.
/// Back edges count as leaves; the cycle rule reports them.
///
/// Post-order walk over an explicit stack of (operation, next nested index).
fn nesting_depth<'a>(
    root: &'a str,
    cx: &ValidationContext<'a>,
    memo: &mut AHashMap<&'a str, usize>,
) -> usize {
    if let Some(depth) = memo.get(root) {
        return *depth;
    }
    match cx.operation(root) {
        None => return 0,
        Some(op) if !op.is_control() => {
            memo.insert(root, 0);
            return 0;
        }
        Some(_) => {}
    }

    let mut visiting: AHashSet<&'a str> = AHashSet::new();
    let mut stack: Vec<(&'a Operation, usize)> = Vec::new();
    if let Some(op) = cx.operation(root) {
        visiting.insert(root);
        stack.push((op, 0));
    }

    while let Some(top) = stack.last_mut() {
        let op = top.0;
        let child = nested(op).nth(top.1);
        top.1 += 1;

        match child {
            Some(id) => {
                if memo.contains_key(id) || visiting.contains(id) {
                    continue;
                }
                match cx.operation(id) {
                    Some(child) if child.is_control() => {
                        visiting.insert(id);
                        stack.push((child, 0));
                    }
                    Some(_) => {
                        memo.insert(id, 0);
                    }
                    None => {}
                }
            }
            None => {
                let deepest = nested(op)
                    .map(|id| memo.get(id).copied().unwrap_or(0))
                    .max()
                    .unwrap_or(0);
                visiting.remove(op.id.as_str());
                memo.insert(op.id.as_str(), deepest + 1);
                stack.pop();
            }
        }
    }
    memo.get(root).copied().unwrap_or(0)
}
