use crate::validator::{Finding, FindingKind, ValidationContext, ValidationRule};
use ahash::AHashMap;

/// The graph of run order, branch and loop-body edges is acyclic.
///
/// Depth-first search with three colours, started from each operation in
/// declaration order. The first back edge ends the search and yields one
/// finding naming the cycle in traversal order.
pub struct CycleRule;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Colour {
    InProgress,
    Done,
}

impl ValidationRule for CycleRule {
    fn id(&self) -> &'static str {
        "cycle"
    }

    fn description(&self) -> &'static str {
        "Run order, branch and loop edges must not form a cycle"
    }

    fn check(&self, cx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        let mut successors: AHashMap<&str, Vec<&str>> = AHashMap::new();
        for edge in cx.workflow.edges() {
            if cx.is_defined(edge.from) && cx.is_defined(edge.to) {
                successors.entry(edge.from).or_default().push(edge.to);
            }
        }

        let mut colours: AHashMap<&str, Colour> = AHashMap::new();
        for op in &cx.workflow.operations {
            if colours.contains_key(op.id.as_str()) {
                continue;
            }
            if let Some(cycle) = find_cycle(&op.id, &successors, &mut colours) {
                let span = cx.operation(cycle[0]).map(|op| op.span);
                let mut path = cycle.join(" -> ");
                path.push_str(" -> ");
                path.push_str(cycle[0]);

                let mut finding =
                    Finding::new(FindingKind::CycleDetected, format!("Cycle detected: {}", path))
                        .naming(cycle.iter().copied());
                if let Some(span) = span {
                    finding = finding.at(span);
                }
                findings.push(finding);
                return;
            }
        }
    }
}

/// Depth-first search from `root` with an explicit stack of (operation, next successor).
fn find_cycle<'a>(
    root: &'a str,
    successors: &AHashMap<&'a str, Vec<&'a str>>,
    colours: &mut AHashMap<&'a str, Colour>,
) -> Option<Vec<&'a str>> {
    let mut stack: Vec<(&'a str, usize)> = vec![(root, 0)];
    colours.insert(root, Colour::InProgress);

    while let Some(top) = stack.last_mut() {
        let id = top.0;
        let next = successors.get(id).and_then(|s| s.get(top.1)).copied();
        top.1 += 1;

        let Some(next) = next else {
            stack.pop();
            colours.insert(id, Colour::Done);
            continue;
        };
        match colours.get(next) {
            Some(Colour::InProgress) => {
                let start = stack.iter().position(|(s, _)| *s == next).unwrap_or(0);
                return Some(stack[start..].iter().map(|(s, _)| *s).collect());
            }
            Some(Colour::Done) => {}
            None => {
                colours.insert(next, Colour::InProgress);
                stack.push((next, 0));
            }
        }
    }
    None
}
