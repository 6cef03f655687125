//! Mermaid flowchart export of a workflow's operation graph.
use crate::ast::{EdgeClass, Operation, OperationKind, Workflow};
use itertools::Itertools;

/// Renders the workflow as a top-down Mermaid flowchart.
///
/// Nodes come first in declaration order, then data-flow edges (an operation
/// reading a path another one writes), then branch and loop edges, then the
/// run order as dotted `next` edges. Class definitions colour control flow
/// and side-effecting operations.
pub fn to_mermaid(workflow: &Workflow) -> String {
    let mut output = String::from("graph TD\n");

    for op in &workflow.operations {
        output.push_str(&format!("    {}\n", node(op)));
    }

    for producer in &workflow.operations {
        let Some(written) = &producer.output_path else {
            continue;
        };
        for consumer in &workflow.operations {
            if consumer.id == producer.id {
                continue;
            }
            if consumer.input_path.as_ref() == Some(written) {
                output.push_str(&format!(
                    "    {} -->|\"{}\"| {}\n",
                    producer.id, written, consumer.id
                ));
            }
        }
    }

    for edge in workflow.edges() {
        let arrow = match edge.class {
            EdgeClass::RunOrder => "-.->",
            _ => "-->",
        };
        output.push_str(&format!(
            "    {} {}|{}| {}\n",
            edge.from,
            arrow,
            edge.class.label(),
            edge.to
        ));
    }

    output.push_str(&format!("    classDef control {}\n", CONTROL_STYLE));
    output.push_str(&format!("    classDef effect {}\n", EFFECT_STYLE));
    for (class, ids) in [
        ("control", ids_where(workflow, Operation::is_control)),
        ("effect", ids_where(workflow, |op| op.kind.is_effect())),
    ] {
        if !ids.is_empty() {
            output.push_str(&format!("    class {} {}\n", ids, class));
        }
    }
    output
}

const CONTROL_STYLE: &str = "fill:#fff4dd,stroke:#d49b00";
const EFFECT_STYLE: &str = "fill:#e8f0ff,stroke:#3b6fd4";

fn ids_where(workflow: &Workflow, keep: impl Fn(&Operation) -> bool) -> String {
    workflow
        .operations
        .iter()
        .filter(|op| keep(op))
        .map(|op| op.id.as_str())
        .join(",")
}

/// Conditionals are diamonds, loops circles and API calls parallelograms.
fn node(op: &Operation) -> String {
    let label = format!("{}: {}", op.id, op.kind).replace('"', "#quot;");
    match op.kind {
        OperationKind::Conditional => format!("{}{{\"{}\"}}", op.id, label),
        OperationKind::Loop => format!("{}((\"{}\"))", op.id, label),
        OperationKind::ApiCall => format!("{}[/\"{}\"/]", op.id, label),
        _ => format!("{}[\"{}\"]", op.id, label),
    }
}

