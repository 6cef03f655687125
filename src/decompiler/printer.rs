use crate::ast::value::{Key, Quoted};
use crate::ast::{Operation, Reference, Value, Workflow};
use itertools::Itertools;

const INDENT: &str = "  ";

/// Object values longer than this are written one entry per line.
const INLINE_WIDTH: usize = 72;

/// Renders a workflow as source text.
///
/// Each operation writes its clauses in the wire order (`from`, `->`, `where`,
/// `if`, loop body) followed by its properties in declaration order. The
/// output always ends with the run statement and a newline.
pub fn render(workflow: &Workflow) -> String {
    let mut out = format!("workflow {}\n\n", Quoted(&workflow.name));

    for op in &workflow.operations {
        render_operation(&mut out, op);
        out.push('\n');
    }

    out.push_str("run: ");
    out.push_str(&workflow.run.ids().join(" -> "));
    out.push('\n');
    out
}

fn render_operation(out: &mut String, op: &Operation) {
    let mut lines = Vec::new();

    if let Some(path) = &op.input_path {
        lines.push(format!("from {}", path));
    }
    if let Some(path) = &op.output_path {
        lines.push(format!("-> {}", path));
    }
    if !op.conditions.is_empty() {
        lines.push(format!("where {}", op.conditions.iter().join(", ")));
    }
    if let Some(branch) = &op.branch {
        let mut line = format!("if {} then {}", branch.condition, targets(&branch.if_true));
        if let Some(if_false) = &branch.if_false {
            line.push_str(" else ");
            line.push_str(&targets(if_false));
        }
        lines.push(line);
    }
    if let Some(body) = &op.body {
        lines.push(format!("operations: [{}]", targets(body)));
    }
    for prop in &op.properties {
        let mut line = format!("{}: ", Key(&prop.key));
        render_value(&mut line, &prop.value, 1);
        lines.push(line);
    }

    out.push_str(&format!("{} = {} {{", op.id, op.kind));
    if lines.is_empty() {
        out.push_str("}\n");
        return;
    }
    out.push('\n');
    for line in lines {
        out.push_str(INDENT);
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str("}\n");
}

fn targets(refs: &[Reference]) -> String {
    refs.iter().map(|r| r.id.as_str()).join(", ")
}

/// Wide objects break across lines; everything else uses the inline form.
fn render_value(out: &mut String, value: &Value, depth: usize) {
    let inline = value.to_string();
    let entries = match value {
        Value::Object(entries) if inline.len() > INLINE_WIDTH => entries,
        _ => {
            out.push_str(&inline);
            return;
        }
    };

    out.push_str("{\n");
    for (key, item) in entries {
        out.push_str(&format!("{}{}: ", INDENT.repeat(depth + 1), Key(key)));
        render_value(out, item, depth + 1);
        out.push('\n');
    }
    out.push_str(&INDENT.repeat(depth));
    out.push('}');
}
