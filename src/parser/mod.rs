//! Source text to [`Workflow`].
//!
//! The grammar lives in `a2e.pest`; this module walks the resulting pairs into
//! the AST and applies the checks a grammar cannot express (reserved words,
//! duplicate properties and clauses, escapes, number range). Parsing is
//! fail-fast: the first error is returned with the span of the offending
//! token. Referential integrity, kinds and operator/value compatibility are
//! left to the validator.
mod errors;

use crate::ast::{
    Branch, Condition, FieldRef, Operation, OperationKind, Operator, Path, Property, Reference,
    RunSpec, Span, Value, Workflow, is_reserved,
};
use crate::error::ParseError;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "parser/a2e.pest"]
struct A2eParser;

/// Property keys owned by the structural clauses.
const RESERVED_KEYS: &[&str] = &[
    "inputPath",
    "outputPath",
    "conditions",
    "condition",
    "ifTrue",
    "ifFalse",
];

/// Nesting limit for braces and brackets, operation bodies included.
const MAX_NESTING: usize = 128;

/// Parses one workflow source file.
pub fn parse(source: &str) -> Result<Workflow, ParseError> {
    errors::check_nesting(source, MAX_NESTING)?;
    let file = A2eParser::parse(Rule::file, source)
        .map_err(|err| errors::from_pest(&err, source))?
        .next()
        .ok_or_else(|| ParseError::new(Span::new(1, 1, 0), "Empty source"))?;
    let workflow = build_workflow(file)?;
    tracing::debug!(
        workflow = %workflow.name,
        operations = workflow.operations.len(),
        "parsed workflow"
    );
    Ok(workflow)
}

/// Inner pairs without keywords and closing braces.
fn significant<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.into_inner().filter(|p| {
        !matches!(
            p.as_rule(),
            Rule::kw_workflow
                | Rule::kw_run
                | Rule::kw_from
                | Rule::kw_where
                | Rule::kw_if
                | Rule::kw_then
                | Rule::kw_else
                | Rule::kw_credential
                | Rule::body_end
                | Rule::EOI
        )
    })
}

/// The next inner pair. The grammar guarantees it; a missing one is reported at `span`.
fn next_part<'i>(
    parts: &mut impl Iterator<Item = Pair<'i, Rule>>,
    span: Span,
) -> Result<Pair<'i, Rule>, ParseError> {
    parts
        .next()
        .ok_or_else(|| ParseError::new(span, "Incomplete construct"))
}

/// 1-based position of the pair's first character; the length covers its first line.
fn span_of(pair: &Pair<'_, Rule>) -> Span {
    let (line, column) = pair.line_col();
    let length = pair.as_str().chars().take_while(|c| *c != '\n').count();
    Span::new(line, column, length)
}

fn build_workflow(file: Pair<'_, Rule>) -> Result<Workflow, ParseError> {
    let file_span = span_of(&file);
    let mut header = None;
    let mut operations = Vec::new();
    let mut run = None;

    for pair in significant(file) {
        match pair.as_rule() {
            Rule::header => {
                let span = span_of(&pair);
                let name = next_part(&mut significant(pair), span)?;
                header = Some((unquote(&name)?, span));
            }
            Rule::operation => operations.push(build_operation(pair)?),
            Rule::run_stmt => run = Some(build_run(pair)?),
            _ => {}
        }
    }

    let (name, span) = header.ok_or_else(|| {
        ParseError::new(file_span, "Missing workflow declaration").expecting(&["workflow"])
    })?;
    let run = run.ok_or_else(|| {
        ParseError::new(file_span, "Missing run statement").expecting(&["run"])
    })?;
    Ok(Workflow {
        name,
        operations,
        run,
        span,
    })
}

/// An identifier that may name an operation.
fn identifier(pair: &Pair<'_, Rule>, what: &str) -> Result<(String, Span), ParseError> {
    let span = span_of(pair);
    let name = pair.as_str();
    if is_reserved(name) {
        return Err(ParseError::new(
            span,
            format!("'{}' is a reserved word and cannot be used as {}", name, what),
        ));
    }
    Ok((name.to_string(), span))
}

fn build_run(pair: Pair<'_, Rule>) -> Result<RunSpec, ParseError> {
    let span = span_of(&pair);
    let order = significant(pair)
        .map(|id| {
            identifier(&id, "operation identifier").map(|(id, span)| Reference::new(id, span))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RunSpec { order, span })
}

fn build_operation(pair: Pair<'_, Rule>) -> Result<Operation, ParseError> {
    let span = span_of(&pair);
    let mut parts = significant(pair);
    let (id, id_span) = identifier(&next_part(&mut parts, span)?, "operation identifier")?;
    let (kind, _) = identifier(&next_part(&mut parts, span)?, "operation kind")?;

    let mut op = Operation::new(id, OperationKind::from_name(&kind));
    op.span = id_span;

    for item in parts {
        let item_span = span_of(&item);
        match item.as_rule() {
            Rule::property => add_property(&mut op, item)?,
            Rule::input_clause => {
                if op.input_path.is_some() {
                    return Err(duplicate_clause(item_span, "from", &op.id));
                }
                let path = next_part(&mut significant(item), item_span)?;
                op.input_path = Some(Path::new(path.as_str()));
            }
            Rule::output_clause => {
                if op.output_path.is_some() {
                    return Err(duplicate_clause(item_span, "->", &op.id));
                }
                let path = next_part(&mut significant(item), item_span)?;
                op.output_path = Some(Path::new(path.as_str()));
            }
            Rule::where_clause => {
                if !op.conditions.is_empty() {
                    return Err(duplicate_clause(item_span, "where", &op.id));
                }
                for condition in significant(item) {
                    op.conditions.push(build_condition(condition)?);
                }
            }
            Rule::if_clause => {
                if op.branch.is_some() {
                    return Err(duplicate_clause(item_span, "if", &op.id));
                }
                op.branch = Some(build_branch(item)?);
            }
            _ => {}
        }
    }

    lift_loop_body(&mut op);
    Ok(op)
}

fn add_property(op: &mut Operation, pair: Pair<'_, Rule>) -> Result<(), ParseError> {
    let span = span_of(&pair);
    let mut parts = significant(pair);
    let key_pair = next_part(&mut parts, span)?;
    let key_span = span_of(&key_pair);
    let key = property_key(key_pair)?;

    if RESERVED_KEYS.contains(&key.as_str()) {
        return Err(ParseError::new(
            key_span,
            format!(
                "Property name '{}' is reserved for structural clauses (from, ->, where, if)",
                key
            ),
        ));
    }
    if op.property(&key).is_some() {
        return Err(ParseError::new(
            key_span,
            format!("Duplicate property '{}' in operation '{}'", key, op.id),
        ));
    }

    let value = build_value(next_part(&mut parts, span)?)?;
    op.properties.push(Property { key, value, span });
    Ok(())
}

fn property_key(pair: Pair<'_, Rule>) -> Result<String, ParseError> {
    let span = span_of(&pair);
    let key = next_part(&mut significant(pair), span)?;
    match key.as_rule() {
        Rule::string => unquote(&key),
        _ => Ok(key.as_str().to_string()),
    }
}

fn build_condition(pair: Pair<'_, Rule>) -> Result<Condition, ParseError> {
    let span = span_of(&pair);
    let mut parts = significant(pair);

    let field_pair = next_part(&mut parts, span)?;
    let field = match field_pair.as_rule() {
        Rule::path => FieldRef::Path(Path::new(field_pair.as_str())),
        _ => FieldRef::Field(identifier(&field_pair, "field name")?.0),
    };

    let op_pair = next_part(&mut parts, span)?;
    let operator = Operator::from_symbol(op_pair.as_str()).ok_or_else(|| {
        ParseError::new(
            span_of(&op_pair),
            format!("Unknown operator '{}'", op_pair.as_str()),
        )
        .expecting(&["comparison operator"])
    })?;

    let value = parts.next().map(build_value).transpose()?;
    Ok(Condition {
        field,
        operator,
        value,
        span,
    })
}

fn build_branch(pair: Pair<'_, Rule>) -> Result<Branch, ParseError> {
    let span = span_of(&pair);
    let mut parts = significant(pair);
    let condition = build_condition(next_part(&mut parts, span)?)?;
    let if_true = build_targets(next_part(&mut parts, span)?)?;
    let if_false = match parts.next() {
        Some(else_clause) => {
            let else_span = span_of(&else_clause);
            Some(build_targets(next_part(
                &mut significant(else_clause),
                else_span,
            )?)?)
        }
        None => None,
    };
    Ok(Branch {
        condition,
        if_true,
        if_false,
        span,
    })
}

/// `id (, id)*`
fn build_targets(pair: Pair<'_, Rule>) -> Result<Vec<Reference>, ParseError> {
    significant(pair)
        .map(|id| {
            identifier(&id, "operation identifier").map(|(id, span)| Reference::new(id, span))
        })
        .collect()
}

fn build_value(pair: Pair<'_, Rule>) -> Result<Value, ParseError> {
    let span = span_of(&pair);
    match pair.as_rule() {
        Rule::string => unquote(&pair).map(Value::String),
        Rule::number => number(&pair).map(Value::Number),
        Rule::boolean => Ok(Value::Bool(pair.as_str() == "true")),
        Rule::null => Ok(Value::Null),
        Rule::path => Ok(Value::Path(Path::new(pair.as_str()))),
        Rule::ident => Ok(Value::String(pair.as_str().to_string())),
        Rule::credential => {
            let id = next_part(&mut significant(pair), span)?;
            match id.as_rule() {
                Rule::string => unquote(&id).map(Value::Credential),
                _ => identifier(&id, "credential identifier").map(|(id, _)| Value::Credential(id)),
            }
        }
        Rule::object => {
            let mut entries: Vec<(String, Value)> = Vec::new();
            for entry in significant(pair) {
                let entry_span = span_of(&entry);
                let mut parts = significant(entry);
                let key_pair = next_part(&mut parts, entry_span)?;
                let key_span = span_of(&key_pair);
                let key = property_key(key_pair)?;
                if entries.iter().any(|(k, _)| *k == key) {
                    return Err(ParseError::new(
                        key_span,
                        format!("Duplicate key '{}' in object", key),
                    ));
                }
                let value = build_value(next_part(&mut parts, entry_span)?)?;
                entries.push((key, value));
            }
            Ok(Value::Object(entries))
        }
        Rule::array => significant(pair)
            .map(build_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Err(ParseError::new(span, format!("Unexpected '{}'", pair.as_str())).expecting(&["value"])),
    }
}

/// Literals that overflow to infinity are rejected; JSON cannot carry them.
fn number(pair: &Pair<'_, Rule>) -> Result<f64, ParseError> {
    let text = pair.as_str();
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        Ok(_) => Err(ParseError::new(
            span_of(pair),
            format!("Number '{}' is out of range", text),
        )),
        Err(_) => Err(ParseError::new(
            span_of(pair),
            format!("Invalid number '{}'", text),
        )),
    }
}

/// The contents of a string literal with `\" \\ \n \t \r` resolved.
fn unquote(pair: &Pair<'_, Rule>) -> Result<String, ParseError> {
    let raw = pair.as_str();
    let body = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);

    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some((_, '"')) => out.push('"'),
            Some((_, '\\')) => out.push('\\'),
            Some((_, 'n')) => out.push('\n'),
            Some((_, 't')) => out.push('\t'),
            Some((_, 'r')) => out.push('\r'),
            Some((_, other)) => {
                return Err(ParseError::new(
                    offset_span(pair, i + 1, 2),
                    format!("Invalid escape '\\{}'", other),
                ));
            }
            None => out.push('\\'),
        }
    }
    Ok(out)
}

/// The span `offset` bytes into `pair`.
fn offset_span(pair: &Pair<'_, Rule>, offset: usize, length: usize) -> Span {
    let (line, column) = pair.line_col();
    let prefix = pair.as_str().get(..offset).unwrap_or("");
    match prefix.rfind('\n') {
        Some(newline) => Span::new(
            line + prefix.matches('\n').count(),
            prefix[newline + 1..].chars().count() + 1,
            length,
        ),
        None => Span::new(line, column + prefix.chars().count(), length),
    }
}

fn duplicate_clause(span: Span, clause: &str, id: &str) -> ParseError {
    ParseError::new(
        span,
        format!("Duplicate '{}' clause in operation '{}'", clause, id),
    )
}

/// A Loop's `operations: [ids]` property becomes its body.
fn lift_loop_body(op: &mut Operation) {
    if op.kind != OperationKind::Loop {
        return;
    }
    let Some(pos) = op.properties.iter().position(|p| p.key == "operations") else {
        return;
    };
    let Value::Array(items) = &op.properties[pos].value else {
        return;
    };
    if !items.iter().all(|item| item.as_str().is_some()) {
        return;
    }
    let prop = op.properties.remove(pos);
    if let Value::Array(items) = prop.value {
        let body = items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(id) => Some(Reference::new(id, prop.span)),
                _ => None,
            })
            .collect();
        op.body = Some(body);
    }
}
