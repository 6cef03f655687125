//! Conversion of grammar failures into [`ParseError`]s.
use super::Rule;
use crate::ast::Span;
use crate::error::ParseError;
use itertools::Itertools;
use pest::error::{Error, ErrorVariant, InputLocation, LineColLocation};
use std::fmt;

/// Rejects sources whose braces and brackets nest deeper than `limit`.
pub(super) fn check_nesting(source: &str, limit: usize) -> Result<(), ParseError> {
    let mut depth = 0usize;
    let mut line = 1;
    let mut column = 0;
    let mut in_string = false;
    let mut in_comment = false;
    let mut escaped = false;

    for c in source.chars() {
        if c == '\n' {
            line += 1;
            column = 0;
            in_comment = false;
            continue;
        }
        column += 1;
        if in_comment {
            continue;
        }
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '#' => in_comment = true,
            '{' | '[' => {
                depth += 1;
                if depth > limit {
                    return Err(ParseError::new(
                        Span::new(line, column, 1),
                        format!("Value nests too deeply (limit {})", limit),
                    ));
                }
            }
            '}' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

pub(super) fn from_pest(err: &Error<Rule>, source: &str) -> ParseError {
    let offset = match err.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    let (line, column) = match err.line_col {
        LineColLocation::Pos(at) => at,
        LineColLocation::Span(at, _) => at,
    };
    let expected: Vec<&str> = match &err.variant {
        ErrorVariant::ParsingError { positives, .. } => {
            positives.iter().map(describe).unique().collect()
        }
        ErrorVariant::CustomError { .. } => Vec::new(),
    };

    let found = Found::at(source.get(offset..).unwrap_or(""));
    let message = match found {
        Found::End if expected.contains(&"run") => "Missing run statement".to_string(),
        Found::Unterminated => "Unterminated string".to_string(),
        Found::Token { .. } if expected == ["end of input"] => {
            format!("Unexpected {} after run statement", found)
        }
        _ => format!("Unexpected {}", found),
    };
    ParseError::new(Span::new(line, column, found.width()), message).expecting(&expected)
}

/// How a grammar rule is named in error messages.
fn describe(rule: &Rule) -> &'static str {
    match rule {
        Rule::EOI => "end of input",
        Rule::ident | Rule::targets => "identifier",
        Rule::body_end => "'}'",
        Rule::property | Rule::property_key => "property",
        Rule::input_clause | Rule::kw_from => "from",
        Rule::output_clause => "->",
        Rule::where_clause | Rule::kw_where => "where",
        Rule::if_clause | Rule::kw_if => "if",
        Rule::kw_then => "then",
        Rule::else_clause | Rule::kw_else => "else",
        Rule::run_stmt | Rule::kw_run => "run",
        Rule::unary_op | Rule::binary_op => "comparison operator",
        Rule::condition => "condition",
        Rule::header | Rule::kw_workflow => "workflow",
        Rule::operation => "operation",
        Rule::string => "string",
        Rule::number => "number",
        Rule::path => "path",
        Rule::object => "object",
        Rule::object_entry => "object key",
        Rule::array => "array",
        Rule::credential | Rule::kw_credential => "credential",
        Rule::boolean => "boolean",
        Rule::null => "null",
        _ => "token",
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenClass {
    Identifier,
    Str,
    Number,
    Path,
    Symbol,
}

/// The token sitting where the grammar gave up.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Found<'a> {
    End,
    Unterminated,
    Token { text: &'a str, class: TokenClass },
}

impl<'a> Found<'a> {
    fn at(rest: &'a str) -> Self {
        let Some(first) = rest.chars().next() else {
            return Found::End;
        };
        let take = |len: usize, class| Found::Token {
            text: &rest[..len],
            class,
        };
        let run_of = |skip: usize, accept: fn(char) -> bool| {
            skip + rest[skip..]
                .char_indices()
                .find(|(_, c)| !accept(*c))
                .map_or(rest.len() - skip, |(i, _)| i)
        };

        match first {
            '"' => {
                let mut escaped = false;
                for (i, c) in rest.char_indices().skip(1) {
                    match c {
                        _ if escaped => escaped = false,
                        '\\' => escaped = true,
                        '"' => return take(i + 1, TokenClass::Str),
                        _ => {}
                    }
                }
                Found::Unterminated
            }
            '/' => take(
                run_of(1, |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-')),
                TokenClass::Path,
            ),
            c if c.is_ascii_digit()
                || (c == '-' && rest[1..].starts_with(|d: char| d.is_ascii_digit())) =>
            {
                take(
                    run_of(1, |c: char| c.is_ascii_alphanumeric() || c == '.'),
                    TokenClass::Number,
                )
            }
            c if c.is_ascii_alphabetic() || c == '_' => take(
                run_of(1, |c: char| c.is_ascii_alphanumeric() || c == '_'),
                TokenClass::Identifier,
            ),
            _ if ["->", "==", "!=", ">=", "<="]
                .iter()
                .any(|symbol| rest.starts_with(symbol)) =>
            {
                take(2, TokenClass::Symbol)
            }
            c => take(c.len_utf8(), TokenClass::Symbol),
        }
    }

    /// Characters covered by the error span.
    fn width(&self) -> usize {
        match self {
            Found::End => 0,
            Found::Unterminated => 1,
            Found::Token { text, .. } => text.chars().count(),
        }
    }
}

impl fmt::Display for Found<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Found::End => write!(f, "end of input"),
            Found::Unterminated => write!(f, "unterminated string"),
            Found::Token { text, class } => match class {
                TokenClass::Identifier => write!(f, "identifier '{}'", text),
                TokenClass::Str => write!(f, "string {}", text),
                TokenClass::Number => write!(f, "number {}", text),
                TokenClass::Path => write!(f, "path '{}'", text),
                TokenClass::Symbol => write!(f, "'{}'", text),
            },
        }
    }
}
