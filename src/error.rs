use crate::ast::Span;
use thiserror::Error;

/// The first structural error found while parsing. Parsing stops here.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at {span}{}", format_expected(.expected))]
pub struct ParseError {
    pub span: Span,
    pub message: String,
    /// Human-readable names of the tokens that would have been accepted.
    pub expected: Vec<String>,
}

impl ParseError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            expected: Vec::new(),
        }
    }

    pub fn expecting(mut self, expected: &[&str]) -> Self {
        self.expected = expected.iter().map(|e| e.to_string()).collect();
        self
    }
}

fn format_expected(expected: &[String]) -> String {
    match expected {
        [] => String::new(),
        [one] => format!(" (expected {})", one),
        many => format!(" (expected one of: {})", many.join(", ")),
    }
}

/// Errors raised while lowering a workflow to wire messages.
///
/// A validated workflow never produces these; seeing one means the validator
/// and the compiler disagree about an invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Operation '{operation}' has a non-finite number in '{key}', which JSON cannot carry")]
    NonFiniteNumber { operation: String, key: String },

    #[error("Workflow '{0}' has an empty run order")]
    EmptyRunOrder(String),

    #[error("Failed to serialize wire message: {0}")]
    Serialization(String),
}

/// Errors raised while rebuilding a workflow from wire messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecompileError {
    #[error("Message {message} is not a recognizable workflow message: {reason}")]
    UnrecognizedMessageShape { message: usize, reason: String },

    #[error("Operation '{id}' is referenced by {referrer} but never declared")]
    DanglingReference { id: String, referrer: String },

    #[error("Input mixes legacy and protocol messages")]
    AmbiguousFormat,
}

/// Errors raised while loading limits or mock input from disk.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
