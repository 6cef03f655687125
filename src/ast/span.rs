use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based source location. `length` counts characters on `line`.
///
/// Nodes rebuilt from wire messages carry the synthetic span (line 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub length: usize,
}

impl Span {
    pub fn new(line: usize, column: usize, length: usize) -> Self {
        Self {
            line,
            column,
            length,
        }
    }

    /// The span used for nodes that have no source text behind them.
    pub fn synthetic() -> Self {
        Self::default()
    }

    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }

    /// Joins two spans. Spans on different lines keep the start token only.
    pub fn to(self, end: Span) -> Span {
        if end.line == self.line && end.column >= self.column {
            Span::new(self.line, self.column, end.column + end.length - self.column)
        } else {
            self
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.column)
    }
}
