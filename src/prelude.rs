//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and functions of the
//! a2e-lang crate. Import it to get the whole pipeline without importing each
//! stage individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use a2e_lang::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let source = std::fs::read_to_string("path/to/workflow.a2e")?;
//! let workflow = parse(&source)?;
//!
//! let limits = Limits::from_file("path/to/limits.json")?;
//! let findings = validate(&workflow, &limits);
//! assert!(findings.is_empty());
//!
//! let input = MockInput::from_file("path/to/input.json")?;
//! let trace = simulate(&workflow, &input, &limits);
//! println!("{}", trace.summary());
//! # Ok(())
//! # }
//! ```

// Pipeline stages
pub use crate::compiler::{WireCompiler, WireFormat, WireMessage, compile, compile_to_jsonl};
pub use crate::decompiler::{decompile, reconstruct};
pub use crate::parser::parse;
pub use crate::simulator::{Simulator, simulate};
pub use crate::validator::{
    Finding, FindingKind, Limits, ValidationRule, Validator, validate,
};

// AST types
pub use crate::ast::{
    Condition, KindSpec, Operation, OperationKind, Operator, Path, Span, Value, Workflow,
};

// Data and traces
pub use crate::data::MockInput;
pub use crate::trace::{ExecutionTrace, TraceEntry, TraceFormatter, TraceStatus};

// Error types
pub use crate::error::{CompileError, ConfigError, DecompileError, ParseError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
