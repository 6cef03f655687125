//! # a2e-lang - Workflow DSL Compiler
//!
//! **a2e-lang** turns a small declarative workflow language into the JSONL
//! message streams an agent-to-execution runtime consumes. A workflow is a
//! named graph of typed operations (API calls, filters, transforms, branches,
//! loops, ...) wired together by slash-delimited data paths and a run order.
//!
//! ## Pipeline
//!
//! Every stage is a pure, synchronous transformation over one [`ast::Workflow`]:
//!
//! 1.  **Parse**: [`parser::parse`] turns source text into a span-annotated AST, failing fast on the first grammar error.
//! 2.  **Validate**: [`validator::Validator`] collects every referential, structural and complexity defect as a list of findings.
//! 3.  **Compile**: [`compiler::compile_to_jsonl`] lowers a valid workflow to the legacy or the protocol wire format.
//! 4.  **Simulate**: [`simulator::Simulator`] dry-runs a valid workflow over mock input and records an execution trace.
//! 5.  **Decompile**: [`decompiler::decompile`] rebuilds source text from compiled JSONL.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use a2e_lang::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let source = r#"
//!         workflow "greet"
//!
//!         users = ApiCall {
//!           method: "GET"
//!           url: "https://api.example.com/users"
//!           headers: { Authorization: credential("api-token") }
//!           -> /workflow/users
//!         }
//!
//!         active = FilterData {
//!           from /workflow/users
//!           where status == "active", points > 100
//!           -> /workflow/active
//!         }
//!
//!         run: users -> active
//!     "#;
//!
//!     let workflow = parse(source)?;
//!
//!     // Any finding blocks compilation and simulation.
//!     let findings = Validator::new().validate(&workflow);
//!     if !findings.is_empty() {
//!         for finding in &findings {
//!             eprintln!("{}", finding);
//!         }
//!         return Ok(());
//!     }
//!
//!     let jsonl = compile_to_jsonl(&workflow, WireFormat::Spec, false)?;
//!     print!("{}", jsonl);
//!
//!     let input = MockInput::from_json(
//!         r#"{"workflow": {"users": [{"status": "active", "points": 150}]}}"#,
//!     )?;
//!     let trace = Simulator::new().simulate(&workflow, &input);
//!     println!("{}", TraceFormatter::format_trace(&trace));
//!
//!     // Decompiling the compiled output yields equivalent source.
//!     println!("{}", decompile(&jsonl)?);
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod compiler;
pub mod data;
pub mod decompiler;
pub mod error;
pub mod graph;
pub mod parser;
pub mod prelude;
pub mod simulator;
pub mod sourcemap;
pub mod trace;
pub mod validator;
