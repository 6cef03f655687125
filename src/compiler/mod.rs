//! Lowers a validated [`Workflow`] to line-delimited wire messages.
//!
//! Both formats share one structural translation (see [`lower_value`]) and
//! differ only in how operations are grouped into messages. Compilation is
//! pure and deterministic: the same workflow always renders to the same bytes.
//!
//! Callers validate first; compiling a workflow with findings is not checked here.
mod legacy;
pub(crate) mod lowering;
pub mod message;
mod protocol;

pub use legacy::LegacyCompiler;
pub use lowering::lower_value;
pub use message::{
    LegacyBeginExecution, LegacyMessage, LegacyOperation, LegacyOperationUpdate, OperationBody,
    SpecMessage, WireMessage,
};
pub use protocol::SpecCompiler;

use crate::ast::Workflow;
use crate::error::CompileError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Two messages: every operation in one update, then the run root.
    #[default]
    Legacy,
    /// One message per operation, then the full run order.
    Spec,
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Legacy => f.write_str("legacy"),
            WireFormat::Spec => f.write_str("spec"),
        }
    }
}

/// A code generator for one wire format.
pub trait WireCompiler {
    fn format(&self) -> WireFormat;

    fn compile(&self, workflow: &Workflow) -> Result<Vec<WireMessage>, CompileError>;

    fn compile_to_jsonl(&self, workflow: &Workflow, pretty: bool) -> Result<String, CompileError> {
        let messages = self.compile(workflow)?;
        let rendered = render_jsonl(&messages, pretty)?;
        tracing::debug!(
            workflow = %workflow.name,
            format = %self.format(),
            messages = messages.len(),
            "compiled workflow"
        );
        Ok(rendered)
    }
}

pub fn compiler_for(format: WireFormat) -> Box<dyn WireCompiler> {
    match format {
        WireFormat::Legacy => Box::new(LegacyCompiler),
        WireFormat::Spec => Box::new(SpecCompiler),
    }
}

/// Compiles to messages in the given format.
pub fn compile(workflow: &Workflow, format: WireFormat) -> Result<Vec<WireMessage>, CompileError> {
    compiler_for(format).compile(workflow)
}

/// Compiles straight to JSONL text.
pub fn compile_to_jsonl(
    workflow: &Workflow,
    format: WireFormat,
    pretty: bool,
) -> Result<String, CompileError> {
    compiler_for(format).compile_to_jsonl(workflow, pretty)
}

/// Compact output puts one JSON object per line. Pretty output indents each
/// object and separates objects with a blank line.
pub fn render_jsonl(messages: &[WireMessage], pretty: bool) -> Result<String, CompileError> {
    let mut out = String::new();
    for (i, message) in messages.iter().enumerate() {
        let line = if pretty {
            serde_json::to_string_pretty(message)
        } else {
            serde_json::to_string(message)
        }
        .map_err(|e| CompileError::Serialization(e.to_string()))?;
        if pretty && i > 0 {
            out.push('\n');
        }
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}
