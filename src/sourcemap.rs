//! Maps compiled wire lines back to the source that produced them.
use crate::ast::{OperationKind, Span, Workflow};
use crate::compiler::WireFormat;
use serde::Serialize;

/// Where each operation's configuration lands in the compiled JSONL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub workflow: String,
    pub format: WireFormat,
    pub mappings: Vec<Mapping>,
    /// Wire line of the `beginExecution` message.
    pub begin_line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    /// 0-based line in compact output.
    pub line: usize,
    pub operation_id: String,
    pub kind: OperationKind,
    pub span: Span,
    pub properties: Vec<PropertySpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySpan {
    pub key: String,
    pub span: Span,
}

impl SourceMap {
    /// The legacy format bundles every operation into line 0; the protocol
    /// format gives operation `i` line `i`.
    pub fn generate(workflow: &Workflow, format: WireFormat) -> Self {
        let mappings: Vec<Mapping> = workflow
            .operations
            .iter()
            .enumerate()
            .map(|(i, op)| Mapping {
                line: match format {
                    WireFormat::Legacy => 0,
                    WireFormat::Spec => i,
                },
                operation_id: op.id.clone(),
                kind: op.kind.clone(),
                span: op.span,
                properties: op
                    .properties
                    .iter()
                    .map(|p| PropertySpan {
                        key: p.key.clone(),
                        span: p.span,
                    })
                    .collect(),
            })
            .collect();

        let begin_line = match format {
            WireFormat::Legacy => 1,
            WireFormat::Spec => mappings.len(),
        };
        SourceMap {
            workflow: workflow.name.clone(),
            format,
            mappings,
            begin_line,
        }
    }

    pub fn for_operation(&self, id: &str) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.operation_id == id)
    }

    /// Every operation compiled onto `line`.
    pub fn at_line(&self, line: usize) -> Vec<&Mapping> {
        self.mappings.iter().filter(|m| m.line == line).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
