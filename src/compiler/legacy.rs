use super::lowering::{TargetShape, lower_operation};
use super::message::{
    LegacyBeginExecution, LegacyMessage, LegacyOperation, LegacyOperationUpdate, WireMessage,
};
use super::{WireCompiler, WireFormat};
use crate::ast::Workflow;
use crate::error::CompileError;

/// Emits one `operationUpdate` bundling every operation, then one
/// `beginExecution` naming the run root.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyCompiler;

impl WireCompiler for LegacyCompiler {
    fn format(&self) -> WireFormat {
        WireFormat::Legacy
    }

    fn compile(&self, workflow: &Workflow) -> Result<Vec<WireMessage>, CompileError> {
        let root = workflow
            .run
            .root()
            .ok_or_else(|| CompileError::EmptyRunOrder(workflow.name.clone()))?;

        let operations = workflow
            .operations
            .iter()
            .map(|op| {
                Ok(LegacyOperation {
                    id: op.id.clone(),
                    operation: lower_operation(op, TargetShape::Collapsed)?,
                })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;

        Ok(vec![
            WireMessage::Legacy(LegacyMessage::OperationUpdate(LegacyOperationUpdate {
                workflow_id: workflow.name.clone(),
                operations,
            })),
            WireMessage::Legacy(LegacyMessage::BeginExecution(LegacyBeginExecution {
                workflow_id: workflow.name.clone(),
                root: root.id.clone(),
            })),
        ])
    }
}
