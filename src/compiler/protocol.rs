use super::lowering::{TargetShape, lower_operation};
use super::message::{SpecMessage, WireMessage};
use super::{WireCompiler, WireFormat};
use crate::ast::Workflow;
use crate::error::CompileError;

/// Emits one self-describing `operationUpdate` per operation in declaration
/// order, then a `beginExecution` carrying the whole run order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecCompiler;

impl WireCompiler for SpecCompiler {
    fn format(&self) -> WireFormat {
        WireFormat::Spec
    }

    fn compile(&self, workflow: &Workflow) -> Result<Vec<WireMessage>, CompileError> {
        if workflow.run.order.is_empty() {
            return Err(CompileError::EmptyRunOrder(workflow.name.clone()));
        }

        let mut messages = Vec::with_capacity(workflow.operations.len() + 1);
        for op in &workflow.operations {
            messages.push(WireMessage::Spec(SpecMessage::OperationUpdate {
                operation_id: op.id.clone(),
                operation: lower_operation(op, TargetShape::List)?,
            }));
        }
        messages.push(WireMessage::Spec(SpecMessage::BeginExecution {
            execution_id: workflow.name.clone(),
            operation_order: workflow.run.ids().map(str::to_string).collect(),
        }));
        Ok(messages)
    }
}
