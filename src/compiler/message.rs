use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// `{ "<Kind>": { ...config... } }`: exactly one entry.
pub type OperationBody = Map<String, JsonValue>;

/// One line of compiled output, in either wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireMessage {
    Legacy(LegacyMessage),
    Spec(SpecMessage),
}

/// The two-message legacy format, externally tagged:
/// `{"operationUpdate": {...}}` then `{"beginExecution": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LegacyMessage {
    #[serde(rename = "operationUpdate")]
    OperationUpdate(LegacyOperationUpdate),
    #[serde(rename = "beginExecution")]
    BeginExecution(LegacyBeginExecution),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyOperationUpdate {
    pub workflow_id: String,
    pub operations: Vec<LegacyOperation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyOperation {
    pub id: String,
    pub operation: OperationBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBeginExecution {
    pub workflow_id: String,
    pub root: String,
}

/// The per-operation protocol format, tagged by a `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpecMessage {
    #[serde(rename = "operationUpdate")]
    OperationUpdate {
        #[serde(rename = "operationId")]
        operation_id: String,
        operation: OperationBody,
    },
    #[serde(rename = "beginExecution")]
    BeginExecution {
        #[serde(rename = "executionId")]
        execution_id: String,
        #[serde(rename = "operationOrder")]
        operation_order: Vec<String>,
    },
}

impl WireMessage {
    /// The operation this message declares, if it declares one.
    pub fn declared_operations(&self) -> Vec<(&str, &OperationBody)> {
        match self {
            WireMessage::Legacy(LegacyMessage::OperationUpdate(update)) => update
                .operations
                .iter()
                .map(|op| (op.id.as_str(), &op.operation))
                .collect(),
            WireMessage::Spec(SpecMessage::OperationUpdate {
                operation_id,
                operation,
            }) => vec![(operation_id.as_str(), operation)],
            _ => Vec::new(),
        }
    }
}
