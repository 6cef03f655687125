use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Optional bounds on workflow size, used by the validator and the simulator.
///
/// ```json
/// { "maxOperations": 50, "maxDepth": 3, "maxConditionsPerOperation": 5 }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Limits {
    #[serde(default)]
    pub max_operations: Option<usize>,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub max_conditions_per_operation: Option<usize>,
}

impl Limits {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn with_max_operations(mut self, max: usize) -> Self {
        self.max_operations = Some(max);
        self
    }

    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = Some(max);
        self
    }

    pub fn with_max_conditions(mut self, max: usize) -> Self {
        self.max_conditions_per_operation = Some(max);
        self
    }
}
