use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fs;

/// The JSON document a dry run starts from.
///
/// Top-level keys may be full paths (`{"/workflow/users": [...]}`) or the
/// document may be nested (`{"workflow": {"users": [...]}}`); both resolve.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct MockInput {
    pub document: JsonValue,
}

impl MockInput {
    pub fn new(document: JsonValue) -> Self {
        Self { document }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Load mock input from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn into_data_space(self) -> DataSpace {
        DataSpace::new(self.document)
    }
}

impl Default for MockInput {
    fn default() -> Self {
        Self::new(JsonValue::Object(Map::new()))
    }
}

/// A JSON document addressed by slash-delimited paths.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSpace {
    root: JsonValue,
}

impl DataSpace {
    pub fn new(root: JsonValue) -> Self {
        Self { root }
    }

    /// An exact top-level key wins over a nested lookup.
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        if let Some(value) = self.root.as_object().and_then(|m| m.get(path)) {
            return Some(value);
        }
        if !path.starts_with('/') {
            return None;
        }
        self.root.pointer(path)
    }

    /// Writes `value` at `path`, creating intermediate objects as needed.
    pub fn set(&mut self, path: &str, value: JsonValue) {
        if let Some(slot) = self.root.as_object_mut().and_then(|m| m.get_mut(path)) {
            *slot = value;
            return;
        }
        let mut current = &mut self.root;
        for segment in path.strip_prefix('/').unwrap_or(path).split('/') {
            current = child_mut(current, segment);
        }
        *current = value;
    }

    pub fn document(&self) -> &JsonValue {
        &self.root
    }

    pub fn into_document(self) -> JsonValue {
        self.root
    }
}

impl Default for DataSpace {
    fn default() -> Self {
        MockInput::default().into_data_space()
    }
}

/// Steps into `segment`, turning non-containers into objects.
fn child_mut<'a>(node: &'a mut JsonValue, segment: &str) -> &'a mut JsonValue {
    let index = node.as_array().and_then(|items| {
        segment
            .parse::<usize>()
            .ok()
            .filter(|i| *i < items.len())
    });
    match (node, index) {
        (JsonValue::Array(items), Some(i)) => &mut items[i],
        (node, _) => {
            if !node.is_object() {
                *node = JsonValue::Object(Map::new());
            }
            match node {
                JsonValue::Object(map) => map.entry(segment.to_string()).or_insert(JsonValue::Null),
                other => other,
            }
        }
    }
}
