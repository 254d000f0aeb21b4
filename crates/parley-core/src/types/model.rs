use serde::{Deserialize, Serialize};

/// A selectable backend model, as listed by `GET /v1/models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default = "default_object")]
    pub object: String,
    #[serde(default)]
    pub owned_by: String,
}

fn default_object() -> String {
    "model".to_string()
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, owned_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: default_object(),
            owned_by: owned_by.into(),
        }
    }
}
