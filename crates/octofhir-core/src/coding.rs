//! Read-only views over `Coding` and `CodeableConcept` elements.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
        }
    }

    /// Code trimmed and lowercased, `None` when blank.
    pub fn normalized_code(&self) -> Option<String> {
        normalize_text(self.code.as_deref())
    }

    /// Read a `Coding` element, `None` when the value does not have its shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Read a `CodeableConcept` element, `None` when the value does not have its shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    /// Text trimmed and lowercased, `None` when blank.
    pub fn normalized_text(&self) -> Option<String> {
        normalize_text(self.text.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.coding.is_empty() && self.normalized_text().is_none()
    }
}

fn normalize_text(raw: Option<&str>) -> Option<String> {
    raw.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
}
