//! Bundle, entry and generic resource model.
//!
//! Resources are kept as ordered JSON objects so that any resource type round-trips
//! unchanged; typed access goes through the accessor helpers.

use crate::coding::CodeableConcept;
use crate::error::{CoreError, Result};
use crate::fhir::ResourceType;
use crate::fhir_reference::local_reference;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "resourceType")]
    pub resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Resource {
    pub fn new(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self {
            resource_type,
            id: Some(id.into()),
            data: Map::new(),
        }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// `Type/id` reference to this resource, `None` when it has no id.
    pub fn reference(&self) -> Option<String> {
        self.id
            .as_deref()
            .map(|id| format!("{}/{}", self.resource_type, id))
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    pub fn concept(&self, key: &str) -> Option<CodeableConcept> {
        self.data.get(key).and_then(CodeableConcept::from_value)
    }

    /// Every `CodeableConcept` held in an array field, skipping malformed elements.
    pub fn concepts(&self, key: &str) -> Vec<CodeableConcept> {
        self.data
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(CodeableConcept::from_value).collect())
            .unwrap_or_default()
    }

    /// Raw `reference` string of a `Reference` field.
    pub fn reference_field(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|v| v.get("reference"))
            .and_then(Value::as_str)
    }

    /// Relative `Type/id` of a `Reference` field, when it addresses a bundle entry.
    pub fn local_reference_field(&self, key: &str) -> Option<String> {
        self.reference_field(key).and_then(local_reference)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    #[serde(rename = "fullUrl", default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BundleEntry {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource: Some(resource),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    pub resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(rename = "entry", default, deserialize_with = "null_as_empty")]
    pub entries: Vec<BundleEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Bundle {
    pub fn new(bundle_type: impl Into<String>) -> Self {
        Self {
            resource_type: ResourceType::Bundle,
            id: None,
            bundle_type: Some(bundle_type.into()),
            total: None,
            entries: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_resources(mut self, resources: impl IntoIterator<Item = Resource>) -> Self {
        self.entries
            .extend(resources.into_iter().map(BundleEntry::new));
        self
    }

    /// Parse a bundle document, rejecting anything whose `resourceType` is not `Bundle`.
    pub fn from_value(value: Value) -> Result<Self> {
        let bundle: Bundle = serde_json::from_value(value)?;
        if bundle.resource_type != ResourceType::Bundle {
            return Err(CoreError::invalid_resource_type(format!(
                "expected Bundle, found {}",
                bundle.resource_type
            )));
        }
        Ok(bundle)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entries.iter().filter_map(|e| e.resource.as_ref())
    }

    pub fn resources_of<'a>(
        &'a self,
        resource_type: &'a ResourceType,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources()
            .filter(move |r| &r.resource_type == resource_type)
    }

    pub fn find(&self, reference: &str) -> Option<&Resource> {
        self.resources()
            .find(|r| r.reference().as_deref() == Some(reference))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<BundleEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<BundleEntry>>::deserialize(deserializer)?.unwrap_or_default())
}
