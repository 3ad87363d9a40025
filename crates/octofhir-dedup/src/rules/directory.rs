use super::{EquivalenceRule, ResourceRole};
use crate::error::Result;
use crate::key::{GroupKey, KeyOutcome};
use octofhir_core::{Resource, ResourceType};
use serde_json::Value;

const NPI_SYSTEM: &str = "us-npi";
const NPI_OID: &str = "2.16.840.1.113883.4.6";

/// Practitioners and organizations, matched on NPI or on name plus first address.
#[derive(Debug, Clone)]
pub struct DirectoryRule {
    resource_type: ResourceType,
}

impl DirectoryRule {
    pub fn new(resource_type: ResourceType) -> Self {
        Self { resource_type }
    }

    fn npi(resource: &Resource) -> Option<String> {
        resource
            .get("identifier")
            .and_then(Value::as_array)?
            .iter()
            .find(|identifier| {
                identifier
                    .get("system")
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.ends_with(NPI_SYSTEM) || s.ends_with(NPI_OID))
            })
            .and_then(|identifier| identifier.get("value"))
            .and_then(Value::as_str)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn name(resource: &Resource) -> Option<String> {
        let name = match resource.get("name")? {
            Value::String(name) => name.clone(),
            Value::Array(names) => {
                let name = names.first()?;
                let mut parts: Vec<&str> = name
                    .get("given")
                    .and_then(Value::as_array)
                    .map(|given| given.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                parts.extend(name.get("family").and_then(Value::as_str));
                if parts.is_empty() {
                    name.get("text").and_then(Value::as_str)?.to_string()
                } else {
                    parts.join(" ")
                }
            }
            _ => return None,
        };
        let name = normalize_words(&name);
        (!name.is_empty()).then_some(name)
    }

    fn address(resource: &Resource) -> Option<String> {
        let address = resource.get("address").and_then(Value::as_array)?.first()?;
        let mut parts: Vec<&str> = address
            .get("line")
            .and_then(Value::as_array)
            .map(|lines| lines.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        for field in ["city", "state", "postalCode"] {
            parts.extend(address.get(field).and_then(Value::as_str));
        }
        let address = normalize_words(&parts.join(" "));
        (!address.is_empty()).then_some(address)
    }
}

fn normalize_words(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

impl EquivalenceRule for DirectoryRule {
    fn resource_type(&self) -> ResourceType {
        self.resource_type.clone()
    }

    fn role(&self) -> ResourceRole {
        ResourceRole::Catalog
    }

    fn key(&self, resource: &Resource) -> Result<KeyOutcome> {
        if let Some(npi) = Self::npi(resource) {
            return Ok(KeyOutcome::Keyed(GroupKey::exact([Some("npi".to_string()), Some(npi)])));
        }
        Ok(match Self::name(resource) {
            Some(name) => KeyOutcome::Keyed(GroupKey::exact([
                Some("name".to_string()),
                Some(name),
                Self::address(resource),
            ])),
            None => KeyOutcome::Unique,
        })
    }

    fn code_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn richness(&self, resource: &Resource) -> usize {
        resource.data.len()
    }
}
