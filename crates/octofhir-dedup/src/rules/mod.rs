//! Per-type equivalence rules.
//!
//! Each handled resource type has one [`EquivalenceRule`] that turns a resource into a
//! [`KeyOutcome`] and decides whether two keys denote the same clinical fact. Rules are
//! looked up by type in a [`RuleRegistry`]; supporting a new type means registering a
//! new rule, nothing else changes.

mod clinical;
mod condition;
mod directory;
mod medication;
mod medication_usage;
mod observation;
mod report;

pub use clinical::{AllergyRule, FamilyHistoryRule, ImmunizationRule, ProcedureRule};
pub use condition::ConditionRule;
pub use directory::DirectoryRule;
pub use medication::MedicationRule;
pub use medication_usage::MedicationUsageRule;
pub use observation::ObservationRule;
pub use report::{DiagnosticReportRule, EncounterRule};

use crate::error::Result;
use crate::key::{Exclusion, GroupKey, KeyOutcome, code_part};
use crate::registry::{ConceptFamily, is_no_known_sentinel, is_unknown_coding};
use indexmap::IndexMap;
use octofhir_core::{Coding, Resource, ResourceType};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// How the rest of the bundle relates to a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRole {
    /// Referenced by clinical facts; traceability lives on the referencing facts.
    Catalog,
    /// Visit-scoped fact; masters record every absorbed id.
    Fact,
}

pub trait EquivalenceRule: Send + Sync + fmt::Debug {
    fn resource_type(&self) -> ResourceType;

    fn role(&self) -> ResourceRole {
        ResourceRole::Fact
    }

    /// Grouping outcome for one resource.
    ///
    /// Errors are per-resource date problems; the collector resolves them through the
    /// configured missing-date policy.
    fn key(&self, resource: &Resource) -> Result<KeyOutcome>;

    fn matches(&self, a: &GroupKey, b: &GroupKey) -> bool {
        a.matches(b)
    }

    /// Fields holding the concept that identifies the resource.
    fn code_fields(&self) -> &'static [&'static str] {
        &["code"]
    }

    /// Ordering weight; the richest member seeds the master.
    fn richness(&self, resource: &Resource) -> usize {
        self.code_fields()
            .iter()
            .filter_map(|field| resource.concept(field))
            .map(|concept| concept.coding.len())
            .sum()
    }

    /// Drop codings that only say "unknown" from a surviving resource.
    fn scrub(&self, resource: &mut Resource) {
        for field in self.code_fields() {
            if let Some(concept) = resource.data.get_mut(*field) {
                strip_unknown_codings(concept);
            }
        }
    }
}

/// Preferred code of a concept field, or the reason the resource has none.
pub(crate) fn identifying_code(
    resource: &Resource,
    field: &str,
    family: ConceptFamily,
) -> std::result::Result<String, Exclusion> {
    let concept = resource
        .concept(field)
        .ok_or(Exclusion::UnrecognizedCode)?;
    if is_no_known_sentinel(&concept) {
        return Err(Exclusion::NoKnownSentinel);
    }
    code_part(&concept, family).ok_or(Exclusion::UnrecognizedCode)
}

/// Remove null-flavor codings from a `CodeableConcept` value.
///
/// Returns false when nothing meaningful is left (no coding and no text).
pub(crate) fn strip_unknown_codings(concept: &mut Value) -> bool {
    let Some(object) = concept.as_object_mut() else {
        return true;
    };
    if let Some(Value::Array(codings)) = object.get_mut("coding") {
        codings.retain(|coding| {
            Coding::from_value(coding)
                .map(|c| !is_unknown_coding(&c))
                .unwrap_or(true)
        });
        if codings.is_empty() {
            object.shift_remove("coding");
        }
    }
    let has_text = object
        .get("text")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.trim().is_empty() && !t.trim().eq_ignore_ascii_case("unknown"));
    object.contains_key("coding") || has_text
}

/// Rules indexed by the resource type they handle.
#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    rules: IndexMap<ResourceType, Arc<dyn EquivalenceRule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a rule for every handled clinical type.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(MedicationRule);
        registry.register(DirectoryRule::new(ResourceType::Practitioner));
        registry.register(DirectoryRule::new(ResourceType::Organization));
        registry.register(ConditionRule);
        registry.register(AllergyRule);
        registry.register(ImmunizationRule);
        registry.register(ProcedureRule);
        registry.register(ObservationRule);
        registry.register(FamilyHistoryRule);
        registry.register(MedicationUsageRule::statement());
        registry.register(MedicationUsageRule::request());
        registry.register(MedicationUsageRule::administration());
        registry.register(DiagnosticReportRule);
        registry.register(EncounterRule);
        registry
    }

    /// Register a rule, replacing any previous rule for the same type.
    pub fn register<R: EquivalenceRule + 'static>(&mut self, rule: R) {
        self.rules.insert(rule.resource_type(), Arc::new(rule));
    }

    pub fn get(&self, resource_type: &ResourceType) -> Option<&dyn EquivalenceRule> {
        self.rules.get(resource_type).map(|rule| rule.as_ref())
    }

    pub fn contains(&self, resource_type: &ResourceType) -> bool {
        self.rules.contains_key(resource_type)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.rules.keys()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
