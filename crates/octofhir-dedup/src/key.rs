//! Grouping keys and the helpers rules use to build them.

use crate::error::{DedupError, Result};
use crate::registry::{ConceptFamily, SystemCode, primary_code};
use octofhir_core::{CodeableConcept, Resource, normalize_date};
use serde_json::{Number, Value};
use std::collections::BTreeSet;
use std::fmt;

const PART_SEPARATOR: char = '\u{1f}';

/// Key a resource is grouped under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    /// Equal strings are duplicates.
    Exact(String),
    /// Same date and at least one shared code.
    Overlap {
        codes: BTreeSet<SystemCode>,
        date: String,
    },
}

impl GroupKey {
    /// Exact key from ordered parts; a missing part still takes its slot.
    pub fn exact<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let mut key = String::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                key.push(PART_SEPARATOR);
            }
            if let Some(part) = part {
                key.push_str(part.as_ref());
            }
        }
        GroupKey::Exact(key)
    }

    pub fn overlap(codes: impl IntoIterator<Item = SystemCode>, date: impl Into<String>) -> Self {
        GroupKey::Overlap {
            codes: codes.into_iter().collect(),
            date: date.into(),
        }
    }

    /// Candidate bucket: only keys sharing a bucket are ever compared.
    pub fn bucket(&self) -> &str {
        match self {
            GroupKey::Exact(key) => key,
            GroupKey::Overlap { date, .. } => date,
        }
    }

    pub fn matches(&self, other: &GroupKey) -> bool {
        match (self, other) {
            (GroupKey::Exact(a), GroupKey::Exact(b)) => a == b,
            (
                GroupKey::Overlap { codes: a, date: da },
                GroupKey::Overlap { codes: b, date: db },
            ) => da == db && !a.is_disjoint(b),
            _ => false,
        }
    }

    /// Widen this key so it also stands for `other`'s members.
    pub fn absorb(&mut self, other: &GroupKey) {
        if let (GroupKey::Overlap { codes, .. }, GroupKey::Overlap { codes: more, .. }) =
            (self, other)
        {
            codes.extend(more.iter().cloned());
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Exact(key) => write!(f, "{}", key.replace(PART_SEPARATOR, "|")),
            GroupKey::Overlap { codes, date } => {
                let codes: Vec<String> = codes.iter().map(|(s, c)| format!("{s}:{c}")).collect();
                write!(f, "{}@{}", codes.join(","), date)
            }
        }
    }
}

/// Why a resource is left out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exclusion {
    /// Asserts an absence, e.g. "No known allergies"
    NoKnownSentinel,
    /// Carries no code from a recognized terminology
    UnrecognizedCode,
    /// Lacks the content that makes it clinically meaningful
    MissingContent,
    /// Grouping date missing or unparseable and the policy is `exclude`
    MissingDate,
}

impl Exclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exclusion::NoKnownSentinel => "no-known-sentinel",
            Exclusion::UnrecognizedCode => "unrecognized-code",
            Exclusion::MissingContent => "missing-content",
            Exclusion::MissingDate => "missing-date",
        }
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Keyed(GroupKey),
    /// Kept as-is, never grouped with anything.
    Unique,
    Excluded(Exclusion),
}

/// Where a rule looks for the date it groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    /// A `date`/`dateTime` field
    DateTime(&'static str),
    /// A `Period` field: its start, else its end
    Period(&'static str),
}

/// Normalized date of the first source present on the resource.
///
/// A present but unparseable value is an error rather than a fallthrough, so two
/// copies of a resource never end up keyed on different fields.
pub fn first_date(resource: &Resource, sources: &[DateSource]) -> Result<Option<String>> {
    for source in sources {
        let raw = match source {
            DateSource::DateTime(field) => resource.get_str(field),
            DateSource::Period(field) => resource.get(field).and_then(|period| {
                period
                    .get("start")
                    .and_then(Value::as_str)
                    .or_else(|| period.get("end").and_then(Value::as_str))
            }),
        };
        if let Some(raw) = raw {
            return normalize_date(raw)
                .map(Some)
                .map_err(|e| DedupError::invalid_date(describe(resource), e));
        }
    }
    Ok(None)
}

/// Like [`first_date`], but a resource without any date is an error.
pub fn required_date(resource: &Resource, sources: &[DateSource]) -> Result<String> {
    first_date(resource, sources)?.ok_or_else(|| DedupError::missing_date(describe(resource)))
}

/// `system|code` of the concept's preferred code.
pub fn code_part(concept: &CodeableConcept, family: ConceptFamily) -> Option<String> {
    primary_code(concept, family).map(|(system, code)| format!("{system}|{code}"))
}

/// Canonical string for a value used as a key part, e.g. an observation value.
///
/// Numbers compare by magnitude, so `70` and `70.0` yield the same part.
pub fn value_part(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_lowercase(),
        other => canonical_numbers(other).to_string(),
    }
}

fn canonical_numbers(value: &Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER => Value::from(f as i64),
            Some(f) => Number::from_f64(f).map_or_else(|| value.clone(), Value::Number),
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(canonical_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), canonical_numbers(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Largest magnitude below which every integral `f64` is exact.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub(crate) fn describe(resource: &Resource) -> String {
    resource
        .reference()
        .unwrap_or_else(|| format!("{}/<no id>", resource.resource_type))
}
