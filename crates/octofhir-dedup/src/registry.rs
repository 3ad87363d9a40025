//! Code system registry.
//!
//! Static table of the terminologies the equivalence rules recognize, and per concept
//! family the ordered list of systems accepted for grouping (first = preferred).

use octofhir_core::{CodeableConcept, Coding};
use std::fmt;

const NO_KNOWN_MARKER: &str = "no known";

/// Null-flavor codes that say "we do not know" rather than identify a concept.
const NULL_FLAVOR_CODES: &[&str] = &["unk", "unknown", "ni", "na", "asku", "nask", "nav", "oth"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CodeSystem {
    Snomed,
    RxNorm,
    Ndc,
    Icd10,
    Icd9,
    Loinc,
    Cpt,
    Cvx,
    /// Intelligent Medical Objects, a proprietary problem-list vocabulary
    Imo,
}

struct SystemEntry {
    system: CodeSystem,
    name: &'static str,
    /// Lowercase URI fragments, matched as substrings
    fragments: &'static [&'static str],
    /// HL7 OIDs, matched exactly (with or without `urn:oid:`)
    oids: &'static [&'static str],
}

const SYSTEMS: &[SystemEntry] = &[
    SystemEntry {
        system: CodeSystem::Snomed,
        name: "snomed",
        fragments: &["snomed"],
        oids: &["2.16.840.1.113883.6.96"],
    },
    SystemEntry {
        system: CodeSystem::RxNorm,
        name: "rxnorm",
        fragments: &["rxnorm"],
        oids: &["2.16.840.1.113883.6.88"],
    },
    SystemEntry {
        system: CodeSystem::Ndc,
        name: "ndc",
        fragments: &["/ndc", "ndc"],
        oids: &["2.16.840.1.113883.6.69"],
    },
    SystemEntry {
        system: CodeSystem::Icd10,
        name: "icd-10",
        fragments: &["icd-10", "icd10"],
        oids: &["2.16.840.1.113883.6.90", "2.16.840.1.113883.6.3", "2.16.840.1.113883.6.4"],
    },
    SystemEntry {
        system: CodeSystem::Icd9,
        name: "icd-9",
        fragments: &["icd-9", "icd9"],
        oids: &["2.16.840.1.113883.6.103", "2.16.840.1.113883.6.104", "2.16.840.1.113883.6.2"],
    },
    SystemEntry {
        system: CodeSystem::Loinc,
        name: "loinc",
        fragments: &["loinc"],
        oids: &["2.16.840.1.113883.6.1"],
    },
    SystemEntry {
        system: CodeSystem::Cpt,
        name: "cpt",
        fragments: &["/cpt", "cpt"],
        oids: &["2.16.840.1.113883.6.12"],
    },
    SystemEntry {
        system: CodeSystem::Cvx,
        name: "cvx",
        fragments: &["cvx"],
        oids: &["2.16.840.1.113883.12.292"],
    },
    SystemEntry {
        system: CodeSystem::Imo,
        name: "imo",
        fragments: &["imo-", "imohealth", "/imo"],
        oids: &["2.16.840.1.113883.3.247.1.1"],
    },
];

impl CodeSystem {
    /// Identify the terminology of a `Coding.system` value.
    pub fn identify(system: &str) -> Option<Self> {
        let system = system.trim().to_lowercase();
        let oid = system.strip_prefix("urn:oid:").unwrap_or(&system);

        if let Some(entry) = SYSTEMS.iter().find(|e| e.oids.contains(&oid)) {
            return Some(entry.system);
        }

        SYSTEMS
            .iter()
            .find(|e| e.fragments.iter().any(|f| system.contains(f)))
            .map(|e| e.system)
    }

    pub fn name(self) -> &'static str {
        SYSTEMS
            .iter()
            .find(|e| e.system == self)
            .map(|e| e.name)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for CodeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Clinical concept families and the systems accepted for each, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConceptFamily {
    Condition,
    Medication,
    Allergen,
    Immunization,
    Procedure,
    Observation,
}

impl ConceptFamily {
    pub fn systems(self) -> &'static [CodeSystem] {
        match self {
            Self::Condition => &[
                CodeSystem::Icd10,
                CodeSystem::Snomed,
                CodeSystem::Icd9,
                CodeSystem::Imo,
                CodeSystem::Loinc,
                CodeSystem::Cpt,
            ],
            Self::Medication => &[CodeSystem::RxNorm, CodeSystem::Ndc, CodeSystem::Snomed],
            Self::Allergen => &[CodeSystem::RxNorm, CodeSystem::Snomed, CodeSystem::Ndc],
            Self::Immunization => &[CodeSystem::Cvx, CodeSystem::Ndc, CodeSystem::Snomed],
            Self::Procedure => &[
                CodeSystem::Cpt,
                CodeSystem::Snomed,
                CodeSystem::Loinc,
                CodeSystem::Icd10,
            ],
            Self::Observation => &[CodeSystem::Loinc, CodeSystem::Snomed, CodeSystem::Cpt],
        }
    }

    pub fn accepts(self, system: CodeSystem) -> bool {
        self.systems().contains(&system)
    }
}

/// A code identified by its terminology, normalized for comparison.
pub type SystemCode = (CodeSystem, String);

/// All family-accepted codes of a concept, in coding order, skipping unknown codings.
pub fn recognized_codes(concept: &CodeableConcept, family: ConceptFamily) -> Vec<SystemCode> {
    concept
        .coding
        .iter()
        .filter(|c| !is_unknown_coding(c))
        .filter_map(|c| {
            let system = CodeSystem::identify(c.system.as_deref()?)?;
            let code = c.normalized_code()?;
            family.accepts(system).then_some((system, code))
        })
        .collect()
}

/// The code of the highest-priority accepted system present on the concept.
///
/// Within a system the first coding wins, so the result only depends on the
/// concept's own coding order.
pub fn primary_code(concept: &CodeableConcept, family: ConceptFamily) -> Option<SystemCode> {
    let codes = recognized_codes(concept, family);
    family
        .systems()
        .iter()
        .find_map(|system| codes.iter().find(|(s, _)| s == system).cloned())
}

/// Null-flavor / "unknown" codings carry no clinical identity.
pub fn is_unknown_coding(coding: &Coding) -> bool {
    let system = coding.system.as_deref().unwrap_or("").to_lowercase();
    if system.contains("nullflavor") || system.contains("v3-unknown") {
        return true;
    }

    let display_unknown = coding
        .display
        .as_deref()
        .map(|d| d.trim().eq_ignore_ascii_case("unknown"))
        .unwrap_or(true);

    match coding.normalized_code() {
        Some(code) => NULL_FLAVOR_CODES.contains(&code.as_str()) && display_unknown,
        None => display_unknown,
    }
}

/// True when a concept states the absence of a fact ("No known allergies").
pub fn is_no_known_sentinel(concept: &CodeableConcept) -> bool {
    let mentions = |s: Option<&str>| {
        s.map(|s| s.to_lowercase().contains(NO_KNOWN_MARKER))
            .unwrap_or(false)
    };
    mentions(concept.text.as_deref()) || concept.coding.iter().any(|c| mentions(c.display.as_deref()))
}
