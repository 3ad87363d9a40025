//! Deduplication of multi-source FHIR patient bundles.
//!
//! A patient's record assembled from several sources carries the same medication,
//! condition or visit many times over. [`Deduplicator`] collapses each group of
//! equivalent resources into one master, records the absorbed ids as provenance
//! extensions, rewrites references to the survivors and removes what no longer
//! resolves. Running it on its own output changes nothing.

pub mod assembly;
pub mod collector;
pub mod config;
pub mod error;
pub mod key;
pub mod merge;
pub mod pipeline;
pub mod provenance;
pub mod reconcile;
pub mod references;
pub mod registry;
pub mod report;
pub mod rules;
pub mod sweep;

pub use config::{DEFAULT_PROVENANCE_URL, DedupConfig, MissingDatePolicy};
pub use error::{DedupError, Result};
pub use key::{Exclusion, GroupKey, KeyOutcome};
pub use pipeline::{DedupOutcome, Deduplicator, Pass, deduplicate, deduplicate_json, standard_passes};
pub use reconcile::{ReconciliationTable, Reducer};
pub use registry::{CodeSystem, ConceptFamily};
pub use report::{DedupReport, TypeStats};
pub use rules::{EquivalenceRule, ResourceRole, RuleRegistry};
