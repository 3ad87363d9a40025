pub mod bundle;
pub mod coding;
pub mod error;
pub mod fhir;
pub mod fhir_reference;
pub mod time;

pub use bundle::{Bundle, BundleEntry, Resource};
pub use coding::{CodeableConcept, Coding};
pub use error::{CoreError, Result};
pub use fhir::ResourceType;
pub use fhir_reference::{FhirReference, UnresolvableReference, local_reference, parse_reference};
pub use time::{FhirDateTime, normalize_date};
