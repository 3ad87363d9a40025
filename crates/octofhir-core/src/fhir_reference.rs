//! FHIR Reference parsing for references between entries of one bundle.
//!
//! Only relative references resolve inside a bundle:
//! - Relative: `Medication/123`
//! - Versioned: `Medication/123/_history/1` (the version is ignored for identity)
//!
//! Contained (`#id`), URN (`urn:uuid:…`) and absolute (`http://…`) references point
//! outside the set of bundle entries keyed by `Type/id` and are reported as
//! [`UnresolvableReference`]. Callers leave those untouched.
//!
//! # Example
//!
//! ```
//! use octofhir_core::fhir_reference::parse_reference;
//!
//! let reference = parse_reference("Medication/123/_history/2").unwrap();
//! assert_eq!(reference.resource_type, "Medication");
//! assert_eq!(reference.id, "123");
//! assert_eq!(reference.to_relative(), "Medication/123");
//! ```

use std::fmt;

/// A successfully parsed bundle-local reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FhirReference {
    /// The resource type (e.g., "Medication", "Condition")
    pub resource_type: String,
    /// The resource ID
    pub id: String,
    /// Optional version ID from `_history` suffix
    pub version: Option<String>,
}

impl FhirReference {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            version: None,
        }
    }

    /// Returns the reference as a relative string (Type/id).
    pub fn to_relative(&self) -> String {
        format!("{}/{}", self.resource_type, self.id)
    }
}

impl fmt::Display for FhirReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

/// A reference that does not address another entry of the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvableReference {
    /// A contained reference (starts with `#`)
    Contained(String),
    /// A URN reference (`urn:uuid:xxx` or `urn:oid:xxx`)
    Urn(String),
    /// An absolute URL
    Absolute(String),
    /// A malformed reference
    Invalid(String),
}

impl fmt::Display for UnresolvableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contained(id) => write!(f, "contained reference: #{id}"),
            Self::Urn(urn) => write!(f, "URN reference: {urn}"),
            Self::Absolute(url) => write!(f, "absolute reference: {url}"),
            Self::Invalid(reason) => write!(f, "invalid reference: {reason}"),
        }
    }
}

impl std::error::Error for UnresolvableReference {}

/// Parse a reference string into its `Type/id[/_history/version]` components.
pub fn parse_reference(reference: &str) -> Result<FhirReference, UnresolvableReference> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(UnresolvableReference::Invalid("empty reference".to_string()));
    }

    if let Some(contained_id) = reference.strip_prefix('#') {
        return Err(UnresolvableReference::Contained(contained_id.to_string()));
    }

    if reference.starts_with("urn:") {
        return Err(UnresolvableReference::Urn(reference.to_string()));
    }

    if reference.contains("://") {
        return Err(UnresolvableReference::Absolute(reference.to_string()));
    }

    let mut parts = reference.split('/');
    let (Some(resource_type), Some(id)) = (parts.next(), parts.next()) else {
        return Err(UnresolvableReference::Invalid(format!(
            "reference must contain at least Type/id: {reference}"
        )));
    };

    if !resource_type
        .chars()
        .next()
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false)
    {
        return Err(UnresolvableReference::Invalid(format!(
            "resource type must start with uppercase letter: {resource_type}"
        )));
    }

    if id.is_empty() {
        return Err(UnresolvableReference::Invalid(
            "resource id cannot be empty".to_string(),
        ));
    }

    let version = match (parts.next(), parts.next()) {
        (Some("_history"), Some(version)) if !version.is_empty() => Some(version.to_string()),
        _ => None,
    };

    Ok(FhirReference {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
        version,
    })
}

/// Relative `Type/id` form of a reference, or `None` when it is not bundle-local.
pub fn local_reference(reference: &str) -> Option<String> {
    parse_reference(reference).ok().map(|r| r.to_relative())
}
