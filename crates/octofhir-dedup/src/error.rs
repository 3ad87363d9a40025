use octofhir_core::CoreError;
use thiserror::Error;

/// Errors raised while deduplicating a bundle.
///
/// Per-resource key errors never abort a run; the group collector resolves them
/// through [`MissingDatePolicy`](crate::config::MissingDatePolicy).
#[derive(Debug, Error)]
pub enum DedupError {
    #[error("{reference} has no date usable for grouping")]
    MissingDate { reference: String },

    #[error("{reference} has an invalid date: {source}")]
    InvalidDate {
        reference: String,
        #[source]
        source: CoreError,
    },

    #[error("Invalid deduplication config: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DedupError {
    pub fn missing_date(reference: impl Into<String>) -> Self {
        Self::MissingDate {
            reference: reference.into(),
        }
    }

    pub fn invalid_date(reference: impl Into<String>, source: CoreError) -> Self {
        Self::InvalidDate {
            reference: reference.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for errors that stem from a resource's temporal fields.
    pub fn is_date_error(&self) -> bool {
        matches!(self, Self::MissingDate { .. } | Self::InvalidDate { .. })
    }
}

pub type Result<T> = std::result::Result<T, DedupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_date_message() {
        let err = DedupError::missing_date("Condition/c1");
        assert_eq!(err.to_string(), "Condition/c1 has no date usable for grouping");
        assert!(err.is_date_error());
    }

    #[test]
    fn test_invalid_date_keeps_source() {
        let err = DedupError::invalid_date(
            "Procedure/p1",
            CoreError::invalid_date_time("Unrecognized FHIR date 'soon'"),
        );
        assert!(err.is_date_error());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: DedupError = CoreError::invalid_resource_type("expected Bundle, found Patient").into();
        assert_eq!(
            err.to_string(),
            "Invalid FHIR resource type: expected Bundle, found Patient"
        );
        assert!(!err.is_date_error());
    }
}
