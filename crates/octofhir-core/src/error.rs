use thiserror::Error;

/// Errors raised while reading bundles and FHIR dates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid FHIR resource type: {0}")]
    InvalidResourceType(String),

    #[error("Invalid FHIR DateTime: {0}")]
    InvalidDateTime(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time parsing error: {0}")]
    TimeError(#[from] time::error::Parse),
}

impl CoreError {
    pub fn invalid_resource_type(resource_type: impl Into<String>) -> Self {
        Self::InvalidResourceType(resource_type.into())
    }

    pub fn invalid_date_time(datetime: impl Into<String>) -> Self {
        Self::InvalidDateTime(datetime.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_message() {
        let err = CoreError::invalid_resource_type("expected Bundle, found Patient");
        assert_eq!(
            err.to_string(),
            "Invalid FHIR resource type: expected Bundle, found Patient"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let core_err: CoreError = json_err.into();
        assert!(matches!(core_err, CoreError::JsonError(_)));
    }

    #[test]
    fn test_time_error_conversion() {
        let format = time::format_description::parse("[year]-[month]-[day]").unwrap();
        let err = time::Date::parse("2023-13-45", &format).unwrap_err();
        let core_err: CoreError = err.into();
        assert!(matches!(core_err, CoreError::TimeError(_)));
    }
}
