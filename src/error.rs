//! Error types for Card Dwell

use thiserror::Error;

/// Errors that can occur while loading, computing or exporting a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Malformed action log response: {0}")]
    MalformedResponse(String),

    #[error("No records found for the selected date range")]
    NoMatchingRecords,

    #[error("Failed to fetch from host: {0}")]
    Fetch(String),

    #[error("Preference storage error: {0}")]
    Storage(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Invalid date window: {0}")]
    InvalidWindow(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ReportError {
    /// The single line shown to the person who triggered the action.
    ///
    /// Pipeline stages never message the user themselves; callers translate
    /// whatever they get back through this.
    pub fn user_message(&self) -> &'static str {
        match self {
            ReportError::NoMatchingRecords => "No records found for the selected date range.",
            ReportError::InvalidWindow(_) => "Both start and end dates are required.",
            ReportError::Storage(_) => "Failed to save settings. Please try again.",
            ReportError::Export(_) => "Failed to export card activities. Please try again.",
            ReportError::MalformedResponse(_)
            | ReportError::Fetch(_)
            | ReportError::InvalidTimezone(_)
            | ReportError::Config(_)
            | ReportError::JsonError(_) => "Failed to load card activities. Please try again.",
        }
    }

    /// Recoverable outcomes surface as a notice rather than an error banner
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReportError::NoMatchingRecords | ReportError::InvalidWindow(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matching_records_is_recoverable() {
        let err = ReportError::NoMatchingRecords;
        assert!(err.is_recoverable());
        assert_eq!(
            err.user_message(),
            "No records found for the selected date range."
        );
    }

    #[test]
    fn test_fetch_failure_maps_to_generic_message() {
        let err = ReportError::Fetch("connection reset".to_string());
        assert!(!err.is_recoverable());
        assert_eq!(
            err.user_message(),
            "Failed to load card activities. Please try again."
        );
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_malformed_response_is_not_recoverable() {
        let err = ReportError::MalformedResponse("expected array".to_string());
        assert!(!err.is_recoverable());
    }
}
