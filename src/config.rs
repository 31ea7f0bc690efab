//! Report configuration
//!
//! Loaded from TOML; every key is optional and falls back to the defaults below.

use crate::dwell::NegativeDurationPolicy;
use crate::error::ReportError;
use crate::schema::LIST_MOVE_FILTER;
use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default export filename
pub const DEFAULT_EXPORT_FILENAME: &str = "card_activity_log.csv";

/// Default action date format (month/day/year, 12-hour clock)
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Settings that shape how a report is computed and rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// IANA timezone used to render action dates
    pub timezone: String,
    /// chrono format string for action dates
    pub timestamp_format: String,
    /// Suggested filename for the CSV export
    pub export_filename: String,
    pub negative_durations: NegativeDurationPolicy,
    /// Suffix open intervals with " (ongoing)" in display rows
    pub mark_open_intervals: bool,
    /// Action filter sent with the log query
    pub action_filter: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            export_filename: DEFAULT_EXPORT_FILENAME.to_string(),
            negative_durations: NegativeDurationPolicy::Report,
            mark_open_intervals: false,
            action_filter: LIST_MOVE_FILTER.to_string(),
        }
    }
}

impl ReportConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ReportError> {
        let config: ReportConfig =
            toml::from_str(text).map_err(|e| ReportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject timezones and date formats that cannot be rendered
    pub fn validate(&self) -> Result<(), ReportError> {
        self.display_timezone()?;
        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(ReportError::Config(format!(
                "invalid timestamp_format: {}",
                self.timestamp_format
            )));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReportError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Serialize configuration to TOML text
    pub fn to_toml_string(&self) -> Result<String, ReportError> {
        toml::to_string_pretty(self).map_err(|e| ReportError::Config(e.to_string()))
    }

    /// The configured timezone, parsed
    pub fn display_timezone(&self) -> Result<Tz, ReportError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ReportError::InvalidTimezone(format!("{}: {}", self.timezone, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ReportConfig::default();
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.export_filename, "card_activity_log.csv");
        assert_eq!(config.action_filter, "updateCard:idList");
        assert_eq!(config.negative_durations, NegativeDurationPolicy::Report);
        assert!(!config.mark_open_intervals);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ReportConfig::from_toml_str(
            r#"
            timezone = "Europe/Berlin"
            negative_durations = "clamp"
            "#,
        )
        .unwrap();

        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.negative_durations, NegativeDurationPolicy::Clamp);
        assert_eq!(config.timestamp_format, DEFAULT_TIMESTAMP_FORMAT);
        assert_eq!(config.display_timezone().unwrap(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let result = ReportConfig::from_toml_str(r#"timezone = "Mars/Olympus""#);
        assert!(matches!(result, Err(ReportError::InvalidTimezone(_))));
    }

    #[test]
    fn test_invalid_timestamp_format_rejected() {
        let result = ReportConfig::from_toml_str("timestamp_format = \"%Y-%m %\"");
        assert!(matches!(result, Err(ReportError::Config(_))));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let result = ReportConfig::from_toml_str("timezone = ");
        assert!(matches!(result, Err(ReportError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "export_filename = \"moves.csv\"").unwrap();
        writeln!(file, "mark_open_intervals = true").unwrap();

        let config = ReportConfig::load(file.path()).unwrap();
        assert_eq!(config.export_filename, "moves.csv");
        assert!(config.mark_open_intervals);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ReportConfig {
            timezone: "America/New_York".to_string(),
            ..ReportConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(ReportConfig::from_toml_str(&text).unwrap(), config);
    }
}
