//! Filter panel
//!
//! Glue behind the filter popup: populates the assignee selector and loads,
//! saves or clears the viewer's filter settings for the current board.

use crate::error::ReportError;
use crate::host::{HostClient, Member};
use crate::pipeline::ActivityFilter;
use serde::{Deserialize, Serialize};

/// Storage key for filter settings, scoped per board
pub const FILTER_SETTINGS_KEY: &str = "filterSettings";

pub const MEMBERS_FAILED_MESSAGE: &str = "Failed to load board members. Please try again later.";
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save settings. Please try again.";
pub const RESET_FAILED_MESSAGE: &str = "Failed to reset settings. Please try again.";

/// Board-scoped preference key
pub fn preference_key(board_id: &str) -> String {
    format!("{board_id}:{FILTER_SETTINGS_KEY}")
}

/// Values of the filter form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Pre-filled start date of the report range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Selected member id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

impl FilterSettings {
    /// Blank form fields count as unset
    pub fn activity_filter(&self) -> ActivityFilter {
        ActivityFilter {
            member_id: self
                .member
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        }
    }
}

/// Sort members for the selector, case-insensitively by full name
pub fn sorted_members(mut members: Vec<Member>) -> Vec<Member> {
    members.sort_by(|a, b| {
        a.full_name
            .to_lowercase()
            .cmp(&b.full_name.to_lowercase())
            .then_with(|| a.full_name.cmp(&b.full_name))
    });
    members
}

/// The filter popup bound to one board
pub struct FilterPanel<'a, H: HostClient> {
    host: &'a H,
    board_id: String,
}

impl<'a, H: HostClient> FilterPanel<'a, H> {
    /// Open the panel for the host's current board
    pub fn open(host: &'a H) -> Result<Self, ReportError> {
        let board_id = host.board_id()?;
        Ok(Self { host, board_id })
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// Members for the assignee selector, sorted by name
    pub fn member_options(&self) -> Result<Vec<Member>, ReportError> {
        match self.host.fetch_members(&self.board_id) {
            Ok(members) => Ok(sorted_members(members)),
            Err(e) => {
                log::error!("Error fetching board members: {}", e);
                Err(e)
            }
        }
    }

    /// Stored settings used to pre-fill the form.
    ///
    /// A stored value that is not a settings object is ignored.
    pub fn restore(&self) -> Result<Option<FilterSettings>, ReportError> {
        let stored = self
            .host
            .get_preference(&preference_key(&self.board_id))
            .map_err(|e| {
                log::error!("Error reading filter settings: {}", e);
                e
            })?;
        match stored {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => match serde_json::from_value::<FilterSettings>(value) {
                Ok(settings) => Ok(Some(settings)),
                Err(e) => {
                    log::warn!("ignoring unreadable filter settings: {}", e);
                    Ok(None)
                }
            },
        }
    }

    /// Save settings, then close the popup
    pub fn apply(&self, settings: &FilterSettings) -> Result<(), ReportError> {
        let value = serde_json::to_value(settings)?;
        self.host
            .set_preference(&preference_key(&self.board_id), Some(value))
            .map_err(|e| {
                log::error!("Error saving filter settings: {}", e);
                e
            })?;
        self.host.dismiss();
        Ok(())
    }

    /// Clear settings, then close the popup
    pub fn reset(&self) -> Result<(), ReportError> {
        self.host
            .set_preference(&preference_key(&self.board_id), None)
            .map_err(|e| {
                log::error!("Error resetting filter settings: {}", e);
                e
            })?;
        self.host.dismiss();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn member(id: &str, name: &str) -> Member {
        Member {
            id: id.to_string(),
            full_name: name.to_string(),
            username: None,
        }
    }

    fn host() -> MockHost {
        MockHost::with_log(json!([]))
    }

    #[test]
    fn test_members_sorted_case_insensitively() {
        let mut host = host();
        host.members = vec![
            member("m1", "zoe Quinn"),
            member("m2", "Ada Park"),
            member("m3", "ben Ortiz"),
        ];
        let panel = FilterPanel::open(&host).unwrap();

        let names: Vec<_> = panel
            .member_options()
            .unwrap()
            .into_iter()
            .map(|m| m.full_name)
            .collect();
        assert_eq!(names, vec!["Ada Park", "ben Ortiz", "zoe Quinn"]);
    }

    #[test]
    fn test_member_fetch_failure_propagates() {
        let mut host = host();
        host.fail_fetch = true;
        let panel = FilterPanel::open(&host).unwrap();
        assert!(matches!(panel.member_options(), Err(ReportError::Fetch(_))));
    }

    #[test]
    fn test_apply_saves_then_dismisses() {
        let host = host();
        let panel = FilterPanel::open(&host).unwrap();
        let settings = FilterSettings {
            date: Some("2024-01-15".to_string()),
            member: Some("m2".to_string()),
        };

        panel.apply(&settings).unwrap();

        assert_eq!(host.dismissals.get(), 1);
        assert_eq!(panel.restore().unwrap(), Some(settings));
        assert!(host
            .preferences
            .borrow()
            .contains_key("board-1:filterSettings"));
    }

    #[test]
    fn test_reset_clears_then_dismisses() {
        let host = host();
        let panel = FilterPanel::open(&host).unwrap();
        panel
            .apply(&FilterSettings {
                date: None,
                member: Some("m1".to_string()),
            })
            .unwrap();

        panel.reset().unwrap();

        assert_eq!(host.dismissals.get(), 2);
        assert_eq!(panel.restore().unwrap(), None);
    }

    #[test]
    fn test_storage_failure_does_not_dismiss() {
        let mut host = host();
        host.fail_storage = true;
        let panel = FilterPanel::open(&host).unwrap();

        assert!(panel.apply(&FilterSettings::default()).is_err());
        assert!(panel.reset().is_err());
        assert_eq!(host.dismissals.get(), 0);
    }

    #[test]
    fn test_restore_ignores_garbage() {
        let host = host();
        host.preferences
            .borrow_mut()
            .insert(preference_key("board-1"), json!("not settings"));
        let panel = FilterPanel::open(&host).unwrap();
        assert_eq!(panel.restore().unwrap(), None);
    }

    #[test]
    fn test_blank_member_means_no_filter() {
        let settings = FilterSettings {
            date: None,
            member: Some("  ".to_string()),
        };
        assert_eq!(settings.activity_filter(), ActivityFilter::default());

        let settings = FilterSettings {
            date: None,
            member: Some("m1".to_string()),
        };
        assert_eq!(settings.activity_filter().member_id.as_deref(), Some("m1"));
    }
}
