//! Host capabilities
//!
//! Everything the panel needs from the hosting board platform goes through
//! [`HostClient`]: board lookup, the action log, members, scoped preference
//! storage, file download and popup dismissal. Implementations are injected;
//! nothing in the crate reaches for a global client.

pub mod local;
#[cfg(test)]
pub(crate) mod mock;

pub use local::{ExportTarget, LocalHost};

use crate::error::ReportError;
use crate::types::ExportFile;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Fields requested for each action
pub const ACTION_FIELDS: &str = "id,date,data,memberCreator";

/// Fields requested for the acting member
pub const MEMBER_CREATOR_FIELDS: &str = "fullName";

/// Capability object supplied by the hosting environment
pub trait HostClient {
    /// Identifier of the board the panel is open on
    fn board_id(&self) -> Result<String, ReportError>;

    /// Fetch the raw action log (bare array or `{ "actions": [...] }`)
    fn fetch_action_log(&self, query: &ActionQuery) -> Result<serde_json::Value, ReportError>;

    /// Fetch board members for the assignee selector
    fn fetch_members(&self, board_id: &str) -> Result<Vec<Member>, ReportError>;

    /// Read a viewer-private, board-scoped value; `None` when nothing is stored
    fn get_preference(&self, key: &str) -> Result<Option<serde_json::Value>, ReportError>;

    /// Write a viewer-private, board-scoped value; `None` clears it
    fn set_preference(&self, key: &str, value: Option<serde_json::Value>)
        -> Result<(), ReportError>;

    /// Hand a file to the host's download mechanism
    fn save_export(&self, file: &ExportFile) -> Result<(), ReportError>;

    /// Close the current popup
    fn dismiss(&self);
}

/// A board member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Half-open time range `[since, before)` chosen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub since: DateTime<Utc>,
    pub before: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(since: DateTime<Utc>, before: DateTime<Utc>) -> Result<Self, ReportError> {
        if since > before {
            return Err(ReportError::InvalidWindow(format!(
                "start {} is after end {}",
                since.to_rfc3339(),
                before.to_rfc3339()
            )));
        }
        Ok(Self { since, before })
    }

    /// Build a window from the two date inputs of the export form.
    ///
    /// Both inputs are required and accept `YYYY-MM-DD` (midnight UTC) or
    /// RFC 3339.
    pub fn from_inputs(since: &str, before: &str) -> Result<Self, ReportError> {
        let (since, before) = (since.trim(), before.trim());
        if since.is_empty() || before.is_empty() {
            return Err(ReportError::InvalidWindow(
                "both start and end dates are required".to_string(),
            ));
        }
        Self::new(parse_date_input(since)?, parse_date_input(before)?)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.since <= instant && instant < self.before
    }
}

fn parse_date_input(input: &str) -> Result<DateTime<Utc>, ReportError> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ReportError::InvalidWindow(format!("{input}: {e}")))
}

/// Request for one board's action log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionQuery {
    pub board_id: String,
    pub filter: String,
    pub window: DateWindow,
    pub fields: String,
    pub member_creator_fields: String,
}

impl ActionQuery {
    pub fn new(board_id: impl Into<String>, window: DateWindow, filter: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            filter: filter.into(),
            window,
            fields: ACTION_FIELDS.to_string(),
            member_creator_fields: MEMBER_CREATOR_FIELDS.to_string(),
        }
    }

    /// Request path on the host API
    pub fn path(&self) -> String {
        format!("/1/boards/{}/actions", self.board_id)
    }

    /// Query parameters, in request order
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("filter", self.filter.clone()),
            (
                "since",
                self.window.since.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            (
                "before",
                self.window.before.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            ("fields", self.fields.clone()),
            ("memberCreator_fields", self.member_creator_fields.clone()),
        ]
    }
}
