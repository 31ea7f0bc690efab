//! File-backed host
//!
//! Serves a board's action log and members from JSON files on disk, keeps
//! preferences in a JSON object file and writes exports to a directory or
//! stdout. The log is filtered the way the host API would filter it.

use super::{ActionQuery, HostClient, Member};
use crate::error::ReportError;
use crate::schema::{parse_timestamp, LIST_MOVE_FILTER, UPDATE_CARD_TYPE};
use crate::types::ExportFile;
use serde_json::{Map, Value};
use std::cell::Cell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Where exported files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// Write `<dir>/<filename>`
    Directory(PathBuf),
    /// Write the payload to stdout
    Stdout,
    /// Drop the payload
    Discard,
}

/// Where the action log comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum ActionSource {
    File(PathBuf),
    Text(String),
}

/// Host backed by local files
#[derive(Debug)]
pub struct LocalHost {
    board_id: String,
    actions: Option<ActionSource>,
    members_path: Option<PathBuf>,
    preferences_path: Option<PathBuf>,
    export_target: ExportTarget,
    dismissals: Cell<usize>,
}

impl LocalHost {
    pub fn new(board_id: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            actions: None,
            members_path: None,
            preferences_path: None,
            export_target: ExportTarget::Discard,
            dismissals: Cell::new(0),
        }
    }

    /// Action log JSON file
    pub fn with_actions(mut self, path: impl Into<PathBuf>) -> Self {
        self.actions = Some(ActionSource::File(path.into()));
        self
    }

    /// Action log JSON already in memory (e.g. read from stdin)
    pub fn with_action_log_text(mut self, text: impl Into<String>) -> Self {
        self.actions = Some(ActionSource::Text(text.into()));
        self
    }

    /// Members JSON file (array or `{ "members": [...] }`)
    pub fn with_members(mut self, path: impl Into<PathBuf>) -> Self {
        self.members_path = Some(path.into());
        self
    }

    /// Preference store JSON file; created on first write
    pub fn with_preferences(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = Some(path.into());
        self
    }

    pub fn with_export_target(mut self, target: ExportTarget) -> Self {
        self.export_target = target;
        self
    }

    pub fn export_target(&self) -> &ExportTarget {
        &self.export_target
    }

    /// How many times the popup was dismissed
    pub fn dismissals(&self) -> usize {
        self.dismissals.get()
    }

    fn read_preferences(&self, path: &Path) -> Result<Map<String, Value>, ReportError> {
        if !path.exists() {
            return Ok(Map::new());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| ReportError::Storage(format!("{}: {}", path.display(), e)))?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&text)
            .map_err(|e| ReportError::Storage(format!("{}: {}", path.display(), e)))?
        {
            Value::Object(map) => Ok(map),
            _ => Err(ReportError::Storage(format!(
                "{}: preference file is not a JSON object",
                path.display()
            ))),
        }
    }
}

impl HostClient for LocalHost {
    fn board_id(&self) -> Result<String, ReportError> {
        Ok(self.board_id.clone())
    }

    fn fetch_action_log(&self, query: &ActionQuery) -> Result<Value, ReportError> {
        let response: Value = match &self.actions {
            Some(ActionSource::File(path)) => {
                let text = fs::read_to_string(path)
                    .map_err(|e| ReportError::Fetch(format!("{}: {}", path.display(), e)))?;
                serde_json::from_str(&text)?
            }
            Some(ActionSource::Text(text)) => serde_json::from_str(text)?,
            None => return Err(ReportError::Fetch("no action log configured".to_string())),
        };
        Ok(apply_query(response, query))
    }

    fn fetch_members(&self, _board_id: &str) -> Result<Vec<Member>, ReportError> {
        let Some(path) = self.members_path.as_ref() else {
            return Ok(Vec::new());
        };
        let text = fs::read_to_string(path)
            .map_err(|e| ReportError::Fetch(format!("{}: {}", path.display(), e)))?;
        let value: Value = serde_json::from_str(&text)?;
        let members = match value {
            Value::Object(mut map) => map.remove("members").unwrap_or(Value::Null),
            other => other,
        };
        serde_json::from_value(members)
            .map_err(|e| ReportError::Fetch(format!("{}: {}", path.display(), e)))
    }

    fn get_preference(&self, key: &str) -> Result<Option<Value>, ReportError> {
        let Some(path) = self.preferences_path.as_ref() else {
            return Ok(None);
        };
        Ok(self
            .read_preferences(path)?
            .remove(key)
            .filter(|value| !value.is_null()))
    }

    fn set_preference(&self, key: &str, value: Option<Value>) -> Result<(), ReportError> {
        let path = self
            .preferences_path
            .as_ref()
            .ok_or_else(|| ReportError::Storage("no preference store configured".to_string()))?;
        let mut preferences = self.read_preferences(path)?;
        match value {
            Some(value) if !value.is_null() => {
                preferences.insert(key.to_string(), value);
            }
            _ => {
                preferences.remove(key);
            }
        }
        let text = serde_json::to_string_pretty(&Value::Object(preferences))?;
        fs::write(path, text)
            .map_err(|e| ReportError::Storage(format!("{}: {}", path.display(), e)))
    }

    fn save_export(&self, file: &ExportFile) -> Result<(), ReportError> {
        match &self.export_target {
            ExportTarget::Directory(dir) => {
                let path = dir.join(&file.filename);
                fs::write(&path, &file.bytes)
                    .map_err(|e| ReportError::Export(format!("{}: {}", path.display(), e)))?;
                log::info!("export written to {}", path.display());
                Ok(())
            }
            ExportTarget::Stdout => {
                let mut stdout = io::stdout();
                stdout
                    .write_all(&file.bytes)
                    .and_then(|_| stdout.flush())
                    .map_err(|e| ReportError::Export(e.to_string()))
            }
            ExportTarget::Discard => Ok(()),
        }
    }

    fn dismiss(&self) {
        self.dismissals.set(self.dismissals.get() + 1);
    }
}

/// Filter a response the way the host API would for `query`.
///
/// Only card updates that change lists are kept, and only those dated inside
/// the window. A `null` list does not count as a change. Elements with unreadable dates are passed through for the
/// normalizer to judge. Responses without an action array are returned as-is.
fn apply_query(response: Value, query: &ActionQuery) -> Value {
    let keep = |action: &Value| {
        let action_type = action.get("type").and_then(Value::as_str);
        if action_type.is_some_and(|t| t != UPDATE_CARD_TYPE) {
            return false;
        }
        if query.filter == LIST_MOVE_FILTER {
            let has_list = |key: &str| {
                action
                    .get("data")
                    .and_then(|d| d.get(key))
                    .is_some_and(|v| !v.is_null())
            };
            if !has_list("listAfter") && !has_list("listBefore") {
                return false;
            }
        }
        match action.get("date").and_then(parse_timestamp) {
            Some(instant) => query.window.contains(instant),
            None => true,
        }
    };

    match response {
        Value::Array(actions) => Value::Array(actions.into_iter().filter(|a| keep(a)).collect()),
        Value::Object(mut map) => {
            if let Some(Value::Array(actions)) = map.remove("actions") {
                map.insert(
                    "actions".to_string(),
                    Value::Array(actions.into_iter().filter(|a| keep(a)).collect()),
                );
            }
            Value::Object(map)
        }
        other => other,
    }
}
