//! In-memory host for tests

use super::{ActionQuery, HostClient, Member};
use crate::error::ReportError;
use crate::types::ExportFile;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Default)]
pub(crate) struct MockHost {
    pub board_id: String,
    pub action_log: Option<Value>,
    pub members: Vec<Member>,
    pub fail_fetch: bool,
    pub fail_storage: bool,
    pub preferences: RefCell<HashMap<String, Value>>,
    pub queries: RefCell<Vec<ActionQuery>>,
    pub exports: RefCell<Vec<ExportFile>>,
    pub dismissals: Cell<usize>,
}

impl MockHost {
    pub fn with_log(action_log: Value) -> Self {
        Self {
            board_id: "board-1".to_string(),
            action_log: Some(action_log),
            ..Self::default()
        }
    }
}

impl HostClient for MockHost {
    fn board_id(&self) -> Result<String, ReportError> {
        Ok(self.board_id.clone())
    }

    fn fetch_action_log(&self, query: &ActionQuery) -> Result<Value, ReportError> {
        self.queries.borrow_mut().push(query.clone());
        if self.fail_fetch {
            return Err(ReportError::Fetch("host rejected the request".to_string()));
        }
        self.action_log
            .clone()
            .ok_or_else(|| ReportError::Fetch("no log".to_string()))
    }

    fn fetch_members(&self, _board_id: &str) -> Result<Vec<Member>, ReportError> {
        if self.fail_fetch {
            return Err(ReportError::Fetch("host rejected the request".to_string()));
        }
        Ok(self.members.clone())
    }

    fn get_preference(&self, key: &str) -> Result<Option<Value>, ReportError> {
        if self.fail_storage {
            return Err(ReportError::Storage("storage unavailable".to_string()));
        }
        Ok(self.preferences.borrow().get(key).cloned())
    }

    fn set_preference(&self, key: &str, value: Option<Value>) -> Result<(), ReportError> {
        if self.fail_storage {
            return Err(ReportError::Storage("storage unavailable".to_string()));
        }
        let mut preferences = self.preferences.borrow_mut();
        match value {
            Some(value) => preferences.insert(key.to_string(), value),
            None => preferences.remove(key),
        };
        Ok(())
    }

    fn save_export(&self, file: &ExportFile) -> Result<(), ReportError> {
        self.exports.borrow_mut().push(file.clone());
        Ok(())
    }

    fn dismiss(&self) {
        self.dismissals.set(self.dismissals.get() + 1);
    }
}
