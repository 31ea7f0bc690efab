//! Raw board action shapes
//!
//! The host returns card moves as loosely-typed JSON. Every field here is
//! optional, and a field holding the wrong JSON type reads as absent, so one
//! odd record deserializes instead of failing the batch; the normalizer
//! decides what is usable.

use crate::error::ReportError;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Action type the host uses for card updates
pub const UPDATE_CARD_TYPE: &str = "updateCard";

/// Server-side filter selecting only card-list moves
pub const LIST_MOVE_FILTER: &str = "updateCard:idList";

/// Reference to a card inside an action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRef {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// Reference to a list inside an action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRef {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// Member who performed the action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, rename = "fullName", deserialize_with = "lenient")]
    pub full_name: Option<String>,
}

/// Payload of a card-list move
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionData {
    #[serde(default, deserialize_with = "lenient")]
    pub card: Option<CardRef>,
    #[serde(default, rename = "listBefore", deserialize_with = "lenient")]
    pub list_before: Option<ListRef>,
    #[serde(default, rename = "listAfter", deserialize_with = "lenient")]
    pub list_after: Option<ListRef>,
}

/// One element of the host's action log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub action_type: Option<String>,
    /// RFC 3339 string or epoch milliseconds
    #[serde(default)]
    pub date: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<ActionData>,
    #[serde(default, rename = "idMemberCreator", deserialize_with = "lenient")]
    pub id_member_creator: Option<String>,
    #[serde(default, rename = "memberCreator", deserialize_with = "lenient")]
    pub member_creator: Option<MemberRef>,
}

impl RawAction {
    /// Card reference, if the action carries one
    pub fn card(&self) -> Option<&CardRef> {
        self.data.as_ref().and_then(|d| d.card.as_ref())
    }

    pub fn list_before(&self) -> Option<&ListRef> {
        self.data.as_ref().and_then(|d| d.list_before.as_ref())
    }

    pub fn list_after(&self) -> Option<&ListRef> {
        self.data.as_ref().and_then(|d| d.list_after.as_ref())
    }

    /// Acting member id, preferring the embedded member object
    pub fn actor_id(&self) -> Option<&str> {
        self.member_creator
            .as_ref()
            .and_then(|m| m.id.as_deref())
            .or(self.id_member_creator.as_deref())
    }

    pub fn actor_name(&self) -> Option<&str> {
        self.member_creator
            .as_ref()
            .and_then(|m| m.full_name.as_deref())
    }

    /// Parse the action date into a UTC instant
    pub fn timestamp(&self) -> Result<DateTime<Utc>, SkipReason> {
        match &self.date {
            None | Some(serde_json::Value::Null) => Err(SkipReason::MissingTimestamp),
            Some(value) => parse_timestamp(value).ok_or(SkipReason::UnparsableTimestamp),
        }
    }

    /// Check that the action identifies a card, returning its id
    pub fn validate(&self) -> Result<&str, SkipReason> {
        let card = self.card().ok_or(SkipReason::MissingCard)?;
        match card.id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(SkipReason::MissingCardId),
        }
    }
}

/// Deserialize an optional field, reading a value of the wrong shape as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value::<Option<T>>(value).ok().flatten())
}

/// Why a raw action was dropped from the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[error("element is not an action object")]
    NotAnObject,

    #[error("action has no card reference")]
    MissingCard,

    #[error("card reference has no id")]
    MissingCardId,

    #[error("action has no date")]
    MissingTimestamp,

    #[error("action date could not be parsed")]
    UnparsableTimestamp,
}

/// Parse an action date: RFC 3339 text or integer epoch milliseconds
pub fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Locate the action sequence in a host response.
///
/// Accepts either a bare array or an object wrapping the array under
/// `actions`. Anything else is a malformed response.
pub fn extract_actions(response: &serde_json::Value) -> Result<&[serde_json::Value], ReportError> {
    if let Some(actions) = response.as_array() {
        return Ok(actions);
    }

    match response.get("actions") {
        Some(serde_json::Value::Array(actions)) => Ok(actions),
        Some(other) => Err(ReportError::MalformedResponse(format!(
            "`actions` field is {}, expected an array",
            json_kind(other)
        ))),
        None => Err(ReportError::MalformedResponse(format!(
            "response is {} without an `actions` array",
            json_kind(response)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
