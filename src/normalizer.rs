//! Action normalization
//!
//! Converts the raw action log into canonical move events. Elements that lack
//! a card or a usable date are dropped individually; only a response with no
//! action array at all fails the batch.

use crate::error::ReportError;
use crate::schema::{extract_actions, RawAction, SkipReason};
use crate::types::{NormalizedEvent, NO_LIST, UNKNOWN_ACTOR};
use serde::Serialize;

/// A raw element that did not survive normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAction {
    /// Position in the raw log
    pub index: usize,
    /// Host action id, if the element had one
    pub action_id: Option<String>,
    pub reason: SkipReason,
}

/// Result of normalizing one action log
#[derive(Debug, Clone, Default)]
pub struct NormalizationOutcome {
    /// Usable events, in raw log order
    pub events: Vec<NormalizedEvent>,
    /// Elements dropped, in raw log order
    pub skipped: Vec<SkippedAction>,
}

/// Normalizer for host action logs
pub struct ActionNormalizer;

impl ActionNormalizer {
    /// Normalize a full host response (bare array or `{ "actions": [...] }`)
    pub fn normalize(response: &serde_json::Value) -> Result<NormalizationOutcome, ReportError> {
        let actions = extract_actions(response)?;
        Ok(Self::normalize_actions(actions))
    }

    /// Normalize an already-located action sequence
    pub fn normalize_actions(actions: &[serde_json::Value]) -> NormalizationOutcome {
        let mut outcome = NormalizationOutcome::default();

        for (index, element) in actions.iter().enumerate() {
            match normalize_element(element) {
                Ok(event) => outcome.events.push(event),
                Err(reason) => {
                    let action_id = element
                        .get("id")
                        .and_then(|id| id.as_str())
                        .map(str::to_string);
                    log::debug!(
                        "skipping action {} ({}): {}",
                        index,
                        action_id.as_deref().unwrap_or("no id"),
                        reason
                    );
                    outcome.skipped.push(SkippedAction {
                        index,
                        action_id,
                        reason,
                    });
                }
            }
        }

        if !outcome.skipped.is_empty() {
            log::info!(
                "normalized {} of {} actions ({} skipped)",
                outcome.events.len(),
                actions.len(),
                outcome.skipped.len()
            );
        }

        outcome
    }
}

fn normalize_element(element: &serde_json::Value) -> Result<NormalizedEvent, SkipReason> {
    if !element.is_object() {
        return Err(SkipReason::NotAnObject);
    }
    let action: RawAction =
        serde_json::from_value(element.clone()).map_err(|_| SkipReason::NotAnObject)?;

    let card_id = action.validate()?.to_string();
    let timestamp = action.timestamp()?;

    Ok(NormalizedEvent {
        action_id: action.id.clone(),
        card_id,
        card_name: action
            .card()
            .and_then(|c| c.name.clone())
            .unwrap_or_default(),
        timestamp,
        actor_id: action.actor_id().map(str::to_string),
        actor_name: action
            .actor_name()
            .unwrap_or(UNKNOWN_ACTOR)
            .to_string(),
        from_list: list_name(action.list_before().and_then(|l| l.name.as_deref())),
        to_list: list_name(action.list_after().and_then(|l| l.name.as_deref())),
    })
}

fn list_name(name: Option<&str>) -> String {
    name.unwrap_or(NO_LIST).to_string()
}
