//! Core types for the Card Dwell pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: normalized events, per-card timelines, activity records and the
//! rendered report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when a move has no list on one side
pub const NO_LIST: &str = "N/A";

/// Placeholder used when the acting member is missing
pub const UNKNOWN_ACTOR: &str = "Unknown";

/// A card-list move event in canonical form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Host action identifier, when present
    pub action_id: Option<String>,
    /// Identifier of the card that moved
    pub card_id: String,
    /// Display name of the card
    pub card_name: String,
    /// When the move happened (UTC)
    pub timestamp: DateTime<Utc>,
    /// Identifier of the member who moved the card
    pub actor_id: Option<String>,
    /// Display name of the member who moved the card
    pub actor_name: String,
    /// List the card left, or `N/A`
    pub from_list: String,
    /// List the card entered, or `N/A`
    pub to_list: String,
}

/// Chronologically ordered moves of a single card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTimeline {
    pub card_id: String,
    /// Non-decreasing by timestamp
    pub events: Vec<NormalizedEvent>,
}

impl CardTimeline {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// All card timelines for one request, in first-seen card order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTimelines {
    timelines: Vec<CardTimeline>,
}

impl CardTimelines {
    pub(crate) fn from_ordered(timelines: Vec<CardTimeline>) -> Self {
        Self { timelines }
    }

    /// Look up one card's timeline
    pub fn get(&self, card_id: &str) -> Option<&CardTimeline> {
        self.timelines.iter().find(|t| t.card_id == card_id)
    }

    /// Iterate timelines in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &CardTimeline> {
        self.timelines.iter()
    }

    /// Card identifiers in first-seen order
    pub fn card_ids(&self) -> Vec<&str> {
        self.timelines.iter().map(|t| t.card_id.as_str()).collect()
    }

    /// Number of distinct cards
    pub fn card_count(&self) -> usize {
        self.timelines.len()
    }

    /// Total number of events across all cards
    pub fn event_count(&self) -> usize {
        self.timelines.iter().map(CardTimeline::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }
}

/// Time a card spent in the list it entered at a given move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwellInterval {
    /// Signed length in milliseconds
    pub millis: i64,
    /// True for the last move of a card, measured up to report time
    pub open: bool,
    /// True when the raw delta was negative (future-dated move or clock skew)
    pub negative: bool,
}

impl DwellInterval {
    pub fn as_duration(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.millis)
    }
}

/// One row of computed card activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub card_id: String,
    pub card_name: String,
    /// Identifier of the member who made the move
    pub actor_id: Option<String>,
    pub actor_name: String,
    pub from_list: String,
    pub to_list: String,
    pub event_time: DateTime<Utc>,
    pub dwell: DwellInterval,
}

/// Display-ready table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub card_name: String,
    pub moved_by: String,
    pub from_list: String,
    pub to_list: String,
    pub time_in_list: String,
    pub action_date: String,
    /// Final move of the card; time in list is still accruing
    pub ongoing: bool,
}

/// File handed to the host's download mechanism
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Suggested filename
    pub filename: String,
    /// MIME type of `bytes`
    pub mime_type: String,
    /// Payload
    pub bytes: Vec<u8>,
}

impl ExportFile {
    /// Payload as text (exports are always UTF-8)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Counters describing one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Activity records emitted
    pub records: usize,
    /// Distinct cards
    pub cards: usize,
    /// Raw actions dropped by the normalizer
    pub skipped_actions: usize,
    /// Records whose interval runs up to report time
    pub open_intervals: usize,
    /// Records whose raw interval was negative
    pub negative_intervals: usize,
}

/// Rendered report: table rows plus export payload
#[derive(Debug, Clone)]
pub struct Report {
    /// Unique id of the run that produced this report
    pub run_id: String,
    /// The instant used as "now" for open intervals
    pub generated_at: DateTime<Utc>,
    pub records: Vec<ActivityRecord>,
    pub rows: Vec<DisplayRow>,
    pub export: ExportFile,
    pub summary: ReportSummary,
}
