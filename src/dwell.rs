//! Dwell-time computation
//!
//! For each card, the time spent in the list entered at move `i` is the gap
//! to move `i + 1`. The last move is open: it runs until the report's "now".

use crate::types::{ActivityRecord, CardTimeline, CardTimelines, DwellInterval};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What to do with an interval that comes out negative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeDurationPolicy {
    /// Keep the signed value as computed
    #[default]
    Report,
    /// Replace it with zero
    Clamp,
}

/// Calculator turning card timelines into activity records
#[derive(Debug, Clone, Copy, Default)]
pub struct DwellCalculator {
    policy: NegativeDurationPolicy,
}

impl DwellCalculator {
    pub fn new(policy: NegativeDurationPolicy) -> Self {
        Self { policy }
    }

    /// Compute one record per event.
    ///
    /// Records follow the card order of `timelines` and each card's
    /// chronological order. `now` closes the final interval of every card.
    pub fn compute(&self, timelines: &CardTimelines, now: DateTime<Utc>) -> Vec<ActivityRecord> {
        let mut records = Vec::with_capacity(timelines.event_count());
        for timeline in timelines.iter() {
            self.compute_card(timeline, now, &mut records);
        }
        records
    }

    fn compute_card(
        &self,
        timeline: &CardTimeline,
        now: DateTime<Utc>,
        records: &mut Vec<ActivityRecord>,
    ) {
        let events = &timeline.events;
        for (i, current) in events.iter().enumerate() {
            let (end, open) = match events.get(i + 1) {
                Some(next) => (next.timestamp, false),
                None => (now, true),
            };
            let raw_millis = (end - current.timestamp).num_milliseconds();
            let negative = raw_millis < 0;
            if negative {
                log::warn!(
                    "negative dwell of {} ms for card {} at {}",
                    raw_millis,
                    timeline.card_id,
                    current.timestamp.to_rfc3339()
                );
            }

            let millis = match self.policy {
                NegativeDurationPolicy::Clamp if negative => 0,
                _ => raw_millis,
            };

            records.push(ActivityRecord {
                card_id: current.card_id.clone(),
                card_name: current.card_name.clone(),
                actor_id: current.actor_id.clone(),
                actor_name: current.actor_name.clone(),
                from_list: current.from_list.clone(),
                to_list: current.to_list.clone(),
                event_time: current.timestamp,
                dwell: DwellInterval {
                    millis,
                    open,
                    negative,
                },
            });
        }
    }
}

/// Format milliseconds as `HH:MM:SS`.
///
/// Seconds are floor-divided, hours are not wrapped at 24 and negative spans
/// get a leading `-`.
pub fn format_duration(millis: i64) -> String {
    let total_seconds = millis.div_euclid(1000);
    let sign = if total_seconds < 0 { "-" } else { "" };
    let magnitude = total_seconds.unsigned_abs();
    let hours = magnitude / 3600;
    let minutes = (magnitude % 3600) / 60;
    let seconds = magnitude % 60;
    format!("{sign}{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::TimelineBuilder;
    use crate::types::NormalizedEvent;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn event(card_id: &str, card_name: &str, offset_ms: i64) -> NormalizedEvent {
        NormalizedEvent {
            action_id: None,
            card_id: card_id.to_string(),
            card_name: card_name.to_string(),
            timestamp: t0() + Duration::milliseconds(offset_ms),
            actor_id: None,
            actor_name: "Ada Park".to_string(),
            from_list: "To Do".to_string(),
            to_list: "Doing".to_string(),
        }
    }

    #[test]
    fn test_two_cards_scenario() {
        let timelines = TimelineBuilder::build(vec![
            event("c1", "A", 0),
            event("c2", "B", 30_000),
            event("c1", "A", 90_000),
        ]);
        let now = t0() + Duration::minutes(10);
        let records = DwellCalculator::default().compute(&timelines, now);

        let order: Vec<_> = records
            .iter()
            .map(|r| (r.card_name.as_str(), r.event_time))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A", t0()),
                ("A", t0() + Duration::seconds(90)),
                ("B", t0() + Duration::seconds(30)),
            ]
        );

        assert_eq!(format_duration(records[0].dwell.millis), "00:01:30");
        assert!(!records[0].dwell.open);

        assert!(records[1].dwell.open);
        assert_eq!(records[1].dwell.millis, 510_000);
        assert!(records[2].dwell.open);
        assert_eq!(records[2].dwell.millis, 570_000);
        assert!(records.iter().all(|r| r.dwell.millis >= 0));
    }

    #[test]
    fn test_closed_intervals_equal_successor_delta() {
        let offsets = [0, 1_250, 61_999, 3_600_000, 3_600_000, 90_061_500];
        let timelines =
            TimelineBuilder::build(offsets.iter().map(|&o| event("c1", "A", o)).collect());
        let records = DwellCalculator::default().compute(&timelines, t0() + Duration::days(3));

        for (i, record) in records.iter().enumerate().take(offsets.len() - 1) {
            assert_eq!(record.dwell.millis, offsets[i + 1] - offsets[i]);
            assert!(!record.dwell.open);
        }
        assert!(records.last().unwrap().dwell.open);
    }

    #[test]
    fn test_single_event_is_open() {
        let timelines = TimelineBuilder::build(vec![event("c1", "A", 0)]);
        let records = DwellCalculator::default().compute(&timelines, t0() + Duration::hours(2));

        assert_eq!(records.len(), 1);
        assert!(records[0].dwell.open);
        assert_eq!(format_duration(records[0].dwell.millis), "02:00:00");
    }

    #[test]
    fn test_future_event_reports_negative() {
        let timelines = TimelineBuilder::build(vec![event("c1", "A", 5_000)]);
        let records = DwellCalculator::default().compute(&timelines, t0());

        assert_eq!(records[0].dwell.millis, -5_000);
        assert!(records[0].dwell.negative);
        assert_eq!(format_duration(records[0].dwell.millis), "-00:00:05");
    }

    #[test]
    fn test_future_event_clamped() {
        let timelines = TimelineBuilder::build(vec![event("c1", "A", 5_000)]);
        let records =
            DwellCalculator::new(NegativeDurationPolicy::Clamp).compute(&timelines, t0());

        assert_eq!(records[0].dwell.millis, 0);
        assert!(records[0].dwell.negative);
    }

    #[test]
    fn test_compute_is_idempotent() {
        let timelines = TimelineBuilder::build(vec![
            event("c1", "A", 0),
            event("c2", "B", 10),
            event("c1", "A", 20),
        ]);
        let now = t0() + Duration::hours(1);
        let calculator = DwellCalculator::default();
        assert_eq!(
            calculator.compute(&timelines, now),
            calculator.compute(&timelines, now)
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(999), "00:00:00");
        assert_eq!(format_duration(90_000), "00:01:30");
        assert_eq!(format_duration(3_661_000), "01:01:01");
        // hours are not wrapped at a day
        assert_eq!(format_duration(100 * 3_600_000 + 59_999), "100:00:59");
        // floor, not truncation
        assert_eq!(format_duration(-1), "-00:00:01");
        assert_eq!(format_duration(-61_000), "-00:01:01");
    }
}
