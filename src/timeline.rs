//! Card timeline reconstruction
//!
//! Groups normalized events by card and orders each group chronologically.

use crate::types::{CardTimeline, CardTimelines, NormalizedEvent};
use std::collections::HashMap;

/// Builder for per-card timelines
pub struct TimelineBuilder;

impl TimelineBuilder {
    /// Group events by card id, keeping cards in the order they first appear,
    /// then sort each card's events by ascending timestamp.
    ///
    /// The sort is stable: events sharing a timestamp keep their log order.
    /// No event is dropped.
    pub fn build(events: Vec<NormalizedEvent>) -> CardTimelines {
        let (mut timelines, _) = events.into_iter().fold(
            (Vec::<CardTimeline>::new(), HashMap::<String, usize>::new()),
            |(mut timelines, mut slots), event| {
                match slots.get(&event.card_id) {
                    Some(&slot) => timelines[slot].events.push(event),
                    None => {
                        slots.insert(event.card_id.clone(), timelines.len());
                        timelines.push(CardTimeline {
                            card_id: event.card_id.clone(),
                            events: vec![event],
                        });
                    }
                }
                (timelines, slots)
            },
        );

        for timeline in &mut timelines {
            timeline.events.sort_by_key(|e| e.timestamp);
        }

        CardTimelines::from_ordered(timelines)
    }
}
