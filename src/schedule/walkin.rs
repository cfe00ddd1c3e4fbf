use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use ulid::Ulid;

use crate::clock::{format_clock, local_offset};
use crate::limits::*;
use crate::model::*;

use super::overlap::{by_start, event_prompt_span};
use super::timeline::Timeline;
use super::window::{active_service_day, food_span, service_span};

/// Pre-filled values for a new walk-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkInDefaults {
    pub purpose: Purpose,
    pub event_id: Option<Ulid>,
    /// `HH:MM`
    pub suggested_time: String,
}

/// Propose purpose, event and start time for a walk-in arriving at `now`.
pub fn resolve_walk_in_defaults(
    day: ServiceDay,
    now: &DateTime<Tz>,
    window: &ServiceWindow,
    timeline: &Timeline,
    events: &[EventOption],
) -> WalkInDefaults {
    let tz = now.timezone();
    let current = local_offset(now, day);
    let food = food_span(window).unwrap_or_else(|_| timeline.span());

    let live_event = by_start(events).into_iter().find(|event| {
        !event.is_full
            && event_prompt_span(event, day, tz).is_ok_and(|prompt| prompt.contains_instant(current))
    });

    let (purpose, event_id, basis) = match live_event {
        Some(event) => (Purpose::Event, Some(event.id), food),
        None if food.contains_instant(current) => (Purpose::Food, None, food),
        None => (
            Purpose::Drinks,
            None,
            service_span(window).unwrap_or_else(|_| timeline.span()),
        ),
    };

    WalkInDefaults {
        purpose,
        event_id,
        suggested_time: format_clock(suggest_minute(
            current,
            basis,
            active_service_day(day, Some(window), now) == day,
        )),
    }
}

fn suggest_minute(current: Minutes, basis: Span, in_service: bool) -> Minutes {
    let latest = (basis.end - WALK_IN_LAST_SEATING_MINUTES).max(basis.start);
    let m = current.clamp(basis.start, latest);
    if in_service { m.max(current + 1) } else { m }
}
