use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::clock::{minute_offset, parse_clock};
use crate::limits::*;
use crate::model::*;

use super::{GateBlocked, ScheduleError};

/// The parts of a booking draft the advisor looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingProposal {
    pub date: NaiveDate,
    /// Clock start, `HH:MM`.
    pub time: String,
    pub purpose: Purpose,
    #[serde(default)]
    pub sunday_lunch: bool,
}

/// How long a proposed booking is assumed to occupy its table.
/// Event bookings are already against an event and are never advised.
pub fn proposal_duration(purpose: Purpose, sunday_lunch: bool) -> Option<Minutes> {
    match purpose {
        Purpose::Event => None,
        _ if sunday_lunch => Some(SUNDAY_LUNCH_BOOKING_MINUTES),
        Purpose::Food => Some(FOOD_BOOKING_MINUTES),
        Purpose::Drinks => Some(DRINKS_BOOKING_MINUTES),
    }
}

/// `[start - 15, end)` for an event, relative to `day`.
pub(crate) fn event_prompt_span(
    event: &EventOption,
    day: ServiceDay,
    tz: Tz,
) -> Result<Span, ScheduleError> {
    let start = minute_offset(&event.start_at, day, tz) - EVENT_PROMPT_LEAD_MINUTES;
    let end = minute_offset(&event.end_at, day, tz);
    if end <= start {
        return Err(ScheduleError::InvalidEventWindow(event.id));
    }
    Ok(Span::new(start, end))
}

/// Events ordered by start; ties keep their delivered order.
pub(crate) fn by_start(events: &[EventOption]) -> Vec<&EventOption> {
    let mut sorted: Vec<&EventOption> = events.iter().collect();
    sorted.sort_by_key(|e| e.start_at);
    sorted
}

/// Earliest table-bookable event whose prompt window intersects the proposal.
pub fn find_overlapping_event<'a>(
    proposal: &BookingProposal,
    events: &'a [EventOption],
    tz: Tz,
) -> Result<Option<&'a EventOption>, ScheduleError> {
    let Some(duration) = proposal_duration(proposal.purpose, proposal.sunday_lunch) else {
        return Ok(None);
    };
    let start = parse_clock(&proposal.time).ok_or_else(|| ScheduleError::InvalidClock {
        field: "time",
        value: proposal.time.clone(),
    })?;
    let proposed = Span::new(start, start + duration);

    for event in by_start(events) {
        if event.booking_mode == BookingMode::General {
            continue;
        }
        match event_prompt_span(event, proposal.date, tz) {
            Ok(prompt) if prompt.overlaps(&proposed) => return Ok(Some(event)),
            Ok(_) => {}
            Err(e) => tracing::debug!("skipping event in overlap check: {e}"),
        }
    }
    Ok(None)
}

/// Holds a table booking back while it overlaps an event, until the operator
/// either books the event instead or confirms the table booking for that
/// specific event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapGate {
    advised: Option<Ulid>,
    acknowledged: Option<Ulid>,
}

impl OverlapGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the latest advisor result. A different event drops any earlier acknowledgement.
    pub fn update(&mut self, advice: Option<&EventOption>) {
        let next = advice.map(|e| e.id);
        if next != self.advised {
            self.acknowledged = None;
        }
        self.advised = next;
    }

    pub fn advised(&self) -> Option<Ulid> {
        self.advised
    }

    /// Keep the table booking for `event_id`. Ignored unless it is the advised event.
    pub fn acknowledge(&mut self, event_id: Ulid) -> bool {
        if self.advised == Some(event_id) {
            self.acknowledged = Some(event_id);
            true
        } else {
            false
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        self.advised.is_some() && self.acknowledged == self.advised
    }

    /// Event to redirect the draft to, when one is advised.
    pub fn redirect_target(&self) -> Option<Ulid> {
        self.advised
    }

    pub fn check(&self) -> Result<(), GateBlocked> {
        match self.advised {
            Some(event_id) if self.acknowledged != Some(event_id) => Err(GateBlocked { event_id }),
            _ => Ok(()),
        }
    }
}
