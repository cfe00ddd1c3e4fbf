//! Booking drafts as the operator fills them in, and the rules that gate
//! their submission.

use chrono::NaiveDate;
use chrono_tz::Tz;
use ulid::Ulid;

use crate::api::{ApiError, DishSelection, EventBookingRequest, TableBookingRequest};
use crate::clock::parse_clock;
use crate::layout::LaneContext;
use crate::model::*;
use crate::schedule::{find_overlapping_event, BookingProposal, GateBlocked, OverlapGate, ScheduleError, WalkInDefaults};

#[derive(Debug, Clone, PartialEq)]
pub struct TableBookingDraft {
    pub date: NaiveDate,
    pub time: String,
    pub party_size: u32,
    pub purpose: Purpose,
    pub sunday_lunch: bool,
    pub walk_in: bool,
    /// Set when the draft is for an event rather than a plain table.
    pub event_id: Option<Ulid>,
    pub table_id: Option<Ulid>,
    pub customer_id: Option<Ulid>,
    pub guest_name: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub dishes: Vec<DishSelection>,
}

impl TableBookingDraft {
    pub fn new(date: NaiveDate, time: impl Into<String>, party_size: u32, purpose: Purpose) -> Self {
        Self {
            date,
            time: time.into(),
            party_size,
            purpose,
            sunday_lunch: false,
            walk_in: false,
            event_id: None,
            table_id: None,
            customer_id: None,
            guest_name: String::new(),
            phone: None,
            notes: None,
            dishes: Vec::new(),
        }
    }

    /// Walk-in draft seeded from the resolver and, if clicked from a lane, that table.
    pub fn walk_in(day: ServiceDay, lane: Option<&LaneContext>, defaults: &WalkInDefaults) -> Self {
        Self {
            walk_in: true,
            event_id: defaults.event_id,
            table_id: lane.map(|l| l.lane_id),
            ..Self::new(day, defaults.suggested_time.clone(), 2, defaults.purpose)
        }
    }

    pub fn proposal(&self) -> BookingProposal {
        BookingProposal {
            date: self.date,
            time: self.time.clone(),
            purpose: self.purpose,
            sunday_lunch: self.sunday_lunch,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Gate(#[from] GateBlocked),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("invalid booking: {0}")]
    Invalid(&'static str),
    /// The draft changed since the overlap advisor last saw it.
    #[error("event overlap not checked for the current draft")]
    Unchecked,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SubmitError {
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Gate(_) => {
                "This time overlaps an event. Book the event, or confirm you want a table booking."
                    .into()
            }
            SubmitError::Schedule(_) => "Enter a valid time (HH:MM).".into(),
            SubmitError::Invalid(what) => format!("Check the booking: {what}."),
            SubmitError::Unchecked => "Checking this time against events, try again.".into(),
            SubmitError::Api(e) => format!("Couldn't create the booking: {e}"),
        }
    }
}

/// A draft plus its event-overlap state.
///
/// Advice is tied to the proposal it was computed for. Editing the date,
/// time, purpose or Sunday-lunch flag makes it stale, and table or redirect
/// requests are refused until the advisor runs again.
#[derive(Debug, Clone)]
pub struct BookingForm {
    pub draft: TableBookingDraft,
    gate: OverlapGate,
    advised: Option<EventOption>,
    advised_for: Option<BookingProposal>,
}

impl BookingForm {
    pub fn new(draft: TableBookingDraft) -> Self {
        Self {
            draft,
            gate: OverlapGate::new(),
            advised: None,
            advised_for: None,
        }
    }

    /// Re-run the overlap advisor against `events` (the draft date's events).
    pub fn refresh_advice(
        &mut self,
        events: &[EventOption],
        tz: Tz,
    ) -> Result<Option<&EventOption>, ScheduleError> {
        let proposal = self.draft.proposal();
        let advice = find_overlapping_event(&proposal, events, tz)?;
        self.gate.update(advice);
        self.advised = advice.cloned();
        self.advised_for = Some(proposal);
        Ok(self.advised.as_ref())
    }

    pub fn advised_event(&self) -> Option<&EventOption> {
        self.advised.as_ref()
    }

    pub fn gate(&self) -> &OverlapGate {
        &self.gate
    }

    /// Whether the last advice was computed for the draft as it stands.
    pub fn is_advice_current(&self) -> bool {
        self.advised_for.as_ref() == Some(&self.draft.proposal())
    }

    /// Keep this as a table booking alongside the advised event.
    pub fn acknowledge(&mut self) -> bool {
        match self.gate.advised() {
            Some(event_id) => self.gate.acknowledge(event_id),
            None => false,
        }
    }

    fn validate(&self) -> Result<(), SubmitError> {
        if self.draft.party_size == 0 {
            return Err(SubmitError::Invalid("party size must be at least one"));
        }
        if !self.draft.walk_in && self.draft.guest_name.trim().is_empty() {
            return Err(SubmitError::Invalid("guest name is required"));
        }
        if parse_clock(&self.draft.time).is_none() {
            return Err(ScheduleError::InvalidClock {
                field: "time",
                value: self.draft.time.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Request for a plain table booking. Fails while the gate is closed.
    pub fn table_request(&self) -> Result<TableBookingRequest, SubmitError> {
        if self.draft.purpose == Purpose::Event {
            return Err(SubmitError::Invalid("event bookings are made against the event"));
        }
        self.validate()?;
        if !self.is_advice_current() {
            return Err(SubmitError::Unchecked);
        }
        self.gate.check()?;
        let d = &self.draft;
        Ok(TableBookingRequest {
            date: d.date,
            time: d.time.clone(),
            party_size: d.party_size,
            purpose: d.purpose,
            sunday_lunch: d.sunday_lunch,
            walk_in: d.walk_in,
            table_id: d.table_id,
            customer_id: d.customer_id,
            guest_name: d.guest_name.clone(),
            phone: d.phone.clone(),
            notes: d.notes.clone(),
            acknowledged_event_id: self.gate.is_acknowledged().then_some(self.gate.advised()).flatten(),
            dishes: d.dishes.clone(),
        })
    }

    /// Request for an event booking: the draft's own event, or the advised
    /// event when redirecting an overlapping table booking.
    pub fn event_request(&self) -> Result<EventBookingRequest, SubmitError> {
        let event_id = match self.draft.purpose {
            Purpose::Event => self.draft.event_id,
            _ if !self.is_advice_current() => return Err(SubmitError::Unchecked),
            _ => self.gate.redirect_target(),
        }
        .ok_or(SubmitError::Invalid("no event selected"))?;
        self.validate()?;
        let d = &self.draft;
        Ok(EventBookingRequest {
            event_id,
            seats: d.party_size,
            customer_id: d.customer_id,
            guest_name: d.guest_name.clone(),
            phone: d.phone.clone(),
            table_id: d.table_id,
            walk_in: d.walk_in,
        })
    }
}
