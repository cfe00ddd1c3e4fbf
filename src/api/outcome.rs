//! Booking-creation outcomes and the guidance shown for blocked ones.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableBookingState {
    Confirmed,
    PendingCardCapture,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBookingOutcome {
    pub state: TableBookingState,
    pub blocked_reason: Option<String>,
    pub table_name: Option<String>,
    pub next_step_url: Option<String>,
}

/// Why the backend refused a table booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableBlockReason {
    OutsideHours,
    CutOff,
    NoTable,
    PrivateBookingBlocked,
    TooLargeParty,
    CustomerConflict,
    InPast,
    Blocked,
}

impl TableBlockReason {
    /// Unrecognised codes fall back to the generic `Blocked`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "outside_hours" => Self::OutsideHours,
            "cut_off" => Self::CutOff,
            "no_table" => Self::NoTable,
            "private_booking_blocked" => Self::PrivateBookingBlocked,
            "too_large_party" => Self::TooLargeParty,
            "customer_conflict" => Self::CustomerConflict,
            "in_past" => Self::InPast,
            _ => Self::Blocked,
        }
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            Self::OutsideHours => "That time is outside opening hours. Pick a time within service.",
            Self::CutOff => "Bookings for that time have closed. Seat them as a walk-in instead.",
            Self::NoTable => "No table is free for that party at that time. Try another time or table.",
            Self::PrivateBookingBlocked => {
                "A private booking has that area reserved. Choose a table outside it."
            }
            Self::TooLargeParty => "That party is too large to book online. Split it or contact a manager.",
            Self::CustomerConflict => "This guest already has a booking around that time.",
            Self::InPast => "That time has already passed. Choose a later time.",
            Self::Blocked => "The booking couldn't be made. Check the details and try again.",
        }
    }
}

impl TableBookingOutcome {
    pub fn block_reason(&self) -> Option<TableBlockReason> {
        (self.state == TableBookingState::Blocked).then(|| {
            TableBlockReason::from_code(self.blocked_reason.as_deref().unwrap_or("blocked"))
        })
    }

    /// One-line summary for the operator.
    pub fn message(&self) -> String {
        match self.state {
            TableBookingState::Confirmed => match &self.table_name {
                Some(table) => format!("Booking confirmed on {table}."),
                None => "Booking confirmed.".to_string(),
            },
            TableBookingState::PendingCardCapture => {
                "Booking held. The guest needs to add a card to confirm.".to_string()
            }
            TableBookingState::Blocked => self
                .block_reason()
                .unwrap_or(TableBlockReason::Blocked)
                .guidance()
                .to_string(),
        }
    }

    /// Whether the floor changed and should be reloaded.
    pub fn placed(&self) -> bool {
        self.state != TableBookingState::Blocked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventBookingState {
    Confirmed,
    PendingPayment,
    FullWithWaitlistOption,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBookingOutcome {
    pub state: EventBookingState,
    pub reason: Option<String>,
    pub seats_remaining: Option<u32>,
    pub next_step_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBlockReason {
    InsufficientCapacity,
    BookingClosed,
    NotBookable,
    EventStarted,
    CapacityNotConfigured,
    GeneralEntryOnly,
    NoTable,
    OutsideHours,
    CutOff,
    EventNotFound,
    Other,
}

impl EventBlockReason {
    pub fn from_code(code: &str) -> Self {
        match code {
            "insufficient_capacity" => Self::InsufficientCapacity,
            "booking_closed" => Self::BookingClosed,
            "not_bookable" => Self::NotBookable,
            "event_started" => Self::EventStarted,
            "capacity_not_configured" => Self::CapacityNotConfigured,
            "event_general_entry_only" => Self::GeneralEntryOnly,
            "no_table" => Self::NoTable,
            "outside_service_window" | "outside_hours" => Self::OutsideHours,
            "cut_off" => Self::CutOff,
            "event_not_found" => Self::EventNotFound,
            _ => Self::Other,
        }
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            Self::InsufficientCapacity => "Not enough seats left for that party.",
            Self::BookingClosed => "Bookings for this event have closed.",
            Self::NotBookable => "This event isn't taking bookings.",
            Self::EventStarted => "This event has already started.",
            Self::CapacityNotConfigured => "This event has no capacity set. Ask a manager to configure it.",
            Self::GeneralEntryOnly => "This event is general entry only. No table booking is needed.",
            Self::NoTable => "No table is free for this event. Try a smaller party or another event.",
            Self::OutsideHours => "The event is outside service hours.",
            Self::CutOff => "The booking cut-off for this event has passed.",
            Self::EventNotFound => "This event no longer exists. Refresh and pick another.",
            Self::Other => "The event booking couldn't be made. Check the details and try again.",
        }
    }
}

impl EventBookingOutcome {
    pub fn block_reason(&self) -> Option<EventBlockReason> {
        (self.state == EventBookingState::Blocked)
            .then(|| EventBlockReason::from_code(self.reason.as_deref().unwrap_or("")))
    }

    pub fn message(&self) -> String {
        match self.state {
            EventBookingState::Confirmed => "Event booking confirmed.".to_string(),
            EventBookingState::PendingPayment => {
                "Event booking held until payment is received.".to_string()
            }
            EventBookingState::FullWithWaitlistOption => {
                "This event is full. The guest can join the waitlist.".to_string()
            }
            EventBookingState::Blocked => self
                .block_reason()
                .unwrap_or(EventBlockReason::Other)
                .guidance()
                .to_string(),
        }
    }

    pub fn placed(&self) -> bool {
        matches!(
            self.state,
            EventBookingState::Confirmed | EventBookingState::PendingPayment
        )
    }
}
