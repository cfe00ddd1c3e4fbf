mod error;
mod overlap;
mod timeline;
mod walkin;
mod window;

pub use error::{GateBlocked, ScheduleError};
pub use overlap::{find_overlapping_event, proposal_duration, BookingProposal, OverlapGate};
pub use timeline::{build_timeline, Timeline};
pub use walkin::{resolve_walk_in_defaults, WalkInDefaults};
pub use window::{
    active_service_day, food_span, resolve_booking_window, service_day_end, service_span,
};

use std::collections::HashMap;

use chrono_tz::Tz;
use serde::Serialize;
use ulid::Ulid;

use crate::actions::LifecycleState;
use crate::model::*;

/// Covers and counts for the day, excluding private blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FloorTotals {
    pub bookings: usize,
    pub covers: u32,
    pub seated_covers: u32,
    pub food_covers: u32,
    pub drinks_covers: u32,
    pub event_covers: u32,
    pub unassigned: usize,
}

impl FloorTotals {
    pub fn from_snapshot(snapshot: &ScheduleSnapshot) -> Self {
        let mut totals = FloorTotals {
            unassigned: snapshot
                .unassigned_bookings
                .iter()
                .filter(|b| !b.is_private_block)
                .count(),
            ..Default::default()
        };
        for booking in snapshot.unique_bookings() {
            let state = LifecycleState::of(booking);
            if matches!(
                state,
                LifecycleState::Block | LifecycleState::NoShow | LifecycleState::Cancelled
            ) {
                continue;
            }
            totals.bookings += 1;
            totals.covers += booking.party_size;
            if state == LifecycleState::Seated {
                totals.seated_covers += booking.party_size;
            }
            match booking.purpose {
                Purpose::Food => totals.food_covers += booking.party_size,
                Purpose::Drinks => totals.drinks_covers += booking.party_size,
                Purpose::Event => totals.event_covers += booking.party_size,
            }
        }
        totals
    }
}

/// Everything derived from one snapshot. Rebuilt from scratch on every
/// reload; nothing carries over between snapshots.
#[derive(Debug, Clone)]
pub struct FloorPlan {
    pub day: ServiceDay,
    pub timeline: Timeline,
    windows: HashMap<Ulid, Span>,
    /// Bookings left off the floor because their time data did not resolve.
    pub excluded: Vec<Ulid>,
    pub totals: FloorTotals,
}

impl FloorPlan {
    pub fn build(snapshot: &ScheduleSnapshot, tz: Tz) -> Self {
        let day = snapshot.date;
        let mut windows = HashMap::new();
        let mut excluded = Vec::new();
        for booking in snapshot.unique_bookings() {
            match resolve_booking_window(booking, day, tz) {
                Ok(span) => {
                    windows.insert(booking.id, span);
                }
                Err(e) => {
                    tracing::debug!(booking = %booking.id, "excluded from layout: {e}");
                    excluded.push(booking.id);
                }
            }
        }

        let spans: Vec<Span> = windows.values().copied().collect();
        let timeline = build_timeline(&snapshot.service_window, &spans);

        Self {
            day,
            timeline,
            windows,
            excluded,
            totals: FloorTotals::from_snapshot(snapshot),
        }
    }

    pub fn window(&self, booking_id: &Ulid) -> Option<Span> {
        self.windows.get(booking_id).copied()
    }
}
