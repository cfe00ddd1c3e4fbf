//! Lane layout: bookings as positioned, styled blocks on the timeline, and
//! routing of clicks on a lane.

use serde::Serialize;
use ulid::Ulid;

use crate::limits::MIN_BLOCK_WIDTH_PCT;
use crate::model::*;
use crate::schedule::{FloorPlan, Timeline, WalkInDefaults};

/// How a block is drawn. Earlier variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VisualState {
    PrivateBlock,
    NoShow,
    Left,
    Seated,
    Status(BookingStatus),
    Unknown,
}

impl VisualState {
    pub fn of(booking: &Booking) -> Self {
        if booking.is_private_block {
            VisualState::PrivateBlock
        } else if booking.no_show_at.is_some() || booking.status == BookingStatus::NoShow {
            VisualState::NoShow
        } else if booking.left_at.is_some() || booking.status == BookingStatus::Left {
            VisualState::Left
        } else if booking.seated_at.is_some() || booking.status == BookingStatus::Seated {
            VisualState::Seated
        } else {
            match booking.status {
                BookingStatus::PendingCardCapture
                | BookingStatus::Confirmed
                | BookingStatus::Cancelled
                | BookingStatus::Completed
                | BookingStatus::VisitedWaitingForReview
                | BookingStatus::ReviewClicked => VisualState::Status(booking.status),
                _ => VisualState::Unknown,
            }
        }
    }

    /// Style key for the front end.
    pub fn class_name(&self) -> &'static str {
        match self {
            VisualState::PrivateBlock => "private_block",
            VisualState::NoShow => "no_show",
            VisualState::Left => "left",
            VisualState::Seated => "seated",
            VisualState::Status(status) => status.as_str(),
            VisualState::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingBlock {
    pub booking_id: Ulid,
    pub label: String,
    pub party_size: u32,
    /// Resolved window before clipping.
    pub window: Span,
    pub left_pct: f64,
    pub width_pct: f64,
    pub visual: VisualState,
    pub joined: bool,
    pub clipped_start: bool,
    pub clipped_end: bool,
}

impl BookingBlock {
    pub fn contains_pct(&self, x_pct: f64) -> bool {
        x_pct >= self.left_pct && x_pct < self.left_pct + self.width_pct
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneRow {
    pub lane_id: Ulid,
    pub name: String,
    pub capacity: u32,
    pub area: Option<String>,
    pub is_bookable: bool,
    pub blocks: Vec<BookingBlock>,
}

impl LaneRow {
    /// Topmost block under `x_pct`; later blocks draw over earlier ones.
    pub fn hit_test(&self, x_pct: f64) -> Option<&BookingBlock> {
        self.blocks.iter().rev().find(|b| b.contains_pct(x_pct))
    }
}

/// Position a window on the timeline. `None` when nothing of it is visible.
pub fn place(window: Span, timeline: &Timeline) -> Option<(f64, f64)> {
    let visible = window.clip(&timeline.span())?;
    let width = (f64::from(visible.duration()) / f64::from(timeline.width()) * 100.0)
        .max(MIN_BLOCK_WIDTH_PCT);
    let left = timeline.percent_of(visible.start).min(100.0 - width).max(0.0);
    Some((left, width))
}

pub fn layout_lane(lane: &Lane, plan: &FloorPlan) -> LaneRow {
    let bounds = plan.timeline.span();
    let mut blocks: Vec<BookingBlock> = lane
        .bookings
        .iter()
        .filter_map(|booking| {
            let window = plan.window(&booking.id)?;
            let (left_pct, width_pct) = place(window, &plan.timeline)?;
            Some(BookingBlock {
                booking_id: booking.id,
                label: booking.guest_name.clone(),
                party_size: booking.party_size,
                window,
                left_pct,
                width_pct,
                visual: VisualState::of(booking),
                joined: booking.is_joined(),
                clipped_start: window.start < bounds.start,
                clipped_end: window.end > bounds.end,
            })
        })
        .collect();
    blocks.sort_by_key(|b| b.window.start);

    LaneRow {
        lane_id: lane.id,
        name: lane.name.clone(),
        capacity: lane.capacity,
        area: lane.area.clone(),
        is_bookable: lane.is_bookable,
        blocks,
    }
}

pub fn layout_lanes(snapshot: &ScheduleSnapshot, plan: &FloorPlan) -> Vec<LaneRow> {
    snapshot.lanes.iter().map(|lane| layout_lane(lane, plan)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneContext {
    pub lane_id: Ulid,
    pub lane_name: String,
}

impl LaneContext {
    pub fn of(lane: &Lane) -> Self {
        Self {
            lane_id: lane.id,
            lane_name: lane.name.clone(),
        }
    }
}

/// Result of a click on the floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Detail {
        booking: Booking,
        lane: Option<LaneContext>,
    },
    WalkIn {
        lane: LaneContext,
        defaults: WalkInDefaults,
    },
    Nothing,
}

pub fn click_block(lane: &Lane, block: &BookingBlock) -> Selection {
    match lane.bookings.iter().find(|b| b.id == block.booking_id) {
        Some(booking) => Selection::Detail {
            booking: booking.clone(),
            lane: Some(LaneContext::of(lane)),
        },
        None => Selection::Nothing,
    }
}

/// Walk-in creation on empty lane space, when editing is allowed and the
/// table is bookable.
pub fn click_empty(
    lane: &Lane,
    can_edit: bool,
    walk_in_defaults: impl FnOnce() -> WalkInDefaults,
) -> Selection {
    if can_edit && lane.is_bookable {
        Selection::WalkIn {
            lane: LaneContext::of(lane),
            defaults: walk_in_defaults(),
        }
    } else {
        Selection::Nothing
    }
}

/// Route a click at `x_pct` on `lane` to the block under it or to empty space.
pub fn click(
    lane: &Lane,
    row: &LaneRow,
    x_pct: f64,
    can_edit: bool,
    walk_in_defaults: impl FnOnce() -> WalkInDefaults,
) -> Selection {
    match row.hit_test(x_pct) {
        Some(block) => click_block(lane, block),
        None => click_empty(lane, can_edit, walk_in_defaults),
    }
}
