//! Booking lifecycle actions.
//!
//! Seat, leave and no-show move a booking through its lifecycle; move-table and
//! walkout are side effects that leave the state alone. Exactly one action may
//! be in flight per terminal.

use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

use ulid::Ulid;

use crate::api::{ApiError, FloorApi};
use crate::limits::MAX_WALKOUT_AMOUNT;
use crate::model::*;
use crate::observability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Private-event block. Read-only here.
    Block,
    /// Confirmed or awaiting card capture.
    Booked,
    Seated,
    Left,
    NoShow,
    Cancelled,
    /// Completed or in one of the post-visit review states.
    Closed,
}

impl LifecycleState {
    pub fn of(booking: &Booking) -> Self {
        if booking.is_private_block {
            return LifecycleState::Block;
        }
        if booking.no_show_at.is_some() || booking.status == BookingStatus::NoShow {
            return LifecycleState::NoShow;
        }
        if booking.status == BookingStatus::Cancelled {
            return LifecycleState::Cancelled;
        }
        if booking.left_at.is_some() || booking.status == BookingStatus::Left {
            return LifecycleState::Left;
        }
        if booking.seated_at.is_some() || booking.status == BookingStatus::Seated {
            return LifecycleState::Seated;
        }
        match booking.status {
            BookingStatus::Completed
            | BookingStatus::VisitedWaitingForReview
            | BookingStatus::ReviewClicked => LifecycleState::Closed,
            _ => LifecycleState::Booked,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, LifecycleState::Booked | LifecycleState::Seated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Block => "private block",
            LifecycleState::Booked => "booked",
            LifecycleState::Seated => "seated",
            LifecycleState::Left => "left",
            LifecycleState::NoShow => "no-show",
            LifecycleState::Cancelled => "cancelled",
            LifecycleState::Closed => "closed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleAction {
    Seat,
    Leave,
    NoShow,
    MoveTable { table_id: Ulid },
    Walkout { amount: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Seat,
    Leave,
    NoShow,
    MoveTable,
    Walkout,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Seat => "seat",
            ActionKind::Leave => "leave",
            ActionKind::NoShow => "no_show",
            ActionKind::MoveTable => "move_table",
            ActionKind::Walkout => "walkout",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LifecycleAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            LifecycleAction::Seat => ActionKind::Seat,
            LifecycleAction::Leave => ActionKind::Leave,
            LifecycleAction::NoShow => ActionKind::NoShow,
            LifecycleAction::MoveTable { .. } => ActionKind::MoveTable,
            LifecycleAction::Walkout { .. } => ActionKind::Walkout,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{kind} is still in progress for booking {booking_id}")]
    Busy { booking_id: Ulid, kind: ActionKind },
    #[error("booking {0} is not in the current schedule")]
    NotFound(Ulid),
    #[error("booking {0} is a private block")]
    ReadOnly(Ulid),
    #[error("cannot {action} a booking that is {state}")]
    InvalidTransition {
        action: ActionKind,
        state: LifecycleState,
    },
    #[error("table {0} cannot take this booking")]
    InvalidTable(Ulid),
    #[error("walkout amount {0} is not valid")]
    InvalidAmount(f64),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ActionError {
    /// The single message shown in the detail view.
    pub fn user_message(&self) -> String {
        match self {
            ActionError::Busy { .. } => "Please wait for the current update to finish.".into(),
            ActionError::NotFound(_) => {
                "This booking is no longer on the floor. The schedule has been refreshed.".into()
            }
            ActionError::ReadOnly(_) => {
                "Private bookings are managed from the private booking screen.".into()
            }
            ActionError::InvalidTransition { action, state } => {
                format!("Can't {} a booking that is {state}.", action.as_str().replace('_', "-"))
            }
            ActionError::InvalidTable(_) => "That table can't take this booking.".into(),
            ActionError::InvalidAmount(_) => "Enter a walkout amount above zero.".into(),
            ActionError::Api(e) => format!("Couldn't update the booking: {e}"),
        }
    }
}

/// Check an action against the booking's current state and the loaded floor.
pub fn validate(
    booking: &Booking,
    action: &LifecycleAction,
    snapshot: &ScheduleSnapshot,
) -> Result<(), ActionError> {
    let state = LifecycleState::of(booking);
    if state == LifecycleState::Block {
        return Err(ActionError::ReadOnly(booking.id));
    }
    let invalid = || ActionError::InvalidTransition {
        action: action.kind(),
        state,
    };
    match action {
        LifecycleAction::Seat if state != LifecycleState::Booked => Err(invalid()),
        LifecycleAction::Leave if state != LifecycleState::Seated => Err(invalid()),
        LifecycleAction::NoShow if state.is_terminal() => Err(invalid()),
        LifecycleAction::MoveTable { .. } if state.is_terminal() => Err(invalid()),
        LifecycleAction::MoveTable { table_id } => {
            let target = snapshot
                .lane(table_id)
                .ok_or(ActionError::InvalidTable(*table_id))?;
            let already_there = booking.assigned_table_ids == [*table_id];
            if !target.is_bookable || already_there {
                return Err(ActionError::InvalidTable(*table_id));
            }
            Ok(())
        }
        LifecycleAction::Walkout { .. }
            if !matches!(state, LifecycleState::Seated | LifecycleState::Left) =>
        {
            Err(invalid())
        }
        LifecycleAction::Walkout { amount } => {
            if !amount.is_finite() || *amount <= 0.0 || *amount > MAX_WALKOUT_AMOUNT {
                return Err(ActionError::InvalidAmount(*amount));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Serialises lifecycle actions: one action in flight at a time, keyed by
/// `(booking_id, kind)` so the UI knows which control to disable.
#[derive(Debug, Default)]
pub struct ActionDispatcher {
    pending: Mutex<Option<(Ulid, ActionKind)>>,
}

/// Holds the dispatcher's single slot. The action counts as in flight until
/// this is dropped, which the caller does once the follow-up reload is done.
#[derive(Debug)]
pub struct PendingAction<'a> {
    slot: &'a Mutex<Option<(Ulid, ActionKind)>>,
    booking_id: Ulid,
}

impl Drop for PendingAction<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<(Ulid, ActionKind)> {
        *self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_busy(&self) -> bool {
        self.pending().is_some()
    }

    /// Claim the slot, or report the action already holding it.
    pub fn begin(&self, booking_id: Ulid, kind: ActionKind) -> Result<PendingAction<'_>, ActionError> {
        let mut slot = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((booking_id, kind)) = *slot {
            return Err(ActionError::Busy { booking_id, kind });
        }
        *slot = Some((booking_id, kind));
        Ok(PendingAction {
            slot: &self.pending,
            booking_id,
        })
    }
}

impl PendingAction<'_> {
    /// Send the action to the backend. The slot stays held after this returns.
    pub async fn send(&self, api: &dyn FloorApi, action: &LifecycleAction) -> Result<(), ActionError> {
        let booking_id = self.booking_id;
        let kind = action.kind();
        let started = Instant::now();

        let result = match action {
            LifecycleAction::Seat => api.mark_seated(booking_id).await,
            LifecycleAction::Leave => api.mark_left(booking_id).await,
            LifecycleAction::NoShow => api.mark_no_show(booking_id).await,
            LifecycleAction::MoveTable { table_id } => api.move_table(booking_id, *table_id).await,
            LifecycleAction::Walkout { amount } => api.walkout(booking_id, *amount).await,
        };

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::ACTIONS_TOTAL, "action" => kind.as_str(), "status" => status)
            .increment(1);
        metrics::histogram!(observability::ACTION_DURATION_SECONDS, "action" => kind.as_str())
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(()) => tracing::info!(booking = %booking_id, action = %kind, "booking action applied"),
            Err(e) => tracing::warn!(booking = %booking_id, action = %kind, "booking action failed: {e}"),
        }
        result.map_err(ActionError::from)
    }
}
