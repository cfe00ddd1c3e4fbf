use ulid::Ulid;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("unparsable clock time {value:?} in {field}")]
    InvalidClock { field: &'static str, value: String },
    #[error("booking {0} has no time data")]
    MissingTime(Ulid),
    #[error("event {0} ends before its prompt window opens")]
    InvalidEventWindow(Ulid),
}

/// Submission is held until the operator acknowledges or redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("booking overlaps event {event_id}: book the event or confirm a table booking")]
pub struct GateBlocked {
    pub event_id: Ulid,
}
