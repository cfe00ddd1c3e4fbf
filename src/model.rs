use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Minutes from the service day's local midnight. Values past 1440 belong to
/// the following calendar day.
pub type Minutes = i32;

/// Venue calendar day that anchors all minute arithmetic.
pub type ServiceDay = NaiveDate;

/// Half-open interval `[start, end)` in service-day minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Minutes,
    pub end: Minutes,
}

impl Span {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> Minutes {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Minutes) -> bool {
        self.start <= t && t < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Intersection with `bounds`, or `None` when nothing is left.
    pub fn clip(&self, bounds: &Span) -> Option<Span> {
        let start = self.start.max(bounds.start);
        let end = self.end.min(bounds.end);
        (end > start).then(|| Span::new(start, end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Food,
    Drinks,
    Event,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Food => "food",
            Purpose::Drinks => "drinks",
            Purpose::Event => "event",
        }
    }
}

/// Stored booking status. Strings this core does not know map to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingCardCapture,
    Confirmed,
    Seated,
    Left,
    NoShow,
    Cancelled,
    Completed,
    VisitedWaitingForReview,
    ReviewClicked,
    #[serde(other)]
    Unknown,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingCardCapture => "pending_card_capture",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Seated => "seated",
            BookingStatus::Left => "left",
            BookingStatus::NoShow => "no_show",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::VisitedWaitingForReview => "visited_waiting_for_review",
            BookingStatus::ReviewClicked => "review_clicked",
            BookingStatus::Unknown => "unknown",
        }
    }
}

/// Operating hours for the venue and, separately, for the kitchen.
/// Clock fields are `HH:MM` or `HH:MM:SS` strings as stored upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceWindow {
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub end_next_day: bool,
    pub kitchen_start_time: Option<String>,
    pub kitchen_end_time: Option<String>,
    pub kitchen_end_next_day: Option<bool>,
    #[serde(default)]
    pub kitchen_closed: bool,
}

/// A booking as delivered in the day snapshot. Only the lifecycle fields
/// (`status`, `seated_at`, `left_at`, `no_show_at`) ever change through this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    #[serde(default)]
    pub reference: String,
    /// Guest name, or the event name for event and private-block rows.
    #[serde(alias = "event_name")]
    pub guest_name: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    /// Legacy clock-only start (`HH:MM`), used when no timestamps are stored.
    pub booking_time: Option<String>,
    pub party_size: u32,
    pub purpose: Purpose,
    pub status: BookingStatus,
    pub seated_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub no_show_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_private_block: bool,
    #[serde(default)]
    pub assigned_table_ids: Vec<Ulid>,
}

impl Booking {
    pub fn assignment_count(&self) -> usize {
        self.assigned_table_ids.len()
    }

    /// Joined across more than one table.
    pub fn is_joined(&self) -> bool {
        self.assignment_count() > 1
    }
}

/// A bookable table and the bookings placed on it for the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub id: Ulid,
    pub name: String,
    pub number: Option<u32>,
    pub capacity: u32,
    pub area: Option<String>,
    #[serde(default = "default_bookable")]
    pub is_bookable: bool,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

fn default_bookable() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingMode {
    Table,
    General,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Free,
    Prepaid,
    CashOnArrival,
    #[serde(other)]
    Unknown,
}

/// A scheduled event that bookings can be made against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOption {
    pub id: Ulid,
    pub name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub payment_mode: PaymentMode,
    pub booking_mode: BookingMode,
    pub capacity: Option<u32>,
    pub seats_remaining: Option<u32>,
    #[serde(default)]
    pub is_full: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingEvent {
    pub id: Ulid,
    pub name: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// Full read snapshot of one service day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub date: NaiveDate,
    pub service_window: ServiceWindow,
    #[serde(default)]
    pub lanes: Vec<Lane>,
    #[serde(default)]
    pub unassigned_bookings: Vec<Booking>,
}

impl ScheduleSnapshot {
    pub fn lane(&self, id: &Ulid) -> Option<&Lane> {
        self.lanes.iter().find(|l| l.id == *id)
    }

    /// Find a booking and the first lane it sits on (None when unassigned).
    pub fn find_booking(&self, id: &Ulid) -> Option<(&Booking, Option<&Lane>)> {
        for lane in &self.lanes {
            if let Some(b) = lane.bookings.iter().find(|b| b.id == *id) {
                return Some((b, Some(lane)));
            }
        }
        self.unassigned_bookings
            .iter()
            .find(|b| b.id == *id)
            .map(|b| (b, None))
    }

    /// Every booking once, even when joined across several lanes.
    pub fn unique_bookings(&self) -> impl Iterator<Item = &Booking> {
        let mut seen = std::collections::HashSet::new();
        self.lanes
            .iter()
            .flat_map(|l| l.bookings.iter())
            .chain(self.unassigned_bookings.iter())
            .filter(move |b| seen.insert(b.id))
    }
}
