use chrono::DateTime;
use chrono_tz::Tz;

use crate::clock::{local_offset, minute_offset, parse_clock};
use crate::limits::*;
use crate::model::*;

use super::ScheduleError;

/// Resolve a booking's stored time fields to a span on the service day.
///
/// Explicit timestamps win over the legacy clock-only field. A missing end
/// defaults to `start + 90`; an end at or before the start becomes
/// `start + 30`, so the returned span is never empty.
pub fn resolve_booking_window(
    booking: &Booking,
    day: ServiceDay,
    tz: Tz,
) -> Result<Span, ScheduleError> {
    let start = match (&booking.start_at, &booking.booking_time) {
        (Some(ts), _) => minute_offset(ts, day, tz),
        (None, Some(clock)) => parse_clock(clock).ok_or_else(|| ScheduleError::InvalidClock {
            field: "booking_time",
            value: clock.clone(),
        })?,
        (None, None) => return Err(ScheduleError::MissingTime(booking.id)),
    };

    let mut end = match &booking.end_at {
        Some(ts) => minute_offset(ts, day, tz),
        None => start + DEFAULT_BOOKING_MINUTES,
    };
    if end <= start {
        end = start + MIN_BOOKING_MINUTES;
    }
    Ok(Span::new(start, end))
}

fn parse_field(field: &'static str, value: &str) -> Result<Minutes, ScheduleError> {
    parse_clock(value).ok_or_else(|| ScheduleError::InvalidClock {
        field,
        value: value.to_string(),
    })
}

/// Roll `end` into the next day when flagged, or when it would not be after `start`.
fn rolled(start: Minutes, end: Minutes, next_day: bool) -> Span {
    let end = if next_day || end <= start {
        end + MINUTES_PER_DAY
    } else {
        end
    };
    Span::new(start, end)
}

/// The venue's operating hours on the service day.
pub fn service_span(window: &ServiceWindow) -> Result<Span, ScheduleError> {
    let start = parse_field("start_time", &window.start_time)?;
    let end = parse_field("end_time", &window.end_time)?;
    Ok(rolled(start, end, window.end_next_day))
}

/// Hours in which food is served: the kitchen sub-window when it is defined
/// and open, otherwise the full operating window.
pub fn food_span(window: &ServiceWindow) -> Result<Span, ScheduleError> {
    if !window.kitchen_closed
        && let (Some(ks), Some(ke)) = (&window.kitchen_start_time, &window.kitchen_end_time)
    {
        match (parse_field("kitchen_start_time", ks), parse_field("kitchen_end_time", ke)) {
            (Ok(start), Ok(end)) => {
                return Ok(rolled(start, end, window.kitchen_end_next_day.unwrap_or(false)));
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::debug!("kitchen window ignored: {e}");
            }
        }
    }
    service_span(window)
}

/// Offset at which a service day is over: the close when service runs past
/// midnight, otherwise midnight.
pub fn service_day_end(window: &ServiceWindow) -> Minutes {
    service_span(window).map_or(MINUTES_PER_DAY, |s| s.end.max(MINUTES_PER_DAY))
}

/// The service day `now` belongs to while `current` is on screen.
///
/// `current` holds from its local midnight until its service closes, so a
/// window like `09:00-01:00` keeps the floor until 01:00 the next morning.
/// Outside that range the calendar date of `now` wins.
pub fn active_service_day(
    current: ServiceDay,
    window: Option<&ServiceWindow>,
    now: &DateTime<Tz>,
) -> ServiceDay {
    let end = window.map_or(MINUTES_PER_DAY, service_day_end);
    if (0..end).contains(&local_offset(now, current)) {
        current
    } else {
        now.date_naive()
    }
}
