use std::time::Duration;

use crate::model::Minutes;

pub const MINUTES_PER_DAY: Minutes = 1440;

/// Duration assumed when a booking carries no end time.
pub const DEFAULT_BOOKING_MINUTES: Minutes = 90;
/// Minimum duration enforced when a stored end is at or before the start.
pub const MIN_BOOKING_MINUTES: Minutes = 30;

pub const TIMELINE_SNAP_MINUTES: Minutes = 30;
pub const TIMELINE_PADDING_MINUTES: Minutes = 30;
pub const TIMELINE_MIN_SPAN_MINUTES: Minutes = 240;
/// Fallback axis when neither the service window nor any booking resolves.
pub const TIMELINE_FALLBACK_START: Minutes = 12 * 60;
pub const TIMELINE_FALLBACK_END: Minutes = 23 * 60;

/// Events start prompting this many minutes before their start.
pub const EVENT_PROMPT_LEAD_MINUTES: Minutes = 15;
/// Latest walk-in suggestion sits this far before the window closes.
pub const WALK_IN_LAST_SEATING_MINUTES: Minutes = 30;

pub const FOOD_BOOKING_MINUTES: Minutes = 120;
pub const SUNDAY_LUNCH_BOOKING_MINUTES: Minutes = 120;
pub const DRINKS_BOOKING_MINUTES: Minutes = 90;

/// Narrowest rendered block, as a percentage of the timeline.
pub const MIN_BLOCK_WIDTH_PCT: f64 = 2.2;

pub const FEED_DEBOUNCE: Duration = Duration::from_millis(300);
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const CLOCK_TICK: Duration = Duration::from_secs(60);
pub const LOOKUP_DEBOUNCE: Duration = Duration::from_millis(250);

/// How long the backend may hold a change-feed poll open before answering empty.
pub const FEED_LONG_POLL_SECS: u64 = 25;
pub const FEED_RETRY_INITIAL: Duration = Duration::from_secs(1);
pub const FEED_RETRY_MAX: Duration = Duration::from_secs(30);

pub const FEED_CHANNEL_CAPACITY: usize = 256;
pub const MIN_SEARCH_QUERY_LEN: usize = 2;
pub const MAX_WALKOUT_AMOUNT: f64 = 10_000.0;
