use serde::Serialize;

use crate::limits::*;
use crate::model::*;

use super::window::service_span;

/// Visible time axis for the floor view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub start: Minutes,
    pub end: Minutes,
    /// Whole hours inside `[start, end]`.
    pub ticks: Vec<Minutes>,
}

impl Timeline {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    pub fn width(&self) -> Minutes {
        self.end - self.start
    }

    /// Position of `m` as a percentage of the axis. Not clamped.
    pub fn percent_of(&self, m: Minutes) -> f64 {
        f64::from(m - self.start) / f64::from(self.width()) * 100.0
    }

    /// Position of the "now" line, if it falls on the axis.
    pub fn now_marker(&self, now: Minutes) -> Option<f64> {
        (self.start..=self.end)
            .contains(&now)
            .then(|| self.percent_of(now))
    }
}

fn floor_to(m: Minutes, step: Minutes) -> Minutes {
    m.div_euclid(step) * step
}

fn ceil_to(m: Minutes, step: Minutes) -> Minutes {
    -floor_to(-m, step)
}

/// Build the axis from the service window and every resolved booking window.
///
/// The service window is widened to cover all bookings, snapped outward to
/// 30 minutes with 30 minutes of padding each side, and stretched to at
/// least four hours.
pub fn build_timeline(window: &ServiceWindow, bookings: &[Span]) -> Timeline {
    let service = match service_span(window) {
        Ok(span) => Some(span),
        Err(e) => {
            tracing::warn!("service window unusable for timeline: {e}");
            None
        }
    };

    let mut bounds = service.map(|s| (s.start, s.end));
    for span in bookings {
        bounds = Some(match bounds {
            Some((lo, hi)) => (lo.min(span.start), hi.max(span.end)),
            None => (span.start, span.end),
        });
    }
    let (lo, hi) = bounds.unwrap_or((TIMELINE_FALLBACK_START, TIMELINE_FALLBACK_END));

    let start = floor_to(lo, TIMELINE_SNAP_MINUTES) - TIMELINE_PADDING_MINUTES;
    let mut end = ceil_to(hi, TIMELINE_SNAP_MINUTES) + TIMELINE_PADDING_MINUTES;
    if end - start < TIMELINE_MIN_SPAN_MINUTES {
        end = start + TIMELINE_MIN_SPAN_MINUTES;
    }

    let ticks = (ceil_to(start, 60)..=end).step_by(60).collect();
    Timeline { start, end, ticks }
}
