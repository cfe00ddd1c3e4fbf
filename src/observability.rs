use std::net::SocketAddr;

use crate::live::ReloadReason;

// ── Snapshot sync ───────────────────────────────────────────────

/// Counter: snapshot reloads. Labels: reason, status (ok, error, stale).
pub const RELOADS_TOTAL: &str = "floorline_reloads_total";

/// Histogram: snapshot fetch latency in seconds.
pub const RELOAD_DURATION_SECONDS: &str = "floorline_reload_duration_seconds";

/// Counter: change-feed notifications received. Labels: table.
pub const FEED_EVENTS_TOTAL: &str = "floorline_feed_events_total";

/// Counter: failed change-feed polls. Each is followed by a backoff.
pub const FEED_POLL_ERRORS_TOTAL: &str = "floorline_feed_poll_errors_total";

/// Counter: reload requests dropped because one was already queued.
pub const RELOADS_COALESCED_TOTAL: &str = "floorline_reloads_coalesced_total";

/// Counter: responses discarded because a newer request or day superseded them.
/// Labels: source (snapshot, customer_search).
pub const STALE_RESPONSES_TOTAL: &str = "floorline_stale_responses_total";

// ── Operator actions ────────────────────────────────────────────

/// Counter: lifecycle actions. Labels: action, status.
pub const ACTIONS_TOTAL: &str = "floorline_actions_total";

/// Histogram: lifecycle action latency in seconds. Labels: action.
pub const ACTION_DURATION_SECONDS: &str = "floorline_action_duration_seconds";

/// Counter: booking submissions. Labels: kind (table, event), outcome.
pub const SUBMISSIONS_TOTAL: &str = "floorline_submissions_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a reload reason to a short label for metrics.
pub fn reason_label(reason: ReloadReason) -> &'static str {
    match reason {
        ReloadReason::Initial => "initial",
        ReloadReason::Feed => "feed",
        ReloadReason::Poll => "poll",
        ReloadReason::Action => "action",
        ReloadReason::Manual => "manual",
    }
}
