//! Background loops that keep a floor view fresh: the backend change-feed
//! pump, the debounced listener with its polling backstop, and the minute
//! clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::FloorApi;
use crate::clock::now_local;
use crate::limits::*;
use crate::model::ServiceDay;
use crate::notify::{ChangeEvent, NotifyHub};
use crate::observability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReloadReason {
    Initial,
    Feed,
    Poll,
    Action,
    Manual,
}

/// Queue a reload unless one is already waiting behind the in-flight one.
pub(crate) fn request_reload(tx: &mpsc::Sender<ReloadReason>, reason: ReloadReason) {
    match tx.try_send(reason) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            debug!(?reason, "reload already queued");
            metrics::counter!(observability::RELOADS_COALESCED_TOTAL).increment(1);
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}

/// Pull the backend change feed for `day` into `hub` until cancelled.
///
/// Failed polls back off from 1 s, doubling up to 30 s; the listener's poll
/// keeps the view fresh meanwhile.
pub async fn run_change_feed(
    api: Arc<dyn FloorApi>,
    hub: Arc<NotifyHub>,
    day: ServiceDay,
    cancel: CancellationToken,
) {
    let mut cursor: Option<String> = None;
    let mut delay = FEED_RETRY_INITIAL;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = api.poll_changes(day, cursor.as_deref()) => result,
        };
        match result {
            Ok(batch) => {
                if delay > FEED_RETRY_INITIAL {
                    info!(%day, "change feed recovered");
                }
                delay = FEED_RETRY_INITIAL;
                for change in &batch.changes {
                    hub.send(change);
                }
                if batch.cursor.is_some() {
                    cursor = batch.cursor;
                }
                continue;
            }
            Err(e) => {
                warn!(%day, retry_ms = delay.as_millis() as u64, "change feed poll failed: {e}");
                metrics::counter!(observability::FEED_POLL_ERRORS_TOTAL).increment(1);
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = (delay * 2).min(FEED_RETRY_MAX);
    }
    debug!(%day, "change feed stopped");
}

/// Turn change-feed bursts into single reloads and poll as a backstop.
///
/// The first notification arms a 300 ms deadline; anything arriving before it
/// fires is absorbed. The 60 s poll runs regardless of the feed and keeps the
/// view correct if the feed drops. Runs until `cancel` fires.
pub async fn run_live_notifier(
    mut feed: broadcast::Receiver<ChangeEvent>,
    reload: mpsc::Sender<ReloadReason>,
    cancel: CancellationToken,
) {
    let mut poll = tokio::time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut deadline: Option<Instant> = None;
    let mut feed_open = true;

    loop {
        let debounce = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("live notifier stopping");
                break;
            }
            msg = feed.recv(), if feed_open => {
                match msg {
                    Ok(event) => {
                        metrics::counter!(observability::FEED_EVENTS_TOTAL, "table" => event.table.as_str())
                            .increment(1);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "change feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("change feed closed, relying on {}s poll", POLL_INTERVAL.as_secs());
                        feed_open = false;
                        continue;
                    }
                }
                if deadline.is_none() {
                    deadline = Some(Instant::now() + FEED_DEBOUNCE);
                }
            }
            _ = debounce => {
                deadline = None;
                request_reload(&reload, ReloadReason::Feed);
            }
            _ = poll.tick() => {
                request_reload(&reload, ReloadReason::Poll);
            }
        }
    }
}

/// Time left until the next wall-clock minute boundary.
fn until_next_minute(now: &DateTime<Tz>) -> Duration {
    let into_minute = Duration::from_secs(u64::from(now.second()))
        + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));
    CLOCK_TICK.saturating_sub(into_minute)
}

/// Publish the venue-local time once a minute, aligned to minute boundaries.
pub async fn run_minute_clock(
    tz: Tz,
    clock: Arc<watch::Sender<DateTime<Tz>>>,
    cancel: CancellationToken,
) {
    let first = until_next_minute(&now_local(tz));
    let mut ticker = tokio::time::interval_at(Instant::now() + first, CLOCK_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(first_tick_ms = first.as_millis() as u64, "minute clock started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                clock.send_replace(now_local(tz));
            }
        }
    }
}
