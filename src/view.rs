//! The live floor view for one service day.
//!
//! [`FloorView`] owns the current snapshot and everything derived from it,
//! keeps it fresh through the background loops in [`crate::live`], and
//! routes operator actions and booking submissions to the backend.
//!
//! Every snapshot load is tagged with the view generation (bumped when the
//! day changes) and a request sequence number. A response is applied only
//! if its generation and day are still current and no newer request has
//! already landed, so a slow response for an old day or an older request
//! can never overwrite fresher state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::{mpsc, watch, RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::actions::{validate, ActionDispatcher, ActionError, ActionKind, LifecycleAction};
use crate::api::{EventBookingOutcome, FloorApi, TableBookingOutcome};
use crate::booking::{BookingForm, SubmitError, TableBookingDraft};
use crate::clock::{local_offset, now_local};
use crate::layout::{click, layout_lanes, LaneContext, LaneRow, Selection};
use crate::live::{request_reload, run_change_feed, run_live_notifier, run_minute_clock, ReloadReason};
use crate::model::*;
use crate::notify::NotifyHub;
use crate::observability;
use crate::schedule::{active_service_day, resolve_walk_in_defaults, FloorPlan, WalkInDefaults};

/// The booking detail panel.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub booking: Booking,
    pub lane: Option<LaneContext>,
    /// Last action failure, as shown to the operator.
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct ViewState {
    pub day: ServiceDay,
    pub generation: u64,
    pub snapshot: Option<ScheduleSnapshot>,
    pub plan: Option<FloorPlan>,
    pub rows: Vec<LaneRow>,
    /// Events on `day`, used by the walk-in resolver and the overlap advisor.
    pub events: Vec<EventOption>,
    pub upcoming: Vec<UpcomingEvent>,
    /// Set while the last snapshot load failed. The previous snapshot stays visible.
    pub banner: Option<String>,
    pub detail: Option<DetailView>,
    pub last_loaded_at: Option<DateTime<Utc>>,
    applied_request: u64,
}

impl ViewState {
    fn new(day: ServiceDay) -> Self {
        Self {
            day,
            generation: 0,
            snapshot: None,
            plan: None,
            rows: Vec::new(),
            events: Vec::new(),
            upcoming: Vec::new(),
            banner: None,
            detail: None,
            last_loaded_at: None,
            applied_request: 0,
        }
    }

    /// Drop everything tied to the current day.
    fn reset(&mut self, day: ServiceDay) {
        let generation = self.generation + 1;
        let upcoming = std::mem::take(&mut self.upcoming);
        *self = Self {
            generation,
            upcoming,
            applied_request: self.applied_request,
            ..Self::new(day)
        };
    }

    fn refresh_detail(&mut self) {
        let Some(detail) = self.detail.as_mut() else { return };
        let found = self
            .snapshot
            .as_ref()
            .and_then(|s| s.find_booking(&detail.booking.id));
        match found {
            Some((booking, lane)) => {
                detail.booking = booking.clone();
                detail.lane = lane.map(LaneContext::of);
            }
            None => {
                debug!(booking = %detail.booking.id, "booking left the floor, closing detail");
                self.detail = None;
            }
        }
    }
}

/// Background tasks for one service day. Cancelled on drop.
struct ViewSession {
    day: ServiceDay,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    reload_tx: mpsc::Sender<ReloadReason>,
}

impl ViewSession {
    async fn stop(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        debug!(day = %self.day, "floor session stopped");
    }
}

impl Drop for ViewSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct FloorView {
    api: Arc<dyn FloorApi>,
    hub: Arc<NotifyHub>,
    tz: Tz,
    upcoming_limit: usize,
    state: RwLock<ViewState>,
    request_seq: AtomicU64,
    dispatcher: ActionDispatcher,
    session: Mutex<Option<ViewSession>>,
    clock: Arc<watch::Sender<DateTime<Tz>>>,
}

impl FloorView {
    pub fn new(
        api: Arc<dyn FloorApi>,
        hub: Arc<NotifyHub>,
        tz: Tz,
        day: ServiceDay,
        upcoming_limit: usize,
    ) -> Arc<Self> {
        let (clock, _) = watch::channel(now_local(tz));
        Arc::new(Self {
            api,
            hub,
            tz,
            upcoming_limit,
            state: RwLock::new(ViewState::new(day)),
            request_seq: AtomicU64::new(0),
            dispatcher: ActionDispatcher::new(),
            session: Mutex::new(None),
            clock: Arc::new(clock),
        })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub async fn state(&self) -> RwLockReadGuard<'_, ViewState> {
        self.state.read().await
    }

    pub async fn day(&self) -> ServiceDay {
        self.state.read().await.day
    }

    // ── Session lifecycle ────────────────────────────────────

    /// Start the reload worker, the change feed with its listener, and the
    /// minute clock for the current day, replacing any running session, and queue the first load.
    pub async fn start(self: &Arc<Self>) {
        let day = self.day().await;
        let previous = self.take_session();
        if let Some(previous) = previous {
            previous.stop().await;
        }
        let session = self.spawn_session(day);
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session);
        info!(%day, "floor session started");
    }

    pub async fn shutdown(&self) {
        if let Some(session) = self.take_session() {
            session.stop().await;
        }
    }

    fn take_session(&self) -> Option<ViewSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn spawn_session(self: &Arc<Self>, day: ServiceDay) -> ViewSession {
        let cancel = CancellationToken::new();
        let (reload_tx, mut reload_rx) = mpsc::channel(1);

        let view = Arc::clone(self);
        let worker_cancel = cancel.clone();
        let worker = tokio::spawn(async move {
            loop {
                let reason = tokio::select! {
                    _ = worker_cancel.cancelled() => break,
                    reason = reload_rx.recv() => match reason {
                        Some(reason) => reason,
                        None => break,
                    },
                };
                tokio::select! {
                    _ = worker_cancel.cancelled() => break,
                    _ = view.reload(reason) => {}
                }
            }
        });

        let notifier = tokio::spawn(run_live_notifier(
            self.hub.subscribe(day),
            reload_tx.clone(),
            cancel.clone(),
        ));
        let feed = tokio::spawn(run_change_feed(
            Arc::clone(&self.api),
            Arc::clone(&self.hub),
            day,
            cancel.clone(),
        ));
        let clock = tokio::spawn(run_minute_clock(self.tz, Arc::clone(&self.clock), cancel.clone()));

        request_reload(&reload_tx, ReloadReason::Initial);
        ViewSession {
            day,
            cancel,
            tasks: vec![worker, notifier, feed, clock],
            reload_tx,
        }
    }

    /// Queue a reload on the running session, coalescing with any already queued.
    pub fn request_reload(&self, reason: ReloadReason) {
        let guard = self.session.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = guard.as_ref() {
            request_reload(&session.reload_tx, reason);
        }
    }

    /// Switch to another service day. In-flight loads for the old day are
    /// discarded when they land.
    pub async fn set_service_day(self: &Arc<Self>, day: ServiceDay) {
        {
            let mut state = self.state.write().await;
            if state.day == day {
                return;
            }
            state.reset(day);
            info!(%day, generation = state.generation, "service day changed");
        }
        self.start().await;
    }

    // ── Loading ──────────────────────────────────────────────

    /// Load the snapshot, the day's events and upcoming events. Returns
    /// whether the result was applied.
    pub async fn reload(&self, reason: ReloadReason) -> bool {
        let (day, generation) = {
            let state = self.state.read().await;
            (state.day, state.generation)
        };
        let request = self.request_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let reason_label = observability::reason_label(reason);
        let started = Instant::now();

        let (schedule, events, upcoming) = futures::future::join3(
            self.api.schedule(day),
            self.api.events_for_date(day),
            self.api.upcoming_events(self.upcoming_limit),
        )
        .await;
        metrics::histogram!(observability::RELOAD_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if state.generation != generation || state.day != day || request <= state.applied_request {
            debug!(%day, request, applied = state.applied_request, "discarding stale snapshot");
            metrics::counter!(observability::STALE_RESPONSES_TOTAL, "source" => "snapshot").increment(1);
            metrics::counter!(observability::RELOADS_TOTAL, "reason" => reason_label, "status" => "stale")
                .increment(1);
            return false;
        }
        state.applied_request = request;

        let status = match schedule {
            Ok(snapshot) => {
                let plan = FloorPlan::build(&snapshot, self.tz);
                state.rows = layout_lanes(&snapshot, &plan);
                info!(
                    %day,
                    ?reason,
                    lanes = snapshot.lanes.len(),
                    bookings = plan.totals.bookings,
                    excluded = plan.excluded.len(),
                    "floor loaded"
                );
                state.snapshot = Some(snapshot);
                state.plan = Some(plan);
                state.banner = None;
                state.last_loaded_at = Some(Utc::now());
                state.refresh_detail();
                "ok"
            }
            Err(e) => {
                warn!(%day, ?reason, "schedule load failed: {e}");
                state.banner = Some(format!("Couldn't refresh the floor: {e}"));
                "error"
            }
        };
        match events {
            Ok(events) => state.events = events,
            Err(e) => warn!(%day, "events unavailable, keeping previous: {e}"),
        }
        match upcoming {
            Ok(upcoming) => state.upcoming = upcoming,
            Err(e) => warn!("upcoming events unavailable, keeping previous: {e}"),
        }

        metrics::counter!(observability::RELOADS_TOTAL, "reason" => reason_label, "status" => status)
            .increment(1);
        true
    }

    // ── Clock ────────────────────────────────────────────────

    pub fn now(&self) -> DateTime<Tz> {
        *self.clock.borrow()
    }

    pub fn set_now(&self, now: DateTime<Tz>) {
        self.clock.send_replace(now);
    }

    pub fn subscribe_clock(&self) -> watch::Receiver<DateTime<Tz>> {
        self.clock.subscribe()
    }

    /// The service day `now` falls in. The current day is kept until its
    /// loaded service window has closed, even when that is past midnight.
    pub async fn service_day_at(&self, now: &DateTime<Tz>) -> ServiceDay {
        let state = self.state.read().await;
        let window = state.snapshot.as_ref().map(|s| &s.service_window);
        active_service_day(state.day, window, now)
    }

    /// Where the "now" line sits on the timeline, as a percentage.
    pub async fn now_marker(&self) -> Option<f64> {
        let state = self.state.read().await;
        let plan = state.plan.as_ref()?;
        plan.timeline.now_marker(local_offset(&self.now(), state.day))
    }

    // ── Selection ────────────────────────────────────────────

    /// Handle a click on `lane_id` at `x_pct` across the timeline.
    pub async fn select(&self, lane_id: Ulid, x_pct: f64, can_edit: bool) -> Selection {
        let now = self.now();
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let (Some(snapshot), Some(plan)) = (state.snapshot.as_ref(), state.plan.as_ref()) else {
            return Selection::Nothing;
        };
        let (Some(lane), Some(row)) = (
            snapshot.lane(&lane_id),
            state.rows.iter().find(|r| r.lane_id == lane_id),
        ) else {
            return Selection::Nothing;
        };

        let day = state.day;
        let events = &state.events;
        let selection = click(lane, row, x_pct, can_edit, || {
            resolve_walk_in_defaults(day, &now, &snapshot.service_window, &plan.timeline, events)
        });
        if let Selection::Detail { booking, lane } = &selection {
            state.detail = Some(DetailView {
                booking: booking.clone(),
                lane: lane.clone(),
                error: None,
            });
        }
        selection
    }

    /// Open the detail panel for any booking on the floor, including unassigned ones.
    pub async fn open_detail(&self, booking_id: Ulid) -> bool {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let Some((booking, lane)) = state
            .snapshot
            .as_ref()
            .and_then(|s| s.find_booking(&booking_id))
        else {
            return false;
        };
        state.detail = Some(DetailView {
            booking: booking.clone(),
            lane: lane.map(LaneContext::of),
            error: None,
        });
        true
    }

    pub async fn close_detail(&self) {
        self.state.write().await.detail = None;
    }

    /// Defaults for a walk-in started from the toolbar rather than a lane.
    pub async fn walk_in_defaults(&self) -> Option<WalkInDefaults> {
        let now = self.now();
        let state = self.state.read().await;
        let snapshot = state.snapshot.as_ref()?;
        let plan = state.plan.as_ref()?;
        Some(resolve_walk_in_defaults(
            state.day,
            &now,
            &snapshot.service_window,
            &plan.timeline,
            &state.events,
        ))
    }

    /// A walk-in form pre-filled for now, optionally on a specific table.
    pub async fn walk_in_form(&self, lane: Option<&LaneContext>) -> Option<BookingForm> {
        let defaults = self.walk_in_defaults().await?;
        let day = self.day().await;
        Some(BookingForm::new(TableBookingDraft::walk_in(day, lane, &defaults)))
    }

    // ── Lifecycle actions ────────────────────────────────────

    pub fn pending_action(&self) -> Option<(Ulid, ActionKind)> {
        self.dispatcher.pending()
    }

    /// Apply a lifecycle action and reload on success. The action stays
    /// pending until that reload has landed, so a repeat is rejected as busy
    /// rather than validated against the old snapshot. Failures are recorded
    /// on the open detail panel, which stays open.
    pub async fn perform(&self, booking_id: Ulid, action: LifecycleAction) -> Result<(), ActionError> {
        let pending = match self.dispatcher.begin(booking_id, action.kind()) {
            Ok(pending) => pending,
            Err(e) => {
                self.show_action_error(booking_id, Some(&e)).await;
                return Err(e);
            }
        };

        let result = match self.validate_action(booking_id, &action).await {
            Ok(()) => pending.send(self.api.as_ref(), &action).await,
            Err(e) => Err(e),
        };
        self.show_action_error(booking_id, result.as_ref().err()).await;

        if matches!(result, Ok(()) | Err(ActionError::NotFound(_))) {
            self.reload(ReloadReason::Action).await;
        }
        drop(pending);
        result
    }

    async fn validate_action(&self, booking_id: Ulid, action: &LifecycleAction) -> Result<(), ActionError> {
        let state = self.state.read().await;
        let snapshot = state
            .snapshot
            .as_ref()
            .ok_or(ActionError::NotFound(booking_id))?;
        let (booking, _) = snapshot
            .find_booking(&booking_id)
            .ok_or(ActionError::NotFound(booking_id))?;
        validate(booking, action, snapshot)
    }

    async fn show_action_error(&self, booking_id: Ulid, error: Option<&ActionError>) {
        let mut state = self.state.write().await;
        if let Some(detail) = state.detail.as_mut().filter(|d| d.booking.id == booking_id) {
            detail.error = error.map(ActionError::user_message);
        }
    }

    // ── Booking creation ─────────────────────────────────────

    /// Refresh the form's event-overlap advice. Uses the loaded events when
    /// the draft is for the current day and fetches them otherwise.
    pub async fn advise(&self, form: &mut BookingForm) -> Result<Option<EventOption>, SubmitError> {
        let date = form.draft.date;
        let events = {
            let state = self.state.read().await;
            (state.day == date).then(|| state.events.clone())
        };
        let events = match events {
            Some(events) => events,
            None => self.api.events_for_date(date).await?,
        };
        Ok(form.refresh_advice(&events, self.tz)?.cloned())
    }

    /// Re-run the advisor so the gate reflects the draft being submitted.
    async fn recheck(&self, form: &mut BookingForm) -> Result<(), SubmitError> {
        if form.draft.purpose == Purpose::Event {
            return Ok(());
        }
        self.advise(form).await.map(|_| ())
    }

    /// Place a plain table booking. The draft is re-advised first, so an
    /// overlap the operator has not acknowledged always blocks it.
    pub async fn submit_table_booking(&self, form: &mut BookingForm) -> Result<TableBookingOutcome, SubmitError> {
        let checked = self.recheck(form).await;
        let request = match checked.and_then(|()| form.table_request()) {
            Ok(request) => request,
            Err(e) => {
                record_submission("table", "rejected");
                return Err(e);
            }
        };
        let outcome = match self.api.create_table_booking(&request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                record_submission("table", "error");
                warn!(date = %request.date, time = %request.time, "table booking failed: {e}");
                return Err(e.into());
            }
        };
        if outcome.placed() {
            record_submission("table", "placed");
            info!(date = %request.date, time = %request.time, party = request.party_size, "table booking placed");
            self.reload(ReloadReason::Action).await;
        } else {
            record_submission("table", "blocked");
            info!(reason = ?outcome.blocked_reason, "table booking blocked");
        }
        Ok(outcome)
    }

    /// Book the draft's event, or the advised event when redirecting.
    pub async fn submit_event_booking(&self, form: &mut BookingForm) -> Result<EventBookingOutcome, SubmitError> {
        let checked = self.recheck(form).await;
        let request = match checked.and_then(|()| form.event_request()) {
            Ok(request) => request,
            Err(e) => {
                record_submission("event", "rejected");
                return Err(e);
            }
        };
        let outcome = match self.api.create_event_booking(&request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                record_submission("event", "error");
                warn!(event = %request.event_id, "event booking failed: {e}");
                return Err(e.into());
            }
        };
        if outcome.placed() {
            record_submission("event", "placed");
            info!(event = %request.event_id, seats = request.seats, "event booking placed");
            self.reload(ReloadReason::Action).await;
        } else {
            record_submission("event", "blocked");
            info!(event = %request.event_id, state = ?outcome.state, "event booking not placed");
        }
        Ok(outcome)
    }

    /// Notify the kitchen screens. Failures are logged and otherwise ignored.
    pub fn send_food_order_alert(&self) -> JoinHandle<()> {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            match api.send_food_order_alert().await {
                Ok(()) => info!("food order alert sent"),
                Err(e) => warn!("food order alert failed: {e}"),
            }
        })
    }
}

fn record_submission(kind: &'static str, outcome: &'static str) {
    metrics::counter!(observability::SUBMISSIONS_TOTAL, "kind" => kind, "outcome" => outcome).increment(1);
}
