#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use tokio::sync::Notify;
use ulid::Ulid;

use floorline::api::*;
use floorline::model::*;
use floorline::notify::ChangeEvent;

// ── In-memory backend ────────────────────────────────────────

/// Backend double: serves snapshots from memory and applies lifecycle
/// actions to them, so a reload after an action sees the change.
#[derive(Default)]
pub struct FakeApi {
    pub schedules: Mutex<HashMap<NaiveDate, ScheduleSnapshot>>,
    pub events: Mutex<Vec<EventOption>>,
    pub customers: Mutex<Vec<CustomerMatch>>,
    pub menu: Mutex<Option<Vec<MenuDish>>>,
    /// The next schedule load for each of these days waits until notified.
    pub holds: Mutex<HashMap<NaiveDate, Arc<Notify>>>,
    pub action_delay: Mutex<Option<Duration>>,
    pub search_delay: Mutex<Option<Duration>>,
    pub fail_schedule: AtomicBool,
    pub fail_events: AtomicBool,
    pub fail_actions: AtomicBool,
    pub fail_search: AtomicBool,
    pub fail_alert: AtomicBool,
    pub fail_feed: AtomicBool,
    /// Changes waiting for the next feed poll.
    pub feed: Mutex<Vec<ChangeEvent>>,
    pub feed_ready: Notify,
    pub feed_polls: AtomicUsize,
    pub feed_batches: AtomicUsize,
    pub feed_cursors: Mutex<Vec<Option<String>>>,
    pub block_table_bookings: AtomicBool,
    pub schedule_calls: AtomicUsize,
    pub alerts: AtomicUsize,
    pub searches: Mutex<Vec<String>>,
    pub actions: Mutex<Vec<(Ulid, &'static str)>>,
    pub table_requests: Mutex<Vec<TableBookingRequest>>,
    pub event_requests: Mutex<Vec<EventBookingRequest>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, snapshot: ScheduleSnapshot) {
        self.schedules.lock().unwrap().insert(snapshot.date, snapshot);
    }

    pub fn hold(&self, day: NaiveDate) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds.lock().unwrap().insert(day, notify.clone());
        notify
    }

    /// Queue a change for the feed and wake any waiting poll.
    pub fn push_change(&self, event: ChangeEvent) {
        self.feed.lock().unwrap().push(event);
        self.feed_ready.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.schedule_calls.load(Ordering::SeqCst)
    }

    fn update_booking(&self, id: Ulid, f: impl Fn(&mut Booking)) -> ApiResult<()> {
        let mut schedules = self.schedules.lock().unwrap();
        let mut found = false;
        for snapshot in schedules.values_mut() {
            for b in snapshot
                .lanes
                .iter_mut()
                .flat_map(|l| l.bookings.iter_mut())
                .chain(snapshot.unassigned_bookings.iter_mut())
            {
                if b.id == id {
                    f(b);
                    found = true;
                }
            }
        }
        if found {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: 404,
                body: "booking not found".into(),
            })
        }
    }

    async fn act(&self, id: Ulid, name: &'static str, f: impl Fn(&mut Booking)) -> ApiResult<()> {
        let delay = *self.action_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.actions.lock().unwrap().push((id, name));
        if self.fail_actions.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable("backend down".into()));
        }
        self.update_booking(id, f)
    }
}

#[async_trait]
impl FloorApi for FakeApi {
    async fn schedule(&self, date: NaiveDate) -> ApiResult<ScheduleSnapshot> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.holds.lock().unwrap().remove(&date);
        if let Some(hold) = hold {
            hold.notified().await;
        }
        if self.fail_schedule.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable("schedule offline".into()));
        }
        self.schedules
            .lock()
            .unwrap()
            .get(&date)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                body: "no schedule".into(),
            })
    }

    async fn upcoming_events(&self, limit: usize) -> ApiResult<Vec<UpcomingEvent>> {
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .take(limit)
            .map(|e| UpcomingEvent {
                id: e.id,
                name: e.name.clone(),
                date: e.start_at.date_naive(),
                time: None,
                start_at: Some(e.start_at),
                end_at: Some(e.end_at),
            })
            .collect())
    }

    async fn events_for_date(&self, date: NaiveDate) -> ApiResult<Vec<EventOption>> {
        if self.fail_events.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable("events offline".into()));
        }
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|e| e.start_at.date_naive() == date)
            .cloned()
            .collect())
    }

    async fn customer_search(&self, query: &str, _country: &str) -> ApiResult<Vec<CustomerMatch>> {
        self.searches.lock().unwrap().push(query.to_string());
        let delay = *self.search_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable("search offline".into()));
        }
        let q = query.to_lowercase();
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&q))
            .cloned()
            .collect())
    }

    async fn sunday_lunch_menu(&self) -> ApiResult<Vec<MenuDish>> {
        self.menu
            .lock()
            .unwrap()
            .clone()
            .ok_or(ApiError::Unavailable("menu offline".into()))
    }

    async fn poll_changes(&self, _date: NaiveDate, cursor: Option<&str>) -> ApiResult<ChangeBatch> {
        self.feed_polls.fetch_add(1, Ordering::SeqCst);
        self.feed_cursors.lock().unwrap().push(cursor.map(str::to_string));
        if self.fail_feed.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable("feed offline".into()));
        }
        loop {
            let changes = std::mem::take(&mut *self.feed.lock().unwrap());
            if !changes.is_empty() {
                let n = self.feed_batches.fetch_add(1, Ordering::SeqCst) + 1;
                return Ok(ChangeBatch {
                    cursor: Some(format!("c{n}")),
                    changes,
                });
            }
            self.feed_ready.notified().await;
        }
    }

    async fn mark_seated(&self, id: Ulid) -> ApiResult<()> {
        self.act(id, "seat", |b| {
            b.status = BookingStatus::Seated;
            b.seated_at = Some(Utc::now());
        })
        .await
    }

    async fn mark_left(&self, id: Ulid) -> ApiResult<()> {
        self.act(id, "leave", |b| {
            b.status = BookingStatus::Left;
            b.left_at = Some(Utc::now());
        })
        .await
    }

    async fn mark_no_show(&self, id: Ulid) -> ApiResult<()> {
        self.act(id, "no_show", |b| {
            b.status = BookingStatus::NoShow;
            b.no_show_at = Some(Utc::now());
        })
        .await
    }

    async fn move_table(&self, id: Ulid, table_id: Ulid) -> ApiResult<()> {
        self.act(id, "move_table", |b| b.assigned_table_ids = vec![table_id]).await
    }

    async fn walkout(&self, id: Ulid, _amount: f64) -> ApiResult<()> {
        self.act(id, "walkout", |_| {}).await
    }

    async fn create_table_booking(&self, request: &TableBookingRequest) -> ApiResult<TableBookingOutcome> {
        self.table_requests.lock().unwrap().push(request.clone());
        if self.block_table_bookings.load(Ordering::SeqCst) {
            return Ok(TableBookingOutcome {
                state: TableBookingState::Blocked,
                blocked_reason: Some("no_table".into()),
                table_name: None,
                next_step_url: None,
            });
        }
        Ok(TableBookingOutcome {
            state: TableBookingState::Confirmed,
            blocked_reason: None,
            table_name: Some("T1".into()),
            next_step_url: None,
        })
    }

    async fn create_event_booking(&self, request: &EventBookingRequest) -> ApiResult<EventBookingOutcome> {
        self.event_requests.lock().unwrap().push(request.clone());
        Ok(EventBookingOutcome {
            state: EventBookingState::Confirmed,
            reason: None,
            seats_remaining: Some(10),
            next_step_url: None,
        })
    }

    async fn send_food_order_alert(&self) -> ApiResult<()> {
        self.alerts.fetch_add(1, Ordering::SeqCst);
        if self.fail_alert.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable("kitchen screens offline".into()));
        }
        Ok(())
    }
}

// ── Fixtures ─────────────────────────────────────────────────

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

pub fn evening() -> ServiceWindow {
    ServiceWindow {
        start_time: "17:00".into(),
        end_time: "23:00".into(),
        end_next_day: false,
        kitchen_start_time: Some("17:00".into()),
        kitchen_end_time: Some("21:00".into()),
        kitchen_end_next_day: None,
        kitchen_closed: false,
    }
}

pub fn booking(guest: &str, clock: &str) -> Booking {
    Booking {
        id: Ulid::new(),
        reference: format!("REF-{guest}"),
        guest_name: guest.into(),
        start_at: None,
        end_at: None,
        booking_time: Some(clock.into()),
        party_size: 2,
        purpose: Purpose::Food,
        status: BookingStatus::Confirmed,
        seated_at: None,
        left_at: None,
        no_show_at: None,
        is_private_block: false,
        assigned_table_ids: vec![],
    }
}

pub fn lane(name: &str, mut bookings: Vec<Booking>) -> Lane {
    let id = Ulid::new();
    for b in &mut bookings {
        b.assigned_table_ids = vec![id];
    }
    Lane {
        id,
        name: name.into(),
        number: None,
        capacity: 4,
        area: None,
        is_bookable: true,
        bookings,
    }
}

pub fn snapshot(date: NaiveDate, lanes: Vec<Lane>) -> ScheduleSnapshot {
    ScheduleSnapshot {
        date,
        service_window: evening(),
        lanes,
        unassigned_bookings: vec![],
    }
}

pub fn event_on(date: NaiveDate, start_h: u32, end_h: u32) -> EventOption {
    let at = |h: u32| Utc.from_utc_datetime(&date.and_hms_opt(h, 0, 0).unwrap());
    EventOption {
        id: Ulid::new(),
        name: "Quiz night".into(),
        start_at: at(start_h),
        end_at: at(end_h),
        payment_mode: PaymentMode::Free,
        booking_mode: BookingMode::Table,
        capacity: Some(40),
        seats_remaining: Some(8),
        is_full: false,
    }
}

pub fn customer(name: &str, score: f64) -> CustomerMatch {
    CustomerMatch {
        id: Ulid::new(),
        name: name.into(),
        phone: None,
        email: None,
        score,
    }
}
