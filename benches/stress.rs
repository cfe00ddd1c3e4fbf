use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, TimeZone, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

use floorline::layout::{layout_lanes, LaneRow};
use floorline::live::{run_live_notifier, ReloadReason};
use floorline::model::*;
use floorline::notify::{ChangeEvent, FeedTable, NotifyHub};
use floorline::schedule::{find_overlapping_event, BookingProposal, FloorPlan};

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

fn service_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
}

/// A busy night: every lane turned several times between noon and close,
/// with a mix of timestamped and legacy clock-only bookings.
fn busy_night(lanes: usize, per_lane: usize) -> ScheduleSnapshot {
    let day = service_day();
    let lanes = (0..lanes)
        .map(|l| {
            let id = Ulid::new();
            let bookings = (0..per_lane)
                .map(|i| {
                    let start = 12 * 60 + (i as i32) * 75 + (l as i32 % 4) * 10;
                    let timestamped = i % 3 != 0;
                    Booking {
                        id: Ulid::new(),
                        reference: format!("B{l}-{i}"),
                        guest_name: format!("Guest {l}-{i}"),
                        start_at: timestamped.then(|| {
                            Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap())
                                + chrono::Duration::minutes(i64::from(start))
                        }),
                        end_at: None,
                        booking_time: (!timestamped)
                            .then(|| format!("{:02}:{:02}", (start / 60) % 24, start % 60)),
                        party_size: 2 + (i % 5) as u32,
                        purpose: if i % 2 == 0 { Purpose::Food } else { Purpose::Drinks },
                        status: BookingStatus::Confirmed,
                        seated_at: None,
                        left_at: None,
                        no_show_at: None,
                        is_private_block: i % 17 == 0,
                        assigned_table_ids: vec![id],
                    }
                })
                .collect();
            Lane {
                id,
                name: format!("T{l}"),
                number: Some(l as u32),
                capacity: 4,
                area: None,
                is_bookable: true,
                bookings,
            }
        })
        .collect();

    ScheduleSnapshot {
        date: day,
        service_window: ServiceWindow {
            start_time: "12:00".into(),
            end_time: "01:00".into(),
            end_next_day: true,
            kitchen_start_time: Some("12:00".into()),
            kitchen_end_time: Some("21:30".into()),
            kitchen_end_next_day: None,
            kitchen_closed: false,
        },
        lanes,
        unassigned_bookings: vec![],
    }
}

fn phase1_build(snapshot: &ScheduleSnapshot) -> (FloorPlan, Vec<LaneRow>) {
    let n = 500;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();
    let mut last = None;

    for _ in 0..n {
        let t = Instant::now();
        let plan = FloorPlan::build(snapshot, chrono_tz::Europe::London);
        let rows = layout_lanes(snapshot, &plan);
        latencies.push(t.elapsed());
        last = Some((plan, rows));
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} rebuilds in {:.2}s = {ops:.0} rebuilds/sec", elapsed.as_secs_f64());
    print_latency("plan + layout latency", &mut latencies);
    last.unwrap()
}

fn phase2_hit_test(rows: &[LaneRow]) {
    let n = 200_000;
    let mut hits = 0usize;
    let start = Instant::now();
    for i in 0..n {
        let row = &rows[i % rows.len()];
        let x = (i % 1000) as f64 / 10.0;
        if row.hit_test(x).is_some() {
            hits += 1;
        }
    }
    let elapsed = start.elapsed();
    println!(
        "  {n} clicks in {:.3}s = {:.0} clicks/sec ({hits} on a booking)",
        elapsed.as_secs_f64(),
        n as f64 / elapsed.as_secs_f64()
    );
}

fn phase3_advisor() {
    let day = service_day();
    let events: Vec<EventOption> = (0..200)
        .map(|i| {
            let start = Utc.from_utc_datetime(&day.and_hms_opt(10, 0, 0).unwrap())
                + chrono::Duration::minutes(i * 7);
            EventOption {
                id: Ulid::new(),
                name: format!("Event {i}"),
                start_at: start,
                end_at: start + chrono::Duration::minutes(45),
                payment_mode: PaymentMode::Free,
                booking_mode: if i % 3 == 0 { BookingMode::General } else { BookingMode::Table },
                capacity: Some(50),
                seats_remaining: Some(10),
                is_full: false,
            }
        })
        .collect();

    let n = 20_000;
    let mut latencies = Vec::with_capacity(n);
    let mut advised = 0usize;
    for i in 0..n {
        let proposal = BookingProposal {
            date: day,
            time: format!("{:02}:{:02}", 8 + (i % 14), (i * 5) % 60),
            purpose: if i % 2 == 0 { Purpose::Food } else { Purpose::Drinks },
            sunday_lunch: false,
        };
        let t = Instant::now();
        if let Ok(Some(_)) = find_overlapping_event(&proposal, &events, chrono_tz::Europe::London) {
            advised += 1;
        }
        latencies.push(t.elapsed());
    }
    println!("  {advised}/{n} proposals advised against {} events", events.len());
    print_latency("advisor latency", &mut latencies);
}

async fn phase4_feed_storm() {
    let hub = Arc::new(NotifyHub::new());
    let (tx, mut rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_live_notifier(hub.subscribe(service_day()), tx, cancel.clone()));

    let n = 5_000;
    let start = Instant::now();
    for i in 0..n {
        hub.send(&ChangeEvent {
            day: service_day(),
            table: if i % 2 == 0 { FeedTable::Bookings } else { FeedTable::TableAssignments },
            record_id: None,
        });
        if i % 500 == 0 {
            tokio::task::yield_now().await;
        }
    }
    tokio::time::sleep(Duration::from_millis(400)).await;
    cancel.cancel();
    let _ = task.await;

    let mut reloads = 0;
    while let Ok(reason) = rx.try_recv() {
        assert_eq!(reason, ReloadReason::Feed);
        reloads += 1;
    }
    println!(
        "  {n} notifications in {:.2}s collapsed into {reloads} reload(s)",
        start.elapsed().as_secs_f64()
    );
}

#[tokio::main]
async fn main() {
    let lanes: usize = std::env::var("FLOORLINE_BENCH_LANES")
        .unwrap_or_else(|_| "80".into())
        .parse()
        .expect("invalid FLOORLINE_BENCH_LANES");
    let per_lane: usize = std::env::var("FLOORLINE_BENCH_BOOKINGS_PER_LANE")
        .unwrap_or_else(|_| "10".into())
        .parse()
        .expect("invalid FLOORLINE_BENCH_BOOKINGS_PER_LANE");

    println!("=== floorline stress benchmark ===");
    println!("floor: {lanes} lanes x {per_lane} bookings\n");

    println!("[setup]");
    let snapshot = busy_night(lanes, per_lane);
    println!("  built snapshot with {} bookings", snapshot.unique_bookings().count());

    println!("\n[phase 1] plan + layout rebuild");
    let (plan, rows) = phase1_build(&snapshot);
    println!("  timeline {}..{}, {} excluded", plan.timeline.start, plan.timeline.end, plan.excluded.len());

    println!("\n[phase 2] click hit-testing");
    phase2_hit_test(&rows);

    println!("\n[phase 3] event overlap advisor");
    phase3_advisor();

    println!("\n[phase 4] change-feed storm");
    phase4_feed_storm().await;

    println!("\n=== benchmark complete ===");
}
