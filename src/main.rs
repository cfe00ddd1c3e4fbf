use std::sync::Arc;

use tracing::info;

use floorline::api::HttpFloorApi;
use floorline::clock::today;
use floorline::config::Config;
use floorline::notify::NotifyHub;
use floorline::view::FloorView;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    floorline::observability::init(config.metrics_port)?;

    let api = Arc::new(HttpFloorApi::new(&config)?);
    let hub = Arc::new(NotifyHub::new());
    let pinned_day = config.service_date;
    let day = pinned_day.unwrap_or_else(|| today(config.timezone));

    info!("floorline following {}", config.api_url);
    info!("  service day: {day}{}", if pinned_day.is_some() { " (pinned)" } else { "" });
    info!("  timezone: {}", config.timezone);
    info!("  auth: {}", if config.api_token.is_some() { "bearer token" } else { "none" });
    info!("  metrics: {}", config.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let view = FloorView::new(api, hub, config.timezone, day, config.upcoming_events_limit);
    view.start().await;
    let mut clock = view.subscribe_clock();

    // Graceful shutdown on SIGTERM/ctrl-c
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = clock.changed() => {
                if changed.is_err() {
                    break;
                }
                let now = *clock.borrow_and_update();
                if pinned_day.is_none() {
                    let next = view.service_day_at(&now).await;
                    if next != view.day().await {
                        view.set_service_day(next).await;
                        continue;
                    }
                }
                log_floor(&view).await;
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    view.shutdown().await;
    info!("floorline stopped");
    Ok(())
}

async fn log_floor(view: &FloorView) {
    let marker = view.now_marker().await;
    let state = view.state().await;
    if let Some(banner) = &state.banner {
        tracing::warn!("{banner}");
    }
    let Some(plan) = &state.plan else { return };
    let t = &plan.totals;
    info!(
        day = %state.day,
        bookings = t.bookings,
        covers = t.covers,
        seated = t.seated_covers,
        unassigned = t.unassigned,
        now_pct = %marker.map(|p| format!("{p:.1}")).unwrap_or_else(|| "-".into()),
        "floor"
    );
    for row in &state.rows {
        let seated = row
            .blocks
            .iter()
            .filter(|b| b.visual == floorline::layout::VisualState::Seated)
            .count();
        tracing::debug!(lane = %row.name, blocks = row.blocks.len(), seated, "lane");
    }
}
