//! Collaborator surface: the read snapshot plus the fixed set of write actions.

mod error;
mod http;
mod outcome;

pub use error::{ApiError, ApiResult};
pub use http::HttpFloorApi;
pub use outcome::{
    EventBlockReason, EventBookingOutcome, EventBookingState, TableBlockReason,
    TableBookingOutcome, TableBookingState,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::*;
use crate::notify::ChangeEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMatch {
    pub id: Ulid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Backend ranking; higher is a better match.
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuDish {
    pub dish_id: Ulid,
    pub name: String,
    pub price: f64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishSelection {
    pub dish_id: Ulid,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBookingRequest {
    pub date: NaiveDate,
    /// `HH:MM`
    pub time: String,
    pub party_size: u32,
    pub purpose: Purpose,
    pub sunday_lunch: bool,
    pub walk_in: bool,
    pub table_id: Option<Ulid>,
    pub customer_id: Option<Ulid>,
    pub guest_name: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
    /// Event the operator explicitly chose to keep this table booking alongside.
    pub acknowledged_event_id: Option<Ulid>,
    #[serde(default)]
    pub dishes: Vec<DishSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBookingRequest {
    pub event_id: Ulid,
    pub seats: u32,
    pub customer_id: Option<Ulid>,
    pub guest_name: String,
    pub phone: Option<String>,
    pub table_id: Option<Ulid>,
    pub walk_in: bool,
}

/// One answer from the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Where the next poll resumes. `None` keeps the previous cursor.
    pub cursor: Option<String>,
    #[serde(default)]
    pub changes: Vec<ChangeEvent>,
}

#[async_trait]
pub trait FloorApi: Send + Sync {
    async fn schedule(&self, date: NaiveDate) -> ApiResult<ScheduleSnapshot>;
    async fn upcoming_events(&self, limit: usize) -> ApiResult<Vec<UpcomingEvent>>;
    async fn events_for_date(&self, date: NaiveDate) -> ApiResult<Vec<EventOption>>;
    async fn customer_search(
        &self,
        query: &str,
        default_country_code: &str,
    ) -> ApiResult<Vec<CustomerMatch>>;
    async fn sunday_lunch_menu(&self) -> ApiResult<Vec<MenuDish>>;

    /// Long-poll the change feed for `date` from `cursor`. Answers once
    /// changes arrive, or empty when the wait runs out.
    async fn poll_changes(&self, date: NaiveDate, cursor: Option<&str>) -> ApiResult<ChangeBatch>;

    async fn mark_seated(&self, booking_id: Ulid) -> ApiResult<()>;
    async fn mark_left(&self, booking_id: Ulid) -> ApiResult<()>;
    async fn mark_no_show(&self, booking_id: Ulid) -> ApiResult<()>;
    async fn move_table(&self, booking_id: Ulid, table_id: Ulid) -> ApiResult<()>;
    async fn walkout(&self, booking_id: Ulid, amount: f64) -> ApiResult<()>;

    async fn create_table_booking(
        &self,
        request: &TableBookingRequest,
    ) -> ApiResult<TableBookingOutcome>;
    async fn create_event_booking(
        &self,
        request: &EventBookingRequest,
    ) -> ApiResult<EventBookingOutcome>;

    /// Broadcast to kitchen screens. No state changes on this side.
    async fn send_food_order_alert(&self) -> ApiResult<()>;
}
