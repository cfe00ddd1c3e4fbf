use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use ulid::Ulid;

use crate::config::Config;
use crate::limits::FEED_LONG_POLL_SECS;
use crate::model::*;

use super::*;

/// [`FloorApi`] over the venue backend's JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpFloorApi {
    client: Client,
    base_url: String,
    token: Option<String>,
    /// Long polls outlive the normal request timeout by the server's wait.
    feed_timeout: Duration,
}

impl HttpFloorApi {
    pub fn new(config: &Config) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
            feed_timeout: Duration::from_secs(config.request_timeout_secs + FEED_LONG_POLL_SECS),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let request = self.authorize(self.client.get(self.url(path)).query(query));
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(&self, path: &str, body: &B) -> ApiResult<T> {
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// POST whose response body is ignored.
    async fn post_ack<B: Serialize + Sync>(&self, path: &str, body: Option<&B>) -> ApiResult<()> {
        let mut request = self.client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::check(self.authorize(request).send().await?).await?;
        Ok(())
    }

    async fn check(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Serialize)]
struct MoveTableBody {
    table_id: Ulid,
}

#[derive(Serialize)]
struct WalkoutBody {
    amount: f64,
}

const NO_BODY: Option<&()> = None;

#[async_trait]
impl FloorApi for HttpFloorApi {
    async fn schedule(&self, date: NaiveDate) -> ApiResult<ScheduleSnapshot> {
        self.get("api/floor/schedule", &[("date", date.to_string())]).await
    }

    async fn upcoming_events(&self, limit: usize) -> ApiResult<Vec<UpcomingEvent>> {
        self.get("api/events/upcoming", &[("limit", limit.to_string())]).await
    }

    async fn events_for_date(&self, date: NaiveDate) -> ApiResult<Vec<EventOption>> {
        self.get("api/events", &[("date", date.to_string())]).await
    }

    async fn customer_search(
        &self,
        query: &str,
        default_country_code: &str,
    ) -> ApiResult<Vec<CustomerMatch>> {
        self.get(
            "api/customers/search",
            &[
                ("q", query.to_string()),
                ("default_country_code", default_country_code.to_string()),
            ],
        )
        .await
    }

    async fn sunday_lunch_menu(&self) -> ApiResult<Vec<MenuDish>> {
        self.get("api/menus/sunday-lunch", &[]).await
    }

    async fn poll_changes(&self, date: NaiveDate, cursor: Option<&str>) -> ApiResult<ChangeBatch> {
        let mut query = vec![
            ("date", date.to_string()),
            ("wait", FEED_LONG_POLL_SECS.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        let request = self.authorize(
            self.client
                .get(self.url("api/floor/changes"))
                .query(&query)
                .timeout(self.feed_timeout),
        );
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn mark_seated(&self, booking_id: Ulid) -> ApiResult<()> {
        self.post_ack(&format!("api/bookings/{booking_id}/seated"), NO_BODY).await
    }

    async fn mark_left(&self, booking_id: Ulid) -> ApiResult<()> {
        self.post_ack(&format!("api/bookings/{booking_id}/left"), NO_BODY).await
    }

    async fn mark_no_show(&self, booking_id: Ulid) -> ApiResult<()> {
        self.post_ack(&format!("api/bookings/{booking_id}/no-show"), NO_BODY).await
    }

    async fn move_table(&self, booking_id: Ulid, table_id: Ulid) -> ApiResult<()> {
        self.post_ack(
            &format!("api/bookings/{booking_id}/move-table"),
            Some(&MoveTableBody { table_id }),
        )
        .await
    }

    async fn walkout(&self, booking_id: Ulid, amount: f64) -> ApiResult<()> {
        self.post_ack(
            &format!("api/bookings/{booking_id}/walkout"),
            Some(&WalkoutBody { amount }),
        )
        .await
    }

    async fn create_table_booking(
        &self,
        request: &TableBookingRequest,
    ) -> ApiResult<TableBookingOutcome> {
        self.post("api/bookings/table", request).await
    }

    async fn create_event_booking(
        &self,
        request: &EventBookingRequest,
    ) -> ApiResult<EventBookingOutcome> {
        self.post("api/bookings/event", request).await
    }

    async fn send_food_order_alert(&self) -> ApiResult<()> {
        self.post_ack("api/kitchen/food-order-alert", NO_BODY).await
    }
}
