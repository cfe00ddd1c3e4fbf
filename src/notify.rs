use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::limits::FEED_CHANNEL_CAPACITY;
use crate::model::ServiceDay;

/// Backend record types whose changes can alter the day snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedTable {
    Bookings,
    TableAssignments,
    Tables,
    Customers,
    PrivateBookings,
    PrivateBookingItems,
    AreaMappings,
}

impl FeedTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedTable::Bookings => "bookings",
            FeedTable::TableAssignments => "table_assignments",
            FeedTable::Tables => "tables",
            FeedTable::Customers => "customers",
            FeedTable::PrivateBookings => "private_bookings",
            FeedTable::PrivateBookingItems => "private_booking_items",
            FeedTable::AreaMappings => "area_mappings",
        }
    }
}

/// One change-feed notification. Carries no payload: receivers reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub day: ServiceDay,
    pub table: FeedTable,
    pub record_id: Option<Ulid>,
}

/// Broadcast hub for change notifications, one channel per service day.
pub struct NotifyHub {
    channels: DashMap<ServiceDay, broadcast::Sender<ChangeEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to changes for a service day. Creates the channel if needed.
    pub fn subscribe(&self, day: ServiceDay) -> broadcast::Receiver<ChangeEvent> {
        let sender = self
            .channels
            .entry(day)
            .or_insert_with(|| broadcast::channel(FEED_CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification to the event's day. No-op if nobody is listening.
    pub fn send(&self, event: &ChangeEvent) {
        if let Some(sender) = self.channels.get(&event.day) {
            let _ = sender.send(event.clone());
        }
    }

    pub fn subscriber_count(&self, day: ServiceDay) -> usize {
        self.channels
            .get(&day)
            .map_or(0, |sender| sender.receiver_count())
    }

    /// Drop a day's channel. Live receivers see the feed close.
    pub fn remove(&self, day: &ServiceDay) {
        self.channels.remove(day);
    }
}
