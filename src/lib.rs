pub mod actions;
pub mod api;
pub mod booking;
pub mod clock;
pub mod config;
pub mod layout;
pub mod limits;
pub mod live;
pub mod lookup;
pub mod model;
pub mod notify;
pub mod observability;
pub mod schedule;
pub mod view;
