pub mod config;
pub mod kiosk;
pub mod live_feed;
pub mod model;
pub mod telemetry;
pub mod utils;
