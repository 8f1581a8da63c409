//! Command line configuration of the two binaries

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser};

use crate::{
    kiosk::KIOSK_BASE_URL,
    live_feed::{LIVE_FEED_ORIGIN, LIVE_FEED_URL, ReloadTiming},
    model::ReloadRequest,
};

/// Logging options shared by both binaries. `RUST_LOG` sets the filter.
#[derive(Args, Debug, Clone, Default)]
pub struct LogArgs {
    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Export tracing spans to this OTLP gRPC endpoint, e.g. http://localhost:4317
    #[arg(long)]
    pub otlp_endpoint: Option<String>,
}

/// Prints the stops of a myrapidbus route as JSON.
#[derive(Parser, Debug)]
#[command(name = "get_bus_stops", version)]
pub struct StopsArgs {
    /// Route code (e.g. T580) or internal route id (e.g. 673)
    pub route: Option<String>,

    /// List the routes of the kiosk dropdown instead
    #[arg(long, conflicts_with = "route")]
    pub list: bool,

    #[arg(long, default_value = KIOSK_BASE_URL)]
    pub base_url: String,

    #[command(flatten)]
    pub log: LogArgs,
}

impl StopsArgs {
    pub const USAGE: &'static str = "Usage: get_bus_stops <ROUTE_CODE or ROUTE_ID>\n  e.g. get_bus_stops T580  or  get_bus_stops 673";

    /// The route argument, trimmed. Blank counts as missing.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref().map(str::trim).filter(|route| !route.is_empty())
    }

    /// Neither a route nor `--list` was given
    pub fn is_missing_request(&self) -> bool {
        self.route().is_none() && !self.list
    }
}

/// Streams live vehicle locations of a myrapidbus route.
#[derive(Parser, Debug)]
#[command(name = "live_feed", version)]
pub struct LiveFeedArgs {
    #[arg(long, default_value = LIVE_FEED_URL)]
    pub url: String,

    /// Origin header sent with the websocket handshake
    #[arg(long, default_value = LIVE_FEED_ORIGIN)]
    pub origin: String,

    #[arg(long, default_value = "RKL")]
    pub provider: String,

    #[arg(long, default_value = "T5800")]
    pub route: String,

    /// Seconds between reload requests
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub reload_interval_secs: u64,

    /// Seconds to wait for the server to acknowledge a reload request
    #[arg(long, default_value_t = 3)]
    pub ack_timeout_secs: u64,

    #[command(flatten)]
    pub log: LogArgs,
}

impl LiveFeedArgs {
    pub fn reload_request(&self) -> ReloadRequest {
        ReloadRequest {
            provider: self.provider.clone(),
            route: self.route.clone(),
        }
    }

    pub fn reload_timing(&self) -> ReloadTiming {
        ReloadTiming {
            interval: Duration::from_secs(self.reload_interval_secs),
            ack_timeout: Duration::from_secs(self.ack_timeout_secs),
        }
    }
}
