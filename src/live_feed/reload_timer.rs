//! Periodic data reload requests for a live connection

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{
    spawn,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, info, warn};

use super::emitter::{EventEmitter, emit_with_ack};
use crate::model::{RELOAD_EVENT, ReloadRequest};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReloadTiming {
    /// Time between two reload requests
    pub interval: Duration,
    /// How long to wait for each acknowledgement
    pub ack_timeout: Duration,
}

impl Default for ReloadTiming {
    fn default() -> Self {
        ReloadTiming {
            interval: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(3),
        }
    }
}

/// Sends [`RELOAD_EVENT`] right away and then on every interval, until disarmed.
///
/// Dropping the timer disarms it.
#[derive(Debug)]
pub struct ReloadTimer {
    live: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ReloadTimer {
    pub fn arm<E: EventEmitter>(emitter: E, request: ReloadRequest, timing: ReloadTiming) -> Self {
        let live = Arc::new(AtomicBool::new(true));
        let task = spawn(send_reloads(emitter, request, timing, live.clone()));

        ReloadTimer { live, task }
    }

    /// Stops the timer, same as dropping it.
    pub fn disarm(self) {}

    /// The timer still sends reloads: not disarmed, and its task hasn't ended.
    pub fn is_armed(&self) -> bool {
        self.live.load(Ordering::Acquire) && !self.task.is_finished()
    }
}

impl Drop for ReloadTimer {
    fn drop(&mut self) {
        self.live.store(false, Ordering::Release);
        self.task.abort();
    }
}

async fn send_reloads<E: EventEmitter>(
    emitter: E,
    request: ReloadRequest,
    timing: ReloadTiming,
    live: Arc<AtomicBool>,
) {
    let payload = request.to_payload();

    info!(
        provider = %request.provider,
        route = %request.route,
        "sending {RELOAD_EVENT}"
    );
    let outcome = emit_with_ack(&emitter, RELOAD_EVENT, payload.clone(), timing.ack_timeout).await;
    if outcome.ok {
        info!(ack = ?outcome.ack, "{RELOAD_EVENT} acknowledged");
    } else {
        warn!(error = ?outcome.error, "{RELOAD_EVENT} not acknowledged");
    }

    info!("waiting for server events");

    let mut ticker = interval_at(Instant::now() + timing.interval, timing.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if !live.load(Ordering::Acquire) {
            break;
        }

        let outcome =
            emit_with_ack(&emitter, RELOAD_EVENT, payload.clone(), timing.ack_timeout).await;
        debug!(?outcome, "periodic {RELOAD_EVENT}");
    }
}
